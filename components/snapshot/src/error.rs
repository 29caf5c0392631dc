//! Snapshot errors.

use bytecode_system::LinkError;
use interpreter::EngineError;
use thiserror::Error;

/// Why an image could not be written, read or restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The bytes do not start with the image magic
    #[error("not a snapshot image")]
    BadMagic,
    /// Written by an incompatible format version
    #[error("unsupported snapshot version {found} (this build reads {expected})")]
    UnsupportedVersion {
        /// Version in the header
        found: u16,
        /// Version this build writes
        expected: u16,
    },
    /// The image ends inside its header
    #[error("snapshot image truncated")]
    Truncated,
    /// The body does not match the header checksum
    #[error("snapshot body checksum mismatch")]
    ChecksumMismatch,
    /// Body serialization failed
    #[error("snapshot body: {0}")]
    Codec(#[from] bincode::Error),
    /// A class the image references is not loaded
    #[error("class {0} is not loaded")]
    MissingClass(String),
    /// A loaded class differs in shape from the one captured
    #[error("class {class} changed shape: image hash {expected}, loaded hash {found}")]
    ClassHashMismatch {
        /// Class name
        class: String,
        /// Hash recorded in the image
        expected: String,
        /// Hash of the loaded class
        found: String,
    },
    /// A method with a live frame in the image is not loaded
    #[error("method {0} is not loaded")]
    MissingMethod(String),
    /// A method with a live frame differs in shape from the one captured
    #[error("method {method} changed shape: image hash {expected}, loaded hash {found}")]
    MethodHashMismatch {
        /// `Class.name(descriptor)`
        method: String,
        /// Hash recorded in the image
        expected: String,
        /// Hash of the loaded method
        found: String,
    },
    /// An object carries a companion no codec is registered for
    #[error("no companion codec registered for {0}")]
    NoCodec(String),
    /// A codec was handed a companion of another type
    #[error("companion of {0} is not the type its codec expects")]
    CompanionType(String),
    /// Capture during a slice, or restore into an engine with threads
    #[error("engine busy: {0}")]
    Busy(&'static str),
    /// The image contradicts itself
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    /// A method with a live frame failed to link
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The engine rejected the restored state
    #[error(transparent)]
    Engine(#[from] EngineError),
}
