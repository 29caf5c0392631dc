//! Engine snapshots
//!
//! A snapshot captures the whole observable state of a quiescent engine
//! (heap, interned strings, static storage, threads with their frames)
//! into a versioned binary image, and restores it into another engine
//! that has loaded the same classes.
//!
//! Restore refuses an image if any class it mentions, or any method with a
//! live frame, has a different structural hash in the target engine.
//! Native companions travel through codecs registered per class in a
//! [`CompanionRegistry`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use class_model::ClassTable;
//! use core_types::VmConfig;
//! use interpreter::Engine;
//! use snapshot::{load, save, CompanionRegistry};
//!
//! let engine = Engine::new(Arc::new(ClassTable::new()), VmConfig::default()).unwrap();
//! let codecs = CompanionRegistry::new();
//! let bytes = save(&engine, &codecs).unwrap();
//!
//! let mut fresh = Engine::new(Arc::new(ClassTable::new()), VmConfig::default()).unwrap();
//! load(&mut fresh, &bytes, &codecs).unwrap();
//! assert_eq!(fresh.heap().len(), engine.heap().len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod capture;
mod codec;
mod error;
mod image;
mod restore;

pub use capture::capture;
pub use codec::{CompanionCodec, CompanionRegistry, SerdeCodec};
pub use error::SnapshotError;
pub use image::{
    ClassRecord, FrameRecord, ObjectRecord, PayloadRecord, SnapshotImage, StaticsRecord, ThreadRecord,
    ThreadStateRecord, FORMAT_VERSION, MAGIC,
};
pub use restore::{restore, validate, ResolvedClasses};

use interpreter::Engine;

/// Captures `engine` and encodes the image.
pub fn save(engine: &Engine, codecs: &CompanionRegistry) -> Result<Vec<u8>, SnapshotError> {
    capture(engine, codecs)?.to_bytes()
}

/// Decodes an image and restores it into `engine`.
pub fn load(engine: &mut Engine, bytes: &[u8], codecs: &CompanionRegistry) -> Result<(), SnapshotError> {
    let image = SnapshotImage::from_bytes(bytes)?;
    restore(engine, &image, codecs)
}
