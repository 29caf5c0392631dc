//! Class model errors.

use thiserror::Error;

use crate::descriptor::DescriptorError;

/// Errors registering classes or resolving members.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    /// A class with this name is already registered
    #[error("class {0} is already loaded")]
    DuplicateClass(String),
    /// A field or method descriptor did not parse
    #[error("{class}.{member}: {source}")]
    Descriptor {
        /// Declaring class
        class: String,
        /// Member name
        member: String,
        /// Parse failure
        #[source]
        source: DescriptorError,
    },
    /// No class with this name
    #[error("no class {0}")]
    NoSuchClass(String),
    /// No method with this name and descriptor anywhere up the hierarchy
    #[error("no method {class}.{name}{descriptor}")]
    NoSuchMethod {
        /// Class the lookup started from
        class: String,
        /// Method name
        name: String,
        /// Method descriptor
        descriptor: String,
    },
    /// No field with this name and descriptor anywhere up the superclass chain
    #[error("no field {class}.{name}:{descriptor}")]
    NoSuchField {
        /// Class the lookup started from
        class: String,
        /// Field name
        name: String,
        /// Field descriptor
        descriptor: String,
    },
    /// A name used as an array class is not an array descriptor
    #[error("{0} is not an array type")]
    NotAnArray(String),
}
