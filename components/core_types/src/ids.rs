//! Typed identifiers shared across components.
//!
//! Ids are plain indices. A `ClassId` indexes the class arena, a `MethodId`
//! names a method by its owning class and declaration index, a `SignatureId`
//! is the engine-wide number assigned to a `name + descriptor` pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a class in the class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// A method, addressed by owning class and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId {
    /// Declaring class
    pub class: ClassId,
    /// Index into the class's method table
    pub index: u16,
}

impl MethodId {
    /// Creates a method id.
    pub fn new(class: ClassId, index: u16) -> Self {
        Self { class, index }
    }
}

/// Engine-wide id for a method signature (`name` + descriptor).
///
/// Shared by all classes and stable for the lifetime of the engine, so
/// virtual dispatch is a table lookup instead of a string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignatureId(pub u32);

/// Identifier of a Java thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

/// Index of a host native in the native registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method#{}.{}", self.class.0, self.index)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}
