//! Class model for the handset VM
//!
//! Metadata containers for loaded classes: [`ClassInfo`], [`Method`],
//! [`Field`], the thread-safe [`ConstantPool`] and the [`ClassTable`] arena
//! that holds them. Beyond structural queries (member resolution up the
//! superclass chain, the `is` subtype test, structural hashes) nothing here
//! executes; linking and execution live in other components.
//!
//! # Overview
//!
//! - [`ClassDefinition`] / [`ClassBuilder`] - unlinked classes from the class source
//! - [`ClassTable`] - registration, lookup, hierarchy links, array classes
//! - [`install_core_classes`] - minimal `java/lang` classes the engine relies on
//! - [`ClassInfo::structural_hash`] - shape hash used to validate snapshots
//!
//! # Examples
//!
//! ```
//! use class_model::{install_core_classes, names, ClassBuilder, ClassTable};
//!
//! let table = ClassTable::new();
//! install_core_classes(&table).unwrap();
//!
//! let mut builder = ClassBuilder::new("app/Failure");
//! builder.extends(names::RUNTIME_EXCEPTION);
//! let failure = table.register(builder.build()).unwrap();
//!
//! let throwable = table.lookup(names::THROWABLE).unwrap();
//! assert!(table.is(failure, throwable));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod class;
mod constant_pool;
mod bootstrap;
mod definition;
mod descriptor;
mod error;
mod flags;
mod hash;
mod member;
mod table;

pub use bootstrap::{core_definitions, install_core_classes, names};
pub use class::{ClassInfo, ElementType, FieldId, Layout};
pub use constant_pool::{Constant, ConstantPool, MemberRef};
pub use definition::{ClassBuilder, ClassDefinition, FieldDefinition, MethodDefinition};
pub use descriptor::{DescriptorError, FieldType, MethodDescriptor};
pub use error::ClassError;
pub use flags::AccessFlags;
pub use hash::method_hash;
pub use member::{Builtin, Field, Method, MethodBody, NativeBinding};
pub use table::{ClassTable, OBJECT_CLASS};
