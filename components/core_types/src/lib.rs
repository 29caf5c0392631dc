//! Core value types and error handling for the handset VM.
//!
//! This crate provides the foundational types shared by every engine
//! component: operand values, heap handles, typed ids for classes, methods,
//! signatures and threads, the engine configuration and the error types.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of operand stack and local values
//! - [`Reference`] - Opaque heap handle, `0` is null
//! - [`ValueKind`] - Primitive/reference kinds with accounting weights
//! - [`VmConfig`] - Engine-wide policies (pacing, overflow, missing symbols)
//! - [`FatalError`] - Non-catchable engine failures
//! - [`LoadLog`] - Load-time issue log with severities
//!
//! # Examples
//!
//! ```
//! use core_types::{Reference, Value, ValueKind};
//!
//! let int = Value::Int(42);
//! assert_eq!(int.as_int(), Some(42));
//!
//! let null = Value::Ref(Reference::NULL);
//! assert!(null.is_null());
//!
//! assert_eq!(ValueKind::Long.weight(), 8);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod error;
mod ids;
mod kind;
mod value;

pub use config::{
    ConfigError, FieldAccessMode, MissingSymbolPolicy, OverflowPolicy, PacingMode,
    UncaughtPolicy, VmConfig,
};
pub use error::{FatalError, LoadIssue, LoadLog, Severity};
pub use ids::{ClassId, MethodId, NativeId, SignatureId, ThreadId};
pub use kind::{Category, ValueKind, OBJECT_HEADER_WEIGHT};
pub use value::{Reference, Value};
