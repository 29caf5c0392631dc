//! Interpreter outcomes and errors.

use bytecode_system::AsmError;
use class_model::ClassError;
use core_types::{ConfigError, FatalError, Reference, ThreadId, Value};
use thiserror::Error;

/// Abrupt completion of an instruction.
///
/// A Java exception unwinds the thread's frames looking for a handler; a
/// fatal error stops the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    /// A thrown Java object
    Exception(Reference),
    /// An engine failure no Java code can catch
    Fatal(FatalError),
}

impl From<FatalError> for Trap {
    fn from(err: FatalError) -> Self {
        Trap::Fatal(err)
    }
}

/// Host-facing engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The built-in core classes could not be assembled
    #[error("core class bootstrap failed: {0}")]
    Bootstrap(#[from] AsmError),
    /// Class registration or lookup failed
    #[error(transparent)]
    Class(#[from] ClassError),
    /// An entry point does not exist
    #[error("no method {0}")]
    NoSuchMethod(String),
    /// An invocation ended with an uncaught Java exception
    #[error("uncaught {class}")]
    Uncaught {
        /// The thrown object
        exception: Reference,
        /// Its class name
        class: String,
        /// Its message, if any
        message: Option<String>,
    },
    /// The engine stopped
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// How a slice of one thread ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceEnd {
    /// The cycle budget ran out or the thread yielded
    Yielded,
    /// The thread detached itself
    Blocked,
    /// The last frame returned
    Finished(Option<Value>),
    /// An exception escaped the last frame
    Uncaught(Reference),
}

/// Why [`Engine::run`](crate::Engine::run) returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every thread has terminated
    Finished,
    /// A host asked the engine to stop
    Stopped,
    /// Threads remain but all are detached with no timer pending
    Idle,
}

/// An exception that terminated a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtException {
    /// Thread that died
    pub thread: ThreadId,
    /// The thrown object
    pub exception: Reference,
    /// Its class name
    pub class: String,
    /// Its message, if any
    pub message: Option<String>,
}
