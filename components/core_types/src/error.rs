//! Engine error types and the load-time issue log.
//!
//! Java-level exceptions are heap objects and never appear here. This module
//! covers the two other failure families: fatal engine errors that no Java
//! code can catch, and load-time issues that are recorded and only matter if
//! the offending code is actually executed.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ids::ThreadId;

/// A failure that terminates the engine rather than a Java thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// A method was executed whose linking failed
    #[error("method {method} failed to link: {reason}")]
    Link {
        /// `Class.name(descriptor)` of the method
        method: String,
        /// Link error message
        reason: String,
    },
    /// Monitor or scheduler invariant broken; signals an engine bug
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
    /// Heap capacity exceeded under the abort overflow policy
    #[error("heap exhausted: requested {requested} units with {used}/{capacity} in use")]
    OutOfMemory {
        /// Accounting units requested
        requested: usize,
        /// Units in use after collection
        used: usize,
        /// Configured capacity
        capacity: usize,
    },
    /// A missing class, method or field was hit under the abort policy
    #[error("missing symbol: {0}")]
    MissingSymbol(String),
    /// An uncaught exception under the abort uncaught policy
    #[error("uncaught {class} on {thread}")]
    UncaughtException {
        /// Thread that threw
        thread: ThreadId,
        /// Class name of the thrown object
        class: String,
    },
    /// The engine was asked to run something it cannot
    #[error("invalid engine operation: {0}")]
    InvalidOperation(String),
}

/// Severity of a load-time issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, e.g. a core class stub was installed
    Info,
    /// Non-fatal reference problem (missing class, method or field)
    Warning,
    /// The affected method or class cannot run
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One entry in the load-time log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadIssue {
    /// How bad it is
    pub severity: Severity,
    /// Class (or `Class.method`) the issue was found in
    pub subject: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.subject, self.message)
    }
}

/// Collects load-time issues and forwards them to the `log` facade.
///
/// # Examples
///
/// ```
/// use core_types::{LoadLog, Severity};
///
/// let log = LoadLog::new();
/// log.record(Severity::Warning, "app/Main", "missing class app/Gone");
/// assert_eq!(log.count(Severity::Warning), 1);
/// ```
#[derive(Debug, Default)]
pub struct LoadLog {
    entries: Mutex<Vec<LoadIssue>>,
}

impl LoadLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an issue.
    pub fn record(&self, severity: Severity, subject: impl Into<String>, message: impl Into<String>) {
        let issue = LoadIssue {
            severity,
            subject: subject.into(),
            message: message.into(),
        };
        match severity {
            Severity::Info => log::info!("load: {}", issue),
            Severity::Warning => log::warn!("load: {}", issue),
            Severity::Error => log::error!("load: {}", issue),
        }
        self.entries.lock().push(issue);
    }

    /// Snapshot of all recorded issues in recording order.
    pub fn entries(&self) -> Vec<LoadIssue> {
        self.entries.lock().clone()
    }

    /// Number of issues with exactly this severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    /// True when any issue mentions `needle` in its subject or message.
    pub fn mentions(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|issue| issue.subject.contains(needle) || issue.message.contains(needle))
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
