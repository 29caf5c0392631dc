//! Engine configuration.
//!
//! All policies are engine-wide: the same `VmConfig` governs every thread and
//! every allocation for the lifetime of an engine instance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the run loop paces execution against wall-clock time.
///
/// Pacing only affects throughput, never ordering or results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    /// Run flat out
    #[default]
    Unlocked,
    /// Spin-wait to hold a target cycle rate
    Strict,
    /// Sleep opportunistically when ahead of the target rate
    Weak,
}

/// What happens when an allocation would exceed the heap capacity even
/// after a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Silently grow capacity
    Expand,
    /// Raise a catchable `OutOfMemoryError` on the allocating thread
    #[default]
    Throw,
    /// Stop the engine with a fatal error
    Abort,
}

/// What happens when code touches a class, method or field that could not
/// be resolved at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingSymbolPolicy {
    /// Raise `NoClassDefFoundError` / `NoSuchMethodError` / `NoSuchFieldError`
    #[default]
    ThrowJavaError,
    /// Stop the engine with a fatal error
    Abort,
}

/// How linked field instructions access instance fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldAccessMode {
    /// Name-keyed lookup against the receiver's class at run time
    #[default]
    Generic,
    /// Direct slot access resolved at link time
    PrecompiledBridge,
}

/// What an uncaught exception does beyond terminating its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncaughtPolicy {
    /// Only the throwing thread dies
    #[default]
    TerminateThread,
    /// The whole engine stops
    Abort,
}

/// Errors loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid JSON or had unknown values
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A numeric setting was out of range
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Engine-wide configuration.
///
/// # Examples
///
/// ```
/// use core_types::{OverflowPolicy, VmConfig};
///
/// let config = VmConfig::default()
///     .with_heap_capacity(4096)
///     .with_overflow(OverflowPolicy::Expand);
/// assert_eq!(config.heap_capacity, 4096);
///
/// let parsed = VmConfig::from_json(r#"{ "overflow": "abort", "pacing": "weak" }"#).unwrap();
/// assert_eq!(parsed.overflow, OverflowPolicy::Abort);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Execution pacing mode
    pub pacing: PacingMode,
    /// Cycle rate targeted by strict and weak pacing
    pub target_cycles_per_second: u64,
    /// Heap overflow policy
    pub overflow: OverflowPolicy,
    /// Missing-symbol policy
    pub missing_symbol: MissingSymbolPolicy,
    /// Field access strategy chosen at link time
    pub field_access: FieldAccessMode,
    /// Uncaught exception policy
    pub uncaught: UncaughtPolicy,
    /// Heap capacity in accounting units
    pub heap_capacity: usize,
    /// Instructions a thread runs before the scheduler rotates
    pub slice_cycles: u32,
    /// Frames per thread before `StackOverflowError`
    pub max_frame_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            pacing: PacingMode::Unlocked,
            target_cycles_per_second: 2_000_000,
            overflow: OverflowPolicy::Throw,
            missing_symbol: MissingSymbolPolicy::ThrowJavaError,
            field_access: FieldAccessMode::Generic,
            uncaught: UncaughtPolicy::TerminateThread,
            heap_capacity: 4 * 1024 * 1024,
            slice_cycles: 1000,
            max_frame_depth: 512,
        }
    }
}

impl VmConfig {
    /// Parses a JSON configuration document. Missing keys keep defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: VmConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks numeric settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slice_cycles == 0 {
            return Err(ConfigError::Invalid {
                field: "slice_cycles",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_frame_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_frame_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pacing != PacingMode::Unlocked && self.target_cycles_per_second == 0 {
            return Err(ConfigError::Invalid {
                field: "target_cycles_per_second",
                reason: "paced modes need a non-zero rate".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the pacing mode.
    pub fn with_pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    /// Sets the overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Sets the missing-symbol policy.
    pub fn with_missing_symbol(mut self, policy: MissingSymbolPolicy) -> Self {
        self.missing_symbol = policy;
        self
    }

    /// Sets the field access strategy.
    pub fn with_field_access(mut self, mode: FieldAccessMode) -> Self {
        self.field_access = mode;
        self
    }

    /// Sets the uncaught exception policy.
    pub fn with_uncaught(mut self, policy: UncaughtPolicy) -> Self {
        self.uncaught = policy;
        self
    }

    /// Sets the heap capacity in accounting units.
    pub fn with_heap_capacity(mut self, capacity: usize) -> Self {
        self.heap_capacity = capacity;
        self
    }

    /// Sets the scheduler slice length.
    pub fn with_slice_cycles(mut self, cycles: u32) -> Self {
        self.slice_cycles = cycles;
        self
    }

    /// Sets the maximum frame depth.
    pub fn with_max_frame_depth(mut self, depth: usize) -> Self {
        self.max_frame_depth = depth;
        self
    }
}
