//! Image schema and binary format.
//!
//! An image is a fixed header followed by a bincode body:
//!
//! | bytes | content |
//! |---|---|
//! | 4 | magic `HVMS` |
//! | 2 | format version, big endian |
//! | 32 | SHA-256 of the body |
//! | rest | bincode-encoded [`SnapshotImage`] |
//!
//! Objects and statics name their classes, so an image can be restored into
//! any engine that has loaded the same class shapes, whatever ids the
//! classes got there.

use core_types::{Reference, ThreadId, Value, ValueKind};
use memory_manager::Monitor;
use scheduler::PendingMonitor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SnapshotError;

/// First bytes of every image.
pub const MAGIC: [u8; 4] = *b"HVMS";

/// Format version written by this build.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 32;

/// A captured engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImage {
    /// Clock reading at capture
    pub captured_at: u64,
    /// Heap capacity at capture, in accounting units
    pub heap_capacity: usize,
    /// The preallocated `OutOfMemoryError`
    pub out_of_memory: Reference,
    /// Every class the image refers to, with its structural hash
    pub classes: Vec<ClassRecord>,
    /// Live heap objects in handle order
    pub objects: Vec<ObjectRecord>,
    /// Interned strings
    pub interned: Vec<(String, Reference)>,
    /// Static storage of every initialized class
    pub statics: Vec<StaticsRecord>,
    /// Live threads in id order
    pub threads: Vec<ThreadRecord>,
    /// Ready threads in rotation order
    pub ready: Vec<ThreadId>,
}

/// A class and its structural hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Internal class name
    pub name: String,
    /// Hex SHA-256 structural hash
    pub hash: String,
}

/// One heap object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Handle, preserved across restore
    pub reference: Reference,
    /// Class name
    pub class: String,
    /// Monitor header
    pub monitor: Monitor,
    /// Instance fields in slot order
    pub fields: Vec<Value>,
    /// Payload
    pub payload: PayloadRecord,
}

/// Object payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadRecord {
    /// Plain instance
    None,
    /// Array storage
    Array {
        /// Element kind
        kind: ValueKind,
        /// Elements
        elements: Vec<Value>,
    },
    /// String text
    Str(String),
    /// Class mirror, by class name
    Mirror(String),
    /// Companion bytes from the class's codec
    Companion(Vec<u8>),
}

/// Static storage of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticsRecord {
    /// Class name
    pub class: String,
    /// Slot values
    pub values: Vec<Value>,
}

/// Scheduling state, with timers relative to the capture clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStateRecord {
    /// In the rotation
    Ready,
    /// Detached with this many milliseconds left
    DetachedFor(u64),
    /// Detached until reattached
    Detached,
}

/// One live thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    /// Thread id, preserved across restore
    pub id: ThreadId,
    /// Scheduling state
    pub state: ThreadStateRecord,
    /// Pending interrupt
    pub interrupted: bool,
    /// Parked in sleep, wait or join
    pub interruptible: bool,
    /// Monitor to reacquire on resume
    pub pending: Option<PendingMonitor>,
    /// `java/lang/Thread` object
    pub object: Reference,
    /// Threads joined on this one
    pub joiners: Vec<ThreadId>,
    /// Frames, outermost first
    pub frames: Vec<FrameRecord>,
}

/// One activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Declaring class
    pub class: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Structural hash of the method
    pub method_hash: String,
    /// Next instruction index
    pub pc: u32,
    /// Local slots
    pub locals: Vec<Value>,
    /// Operand stack
    pub stack: Vec<Value>,
    /// Monitor held for a synchronized method
    pub monitor: Option<Reference>,
}

impl FrameRecord {
    /// `Class.name(descriptor)`
    pub fn method_name(&self) -> String {
        format!("{}.{}{}", self.class, self.name, self.descriptor)
    }
}

impl SnapshotImage {
    /// Encodes the image with its header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let body = bincode::serialize(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        bytes.extend_from_slice(&Sha256::digest(&body));
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decodes an image, checking magic, version and checksum first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(SnapshotError::BadMagic);
        }
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::Truncated);
        }
        let found = u16::from_be_bytes([bytes[4], bytes[5]]);
        if found != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found,
                expected: FORMAT_VERSION,
            });
        }
        let body = &bytes[HEADER_LEN..];
        if Sha256::digest(body).as_slice() != &bytes[6..HEADER_LEN] {
            return Err(SnapshotError::ChecksumMismatch);
        }
        Ok(bincode::deserialize(body)?)
    }
}
