//! Method code containers
//!
//! [`RawCode`] is a method body as the class source delivers it: byte-offset
//! addressed bytecode plus an exception table whose catch types are constant
//! pool indices. [`LinkedCode`] is what the linker turns it into.

use serde::{Deserialize, Serialize};

use core_types::ClassId;

use crate::instruction::Instruction;

/// One exception table entry in raw form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHandler {
    /// First covered byte offset
    pub start_pc: u16,
    /// First byte offset past the covered range
    pub end_pc: u16,
    /// Byte offset of the handler
    pub handler_pc: u16,
    /// Constant pool index of the caught class, `0` for catch-all
    pub catch_type: u16,
}

/// A method body before linking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawCode {
    /// Maximum operand stack depth in slots
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Bytecode
    pub code: Vec<u8>,
    /// Exception table in declaration order
    pub handlers: Vec<RawHandler>,
}

impl RawCode {
    /// Creates a body with no exception handlers.
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            handlers: Vec::new(),
        }
    }

    /// Adds an exception table entry.
    pub fn with_handler(mut self, handler: RawHandler) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// Class caught by a linked handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchType {
    /// `finally` and catch-all handlers
    Any,
    /// Catches this class and its subclasses
    Class(ClassId),
    /// The catch class is missing; the handler never matches
    Unresolved(String),
}

/// One exception table entry addressed by instruction index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    /// First covered instruction
    pub start: u32,
    /// First instruction past the covered range
    pub end: u32,
    /// Handler entry instruction
    pub target: u32,
    /// What the handler catches
    pub catch: CatchType,
}

impl Handler {
    /// True when the instruction at `index` lies in the covered range.
    pub fn covers(&self, index: u32) -> bool {
        self.start <= index && index < self.end
    }
}

/// A linked method body.
///
/// Produced once per method and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedCode {
    /// Resolved instruction stream
    pub instructions: Vec<Instruction>,
    /// Exception table in declaration order
    pub handlers: Vec<Handler>,
    /// Maximum operand stack depth in slots
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
}

impl LinkedCode {
    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `index`.
    pub fn get(&self, index: u32) -> Option<&Instruction> {
        self.instructions.get(index as usize)
    }
}
