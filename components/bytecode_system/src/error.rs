//! Link errors.

use thiserror::Error;

/// A method body that cannot be linked.
///
/// Link errors are fatal for the method: it never executes, and no Java code
/// can catch the failure. Offsets are byte offsets into the raw code; indices
/// are positions in the resolved instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// A branch or handler target is not the start of an instruction
    #[error("broken flow: branch at offset {offset} targets offset {target}, which is not an instruction boundary")]
    BrokenFlow {
        /// Offset of the branching instruction (or handler entry)
        offset: u32,
        /// Offending target
        target: i64,
    },
    /// Two control-flow edges reach an instruction with different stacks
    #[error("stack mismatch at instruction {index}: depth {expected} vs {found}")]
    StackMismatch {
        /// Instruction reached by both edges
        index: u32,
        /// Slots on the first recorded edge
        expected: usize,
        /// Slots on the conflicting edge
        found: usize,
    },
    /// An instruction pops more than the stack holds
    #[error("operand stack underflow at instruction {index}")]
    Underflow {
        /// Offending instruction
        index: u32,
    },
    /// A one-slot value where a two-slot value was required, or the reverse
    #[error("operand category mismatch at instruction {index}")]
    CategoryMismatch {
        /// Offending instruction
        index: u32,
    },
    /// Stack depth exceeds the declared maximum
    #[error("operand stack exceeds max_stack {max_stack} at instruction {index}")]
    StackOverflow {
        /// Offending instruction
        index: u32,
        /// Declared limit
        max_stack: u16,
    },
    /// A local variable index beyond `max_locals`
    #[error("local {local} out of range (max_locals {max_locals}) at instruction {index}")]
    BadLocal {
        /// Offending instruction
        index: u32,
        /// Local index used
        local: u16,
        /// Declared limit
        max_locals: u16,
    },
    /// Execution can run past the last instruction
    #[error("control falls off the end of the code")]
    FallsOffEnd,
    /// The code ends in the middle of an instruction
    #[error("truncated instruction at offset {offset}")]
    Truncated {
        /// Offset of the incomplete instruction
        offset: u32,
    },
    /// A byte that is not an opcode
    #[error("invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode {
        /// Offset of the byte
        offset: u32,
        /// The byte
        opcode: u8,
    },
    /// A valid opcode this engine does not execute
    #[error("unsupported instruction {mnemonic} at offset {offset}")]
    Unsupported {
        /// Offset of the instruction
        offset: u32,
        /// Instruction name
        mnemonic: &'static str,
    },
    /// A constant pool index of the wrong kind or out of range
    #[error("bad constant #{index} at offset {offset}: {reason}")]
    BadConstant {
        /// Offset of the instruction
        offset: u32,
        /// Constant pool index
        index: u16,
        /// What was wrong
        reason: String,
    },
    /// The method has no code at all
    #[error("empty code")]
    EmptyCode,
}
