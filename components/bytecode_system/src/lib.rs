//! Bytecode system for the handset VM
//!
//! This crate defines both sides of linking: the raw class-file opcode table
//! and method body format that the class source delivers, and the resolved
//! instruction set the interpreter executes.
//!
//! # Features
//!
//! - Raw opcode constants and fixed instruction lengths ([`op`], [`fixed_length`])
//! - Resolved instruction set with fast local-access variants ([`Instruction`])
//! - Linked method bodies with index-addressed exception tables ([`LinkedCode`])
//! - Operand stack verifier over every control-flow edge ([`Verifier`])
//! - Label-based assembler for synthesized methods ([`Assembler`])
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Instruction, LinkedCode, Verifier};
//! use core_types::Category;
//!
//! let code = LinkedCode {
//!     instructions: vec![Instruction::PushInt(42), Instruction::ReturnValue(Category::One)],
//!     handlers: Vec::new(),
//!     max_stack: 1,
//!     max_locals: 0,
//! };
//! assert_eq!(Verifier::new().verify(&code), Ok(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod code;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod verifier;

// Re-export main types at crate root
pub use assembler::{AsmError, Assembler, Label};
pub use code::{CatchType, Handler, LinkedCode, RawCode, RawHandler};
pub use error::LinkError;
pub use instruction::{
    ArithOp, CallSite, CompareOp, Cond, FieldSlot, Instruction, LookupSwitch, NamedField,
    NumType, StaticSlot, SymbolKind, TableSwitch, Unresolved,
};
pub use opcode::{fixed_length, mnemonic, op};
pub use verifier::Verifier;
