//! Bytecode assembler
//!
//! Builds raw method bodies with symbolic labels. Hosts that synthesize
//! classes (and the test suites) use it instead of hand-encoding offsets.
//!
//! # Examples
//!
//! ```
//! use bytecode_system::{op, Assembler};
//!
//! let mut asm = Assembler::new(2, 1);
//! let done = asm.label();
//! asm.emit(op::ILOAD_0);
//! asm.branch(op::IFEQ, done);
//! asm.emit_u8(op::BIPUSH, 7);
//! asm.emit(op::IRETURN);
//! asm.bind(done);
//! asm.emit(op::ICONST_0);
//! asm.emit(op::IRETURN);
//! let code = asm.finish().unwrap();
//! assert_eq!(code.code.len(), 9);
//! ```

use thiserror::Error;

use crate::code::{RawCode, RawHandler};
use crate::opcode::op;

/// A position in the code, bound with [`Assembler::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

/// Errors finishing an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// A label was used but never bound
    #[error("label {0} was never bound")]
    UnboundLabel(usize),
    /// A branch distance does not fit its encoding
    #[error("branch at offset {0} is out of range")]
    OutOfRange(usize),
}

#[derive(Debug, Clone, Copy)]
enum Fixup {
    /// 16-bit offset at `at`, relative to the instruction at `base`
    Short { at: usize, base: usize, label: Label },
    /// 32-bit offset at `at`, relative to the instruction at `base`
    Wide { at: usize, base: usize, label: Label },
}

#[derive(Debug, Clone, Copy)]
struct PendingHandler {
    start: Label,
    end: Label,
    target: Label,
    catch_type: u16,
}

/// Raw bytecode builder.
#[derive(Debug)]
pub struct Assembler {
    code: Vec<u8>,
    labels: Vec<Option<usize>>,
    fixups: Vec<Fixup>,
    handlers: Vec<PendingHandler>,
    max_stack: u16,
    max_locals: u16,
}

impl Assembler {
    /// Creates an assembler for a body with the given limits.
    pub fn new(max_stack: u16, max_locals: u16) -> Self {
        Self {
            code: Vec::new(),
            labels: Vec::new(),
            fixups: Vec::new(),
            handlers: Vec::new(),
            max_stack,
            max_locals,
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.code.len()
    }

    /// Creates an unbound label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the current offset.
    pub fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.code.len());
    }

    /// Emits a one-byte instruction.
    pub fn emit(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    /// Emits an instruction with a one-byte operand.
    pub fn emit_u8(&mut self, opcode: u8, operand: u8) -> &mut Self {
        self.code.extend_from_slice(&[opcode, operand]);
        self
    }

    /// Emits an instruction with a two-byte operand (constant pool index,
    /// `sipush` literal).
    pub fn emit_u16(&mut self, opcode: u8, operand: u16) -> &mut Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&operand.to_be_bytes());
        self
    }

    /// Emits a branch with a literal byte delta instead of a label.
    pub fn emit_i16(&mut self, opcode: u8, delta: i16) -> &mut Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&delta.to_be_bytes());
        self
    }

    /// Emits raw bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Emits `iinc`.
    pub fn iinc(&mut self, local: u8, delta: i8) -> &mut Self {
        self.code.extend_from_slice(&[op::IINC, local, delta as u8]);
        self
    }

    /// Emits `invokeinterface` with its count byte.
    pub fn invoke_interface(&mut self, index: u16, arg_slots: u8) -> &mut Self {
        self.emit_u16(op::INVOKEINTERFACE, index);
        self.code.extend_from_slice(&[arg_slots, 0]);
        self
    }

    /// Emits `multianewarray`.
    pub fn multi_new_array(&mut self, index: u16, dims: u8) -> &mut Self {
        self.emit_u16(op::MULTIANEWARRAY, index);
        self.code.push(dims);
        self
    }

    /// Emits a branch (`if*`, `goto`, `goto_w`) to `label`.
    pub fn branch(&mut self, opcode: u8, label: Label) -> &mut Self {
        let base = self.code.len();
        self.code.push(opcode);
        let at = self.code.len();
        if opcode == op::GOTO_W {
            self.code.extend_from_slice(&[0; 4]);
            self.fixups.push(Fixup::Wide { at, base, label });
        } else {
            self.code.extend_from_slice(&[0; 2]);
            self.fixups.push(Fixup::Short { at, base, label });
        }
        self
    }

    /// Emits `tableswitch` over `low..low + targets.len()`.
    pub fn table_switch(&mut self, low: i32, targets: &[Label], default: Label) -> &mut Self {
        let base = self.switch_header(op::TABLESWITCH, default);
        let high = low + targets.len() as i32 - 1;
        self.code.extend_from_slice(&low.to_be_bytes());
        self.code.extend_from_slice(&high.to_be_bytes());
        for label in targets {
            self.wide_slot(base, *label);
        }
        self
    }

    /// Emits `lookupswitch`; pairs must be sorted by key.
    pub fn lookup_switch(&mut self, pairs: &[(i32, Label)], default: Label) -> &mut Self {
        let base = self.switch_header(op::LOOKUPSWITCH, default);
        self.code
            .extend_from_slice(&(pairs.len() as i32).to_be_bytes());
        for (key, label) in pairs {
            self.code.extend_from_slice(&key.to_be_bytes());
            self.wide_slot(base, *label);
        }
        self
    }

    fn switch_header(&mut self, opcode: u8, default: Label) -> usize {
        let base = self.code.len();
        self.code.push(opcode);
        while self.code.len() % 4 != 0 {
            self.code.push(0);
        }
        self.wide_slot(base, default);
        base
    }

    fn wide_slot(&mut self, base: usize, label: Label) {
        let at = self.code.len();
        self.code.extend_from_slice(&[0; 4]);
        self.fixups.push(Fixup::Wide { at, base, label });
    }

    /// Adds an exception table entry covering `start..end`.
    pub fn handler(&mut self, start: Label, end: Label, target: Label, catch_type: u16) -> &mut Self {
        self.handlers.push(PendingHandler {
            start,
            end,
            target,
            catch_type,
        });
        self
    }

    fn resolve(&self, label: Label) -> Result<usize, AsmError> {
        self.labels[label.0].ok_or(AsmError::UnboundLabel(label.0))
    }

    /// Patches branches and produces the method body.
    pub fn finish(mut self) -> Result<RawCode, AsmError> {
        for fixup in std::mem::take(&mut self.fixups) {
            match fixup {
                Fixup::Short { at, base, label } => {
                    let delta = self.resolve(label)? as i64 - base as i64;
                    let delta = i16::try_from(delta).map_err(|_| AsmError::OutOfRange(base))?;
                    self.code[at..at + 2].copy_from_slice(&delta.to_be_bytes());
                }
                Fixup::Wide { at, base, label } => {
                    let delta = (self.resolve(label)? as i64 - base as i64) as i32;
                    self.code[at..at + 4].copy_from_slice(&delta.to_be_bytes());
                }
            }
        }
        let mut handlers = Vec::with_capacity(self.handlers.len());
        for pending in &self.handlers {
            handlers.push(RawHandler {
                start_pc: self.resolve(pending.start)? as u16,
                end_pc: self.resolve(pending.end)? as u16,
                handler_pc: self.resolve(pending.target)? as u16,
                catch_type: pending.catch_type,
            });
        }
        Ok(RawCode {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code: self.code,
            handlers,
        })
    }
}
