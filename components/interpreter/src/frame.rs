//! Activation frames.

use std::sync::Arc;

use bytecode_system::LinkedCode;
use core_types::{FatalError, MethodId, Reference, Value};

use crate::trap::Trap;

/// One method activation.
///
/// The operand stack holds one [`Value`] per entry regardless of category.
/// Locals are addressed by slot: a `long` or `double` at slot `n` also
/// reserves slot `n + 1`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Executing method
    pub method: MethodId,
    /// Its linked code
    pub code: Arc<LinkedCode>,
    /// Index of the next instruction
    pub pc: u32,
    /// Local variable slots
    pub locals: Vec<Value>,
    /// Operand stack
    pub stack: Vec<Value>,
    /// Monitor held for a synchronized method
    pub monitor: Option<Reference>,
}

fn underflow() -> Trap {
    Trap::Fatal(FatalError::InternalConsistency("operand stack underflow".to_string()))
}

fn mistyped(expected: &str, found: Value) -> Trap {
    Trap::Fatal(FatalError::InternalConsistency(format!(
        "expected {} on the operand stack, found {}",
        expected, found
    )))
}

impl Frame {
    /// Creates a frame with `args` spread over the first local slots.
    pub fn new(method: MethodId, code: Arc<LinkedCode>, args: Vec<Value>) -> Self {
        let slots: usize = args.iter().map(|a| usize::from(a.category().slots())).sum();
        let mut locals = vec![Value::Int(0); usize::from(code.max_locals).max(slots)];
        let mut index = 0;
        for arg in args {
            locals[index] = arg;
            index += usize::from(arg.category().slots());
        }
        Self {
            method,
            stack: Vec::with_capacity(usize::from(code.max_stack)),
            code,
            pc: 0,
            locals,
            monitor: None,
        }
    }

    /// Pushes a value.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pops a value.
    pub fn pop(&mut self) -> Result<Value, Trap> {
        self.stack.pop().ok_or_else(underflow)
    }

    /// Top value without popping.
    pub fn peek(&self) -> Result<Value, Trap> {
        self.stack.last().copied().ok_or_else(underflow)
    }

    /// Pops an `int`.
    pub fn pop_int(&mut self) -> Result<i32, Trap> {
        let value = self.pop()?;
        value.as_int().ok_or_else(|| mistyped("int", value))
    }

    /// Pops a `long`.
    pub fn pop_long(&mut self) -> Result<i64, Trap> {
        let value = self.pop()?;
        value.as_long().ok_or_else(|| mistyped("long", value))
    }

    /// Pops a `float`.
    pub fn pop_float(&mut self) -> Result<f32, Trap> {
        let value = self.pop()?;
        value.as_float().ok_or_else(|| mistyped("float", value))
    }

    /// Pops a `double`.
    pub fn pop_double(&mut self) -> Result<f64, Trap> {
        let value = self.pop()?;
        value.as_double().ok_or_else(|| mistyped("double", value))
    }

    /// Pops a reference.
    pub fn pop_ref(&mut self) -> Result<Reference, Trap> {
        let value = self.pop()?;
        value.as_reference().ok_or_else(|| mistyped("reference", value))
    }

    /// Pops `count` values, bottom first.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, Trap> {
        if self.stack.len() < count {
            return Err(underflow());
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    /// Reads a local slot.
    pub fn local(&self, index: u16) -> Result<Value, Trap> {
        self.locals.get(usize::from(index)).copied().ok_or_else(|| {
            Trap::Fatal(FatalError::InternalConsistency(format!("local {} out of range", index)))
        })
    }

    /// Writes a local slot.
    pub fn set_local(&mut self, index: u16, value: Value) -> Result<(), Trap> {
        match self.locals.get_mut(usize::from(index)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Trap::Fatal(FatalError::InternalConsistency(format!(
                "local {} out of range",
                index
            )))),
        }
    }

    /// Every reference held in locals, stack and the monitor slot.
    pub fn references(&self) -> impl Iterator<Item = Reference> + '_ {
        self.locals
            .iter()
            .chain(self.stack.iter())
            .filter_map(Value::as_reference)
            .chain(self.monitor)
            .filter(|r| !r.is_null())
    }
}
