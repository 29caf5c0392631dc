//! Operand stack verifier
//!
//! Simulates the operand stack along every control-flow edge of a linked
//! method, including the implicit edge from each covered instruction to its
//! exception handlers. The stack is tracked as a list of value categories,
//! which is enough to check the `dup`/`pop` family and long/double operands.

use std::collections::VecDeque;

use core_types::Category;

use crate::code::LinkedCode;
use crate::error::LinkError;
use crate::instruction::Instruction;

/// Stack-depth verifier for linked code.
#[derive(Debug, Default)]
pub struct Verifier {
    trace: bool,
}

type Stack = Vec<Category>;

fn depth(stack: &[Category]) -> usize {
    stack.iter().map(|c| c.slots() as usize).sum()
}

impl Verifier {
    /// Creates a verifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every simulated instruction at trace level.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Verifies `code`.
    ///
    /// # Returns
    ///
    /// The deepest stack (in slots) observed on any path.
    pub fn verify(&self, code: &LinkedCode) -> Result<usize, LinkError> {
        let len = code.instructions.len();
        if len == 0 {
            return Err(LinkError::EmptyCode);
        }
        for handler in &code.handlers {
            if handler.start > handler.end
                || handler.end as usize > len
                || handler.target as usize >= len
            {
                return Err(LinkError::BrokenFlow {
                    offset: handler.start,
                    target: i64::from(handler.target),
                });
            }
        }

        let mut states: Vec<Option<Stack>> = vec![None; len];
        let mut worklist = VecDeque::new();
        states[0] = Some(Vec::new());
        worklist.push_back(0u32);
        let mut deepest = 0;

        while let Some(index) = worklist.pop_front() {
            let entry = match &states[index as usize] {
                Some(stack) => stack.clone(),
                None => continue,
            };
            for handler in code.handlers.iter().filter(|h| h.covers(index)) {
                self.merge(&mut states, &mut worklist, handler.target, vec![Category::One])?;
            }

            let instruction = &code.instructions[index as usize];
            let mut stack = entry;
            self.simulate(code, index, instruction, &mut stack)?;
            let slots = depth(&stack);
            if slots > code.max_stack as usize {
                return Err(LinkError::StackOverflow {
                    index,
                    max_stack: code.max_stack,
                });
            }
            deepest = deepest.max(slots);
            if self.trace {
                log::trace!("verify #{} {:?} -> depth {}", index, instruction, slots);
            }

            for target in instruction.branch_targets() {
                if target as usize >= len {
                    return Err(LinkError::BrokenFlow {
                        offset: index,
                        target: i64::from(target),
                    });
                }
                self.merge(&mut states, &mut worklist, target, stack.clone())?;
            }
            if !instruction.is_terminator() {
                let next = index + 1;
                if next as usize >= len {
                    return Err(LinkError::FallsOffEnd);
                }
                self.merge(&mut states, &mut worklist, next, stack)?;
            }
        }
        Ok(deepest)
    }

    fn merge(
        &self,
        states: &mut [Option<Stack>],
        worklist: &mut VecDeque<u32>,
        target: u32,
        incoming: Stack,
    ) -> Result<(), LinkError> {
        match &states[target as usize] {
            None => {
                states[target as usize] = Some(incoming);
                worklist.push_back(target);
                Ok(())
            }
            Some(existing) if *existing == incoming => Ok(()),
            Some(existing) => Err(LinkError::StackMismatch {
                index: target,
                expected: depth(existing),
                found: depth(&incoming),
            }),
        }
    }

    fn simulate(
        &self,
        code: &LinkedCode,
        index: u32,
        instruction: &Instruction,
        stack: &mut Stack,
    ) -> Result<(), LinkError> {
        use Category::{One, Two};
        use Instruction::*;

        let mut ops = Ops { stack, index };
        let local = |local: u16, category: Category| -> Result<(), LinkError> {
            if u32::from(local) + u32::from(category.slots()) > u32::from(code.max_locals) {
                Err(LinkError::BadLocal {
                    index,
                    local,
                    max_locals: code.max_locals,
                })
            } else {
                Ok(())
            }
        };

        match instruction {
            Nop | Goto(_) | Return => {}
            PushInt(_) | PushFloat(_) | PushNull | PushString(_) | PushClass(_) => ops.push(One),
            PushLong(_) | PushDouble(_) => ops.push(Two),

            Load0(c) => {
                local(0, *c)?;
                ops.push(*c);
            }
            Load1(c) => {
                local(1, *c)?;
                ops.push(*c);
            }
            Load2(c) => {
                local(2, *c)?;
                ops.push(*c);
            }
            Load3(c) => {
                local(3, *c)?;
                ops.push(*c);
            }
            Load(n, c) => {
                local(*n, *c)?;
                ops.push(*c);
            }
            Store0(c) => {
                local(0, *c)?;
                ops.pop(*c)?;
            }
            Store1(c) => {
                local(1, *c)?;
                ops.pop(*c)?;
            }
            Store2(c) => {
                local(2, *c)?;
                ops.pop(*c)?;
            }
            Store3(c) => {
                local(3, *c)?;
                ops.pop(*c)?;
            }
            Store(n, c) => {
                local(*n, *c)?;
                ops.pop(*c)?;
            }
            Iinc { index: n, .. } => local(*n, One)?,

            ArrayLoad(kind) => {
                ops.pop(One)?;
                ops.pop(One)?;
                ops.push(kind.category());
            }
            ArrayStore(kind) => {
                ops.pop(kind.category())?;
                ops.pop(One)?;
                ops.pop(One)?;
            }

            Pop => ops.pop(One)?,
            Pop2 => {
                if ops.pop_any()? == One {
                    ops.pop(One)?;
                }
            }
            Dup => {
                ops.pop(One)?;
                ops.push_all(&[One, One]);
            }
            DupX1 => {
                ops.pop(One)?;
                ops.pop(One)?;
                ops.push_all(&[One, One, One]);
            }
            DupX2 => {
                ops.pop(One)?;
                match ops.pop_any()? {
                    Two => ops.push_all(&[One, Two, One]),
                    One => {
                        ops.pop(One)?;
                        ops.push_all(&[One, One, One, One]);
                    }
                }
            }
            Dup2 => match ops.pop_any()? {
                Two => ops.push_all(&[Two, Two]),
                One => {
                    ops.pop(One)?;
                    ops.push_all(&[One, One, One, One]);
                }
            },
            Dup2X1 => match ops.pop_any()? {
                Two => {
                    ops.pop(One)?;
                    ops.push_all(&[Two, One, Two]);
                }
                One => {
                    ops.pop(One)?;
                    ops.pop(One)?;
                    ops.push_all(&[One, One, One, One, One]);
                }
            },
            Dup2X2 => match ops.pop_any()? {
                Two => match ops.pop_any()? {
                    Two => ops.push_all(&[Two, Two, Two]),
                    One => {
                        ops.pop(One)?;
                        ops.push_all(&[Two, One, One, Two]);
                    }
                },
                One => {
                    ops.pop(One)?;
                    match ops.pop_any()? {
                        Two => ops.push_all(&[One, One, Two, One, One]),
                        One => {
                            ops.pop(One)?;
                            ops.push_all(&[One, One, One, One, One, One]);
                        }
                    }
                }
            },
            Swap => {
                ops.pop(One)?;
                ops.pop(One)?;
                ops.push_all(&[One, One]);
            }

            Arith(op, ty) => {
                ops.pop(if op.is_shift() { One } else { ty.category() })?;
                ops.pop(ty.category())?;
                ops.push(ty.category());
            }
            Neg(ty) => {
                ops.pop(ty.category())?;
                ops.push(ty.category());
            }
            Convert(from, to) => {
                ops.pop(from.category())?;
                ops.push(to.category());
            }
            Narrow(_) => {
                ops.pop(One)?;
                ops.push(One);
            }
            Compare(op) => {
                ops.pop(op.operand_category())?;
                ops.pop(op.operand_category())?;
                ops.push(One);
            }

            IfZero(..) | IfNull(..) | TableSwitch(_) | LookupSwitch(_) => ops.pop(One)?,
            IfCmp(..) | IfRefEq(..) => {
                ops.pop(One)?;
                ops.pop(One)?;
            }
            ReturnValue(c) => ops.pop(*c)?,

            GetStatic(s) => ops.push(s.kind.category()),
            PutStatic(s) => ops.pop(s.kind.category())?,
            GetField(f) => {
                ops.pop(One)?;
                ops.push(f.kind.category());
            }
            PutField(f) => {
                ops.pop(f.kind.category())?;
                ops.pop(One)?;
            }
            GetFieldSlot(f) => {
                ops.pop(One)?;
                ops.push(f.kind.category());
            }
            PutFieldSlot(f) => {
                ops.pop(f.kind.category())?;
                ops.pop(One)?;
            }

            InvokeStatic { site, .. } => {
                for param in site.params.iter().rev() {
                    ops.pop(*param)?;
                }
                if let Some(ret) = site.returns {
                    ops.push(ret);
                }
            }
            InvokeSpecial { site, .. }
            | InvokeVirtual { site, .. }
            | InvokeInterface { site, .. } => {
                for param in site.params.iter().rev() {
                    ops.pop(*param)?;
                }
                ops.pop(One)?;
                if let Some(ret) = site.returns {
                    ops.push(ret);
                }
            }
            InvokeVoidNoArgs(_) => ops.pop(One)?,

            New(_) => ops.push(One),
            NewArray(_) | NewRefArray(_) | ArrayLength | CheckCast(_) | InstanceOf(_) => {
                ops.pop(One)?;
                ops.push(One);
            }
            MultiNewArray { dims, .. } => {
                for _ in 0..*dims {
                    ops.pop(One)?;
                }
                ops.push(One);
            }
            Throw | MonitorEnter | MonitorExit => ops.pop(One)?,

            Unresolved(unresolved) => {
                for category in unresolved.pops.iter().rev() {
                    ops.pop(*category)?;
                }
                if let Some(push) = unresolved.push {
                    ops.push(push);
                }
            }
        }
        Ok(())
    }
}

struct Ops<'a> {
    stack: &'a mut Stack,
    index: u32,
}

impl Ops<'_> {
    fn push(&mut self, category: Category) {
        self.stack.push(category);
    }

    fn push_all(&mut self, categories: &[Category]) {
        self.stack.extend_from_slice(categories);
    }

    fn pop_any(&mut self) -> Result<Category, LinkError> {
        self.stack
            .pop()
            .ok_or(LinkError::Underflow { index: self.index })
    }

    fn pop(&mut self, expected: Category) -> Result<(), LinkError> {
        if self.pop_any()? != expected {
            return Err(LinkError::CategoryMismatch { index: self.index });
        }
        Ok(())
    }
}
