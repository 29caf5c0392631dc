//! Dispatch loop for linked code
//!
//! Fetches the instruction at the top frame's program counter, advances the
//! counter, then applies the instruction. Branches overwrite the counter with
//! an absolute instruction index. Anything that can raise a Java exception
//! returns a [`Trap`], which the loop hands to the unwinder.

use std::sync::Arc;

use bytecode_system::{ArithOp, CompareOp, Instruction, NumType};
use class_model::{names, ElementType};
use core_types::{Category, FatalError, ThreadId, Value, ValueKind};
use scheduler::sync::{self, Acquire};

use crate::arith::{self, DivideByZero};
use crate::engine::Engine;
use crate::frame::Frame;
use crate::trap::{SliceEnd, Trap};

/// What the loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Flow {
    /// Keep going
    Next,
    /// End the slice; the thread blocked or yielded
    Yield,
    /// The thread's last frame returned
    Return(Option<Value>),
}

pub(crate) fn top(frames: &mut [Frame]) -> Result<&mut Frame, Trap> {
    frames
        .last_mut()
        .ok_or_else(|| Trap::Fatal(FatalError::InternalConsistency("no active frame".to_string())))
}

fn int_local(frame: &Frame, index: u16) -> Result<i32, Trap> {
    let value = frame.local(index)?;
    value.as_int().ok_or_else(|| {
        Trap::Fatal(FatalError::InternalConsistency(format!(
            "local {} holds {}, expected int",
            index, value
        )))
    })
}

impl Engine {
    /// Runs the resume check and any pending interrupt, then executes.
    pub(crate) fn resume(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, budget: u32) -> Result<SliceEnd, FatalError> {
        if sync::resume(&mut self.heap, &mut self.scheduler, thread)? == sync::Resume::Blocked {
            return Ok(SliceEnd::Blocked);
        }
        let interrupted = match self.scheduler.get_mut(thread) {
            Some(record) if record.interruptible => {
                record.interruptible = false;
                std::mem::take(&mut record.interrupted)
            }
            _ => false,
        };
        if interrupted {
            let trap = self.throw(frames, names::INTERRUPTED, None);
            if let Some(end) = self.handle_trap(thread, frames, trap)? {
                return Ok(end);
            }
        }
        self.execute(thread, frames, budget)
    }

    /// Executes up to `budget` instructions.
    pub(crate) fn execute(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, budget: u32) -> Result<SliceEnd, FatalError> {
        while self.slice_used < budget {
            self.slice_used += 1;
            let flow = match self.execute_one(thread, frames) {
                Ok(flow) => flow,
                Err(trap) => match self.handle_trap(thread, frames, trap)? {
                    Some(end) => return Ok(end),
                    None => continue,
                },
            };
            match flow {
                Flow::Next => {}
                Flow::Return(value) => return Ok(SliceEnd::Finished(value)),
                Flow::Yield => {
                    let ready = self.scheduler.get(thread).map_or(false, |t| !t.is_detached());
                    return Ok(if ready { SliceEnd::Yielded } else { SliceEnd::Blocked });
                }
            }
        }
        Ok(SliceEnd::Yielded)
    }

    fn handle_trap(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, trap: Trap) -> Result<Option<SliceEnd>, FatalError> {
        match trap {
            Trap::Fatal(err) => Err(err),
            Trap::Exception(exception) => {
                if self.unwind(thread, frames, exception)? {
                    Ok(None)
                } else {
                    Ok(Some(SliceEnd::Uncaught(exception)))
                }
            }
        }
    }

    /// Executes one instruction.
    pub(crate) fn execute_one(&mut self, thread: ThreadId, frames: &mut Vec<Frame>) -> Result<Flow, Trap> {
        let frame = top(frames)?;
        let code = Arc::clone(&frame.code);
        let pc = frame.pc;
        let instruction = code.get(pc).ok_or_else(|| {
            FatalError::InternalConsistency(format!("pc {} past the end of {}", pc, frame.method))
        })?;
        frame.pc = pc + 1;

        use Instruction as I;
        match instruction {
            I::Nop => {}
            I::PushInt(v) => frame.push(Value::Int(*v)),
            I::PushLong(v) => frame.push(Value::Long(*v)),
            I::PushFloat(v) => frame.push(Value::Float(*v)),
            I::PushDouble(v) => frame.push(Value::Double(*v)),
            I::PushNull => frame.push(Value::null()),
            I::PushString(text) => {
                let string = self.intern_string(frames, text)?;
                top(frames)?.push(Value::Ref(string));
            }
            I::PushClass(class) => {
                let mirror = self.mirror(frames, *class)?;
                top(frames)?.push(Value::Ref(mirror));
            }

            I::Load0(_) => frame.push(frame.local(0)?),
            I::Load1(_) => frame.push(frame.local(1)?),
            I::Load2(_) => frame.push(frame.local(2)?),
            I::Load3(_) => frame.push(frame.local(3)?),
            I::Load(index, _) => frame.push(frame.local(*index)?),
            I::Store0(_) => store(frame, 0)?,
            I::Store1(_) => store(frame, 1)?,
            I::Store2(_) => store(frame, 2)?,
            I::Store3(_) => store(frame, 3)?,
            I::Store(index, _) => store(frame, *index)?,
            I::Iinc { index, delta } => {
                let value = int_local(frame, *index)?.wrapping_add(i32::from(*delta));
                frame.set_local(*index, Value::Int(value))?;
            }

            I::ArrayLoad(_) => {
                let index = frame.pop_int()?;
                let array = frame.pop_ref()?;
                let value = self.array_element(frames, array, index)?;
                top(frames)?.push(value);
            }
            I::ArrayStore(_) => {
                let value = frame.pop()?;
                let index = frame.pop_int()?;
                let array = frame.pop_ref()?;
                self.store_element(frames, array, index, value)?;
            }

            I::Pop => {
                frame.pop()?;
            }
            I::Pop2 => {
                if frame.pop()?.category() == Category::One {
                    frame.pop()?;
                }
            }
            I::Dup => frame.push(frame.peek()?),
            I::DupX1 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                frame.stack.extend([v1, v2, v1]);
            }
            I::DupX2 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                if v2.category() == Category::Two {
                    frame.stack.extend([v1, v2, v1]);
                } else {
                    let v3 = frame.pop()?;
                    frame.stack.extend([v1, v3, v2, v1]);
                }
            }
            I::Dup2 => {
                let v1 = frame.pop()?;
                if v1.category() == Category::Two {
                    frame.stack.extend([v1, v1]);
                } else {
                    let v2 = frame.pop()?;
                    frame.stack.extend([v2, v1, v2, v1]);
                }
            }
            I::Dup2X1 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                if v1.category() == Category::Two {
                    frame.stack.extend([v1, v2, v1]);
                } else {
                    let v3 = frame.pop()?;
                    frame.stack.extend([v2, v1, v3, v2, v1]);
                }
            }
            I::Dup2X2 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                match (v1.category(), v2.category()) {
                    (Category::Two, Category::Two) => frame.stack.extend([v1, v2, v1]),
                    (Category::Two, Category::One) => {
                        let v3 = frame.pop()?;
                        frame.stack.extend([v1, v3, v2, v1]);
                    }
                    _ => {
                        let v3 = frame.pop()?;
                        if v3.category() == Category::Two {
                            frame.stack.extend([v2, v1, v3, v2, v1]);
                        } else {
                            let v4 = frame.pop()?;
                            frame.stack.extend([v2, v1, v4, v3, v2, v1]);
                        }
                    }
                }
            }
            I::Swap => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                frame.stack.extend([v1, v2]);
            }

            I::Arith(op, ty) => {
                let result = match ty {
                    NumType::Int => {
                        let rhs = frame.pop_int()?;
                        let lhs = frame.pop_int()?;
                        arith::integer(*op, lhs, rhs).map(Value::Int)
                    }
                    NumType::Long if op.is_shift() => {
                        let distance = frame.pop_int()?;
                        let lhs = frame.pop_long()?;
                        Ok(Value::Long(arith::long_shift(*op, lhs, distance)))
                    }
                    NumType::Long => {
                        let rhs = frame.pop_long()?;
                        let lhs = frame.pop_long()?;
                        arith::integer(*op, lhs, rhs).map(Value::Long)
                    }
                    NumType::Float => {
                        let rhs = frame.pop_float()?;
                        let lhs = frame.pop_float()?;
                        Ok(Value::Float(arith::floating(*op, lhs, rhs)))
                    }
                    NumType::Double => {
                        let rhs = frame.pop_double()?;
                        let lhs = frame.pop_double()?;
                        Ok(Value::Double(arith::floating(*op, lhs, rhs)))
                    }
                };
                match result {
                    Ok(value) => frame.push(value),
                    Err(DivideByZero) => {
                        let message = if *op == ArithOp::Rem { "% by zero" } else { "/ by zero" };
                        return Err(self.throw(frames, names::ARITHMETIC, Some(message.to_string())));
                    }
                }
            }
            I::Neg(ty) => {
                let value = match ty {
                    NumType::Int => Value::Int(frame.pop_int()?.wrapping_neg()),
                    NumType::Long => Value::Long(frame.pop_long()?.wrapping_neg()),
                    NumType::Float => Value::Float(-frame.pop_float()?),
                    NumType::Double => Value::Double(-frame.pop_double()?),
                };
                frame.push(value);
            }
            I::Convert(_, to) => {
                let value = frame.pop()?;
                let converted = arith::convert(value, *to).ok_or_else(|| {
                    FatalError::InternalConsistency(format!("cannot convert {} to {:?}", value, to))
                })?;
                frame.push(converted);
            }
            I::Narrow(kind) => {
                let value = frame.pop_int()?;
                frame.push(Value::Int(value).narrow_to(*kind));
            }
            I::Compare(op) => {
                let result = match op {
                    CompareOp::Long => {
                        let rhs = frame.pop_long()?;
                        arith::compare_long(frame.pop_long()?, rhs)
                    }
                    CompareOp::FloatL | CompareOp::FloatG => {
                        let rhs = frame.pop_float()?;
                        arith::compare_floating(*op, frame.pop_float()?, rhs)
                    }
                    CompareOp::DoubleL | CompareOp::DoubleG => {
                        let rhs = frame.pop_double()?;
                        arith::compare_floating(*op, frame.pop_double()?, rhs)
                    }
                };
                frame.push(Value::Int(result));
            }

            I::IfZero(cond, target) => {
                if cond.test(frame.pop_int()?, 0) {
                    frame.pc = *target;
                }
            }
            I::IfCmp(cond, target) => {
                let rhs = frame.pop_int()?;
                let lhs = frame.pop_int()?;
                if cond.test(lhs, rhs) {
                    frame.pc = *target;
                }
            }
            I::IfRefEq(equal, target) => {
                let rhs = frame.pop_ref()?;
                let lhs = frame.pop_ref()?;
                if (lhs == rhs) == *equal {
                    frame.pc = *target;
                }
            }
            I::IfNull(null, target) => {
                if frame.pop_ref()?.is_null() == *null {
                    frame.pc = *target;
                }
            }
            I::Goto(target) => frame.pc = *target,
            I::TableSwitch(table) => {
                let offset = i64::from(frame.pop_int()?) - i64::from(table.low);
                frame.pc = usize::try_from(offset)
                    .ok()
                    .and_then(|i| table.targets.get(i))
                    .copied()
                    .unwrap_or(table.default);
            }
            I::LookupSwitch(lookup) => {
                let key = frame.pop_int()?;
                frame.pc = lookup
                    .pairs
                    .binary_search_by_key(&key, |(k, _)| *k)
                    .map(|i| lookup.pairs[i].1)
                    .unwrap_or(lookup.default);
            }

            I::Return => return self.return_from(thread, frames, None),
            I::ReturnValue(_) => {
                let value = frame.pop()?;
                return self.return_from(thread, frames, Some(value));
            }

            I::GetStatic(field) => {
                self.ensure_initialized(thread, frames, field.class)?;
                let value = self.statics.get(field.class, field.slot).ok_or_else(|| {
                    FatalError::InternalConsistency(format!("no static slot {} in {}", field.slot, field.class))
                })?;
                top(frames)?.push(value);
            }
            I::PutStatic(field) => {
                self.ensure_initialized(thread, frames, field.class)?;
                let value = top(frames)?.pop()?.narrow_to(field.kind);
                if !self.statics.set(field.class, field.slot, value) {
                    return Err(FatalError::InternalConsistency(format!(
                        "no static slot {} in {}",
                        field.slot, field.class
                    ))
                    .into());
                }
            }
            I::GetField(field) => {
                let object = frame.pop_ref()?;
                let slot = self.named_field_slot(frames, object, field)?;
                let value = self.read_field(object, slot)?;
                top(frames)?.push(value);
            }
            I::PutField(field) => {
                let value = frame.pop()?;
                let object = frame.pop_ref()?;
                let slot = self.named_field_slot(frames, object, field)?;
                self.write_field(object, slot, value.narrow_to(field.kind))?;
            }
            I::GetFieldSlot(field) => {
                let object = frame.pop_ref()?;
                self.object_class(frames, object)?;
                let value = self.read_field(object, usize::from(field.slot))?;
                top(frames)?.push(value);
            }
            I::PutFieldSlot(field) => {
                let value = frame.pop()?;
                let object = frame.pop_ref()?;
                self.object_class(frames, object)?;
                self.write_field(object, usize::from(field.slot), value.narrow_to(field.kind))?;
            }

            I::InvokeStatic { method, site } => {
                self.ensure_initialized(thread, frames, method.class)?;
                let args = top(frames)?.pop_n(site.arg_count())?;
                return self.invoke_method(thread, frames, *method, args);
            }
            I::InvokeSpecial { method, site } => {
                let args = frame.pop_n(site.arg_count() + 1)?;
                if args[0].is_null() {
                    return Err(self.throw(frames, names::NULL_POINTER, None));
                }
                return self.invoke_method(thread, frames, *method, args);
            }
            I::InvokeVirtual { signature, site } | I::InvokeInterface { signature, site } => {
                let args = frame.pop_n(site.arg_count() + 1)?;
                let target = self.select_virtual(frames, args[0], *signature)?;
                return self.invoke_method(thread, frames, target, args);
            }
            I::InvokeVoidNoArgs(signature) => {
                // Receiver only; overrides differ per receiver so nothing is cached.
                let args = frame.pop_n(1)?;
                let target = self.select_virtual(frames, args[0], *signature)?;
                return self.invoke_method(thread, frames, target, args);
            }

            I::New(class) => {
                self.ensure_initialized(thread, frames, *class)?;
                let object = self.new_instance(frames, *class)?;
                top(frames)?.push(Value::Ref(object));
            }
            I::NewArray(kind) => {
                let length = frame.pop_int()?;
                let class = self
                    .classes
                    .array_of(ElementType::Primitive(*kind))
                    .map_err(|err| FatalError::InternalConsistency(err.to_string()))?;
                let array = self.new_array(frames, class, *kind, length)?;
                top(frames)?.push(Value::Ref(array));
            }
            I::NewRefArray(class) => {
                let length = frame.pop_int()?;
                let array = self.new_array(frames, *class, ValueKind::Reference, length)?;
                top(frames)?.push(Value::Ref(array));
            }
            I::MultiNewArray { class, dims } => {
                let counts = frame
                    .pop_n(usize::from(*dims))?
                    .iter()
                    .map(|v| v.as_int().unwrap_or(0))
                    .collect::<Vec<i32>>();
                if let Some(negative) = counts.iter().find(|c| **c < 0) {
                    let message = negative.to_string();
                    return Err(self.throw(frames, names::NEGATIVE_ARRAY_SIZE, Some(message)));
                }
                let array = self.new_multi_array(frames, *class, &counts)?;
                top(frames)?.push(Value::Ref(array));
            }
            I::ArrayLength => {
                let array = frame.pop_ref()?;
                let length = self.array_length(frames, array)?;
                top(frames)?.push(Value::Int(length));
            }
            I::Throw => {
                let exception = frame.pop_ref()?;
                if exception.is_null() {
                    return Err(self.throw(frames, names::NULL_POINTER, None));
                }
                return Err(Trap::Exception(exception));
            }
            I::CheckCast(class) => {
                let object = frame.peek()?.as_reference().unwrap_or_default();
                if !object.is_null() {
                    let actual = self.object_class(frames, object)?;
                    if !self.classes.is(actual, *class) {
                        let message = format!(
                            "{} cannot be cast to {}",
                            self.classes.name_of(actual),
                            self.classes.name_of(*class)
                        );
                        return Err(self.throw(frames, names::CLASS_CAST, Some(message)));
                    }
                }
            }
            I::InstanceOf(class) => {
                let object = frame.pop_ref()?;
                let result = !object.is_null()
                    && self
                        .heap
                        .get(object)
                        .map_or(false, |o| self.classes.is(o.class, *class));
                top(frames)?.push(Value::Int(i32::from(result)));
            }
            I::MonitorEnter => {
                let object = frame.pop_ref()?;
                if object.is_null() {
                    return Err(self.throw(frames, names::NULL_POINTER, None));
                }
                match sync::enter(&mut self.heap, &mut self.scheduler, thread, object) {
                    Ok(Acquire::Acquired) => {}
                    Ok(Acquire::Blocked) => return Ok(Flow::Yield),
                    Err(err) => return Err(self.sync_trap(frames, err)),
                }
            }
            I::MonitorExit => {
                let object = frame.pop_ref()?;
                if object.is_null() {
                    return Err(self.throw(frames, names::NULL_POINTER, None));
                }
                if let Err(err) = sync::exit(&mut self.heap, &mut self.scheduler, thread, object) {
                    return Err(self.sync_trap(frames, err));
                }
            }

            I::Unresolved(symbol) => return Err(self.missing_symbol(frames, symbol)),
        }
        Ok(Flow::Next)
    }
}

fn store(frame: &mut Frame, index: u16) -> Result<(), Trap> {
    let value = frame.pop()?;
    frame.set_local(index, value)?;
    if value.category() == Category::Two && usize::from(index) + 1 < frame.locals.len() {
        frame.set_local(index + 1, Value::Int(0))?;
    }
    Ok(())
}
