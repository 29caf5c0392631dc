//! Engine builtins: the natives of `Object`, `Thread` and `System` that
//! reach into the scheduler, monitors or heap.

use class_model::{names, Builtin, ElementType};
use core_types::{FatalError, Reference, ThreadId, Value, ValueKind};
use scheduler::sync;
use scheduler::Timeout;

use crate::engine::Engine;
use crate::frame::Frame;
use crate::roots::EngineRoots;
use crate::trap::Trap;

fn arg(args: &[Value], index: usize) -> Result<Value, Trap> {
    args.get(index).copied().ok_or_else(|| {
        Trap::Fatal(FatalError::InternalConsistency(format!("native argument {} missing", index)))
    })
}

fn ref_arg(args: &[Value], index: usize) -> Result<Reference, Trap> {
    Ok(arg(args, index)?.as_reference().unwrap_or_default())
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, Trap> {
    Ok(arg(args, index)?.as_int().unwrap_or_default())
}

fn long_arg(args: &[Value], index: usize) -> Result<i64, Trap> {
    Ok(arg(args, index)?.as_long().unwrap_or_default())
}

impl Engine {
    pub(crate) fn builtin(
        &mut self,
        thread: ThreadId,
        frames: &mut Vec<Frame>,
        builtin: Builtin,
        args: &[Value],
    ) -> Result<Option<Value>, Trap> {
        match builtin {
            Builtin::ObjectWait => {
                let object = ref_arg(args, 0)?;
                let millis = if args.len() > 1 { long_arg(args, 1)? } else { 0 };
                let nanos = if args.len() > 2 { int_arg(args, 2)? } else { 0 };
                self.object_wait(thread, frames, object, millis, nanos)?;
                Ok(None)
            }
            Builtin::ObjectNotify => {
                let object = ref_arg(args, 0)?;
                match sync::notify(&mut self.heap, &mut self.scheduler, thread, object) {
                    Ok(woken) => {
                        if let Some(woken) = woken {
                            log::trace!("{} notified {}", thread, woken);
                        }
                        Ok(None)
                    }
                    Err(err) => Err(self.sync_trap(frames, err)),
                }
            }
            Builtin::ObjectNotifyAll => {
                let object = ref_arg(args, 0)?;
                match sync::notify_all(&mut self.heap, &mut self.scheduler, thread, object) {
                    Ok(_) => Ok(None),
                    Err(err) => Err(self.sync_trap(frames, err)),
                }
            }
            Builtin::ObjectHashCode | Builtin::SystemIdentityHashCode => {
                let object = ref_arg(args, 0)?;
                let hash = if object.is_null() { 0 } else { self.heap.identity_hash(object) };
                Ok(Some(Value::Int(hash)))
            }
            Builtin::ObjectGetClass => {
                let class = self.object_class(frames, ref_arg(args, 0)?)?;
                Ok(Some(Value::Ref(self.mirror(frames, class)?)))
            }
            Builtin::ThreadSleep => {
                let millis = long_arg(args, 0)?;
                if millis < 0 {
                    let message = "timeout value is negative".to_string();
                    return Err(self.throw(frames, names::ILLEGAL_ARGUMENT, Some(message)));
                }
                self.check_interrupt(thread, frames)?;
                if millis == 0 {
                    self.yield_requested = true;
                } else {
                    self.scheduler.detach(thread, Timeout::Millis(millis as u64));
                    self.set_interruptible(thread);
                }
                Ok(None)
            }
            Builtin::ThreadYield => {
                self.yield_requested = true;
                Ok(None)
            }
            Builtin::ThreadCurrentThread => Ok(Some(Value::Ref(self.thread_object(frames, thread)?))),
            Builtin::ThreadStart => {
                let object = ref_arg(args, 0)?;
                self.start_thread(thread, frames, object)?;
                Ok(None)
            }
            Builtin::ThreadInterrupt => {
                if let Some(target) = self.thread_for_object(ref_arg(args, 0)?) {
                    self.scheduler.interrupt(target);
                }
                Ok(None)
            }
            Builtin::ThreadIsAlive => {
                let alive = self
                    .thread_for_object(ref_arg(args, 0)?)
                    .and_then(|t| self.scheduler.get(t))
                    .map_or(false, |t| t.is_alive());
                Ok(Some(Value::Int(i32::from(alive))))
            }
            Builtin::ThreadJoin => {
                let target = self.thread_for_object(ref_arg(args, 0)?);
                self.check_interrupt(thread, frames)?;
                if let Some(target) = target {
                    if self.scheduler.join(thread, target) {
                        self.set_interruptible(thread);
                    }
                }
                Ok(None)
            }
            Builtin::SystemGc => {
                let stats = self.heap.collect(&EngineRoots {
                    scheduler: &self.scheduler,
                    statics: &self.statics,
                    active: frames,
                });
                log::debug!("System.gc: {:?}", stats);
                Ok(None)
            }
            Builtin::SystemArraycopy => {
                self.arraycopy(
                    frames,
                    ref_arg(args, 0)?,
                    int_arg(args, 1)?,
                    ref_arg(args, 2)?,
                    int_arg(args, 3)?,
                    int_arg(args, 4)?,
                )?;
                Ok(None)
            }
            Builtin::SystemCurrentTimeMillis => {
                let now = i64::try_from(self.scheduler.now()).unwrap_or(i64::MAX);
                Ok(Some(Value::Long(now)))
            }
        }
    }

    fn set_interruptible(&mut self, thread: ThreadId) {
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.interruptible = true;
        }
    }

    /// Consumes a pending interrupt as `InterruptedException`.
    fn check_interrupt(&mut self, thread: ThreadId, frames: &[Frame]) -> Result<(), Trap> {
        if self.scheduler.take_interrupt(thread) {
            return Err(self.throw(frames, names::INTERRUPTED, None));
        }
        Ok(())
    }

    fn object_wait(&mut self, thread: ThreadId, frames: &[Frame], object: Reference, millis: i64, nanos: i32) -> Result<(), Trap> {
        if millis < 0 {
            let message = "timeout value is negative".to_string();
            return Err(self.throw(frames, names::ILLEGAL_ARGUMENT, Some(message)));
        }
        if !(0..=999_999).contains(&nanos) {
            let message = "nanosecond timeout value out of range".to_string();
            return Err(self.throw(frames, names::ILLEGAL_ARGUMENT, Some(message)));
        }
        let owner = self.heap.get(object).and_then(|o| o.monitor.owner());
        if owner != Some(thread) {
            let message = "current thread is not owner".to_string();
            return Err(self.throw(frames, names::ILLEGAL_MONITOR_STATE, Some(message)));
        }
        self.check_interrupt(thread, frames)?;
        let millis = if millis == 0 && nanos > 0 { 1 } else { millis as u64 };
        let timeout = if millis == 0 { Timeout::Indefinite } else { Timeout::Millis(millis) };
        if let Err(err) = sync::wait(&mut self.heap, &mut self.scheduler, thread, object, timeout) {
            return Err(self.sync_trap(frames, err));
        }
        self.set_interruptible(thread);
        Ok(())
    }

    /// `Thread.start`: a new scheduler thread whose entry frame calls the
    /// object's virtual `run()V`.
    fn start_thread(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, object: Reference) -> Result<(), Trap> {
        if object.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        if self.thread_for_object(object).is_some() {
            return Err(self.throw(frames, names::ILLEGAL_THREAD_STATE, None));
        }
        let run = self.select_virtual(frames, Value::Ref(object), self.core.run)?;
        let started = self.scheduler.spawn(object, Vec::new());
        log::debug!("{} started {}", thread, started);
        let entered = self.with_parked(thread, frames, |engine| engine.enter_thread(started, run, vec![Value::Ref(object)]));
        match entered {
            Ok(()) => Ok(()),
            Err(Trap::Exception(exception)) => Ok(self.thread_died(started, exception)?),
            Err(fatal) => Err(fatal),
        }
    }

    fn arraycopy(
        &mut self,
        frames: &[Frame],
        source: Reference,
        source_pos: i32,
        dest: Reference,
        dest_pos: i32,
        length: i32,
    ) -> Result<(), Trap> {
        if source.is_null() || dest.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        let element_of = |engine: &Engine, array: Reference| {
            engine
                .heap
                .get(array)
                .and_then(|o| Some((engine.classes.get(o.class)?.element()?, o.elements()?.len())))
        };
        let (Some((source_type, source_len)), Some((dest_type, dest_len))) =
            (element_of(self, source), element_of(self, dest))
        else {
            return Err(self.throw(frames, names::ARRAY_STORE, Some("arraycopy: argument type mismatch".to_string())));
        };
        let compatible = match (source_type, dest_type) {
            (ElementType::Primitive(a), ElementType::Primitive(b)) => a == b,
            (ElementType::Reference(_), ElementType::Reference(_)) => true,
            _ => false,
        };
        if !compatible {
            let message = "arraycopy: type mismatch".to_string();
            return Err(self.throw(frames, names::ARRAY_STORE, Some(message)));
        }
        let in_bounds = |pos: i32, len: usize| {
            pos >= 0 && length >= 0 && (i64::from(pos) + i64::from(length)) <= len as i64
        };
        if !in_bounds(source_pos, source_len) || !in_bounds(dest_pos, dest_len) {
            let message = format!(
                "arraycopy: last source index {} out of bounds for length {}",
                i64::from(source_pos) + i64::from(length),
                source_len
            );
            return Err(self.throw(frames, names::ARRAY_INDEX_OUT_OF_BOUNDS, Some(message)));
        }

        let (source_pos, dest_pos, length) = (source_pos as usize, dest_pos as usize, length as usize);
        let copied: Vec<Value> = self
            .heap
            .get(source)
            .and_then(|o| o.elements())
            .map(|e| e[source_pos..source_pos + length].to_vec())
            .unwrap_or_default();

        // Reference copies stop at the first element the destination rejects.
        let mut accepted = copied.len();
        if let ElementType::Reference(expected) = dest_type {
            if let Some(position) = copied.iter().position(|value| {
                value
                    .as_reference()
                    .and_then(Reference::non_null)
                    .and_then(|r| self.heap.get(r))
                    .map_or(false, |o| !self.classes.is(o.class, expected))
            }) {
                accepted = position;
            }
        }
        if let Some((kind, elements)) = self.heap.get_mut(dest).and_then(|o| o.elements_mut()) {
            for (offset, value) in copied[..accepted].iter().enumerate() {
                elements[dest_pos + offset] = if kind == ValueKind::Reference { *value } else { value.narrow_to(kind) };
            }
        }
        if accepted < copied.len() {
            let message = "arraycopy: element type mismatch".to_string();
            return Err(self.throw(frames, names::ARRAY_STORE, Some(message)));
        }
        Ok(())
    }
}
