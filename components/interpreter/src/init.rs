//! Class initialization and synthetic invocations.
//!
//! A class's `<clinit>` runs the first time an instruction needs the class
//! initialized, superclasses first. It runs to completion on a synthetic
//! thread of its own, nested inside the instruction that triggered it. The
//! triggering thread's frames go back into its record for the duration so
//! a collection inside the initializer still sees them.

use core_types::{ClassId, FatalError, MethodId, Reference, ThreadId, Value};
use scheduler::ThreadState;

use crate::dispatch::Flow;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::trap::{SliceEnd, Trap};

impl Engine {
    /// Runs pending static initializers of `class` and its superclasses.
    pub(crate) fn ensure_initialized(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, class: ClassId) -> Result<(), Trap> {
        match self.classes.get(class) {
            Some(info) if info.is_init_pending() => {}
            _ => return Ok(()),
        }
        let mut chain = self.classes.ancestry(class);
        chain.reverse();
        for ancestor in chain {
            let Some(info) = self.linker.prepare(ancestor) else {
                continue;
            };
            if !info.take_pending_init() {
                continue;
            }
            self.statics.ensure(ancestor, &info.static_kinds);
            if let Some(initializer) = info.class_initializer().map(|m| m.id) {
                log::debug!("initializing {}", info.name);
                self.with_parked(thread, frames, |engine| engine.run_synthetic(initializer, Vec::new()))?;
            }
        }
        Ok(())
    }

    /// Runs `f` with `frames` stored back in `thread`'s record.
    pub(crate) fn with_parked<R>(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, f: impl FnOnce(&mut Self) -> R) -> R {
        if let Some(record) = self.scheduler.get_mut(thread) {
            std::mem::swap(&mut record.stack, frames);
        }
        let result = f(self);
        if let Some(record) = self.scheduler.get_mut(thread) {
            std::mem::swap(&mut record.stack, frames);
        }
        result
    }

    /// Runs `method` to completion on a fresh synthetic thread.
    ///
    /// Timed waits inside the call idle the clock; blocking with nothing to
    /// wake the thread is fatal, since no other thread runs meanwhile.
    pub(crate) fn run_synthetic(&mut self, method: MethodId, args: Vec<Value>) -> Result<Option<Value>, Trap> {
        let saved = (self.yield_requested, self.slice_used);
        let thread = self.scheduler.spawn(Reference::NULL, Vec::new());
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.synthetic = true;
        }
        let result = self.drive_synthetic(thread, method, args);
        self.scheduler.terminate(thread);
        self.scheduler.remove(thread);
        (self.yield_requested, self.slice_used) = saved;
        result
    }

    fn drive_synthetic(&mut self, thread: ThreadId, method: MethodId, args: Vec<Value>) -> Result<Option<Value>, Trap> {
        let mut frames = Vec::new();
        self.ensure_initialized(thread, &mut frames, method.class)?;
        if let Flow::Return(value) = self.invoke_method(thread, &mut frames, method, args)? {
            return Ok(value);
        }
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.stack = frames;
        }
        loop {
            match self.run_slice(thread, self.config.slice_cycles)? {
                SliceEnd::Finished(value) => return Ok(value),
                SliceEnd::Uncaught(exception) => return Err(Trap::Exception(exception)),
                SliceEnd::Yielded => {}
                SliceEnd::Blocked => match self.scheduler.get(thread).map(|t| t.state) {
                    Some(ThreadState::DetachedUntil(deadline)) => {
                        self.scheduler.clock().idle_until(deadline);
                        self.scheduler.wake_expired();
                    }
                    Some(ThreadState::Ready) => {}
                    _ => {
                        return Err(FatalError::InvalidOperation(format!(
                            "synthetic call to {} blocked with nothing to wake it",
                            method
                        ))
                        .into())
                    }
                },
            }
        }
    }
}
