//! Raising and unwinding Java exceptions.

use bytecode_system::{CatchType, SymbolKind, Unresolved};
use class_model::names;
use core_types::{ClassId, FatalError, MissingSymbolPolicy, Reference, ThreadId, Value};
use scheduler::sync::{self, SyncError};

use crate::engine::Engine;
use crate::frame::Frame;
use crate::trap::Trap;

impl Engine {
    /// Creates an exception of the named core class and returns it as a
    /// trap. Allocation failure yields the preallocated `OutOfMemoryError`
    /// (or a fatal trap under the abort policy).
    pub(crate) fn throw(&mut self, frames: &[Frame], class_name: &str, message: Option<String>) -> Trap {
        let Some(class) = self.classes.lookup(class_name) else {
            return Trap::Fatal(FatalError::MissingSymbol(class_name.to_string()));
        };
        let text = match message {
            Some(text) => match self.string_object(frames, &text) {
                Ok(reference) => Some(reference),
                Err(trap) => return trap,
            },
            None => None,
        };
        if let Some(text) = text {
            self.heap.pin(text);
        }
        let created = self.new_instance(frames, class);
        if let Some(text) = text {
            self.heap.unpin(text);
        }
        let exception = match created {
            Ok(exception) => exception,
            Err(trap) => return trap,
        };
        if let (Some(slot), Some(text)) = (self.core.message_slot, text) {
            if let Some(field) = self
                .heap
                .get_mut(exception)
                .and_then(|o| o.fields.get_mut(usize::from(slot)))
            {
                *field = Value::Ref(text);
            }
        }
        log::debug!("raising {}", class_name);
        Trap::Exception(exception)
    }

    /// Searches `frames` top-down for a handler of `exception`.
    ///
    /// Frames without a handler are popped, releasing the monitors of
    /// synchronized methods. On a match the handler's frame has its operand
    /// stack replaced by the exception and jumps to the handler; returns
    /// false once every frame is gone.
    pub(crate) fn unwind(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, exception: Reference) -> Result<bool, FatalError> {
        let class = self
            .heap
            .get(exception)
            .map(|o| o.class)
            .ok_or_else(|| FatalError::InternalConsistency(format!("thrown object {} is not live", exception)))?;

        while let Some(frame) = frames.last_mut() {
            // pc already points past the faulting instruction
            if let Some(faulting) = frame.pc.checked_sub(1) {
                let target = frame
                    .code
                    .handlers
                    .iter()
                    .find(|h| h.covers(faulting) && self.catches(&h.catch, class))
                    .map(|h| h.target);
                if let Some(target) = target {
                    frame.stack.clear();
                    frame.push(Value::Ref(exception));
                    frame.pc = target;
                    return Ok(true);
                }
            }
            let Some(popped) = frames.pop() else { break };
            if let Some(object) = popped.monitor {
                match sync::exit(&mut self.heap, &mut self.scheduler, thread, object) {
                    Ok(()) => {}
                    Err(SyncError::Fatal(err)) => return Err(err),
                    Err(SyncError::Monitor(err)) => log::warn!("unwinding {}: {}", popped.method, err),
                }
            }
        }
        Ok(false)
    }

    fn catches(&self, catch: &CatchType, class: ClassId) -> bool {
        match catch {
            CatchType::Any => true,
            CatchType::Class(handled) => self.classes.is(class, *handled),
            CatchType::Unresolved(_) => false,
        }
    }

    /// Class name of a live object.
    pub(crate) fn class_name_of(&self, object: Reference) -> String {
        self.heap
            .get(object)
            .map(|o| self.classes.name_of(o.class).to_string())
            .unwrap_or_else(|| "<collected>".to_string())
    }

    /// `Throwable.message` of an exception, if set.
    pub(crate) fn exception_message(&self, exception: Reference) -> Option<String> {
        let slot = usize::from(self.core.message_slot?);
        let text = self.heap.get(exception)?.fields.get(slot)?.as_reference()?;
        self.heap.get(text)?.text().map(|t| t.to_string())
    }

    /// Applies the missing-symbol policy to an unresolved instruction.
    pub(crate) fn missing_symbol(&mut self, frames: &[Frame], symbol: &Unresolved) -> Trap {
        match self.config.missing_symbol {
            MissingSymbolPolicy::Abort => Trap::Fatal(FatalError::MissingSymbol(symbol.symbol.clone())),
            MissingSymbolPolicy::ThrowJavaError => {
                let class = match symbol.kind {
                    SymbolKind::Class => names::NO_CLASS_DEF_FOUND,
                    SymbolKind::Method => names::NO_SUCH_METHOD,
                    SymbolKind::Field => names::NO_SUCH_FIELD,
                };
                self.throw(frames, class, Some(symbol.symbol.clone()))
            }
        }
    }

    /// Monitor misuse becomes `IllegalMonitorStateException`.
    pub(crate) fn sync_trap(&mut self, frames: &[Frame], err: SyncError) -> Trap {
        match err {
            SyncError::Monitor(err) => self.throw(frames, names::ILLEGAL_MONITOR_STATE, Some(err.to_string())),
            SyncError::Fatal(err) => Trap::Fatal(err),
        }
    }
}
