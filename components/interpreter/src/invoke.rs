//! Method invocation and return.

use class_model::{names, Method, MethodBody, NativeBinding};
use core_types::{FatalError, MethodId, Reference, SignatureId, ThreadId, Value};
use scheduler::sync::{self, Acquire};

use crate::dispatch::Flow;
use crate::engine::Engine;
use crate::frame::Frame;
use crate::natives::NativeContext;
use crate::trap::Trap;

impl Engine {
    /// Invokes `method` with `args` (receiver first for instance methods)
    /// on top of `frames`.
    ///
    /// Bytecode methods push a frame and return [`Flow::Next`]; natives run
    /// to completion here. With no caller frame, a completed call returns
    /// [`Flow::Return`].
    pub(crate) fn invoke_method(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, method: MethodId, args: Vec<Value>) -> Result<Flow, Trap> {
        let class = self
            .classes
            .method_owner(method)
            .ok_or_else(|| FatalError::InternalConsistency(format!("unknown method {:?}", method)))?;
        let Some(info) = class.method_at(method.index) else {
            return Err(FatalError::InternalConsistency(format!("unknown method {:?}", method)).into());
        };
        log::trace!("{} invoking {}", thread, info);

        match &info.body {
            MethodBody::Abstract => Err(self.throw(frames, names::ABSTRACT_METHOD, Some(info.to_string()))),
            MethodBody::Native(_) => {
                let binding = self.linker.bind_native(info).unwrap_or(NativeBinding::Unbound);
                self.call_native(thread, frames, info, binding, args)
            }
            MethodBody::Bytecode { .. } => {
                let code = self.linker.link(&class, info).map_err(|err| FatalError::Link {
                    method: info.to_string(),
                    reason: err.to_string(),
                })?;
                if frames.len() >= self.config.max_frame_depth {
                    return Err(self.throw(frames, names::STACK_OVERFLOW, None));
                }
                let receiver = args.first().and_then(Value::as_reference).unwrap_or_default();
                frames.push(Frame::new(method, code, args));
                if info.is_synchronized() {
                    let object = if info.is_static() {
                        match self.mirror(frames, method.class) {
                            Ok(mirror) => mirror,
                            Err(trap) => {
                                frames.pop();
                                return Err(trap);
                            }
                        }
                    } else {
                        receiver
                    };
                    return self.enter_method_monitor(thread, frames, object);
                }
                Ok(Flow::Next)
            }
        }
    }

    fn enter_method_monitor(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, object: Reference) -> Result<Flow, Trap> {
        match sync::enter(&mut self.heap, &mut self.scheduler, thread, object) {
            Ok(acquired) => {
                if let Some(frame) = frames.last_mut() {
                    frame.monitor = Some(object);
                }
                Ok(match acquired {
                    Acquire::Acquired => Flow::Next,
                    Acquire::Blocked => Flow::Yield,
                })
            }
            Err(err) => {
                frames.pop();
                Err(self.sync_trap(frames, err))
            }
        }
    }

    fn call_native(
        &mut self,
        thread: ThreadId,
        frames: &mut Vec<Frame>,
        method: &Method,
        binding: NativeBinding,
        args: Vec<Value>,
    ) -> Result<Flow, Trap> {
        let result = match binding {
            NativeBinding::Builtin(builtin) => self.builtin(thread, frames, builtin, &args)?,
            NativeBinding::Host(id) => {
                let native = self
                    .natives
                    .get(id)
                    .ok_or_else(|| FatalError::InternalConsistency(format!("native {:?} not registered", id)))?;
                let pinned: Vec<Reference> = args
                    .iter()
                    .filter_map(Value::as_reference)
                    .filter(|r| !r.is_null())
                    .collect();
                for reference in &pinned {
                    self.heap.pin(*reference);
                }
                let result = {
                    let mut context = NativeContext::new(self, thread, frames);
                    (*native)(&mut context, &args)
                };
                for reference in &pinned {
                    self.heap.unpin(*reference);
                }
                result?
            }
            NativeBinding::Unbound => {
                return Err(self.throw(frames, names::UNSATISFIED_LINK, Some(method.to_string())));
            }
        };

        let parked = std::mem::take(&mut self.yield_requested)
            || self.scheduler.get(thread).map_or(true, |t| t.is_detached());
        match frames.last_mut() {
            None => Ok(Flow::Return(result)),
            Some(caller) => {
                if let Some(value) = result {
                    caller.push(value);
                }
                Ok(if parked { Flow::Yield } else { Flow::Next })
            }
        }
    }

    /// Pops the top frame, releases its monitor and hands `value` to the
    /// caller.
    pub(crate) fn return_from(&mut self, thread: ThreadId, frames: &mut Vec<Frame>, value: Option<Value>) -> Result<Flow, Trap> {
        let frame = frames
            .pop()
            .ok_or_else(|| FatalError::InternalConsistency("return with no frame".to_string()))?;
        if let Some(object) = frame.monitor {
            if let Err(err) = sync::exit(&mut self.heap, &mut self.scheduler, thread, object) {
                return Err(self.sync_trap(frames, err));
            }
        }
        match frames.last_mut() {
            Some(caller) => {
                if let Some(value) = value {
                    caller.push(value);
                }
                Ok(Flow::Next)
            }
            None => Ok(Flow::Return(value)),
        }
    }

    /// Virtual dispatch on the receiver's runtime class.
    pub(crate) fn select_virtual(&mut self, frames: &[Frame], receiver: Value, signature: SignatureId) -> Result<MethodId, Trap> {
        let object = receiver.as_reference().unwrap_or_default();
        let class = self.object_class(frames, object)?;
        let info = self
            .linker
            .prepare(class)
            .ok_or_else(|| FatalError::InternalConsistency(format!("unknown class {}", class)))?;
        match info.dispatch(signature) {
            Some(method) => Ok(method),
            None => {
                let message = match self.linker.signatures().describe(signature) {
                    Some((name, descriptor)) => format!("{}.{}{}", info.name, name, descriptor),
                    None => info.name.to_string(),
                };
                Err(self.throw(frames, names::ABSTRACT_METHOD, Some(message)))
            }
        }
    }
}
