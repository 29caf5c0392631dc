//! The engine context.
//!
//! An [`Engine`] owns everything one virtual machine instance needs: the
//! class table, linker, heap, statics, threads and configuration. Nothing is
//! global, so several engines can run side by side in one process.

use std::fmt;
use std::sync::Arc;

use class_model::{install_core_classes, names, ClassDefinition, ClassError, ClassTable};
use core_types::{
    ClassId, FatalError, LoadLog, MethodId, NativeId, Reference, SignatureId, ThreadId,
    UncaughtPolicy, Value, VmConfig,
};
use linker::Linker;
use memory_manager::{GcStats, Heap, HeapObject, StaticStorage};
use scheduler::{Clock, HostHandle, JavaThread, Pacer, Scheduler, SystemClock, ThreadState};

use crate::dispatch::Flow;
use crate::frame::Frame;
use crate::natives::{NativeContext, NativeRegistry};
use crate::roots::EngineRoots;
use crate::trap::{EngineError, RunOutcome, SliceEnd, Trap, UncaughtException};

/// Ids of the core classes the interpreter creates objects of.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoreClasses {
    pub(crate) string: ClassId,
    pub(crate) class: ClassId,
    pub(crate) thread: ClassId,
    pub(crate) message_slot: Option<u16>,
    pub(crate) run: SignatureId,
}

/// One virtual machine instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use bytecode_system::{op, Assembler};
/// use class_model::{AccessFlags, ClassBuilder, ClassTable};
/// use core_types::{Value, VmConfig};
/// use interpreter::Engine;
///
/// let mut engine = Engine::new(Arc::new(ClassTable::new()), VmConfig::default()).unwrap();
///
/// let mut asm = Assembler::new(2, 2);
/// asm.emit(op::ILOAD_0).emit(op::ILOAD_1).emit(op::IMUL).emit(op::IRETURN);
/// let mut builder = ClassBuilder::new("app/Calc");
/// builder.method("mul", "(II)I", AccessFlags::STATIC, asm.finish().unwrap());
/// engine.load(builder.build()).unwrap();
///
/// let product = engine
///     .invoke("app/Calc", "mul", "(II)I", vec![Value::Int(6), Value::Int(7)])
///     .unwrap();
/// assert_eq!(product, Some(Value::Int(42)));
/// ```
pub struct Engine {
    pub(crate) config: VmConfig,
    pub(crate) classes: Arc<ClassTable>,
    pub(crate) linker: Linker,
    pub(crate) natives: Arc<NativeRegistry>,
    pub(crate) heap: Heap,
    pub(crate) statics: StaticStorage,
    pub(crate) scheduler: Scheduler<Vec<Frame>>,
    pub(crate) pacer: Pacer,
    pub(crate) core: CoreClasses,
    pub(crate) out_of_memory: Reference,
    pub(crate) uncaught: Vec<UncaughtException>,
    pub(crate) yield_requested: bool,
    pub(crate) slice_used: u32,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("classes", &self.classes.len())
            .field("heap_objects", &self.heap.len())
            .field("heap_used", &self.heap.used())
            .field("threads", &self.scheduler.live_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine on the system clock. Core classes missing from
    /// `classes` are installed.
    pub fn new(classes: Arc<ClassTable>, config: VmConfig) -> Result<Self, EngineError> {
        Self::with_clock(classes, config, Arc::new(SystemClock))
    }

    /// Creates an engine driven by `clock`.
    pub fn with_clock(classes: Arc<ClassTable>, config: VmConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        config.validate()?;
        install_core_classes(&classes)?;
        let natives = Arc::new(NativeRegistry::new());
        let linker = Linker::new(classes.clone(), config.field_access, natives.clone());

        let lookup = |name: &str| classes.lookup(name).ok_or_else(|| ClassError::NoSuchClass(name.to_string()));
        let throwable = lookup(names::THROWABLE)?;
        let message_slot = linker
            .prepare(throwable)
            .and_then(|c| c.field("message", "Ljava/lang/String;").and_then(|f| f.slot()));
        let core = CoreClasses {
            string: lookup(names::STRING)?,
            class: lookup(names::CLASS)?,
            thread: lookup(names::THREAD)?,
            message_slot,
            run: linker.signatures().intern("run", "()V"),
        };

        let mut heap = Heap::from_config(&config);
        let oom_class = lookup(names::OUT_OF_MEMORY)?;
        let kinds = linker
            .prepare(oom_class)
            .and_then(|c| c.layout().map(|l| l.field_kinds.clone()))
            .unwrap_or_default();
        let out_of_memory = heap.insert(HeapObject::instance(oom_class, &kinds));
        heap.pin(out_of_memory);

        log::debug!("engine created ({} classes)", classes.len());
        Ok(Self {
            pacer: Pacer::new(config.pacing, config.target_cycles_per_second),
            scheduler: Scheduler::new(clock),
            statics: StaticStorage::new(),
            config,
            classes,
            linker,
            natives,
            heap,
            core,
            out_of_memory,
            uncaught: Vec::new(),
            yield_requested: false,
            slice_used: 0,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Loaded classes.
    pub fn classes(&self) -> &Arc<ClassTable> {
        &self.classes
    }

    /// The linker.
    pub fn linker(&self) -> &Linker {
        &self.linker
    }

    /// Load-time issues recorded so far.
    pub fn load_log(&self) -> &Arc<LoadLog> {
        self.classes.load_log()
    }

    /// The heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable heap access, for hosts and snapshot restore.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Static field storage.
    pub fn statics(&self) -> &StaticStorage {
        &self.statics
    }

    /// Mutable static storage, for snapshot restore.
    pub fn statics_mut(&mut self) -> &mut StaticStorage {
        &mut self.statics
    }

    /// Threads.
    pub fn scheduler(&self) -> &Scheduler<Vec<Frame>> {
        &self.scheduler
    }

    /// Mutable thread access, for snapshot restore.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<Vec<Frame>> {
        &mut self.scheduler
    }

    /// Handle other host threads use to post requests to this engine.
    pub fn host_handle(&self) -> HostHandle {
        self.scheduler.host_handle()
    }

    /// Exceptions that terminated threads, oldest first.
    pub fn uncaught_exceptions(&self) -> &[UncaughtException] {
        &self.uncaught
    }

    /// The preallocated `OutOfMemoryError` thrown when the heap is full.
    pub fn out_of_memory_error(&self) -> Reference {
        self.out_of_memory
    }

    /// Registers a class definition and prepares it.
    pub fn load(&mut self, definition: ClassDefinition) -> Result<ClassId, EngineError> {
        let id = self.classes.register(definition)?;
        self.linker.prepare(id);
        Ok(id)
    }

    /// Registers a host native for `class.name(descriptor)`. Natives bind
    /// on first invocation, so registration must happen before then.
    pub fn register_native<F>(&self, class: &str, name: &str, descriptor: &str, native: F) -> NativeId
    where
        F: Fn(&mut NativeContext<'_>, &[Value]) -> Result<Option<Value>, Trap> + Send + Sync + 'static,
    {
        self.natives.register(class, name, descriptor, native)
    }

    /// Resolves `class.name(descriptor)` up the superclass chain.
    pub fn find_method(&self, class: &str, name: &str, descriptor: &str) -> Result<MethodId, EngineError> {
        let id = self
            .classes
            .lookup(class)
            .ok_or_else(|| ClassError::NoSuchClass(class.to_string()))?;
        self.classes
            .resolve_method(id, name, descriptor)
            .map_err(|_| EngineError::NoSuchMethod(format!("{}.{}{}", class, name, descriptor)))
    }

    /// Runs a method to completion on a synthetic thread and returns its
    /// result. Instance methods take the receiver as the first argument.
    pub fn invoke(&mut self, class: &str, name: &str, descriptor: &str, args: Vec<Value>) -> Result<Option<Value>, EngineError> {
        let method = self.find_method(class, name, descriptor)?;
        self.run_synthetic(method, args).map_err(|trap| self.engine_error(trap))
    }

    /// Starts a new thread running `class.name(descriptor)`. It runs when
    /// the scheduler reaches it.
    pub fn spawn(&mut self, class: &str, name: &str, descriptor: &str, args: Vec<Value>) -> Result<ThreadId, EngineError> {
        let method = self.find_method(class, name, descriptor)?;
        let thread = self.scheduler.spawn(Reference::NULL, Vec::new());
        match self.enter_thread(thread, method, args) {
            Ok(()) => Ok(thread),
            Err(trap) => {
                self.scheduler.terminate(thread);
                Err(self.engine_error(trap))
            }
        }
    }

    /// Creates a `java/lang/String` with this text.
    pub fn new_string(&mut self, text: &str) -> Result<Reference, EngineError> {
        self.string_object(&[], text).map_err(|trap| self.engine_error(trap))
    }

    /// Text of a string object.
    pub fn string_text(&self, reference: Reference) -> Option<Arc<str>> {
        self.heap.get(reference)?.text().cloned()
    }

    /// Runs a full collection.
    pub fn collect_garbage(&mut self) -> GcStats {
        self.heap.collect(&EngineRoots {
            scheduler: &self.scheduler,
            statics: &self.statics,
            active: &[],
        })
    }

    /// Runs threads until all have terminated, a host asks to stop, or
    /// every remaining thread is detached with no timer pending.
    pub fn run(&mut self) -> Result<RunOutcome, FatalError> {
        loop {
            if self.scheduler.drain_host_requests() {
                log::debug!("run loop stopped by host");
                return Ok(RunOutcome::Stopped);
            }
            if self.scheduler.live_count() == 0 {
                return Ok(RunOutcome::Finished);
            }
            if self.step()?.is_none() {
                match self.scheduler.next_deadline() {
                    Some(deadline) => self.scheduler.clock().idle_until(deadline),
                    None => return Ok(RunOutcome::Idle),
                }
            }
        }
    }

    /// Runs one slice of the next ready thread. Returns the thread that ran,
    /// or `None` when no thread is ready.
    pub fn step(&mut self) -> Result<Option<ThreadId>, FatalError> {
        let Some(thread) = self.scheduler.next() else {
            return Ok(None);
        };
        let end = self.run_slice(thread, self.config.slice_cycles);
        self.scheduler.end_slice();
        self.pacer.pace(u64::from(self.slice_used));
        match end? {
            SliceEnd::Finished(_) => {
                self.scheduler.terminate(thread);
            }
            SliceEnd::Uncaught(exception) => self.thread_died(thread, exception)?,
            SliceEnd::Yielded | SliceEnd::Blocked => {}
        }
        Ok(Some(thread))
    }

    /// Replaces the heap, statics and threads with restored state.
    ///
    /// Only an engine without threads accepts this. `out_of_memory` must
    /// name the restored heap's preallocated `OutOfMemoryError`.
    pub fn install_state(
        &mut self,
        heap: Heap,
        statics: StaticStorage,
        threads: Vec<JavaThread<Vec<Frame>>>,
        out_of_memory: Reference,
    ) -> Result<(), EngineError> {
        if self.scheduler.threads().next().is_some() {
            return Err(FatalError::InvalidOperation("state installed into an engine with threads".to_string()).into());
        }
        let oom_class = self.classes.lookup(names::OUT_OF_MEMORY);
        if heap.get(out_of_memory).map(|o| o.class) != oom_class {
            return Err(FatalError::InvalidOperation(format!("{} is not an OutOfMemoryError", out_of_memory)).into());
        }
        self.heap = heap;
        self.heap.pin(out_of_memory);
        self.out_of_memory = out_of_memory;
        self.statics = statics;
        for thread in threads {
            self.scheduler.insert(thread);
        }
        self.uncaught.clear();
        log::debug!("installed {} objects, {} threads", self.heap.len(), self.scheduler.live_count());
        Ok(())
    }

    /// Scheduling state of a thread.
    pub fn thread_state(&self, thread: ThreadId) -> Option<ThreadState> {
        self.scheduler.get(thread).map(|t| t.state)
    }

    /// Runs one slice with the thread's frames held outside the scheduler.
    pub(crate) fn run_slice(&mut self, thread: ThreadId, budget: u32) -> Result<SliceEnd, FatalError> {
        self.yield_requested = false;
        self.slice_used = 0;
        let Some(record) = self.scheduler.get_mut(thread) else {
            return Ok(SliceEnd::Blocked);
        };
        let mut frames = std::mem::take(&mut record.stack);
        let end = self.resume(thread, &mut frames, budget);
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.stack = frames;
        }
        end
    }

    /// Pushes the entry frame of a new thread.
    pub(crate) fn enter_thread(&mut self, thread: ThreadId, method: MethodId, args: Vec<Value>) -> Result<(), Trap> {
        let mut frames = Vec::new();
        self.ensure_initialized(thread, &mut frames, method.class)?;
        let flow = self.invoke_method(thread, &mut frames, method, args);
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.stack = frames;
        }
        match flow? {
            Flow::Return(_) => {
                self.scheduler.terminate(thread);
            }
            Flow::Next | Flow::Yield => {}
        }
        Ok(())
    }

    pub(crate) fn thread_died(&mut self, thread: ThreadId, exception: Reference) -> Result<(), FatalError> {
        let record = UncaughtException {
            thread,
            exception,
            class: self.class_name_of(exception),
            message: self.exception_message(exception),
        };
        log::warn!(
            "uncaught {} on {}{}",
            record.class,
            thread,
            record.message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
        );
        self.scheduler.terminate(thread);
        let class = record.class.clone();
        self.uncaught.push(record);
        match self.config.uncaught {
            UncaughtPolicy::TerminateThread => Ok(()),
            UncaughtPolicy::Abort => Err(FatalError::UncaughtException { thread, class }),
        }
    }

    pub(crate) fn engine_error(&self, trap: Trap) -> EngineError {
        match trap {
            Trap::Fatal(err) => EngineError::Fatal(err),
            Trap::Exception(exception) => EngineError::Uncaught {
                exception,
                class: self.class_name_of(exception),
                message: self.exception_message(exception),
            },
        }
    }
}
