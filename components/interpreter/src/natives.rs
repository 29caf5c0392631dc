//! Host natives.
//!
//! Hosts register Rust closures for `native` methods by class, name and
//! descriptor. The linker binds each native method once, on first call,
//! through the [`NativeResolver`] this registry implements; a method
//! registered after it was bound stays unbound.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use class_model::names;
use core_types::{NativeId, Reference, ThreadId, Value};
use linker::NativeResolver;
use memory_manager::{Heap, NativeCompanion, Payload};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use scheduler::{HostHandle, Timeout};

use crate::engine::Engine;
use crate::frame::Frame;
use crate::trap::Trap;

/// A host native. Arguments arrive receiver first for instance methods,
/// one [`Value`] per parameter.
pub type HostNative = dyn Fn(&mut NativeContext<'_>, &[Value]) -> Result<Option<Value>, Trap> + Send + Sync;

type NativeKey = (String, String, String);

/// Registered host natives.
#[derive(Default)]
pub struct NativeRegistry {
    ids: RwLock<FxHashMap<NativeKey, NativeId>>,
    natives: RwLock<Vec<Arc<HostNative>>>,
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("natives", &self.natives.read().len())
            .finish()
    }
}

impl NativeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `native` for `class.name(descriptor)`. Registering the
    /// same method again replaces the closure under the same id.
    pub fn register<F>(&self, class: &str, name: &str, descriptor: &str, native: F) -> NativeId
    where
        F: Fn(&mut NativeContext<'_>, &[Value]) -> Result<Option<Value>, Trap> + Send + Sync + 'static,
    {
        let key = (class.to_string(), name.to_string(), descriptor.to_string());
        let native: Arc<HostNative> = Arc::new(native);
        let mut ids = self.ids.write();
        let mut natives = self.natives.write();
        if let Some(id) = ids.get(&key) {
            natives[id.0 as usize] = native;
            return *id;
        }
        let id = NativeId(natives.len() as u32);
        natives.push(native);
        log::debug!("registered native {}.{}{} as {:?}", class, name, descriptor, id);
        ids.insert(key, id);
        id
    }

    /// The native registered under `id`.
    pub fn get(&self, id: NativeId) -> Option<Arc<HostNative>> {
        self.natives.read().get(id.0 as usize).cloned()
    }

    /// Number of registered natives.
    pub fn len(&self) -> usize {
        self.natives.read().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NativeResolver for NativeRegistry {
    fn resolve(&self, class: &str, name: &str, descriptor: &str) -> Option<NativeId> {
        let key = (class.to_string(), name.to_string(), descriptor.to_string());
        self.ids.read().get(&key).copied()
    }
}

/// What a host native can reach while it runs.
///
/// Natives run on the calling Java thread, inside its slice. Reference
/// arguments stay pinned for the duration of the call.
pub struct NativeContext<'a> {
    engine: &'a mut Engine,
    thread: ThreadId,
    frames: &'a [Frame],
}

impl<'a> NativeContext<'a> {
    pub(crate) fn new(engine: &'a mut Engine, thread: ThreadId, frames: &'a [Frame]) -> Self {
        Self { engine, thread, frames }
    }

    /// The calling thread.
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// The heap.
    pub fn heap(&self) -> &Heap {
        &self.engine.heap
    }

    /// Mutable heap access.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.engine.heap
    }

    /// Allocates a string.
    pub fn new_string(&mut self, text: &str) -> Result<Reference, Trap> {
        self.engine.string_object(self.frames, text)
    }

    /// Text of a string object.
    pub fn string(&self, reference: Reference) -> Option<Arc<str>> {
        self.engine.string_text(reference)
    }

    /// Allocates a zeroed instance of a loaded class. Static
    /// initialization is not triggered.
    pub fn new_object(&mut self, class: &str) -> Result<Reference, Trap> {
        match self.engine.classes.lookup(class) {
            Some(id) => self.engine.new_instance(self.frames, id),
            None => Err(self.throw(names::NO_CLASS_DEF_FOUND, Some(class))),
        }
    }

    /// Attaches host state to a plain object. Returns false if the object
    /// is dead or already carries a payload.
    pub fn attach_companion(&mut self, object: Reference, companion: Box<dyn NativeCompanion>) -> bool {
        match self.engine.heap.get_mut(object) {
            Some(target) if matches!(target.payload, Payload::None) => {
                target.payload = Payload::Companion(companion);
                true
            }
            _ => false,
        }
    }

    /// The companion of `object`, if it has one of type `T`.
    pub fn companion<T: Any>(&self, object: Reference) -> Option<&T> {
        self.engine.heap.get(object)?.companion()?.as_any().downcast_ref()
    }

    /// Mutable access to the companion of `object`.
    pub fn companion_mut<T: Any>(&mut self, object: Reference) -> Option<&mut T> {
        self.engine
            .heap
            .get_mut(object)?
            .companion_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    /// Builds an exception of the named class for the native to return.
    pub fn throw(&mut self, class: &str, message: Option<&str>) -> Trap {
        self.engine.throw(self.frames, class, message.map(str::to_string))
    }

    /// Takes the calling thread out of the rotation when the native
    /// returns. Another host thread can bring it back through a
    /// [`HostHandle`].
    pub fn detach(&mut self, timeout: Timeout) -> bool {
        self.engine.scheduler.detach(self.thread, timeout)
    }

    /// Ends the calling thread's slice when the native returns.
    pub fn yield_now(&mut self) {
        self.engine.yield_requested = true;
    }

    /// Handle for posting requests from other host threads.
    pub fn host_handle(&self) -> HostHandle {
        self.engine.host_handle()
    }

    /// Scheduler clock.
    pub fn now_millis(&self) -> u64 {
        self.engine.scheduler.now()
    }
}
