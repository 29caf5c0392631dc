//! Object, array, string and mirror creation plus field and element access.

use std::sync::Arc;

use bytecode_system::NamedField;
use class_model::{names, ElementType};
use core_types::{ClassId, FatalError, Reference, ThreadId, Value, ValueKind};
use memory_manager::{AllocError, HeapObject, Payload};

use crate::engine::Engine;
use crate::frame::Frame;
use crate::roots::EngineRoots;
use crate::trap::Trap;

fn dead(object: Reference) -> Trap {
    Trap::Fatal(FatalError::InternalConsistency(format!("{} is not a live object", object)))
}

impl Engine {
    /// Allocates with `frames` as the running thread's roots. Exhaustion
    /// under the throw policy becomes the preallocated `OutOfMemoryError`.
    pub(crate) fn allocate(&mut self, frames: &[Frame], object: HeapObject) -> Result<Reference, Trap> {
        let roots = EngineRoots {
            scheduler: &self.scheduler,
            statics: &self.statics,
            active: frames,
        };
        match self.heap.allocate(object, &roots) {
            Ok(reference) => Ok(reference),
            Err(err) => Err(self.alloc_failure(err)),
        }
    }

    fn alloc_failure(&self, err: AllocError) -> Trap {
        match err {
            AllocError::OutOfMemory { requested, used, capacity } => {
                log::warn!("out of memory: {} units requested, {}/{} in use", requested, used, capacity);
                Trap::Exception(self.out_of_memory)
            }
            AllocError::Fatal(err) => Trap::Fatal(err),
        }
    }

    /// Zeroed instance of `class`.
    pub(crate) fn new_instance(&mut self, frames: &[Frame], class: ClassId) -> Result<Reference, Trap> {
        let info = self
            .linker
            .prepare(class)
            .ok_or_else(|| FatalError::InternalConsistency(format!("unknown class {}", class)))?;
        let kinds = info.layout().map(|l| l.field_kinds.clone()).unwrap_or_default();
        self.allocate(frames, HeapObject::instance(class, &kinds))
    }

    /// Zeroed array; a negative length raises `NegativeArraySizeException`.
    pub(crate) fn new_array(&mut self, frames: &[Frame], class: ClassId, kind: ValueKind, length: i32) -> Result<Reference, Trap> {
        let Ok(count) = usize::try_from(length) else {
            return Err(self.throw(frames, names::NEGATIVE_ARRAY_SIZE, Some(length.to_string())));
        };
        let roots = EngineRoots {
            scheduler: &self.scheduler,
            statics: &self.statics,
            active: frames,
        };
        match self.heap.reserve(HeapObject::array_weight(kind, count), &roots) {
            Ok(()) => Ok(self.heap.insert(HeapObject::array(class, kind, count))),
            Err(err) => Err(self.alloc_failure(err)),
        }
    }

    /// `multianewarray`: nested arrays, outermost dimension first.
    pub(crate) fn new_multi_array(&mut self, frames: &[Frame], class: ClassId, counts: &[i32]) -> Result<Reference, Trap> {
        let (&length, rest) = counts
            .split_first()
            .ok_or_else(|| FatalError::InternalConsistency("multianewarray with no dimensions".to_string()))?;
        let element = self
            .classes
            .get(class)
            .and_then(|c| c.element())
            .ok_or_else(|| FatalError::InternalConsistency(format!("{} is not an array class", class)))?;
        let array = self.new_array(frames, class, element.kind(), length)?;
        let ElementType::Reference(inner) = element else {
            return Ok(array);
        };
        if rest.is_empty() {
            return Ok(array);
        }

        self.heap.pin(array);
        let mut result = Ok(array);
        for index in 0..usize::try_from(length).unwrap_or(0) {
            match self.new_multi_array(frames, inner, rest) {
                Ok(child) => {
                    if let Some(slot) = self
                        .heap
                        .get_mut(array)
                        .and_then(|o| o.elements_mut())
                        .and_then(|(_, elements)| elements.get_mut(index))
                    {
                        *slot = Value::Ref(child);
                    }
                }
                Err(trap) => {
                    result = Err(trap);
                    break;
                }
            }
        }
        self.heap.unpin(array);
        result
    }

    /// `arraylength`.
    pub(crate) fn array_length(&mut self, frames: &[Frame], array: Reference) -> Result<i32, Trap> {
        if array.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        let length = self
            .heap
            .get(array)
            .and_then(|o| o.elements())
            .map(|e| e.len())
            .ok_or_else(|| dead(array))?;
        Ok(i32::try_from(length).unwrap_or(i32::MAX))
    }

    fn index_error(&mut self, frames: &[Frame], index: i32, length: usize) -> Trap {
        let message = format!("Index {} out of bounds for length {}", index, length);
        self.throw(frames, names::ARRAY_INDEX_OUT_OF_BOUNDS, Some(message))
    }

    /// `xaload`.
    pub(crate) fn array_element(&mut self, frames: &[Frame], array: Reference, index: i32) -> Result<Value, Trap> {
        if array.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        let elements = self.heap.get(array).and_then(|o| o.elements()).ok_or_else(|| dead(array))?;
        let length = elements.len();
        match usize::try_from(index).ok().and_then(|i| elements.get(i)).copied() {
            Some(value) => Ok(value),
            None => Err(self.index_error(frames, index, length)),
        }
    }

    /// `xastore`. Reference stores check the value against the array's
    /// element class.
    pub(crate) fn store_element(&mut self, frames: &[Frame], array: Reference, index: i32, value: Value) -> Result<(), Trap> {
        if array.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        let object = self.heap.get(array).ok_or_else(|| dead(array))?;
        let length = object.elements().map(|e| e.len()).ok_or_else(|| dead(array))?;
        let element = self.classes.get(object.class).and_then(|c| c.element());
        let Some(position) = usize::try_from(index).ok().filter(|i| *i < length) else {
            return Err(self.index_error(frames, index, length));
        };
        if let (Some(ElementType::Reference(expected)), Some(stored)) = (element, value.as_reference()) {
            if let Some(actual) = stored.non_null().and_then(|r| self.heap.get(r)).map(|o| o.class) {
                if !self.classes.is(actual, expected) {
                    let message = self.classes.name_of(actual).to_string();
                    return Err(self.throw(frames, names::ARRAY_STORE, Some(message)));
                }
            }
        }
        if let Some((kind, elements)) = self.heap.get_mut(array).and_then(|o| o.elements_mut()) {
            elements[position] = value.narrow_to(kind);
        }
        Ok(())
    }

    /// New `java/lang/String` holding `text`.
    pub(crate) fn string_object(&mut self, frames: &[Frame], text: &str) -> Result<Reference, Trap> {
        let object = HeapObject::with_payload(self.core.string, Vec::new(), Payload::Str(Arc::from(text)));
        self.allocate(frames, object)
    }

    /// The canonical string for a literal.
    pub(crate) fn intern_string(&mut self, frames: &[Frame], text: &str) -> Result<Reference, Trap> {
        if let Some(existing) = self.heap.interned(text) {
            return Ok(existing);
        }
        let string = self.string_object(frames, text)?;
        self.heap.intern(Arc::from(text), string);
        Ok(string)
    }

    /// The `java/lang/Class` object standing for `class`, created on first use.
    pub(crate) fn mirror(&mut self, frames: &[Frame], class: ClassId) -> Result<Reference, Trap> {
        if let Some(existing) = self.heap.mirror(class) {
            return Ok(existing);
        }
        let object = HeapObject::with_payload(self.core.class, Vec::new(), Payload::Mirror(class));
        let mirror = self.allocate(frames, object)?;
        self.heap.register_mirror(class, mirror);
        Ok(mirror)
    }

    /// Runtime class of an object; null raises `NullPointerException`.
    pub(crate) fn object_class(&mut self, frames: &[Frame], object: Reference) -> Result<ClassId, Trap> {
        if object.is_null() {
            return Err(self.throw(frames, names::NULL_POINTER, None));
        }
        self.heap.get(object).map(|o| o.class).ok_or_else(|| dead(object))
    }

    /// Resolves a name-keyed field against the receiver's class.
    pub(crate) fn named_field_slot(&mut self, frames: &[Frame], object: Reference, field: &NamedField) -> Result<usize, Trap> {
        let class = self.object_class(frames, object)?;
        self.linker.prepare(class);
        let slot = self
            .classes
            .resolve_field(class, &field.name, &field.descriptor)
            .ok()
            .and_then(|id| self.classes.get(id.class)?.fields.get(usize::from(id.index))?.slot());
        match slot {
            Some(slot) => Ok(usize::from(slot)),
            None => {
                let message = format!("{}.{}", self.classes.name_of(class), field.name);
                Err(self.throw(frames, names::NO_SUCH_FIELD, Some(message)))
            }
        }
    }

    pub(crate) fn read_field(&self, object: Reference, slot: usize) -> Result<Value, Trap> {
        self.heap
            .get(object)
            .and_then(|o| o.fields.get(slot))
            .copied()
            .ok_or_else(|| dead(object))
    }

    pub(crate) fn write_field(&mut self, object: Reference, slot: usize, value: Value) -> Result<(), Trap> {
        let field = self
            .heap
            .get_mut(object)
            .and_then(|o| o.fields.get_mut(slot))
            .ok_or_else(|| dead(object))?;
        *field = value;
        Ok(())
    }

    /// The `java/lang/Thread` object of `thread`, created lazily for
    /// threads the engine started itself.
    pub(crate) fn thread_object(&mut self, frames: &[Frame], thread: ThreadId) -> Result<Reference, Trap> {
        let existing = self.scheduler.get(thread).map(|t| t.object).unwrap_or_default();
        if !existing.is_null() {
            return Ok(existing);
        }
        let object = self.new_instance(frames, self.core.thread)?;
        if let Some(record) = self.scheduler.get_mut(thread) {
            record.object = object;
        }
        Ok(object)
    }

    /// The thread started from a `java/lang/Thread` object.
    pub(crate) fn thread_for_object(&self, object: Reference) -> Option<ThreadId> {
        if object.is_null() {
            return None;
        }
        self.scheduler.threads().find(|t| t.object == object).map(|t| t.id)
    }
}
