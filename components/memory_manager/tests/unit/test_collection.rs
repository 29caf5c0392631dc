//! Tests for allocation accounting and collection

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_types::{ClassId, OverflowPolicy, Reference, Value, ValueKind, OBJECT_HEADER_WEIGHT};
use memory_manager::{
    AllocError, Heap, HeapObject, NativeCompanion, NoRoots, Payload, RootSet, StaticStorage,
};

#[derive(Debug)]
struct Counted {
    deletes: Arc<AtomicUsize>,
    veto: bool,
}

impl NativeCompanion for Counted {
    fn on_delete(&mut self) -> bool {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        !self.veto
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn linked(heap: &mut Heap, fields: Vec<Value>) -> Reference {
    heap.insert(HeapObject::with_payload(ClassId(1), fields, Payload::None))
}

#[test]
fn test_accounting_tracks_allocation_and_collection() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let array = heap
        .allocate(HeapObject::array(ClassId(2), ValueKind::Long, 4), &NoRoots)
        .unwrap();
    assert_eq!(heap.used(), OBJECT_HEADER_WEIGHT + 32);
    heap.collect(&vec![array]);
    assert_eq!(heap.used(), OBJECT_HEADER_WEIGHT + 32);
    heap.collect(&NoRoots);
    assert_eq!(heap.used(), 0);
    assert_eq!(heap.stats().bytes_reclaimed, (OBJECT_HEADER_WEIGHT + 32) as u64);
}

#[test]
fn test_reference_arrays_are_traced() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let element = linked(&mut heap, Vec::new());
    let array = heap.insert(HeapObject::with_payload(
        ClassId(3),
        Vec::new(),
        Payload::Array {
            kind: ValueKind::Reference,
            elements: vec![Value::Ref(element), Value::null()],
        },
    ));
    heap.collect(&vec![array]);
    assert!(heap.contains(element));
}

#[test]
fn test_statics_interned_strings_and_mirrors_are_roots() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let mut statics = StaticStorage::new();
    let from_static = linked(&mut heap, Vec::new());
    statics.ensure(ClassId(9), &[ValueKind::Reference]);
    statics.set(ClassId(9), 0, Value::Ref(from_static));

    let text = heap.insert(HeapObject::with_payload(ClassId(4), Vec::new(), Payload::Str("hi".into())));
    heap.intern("hi".into(), text);
    let mirror = heap.insert(HeapObject::with_payload(ClassId(5), Vec::new(), Payload::Mirror(ClassId(9))));
    heap.register_mirror(ClassId(9), mirror);
    let loose = linked(&mut heap, Vec::new());

    let extra = vec![Reference::NULL];
    let roots: [&dyn RootSet; 2] = [&statics, &extra];
    heap.collect(&roots);
    assert!(heap.contains(from_static));
    assert!(heap.contains(text));
    assert!(heap.contains(mirror));
    assert!(!heap.contains(loose));
    assert_eq!(heap.interned("hi"), Some(text));
}

#[test]
fn test_pinned_temporaries_survive_until_unpinned() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let temp = linked(&mut heap, Vec::new());
    heap.pin(temp);
    heap.collect(&NoRoots);
    assert!(heap.contains(temp));
    heap.unpin(temp);
    heap.collect(&NoRoots);
    assert!(!heap.contains(temp));
}

#[test]
fn test_delete_hook_runs_once_per_freed_object() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let deletes = Arc::new(AtomicUsize::new(0));
    heap.insert(HeapObject::with_payload(
        ClassId(6),
        Vec::new(),
        Payload::Companion(Box::new(Counted {
            deletes: deletes.clone(),
            veto: false,
        })),
    ));
    heap.collect(&NoRoots);
    heap.collect(&NoRoots);
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
    assert!(heap.is_empty());
}

#[test]
fn test_vetoing_companion_is_asked_every_cycle() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let deletes = Arc::new(AtomicUsize::new(0));
    let kept = heap.insert(HeapObject::with_payload(
        ClassId(6),
        Vec::new(),
        Payload::Companion(Box::new(Counted {
            deletes: deletes.clone(),
            veto: true,
        })),
    ));
    heap.collect(&NoRoots);
    heap.collect(&NoRoots);
    assert_eq!(deletes.load(Ordering::SeqCst), 2);
    assert!(heap.contains(kept));
    assert_eq!(heap.stats().objects_vetoed, 2);
    let companion = heap.get(kept).unwrap().companion().unwrap();
    assert!(companion.as_any().downcast_ref::<Counted>().is_some());
}

#[test]
fn test_overflow_after_collection_throws() {
    crate::init_logging();
    let mut heap = Heap::new(OBJECT_HEADER_WEIGHT * 2, OverflowPolicy::Throw);
    let a = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();
    let b = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();
    let roots = vec![a, b];
    let err = heap
        .allocate(HeapObject::instance(ClassId(1), &[]), &roots)
        .unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { requested: 8, .. }));
    assert_eq!(heap.stats().collections, 1);
    assert_eq!(heap.len(), 2);
}

#[test]
fn test_oversized_reservation_never_expands() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Expand);
    let size = HeapObject::array_weight(ValueKind::Int, i32::MAX as usize);
    assert!(size > memory_manager::MAX_OBJECT_WEIGHT);

    let err = heap.reserve(size, &NoRoots).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { capacity: 1_000, .. }));
    assert_eq!(heap.capacity(), 1_000);
    assert!(heap.is_empty());

    heap.reserve(2_000, &NoRoots).unwrap();
    assert!(heap.capacity() >= 2_000);
    assert_eq!(heap.used(), 0);
}

#[test]
fn test_array_weight_matches_built_array() {
    crate::init_logging();
    let array = HeapObject::array(ClassId(2), ValueKind::Long, 7);
    assert_eq!(HeapObject::array_weight(ValueKind::Long, 7), array.weight());
    assert_eq!(HeapObject::array_weight(ValueKind::Int, usize::MAX), usize::MAX);
}
