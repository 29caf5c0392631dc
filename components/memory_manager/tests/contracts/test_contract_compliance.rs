//! Contract compliance tests for memory_manager
//! Verifies the heap guarantees other components rely on

use core_types::{ClassId, OverflowPolicy, Reference, VmConfig};
use memory_manager::{Heap, HeapObject, NoRoots};

/// Handle 0 never names an object.
#[test]
fn test_contract_null_never_resolves() {
    let mut heap = Heap::new(10_000, OverflowPolicy::Expand);
    for _ in 0..100 {
        let r = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();
        assert!(!r.is_null());
    }
    assert!(heap.get(Reference::NULL).is_none());
    assert!(!heap.contains(Reference::NULL));
}

/// No mark bit survives a collection.
#[test]
fn test_contract_mark_bits_clear_after_collection() {
    let mut heap = Heap::new(10_000, OverflowPolicy::Throw);
    let roots: Vec<Reference> = (0..10)
        .map(|_| heap.insert(HeapObject::instance(ClassId(1), &[])))
        .collect();
    heap.collect(&roots);
    assert_eq!(heap.len(), 10);
    assert!(heap.objects().iter().all(|(_, o)| !o.is_reachable()));
}

/// The heap follows the engine configuration.
#[test]
fn test_contract_heap_from_config() {
    let config = VmConfig::default()
        .with_heap_capacity(512)
        .with_overflow(OverflowPolicy::Abort);
    let heap = Heap::from_config(&config);
    assert_eq!(heap.capacity(), 512);
    assert_eq!(heap.overflow(), OverflowPolicy::Abort);
}

/// Heaps move between host threads with their engine.
#[test]
fn test_contract_heap_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Heap>();
}
