//! Tests for monitor headers on heap objects

use core_types::{ClassId, OverflowPolicy, ThreadId};
use memory_manager::{Entry, Heap, HeapObject, MonitorError, NoRoots, WaitToken};

#[test]
fn test_monitor_lives_in_object_header() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let a = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();
    let b = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();

    heap.get_mut(a).unwrap().monitor.enter(ThreadId(1)).unwrap();
    assert_eq!(heap.get(a).unwrap().monitor.owner(), Some(ThreadId(1)));
    assert_eq!(heap.get(b).unwrap().monitor.owner(), None);
}

#[test]
fn test_n_enters_need_n_exits() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let lock = heap.insert(HeapObject::instance(ClassId(1), &[]));
    let monitor = &mut heap.get_mut(lock).unwrap().monitor;
    let t = ThreadId(5);
    for _ in 0..4 {
        monitor.enter(t).unwrap();
    }
    for remaining in (0..4).rev() {
        monitor.exit(t).unwrap();
        assert_eq!(monitor.count(), remaining);
    }
    assert_eq!(monitor.owner(), None);
    assert_eq!(monitor.exit(t), Err(MonitorError::NotOwner { thread: t }));
}

#[test]
fn test_wait_notify_round_trip_restores_reentrancy() {
    crate::init_logging();
    let mut heap = Heap::new(1_000, OverflowPolicy::Throw);
    let lock = heap.insert(HeapObject::instance(ClassId(1), &[]));
    let monitor = &mut heap.get_mut(lock).unwrap().monitor;
    let (waiter, notifier) = (ThreadId(1), ThreadId(2));

    monitor.enter(waiter).unwrap();
    monitor.enter(waiter).unwrap();
    monitor.enter(waiter).unwrap();
    let (token, _) = monitor.wait(waiter).unwrap();
    assert_eq!(token, WaitToken { thread: waiter, reentrancy: 3 });

    assert_eq!(monitor.enter(notifier).unwrap(), Entry::Acquired);
    monitor.notify(notifier).unwrap();
    let handed = monitor.exit(notifier).unwrap();
    assert_eq!(handed, Some(token));
    assert_eq!(monitor.owner(), Some(waiter));
    assert_eq!(monitor.count(), 3);
}
