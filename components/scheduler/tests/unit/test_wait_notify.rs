use std::sync::Arc;

use core_types::{ClassId, OverflowPolicy, Reference};
use memory_manager::{Heap, HeapObject};
use scheduler::sync::{self, Acquire, Resume};
use scheduler::{ManualClock, MonitorWait, Scheduler, ThreadState, Timeout};

fn setup() -> (Heap, Scheduler<()>, Reference, Arc<ManualClock>) {
    let mut heap = Heap::new(4096, OverflowPolicy::Throw);
    let object = heap.insert(HeapObject::instance(ClassId(0), &[]));
    let clock = Arc::new(ManualClock::new(0));
    (heap, Scheduler::new(clock.clone()), object, clock)
}

#[test]
fn test_notified_waiter_resumes_with_saved_count() {
    crate::init_logging();
    let (mut heap, mut s, o, _) = setup();
    let a = s.spawn(Reference::NULL, ());
    let b = s.spawn(Reference::NULL, ());

    sync::enter(&mut heap, &mut s, a, o).unwrap();
    sync::enter(&mut heap, &mut s, a, o).unwrap();
    sync::wait(&mut heap, &mut s, a, o, Timeout::Indefinite).unwrap();
    assert_eq!(s.next(), Some(b));

    assert_eq!(sync::enter(&mut heap, &mut s, b, o), Ok(Acquire::Acquired));
    sync::notify(&mut heap, &mut s, b, o).unwrap();
    assert_eq!(heap.get(o).unwrap().monitor.owner(), Some(b));
    sync::exit(&mut heap, &mut s, b, o).unwrap();

    assert_eq!(heap.get(o).unwrap().monitor.owner(), Some(a));
    assert_eq!(s.get(a).unwrap().state, ThreadState::Ready);
    assert_eq!(
        sync::resume(&mut heap, &mut s, a),
        Ok(Resume::Reacquired(MonitorWait::Wait))
    );
    assert_eq!(heap.get(o).unwrap().monitor.count(), 2);
    assert!(s.get(a).unwrap().pending.is_none());
}

#[test]
fn test_notify_all_releases_waiters_in_order() {
    crate::init_logging();
    let (mut heap, mut s, o, _) = setup();
    let waiters: Vec<_> = (0..3).map(|_| s.spawn(Reference::NULL, ())).collect();
    let notifier = s.spawn(Reference::NULL, ());
    for w in &waiters {
        sync::enter(&mut heap, &mut s, *w, o).unwrap();
        sync::wait(&mut heap, &mut s, *w, o, Timeout::Indefinite).unwrap();
    }
    sync::enter(&mut heap, &mut s, notifier, o).unwrap();
    assert_eq!(sync::notify_all(&mut heap, &mut s, notifier, o).unwrap(), waiters);
    sync::exit(&mut heap, &mut s, notifier, o).unwrap();

    for w in &waiters {
        assert_eq!(heap.get(o).unwrap().monitor.owner(), Some(*w));
        assert_eq!(
            sync::resume(&mut heap, &mut s, *w),
            Ok(Resume::Reacquired(MonitorWait::Wait))
        );
        sync::exit(&mut heap, &mut s, *w, o).unwrap();
    }
    assert!(heap.get(o).unwrap().monitor.is_idle());
}

#[test]
fn test_interrupt_does_not_wake_blocked_entrant() {
    crate::init_logging();
    let (mut heap, mut s, o, _) = setup();
    let a = s.spawn(Reference::NULL, ());
    let b = s.spawn(Reference::NULL, ());
    sync::enter(&mut heap, &mut s, a, o).unwrap();
    assert_eq!(sync::enter(&mut heap, &mut s, b, o), Ok(Acquire::Blocked));
    s.interrupt(b);
    assert!(s.get(b).unwrap().is_detached());
}

#[test]
fn test_interrupted_waiter_reacquires_when_free() {
    crate::init_logging();
    let (mut heap, mut s, o, _) = setup();
    let a = s.spawn(Reference::NULL, ());
    sync::enter(&mut heap, &mut s, a, o).unwrap();
    sync::wait(&mut heap, &mut s, a, o, Timeout::Indefinite).unwrap();
    s.interrupt(a);
    assert_eq!(s.next(), Some(a));
    assert_eq!(
        sync::resume(&mut heap, &mut s, a),
        Ok(Resume::Reacquired(MonitorWait::Wait))
    );
    assert!(s.take_interrupt(a));
    assert_eq!(heap.get(o).unwrap().monitor.owner(), Some(a));
}

#[test]
fn test_timed_wait_expires() {
    crate::init_logging();
    let (mut heap, mut s, o, clock) = setup();
    let a = s.spawn(Reference::NULL, ());
    sync::enter(&mut heap, &mut s, a, o).unwrap();
    sync::wait(&mut heap, &mut s, a, o, Timeout::Millis(100)).unwrap();
    assert_eq!(s.next(), None);
    clock.advance(100);
    assert_eq!(s.next(), Some(a));
    assert_eq!(
        sync::resume(&mut heap, &mut s, a),
        Ok(Resume::Reacquired(MonitorWait::Wait))
    );
    assert_eq!(heap.get(o).unwrap().monitor.waiters().count(), 0);
}
