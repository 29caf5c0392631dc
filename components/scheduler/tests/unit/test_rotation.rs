use std::sync::Arc;

use core_types::Reference;
use scheduler::{HostRequest, ManualClock, Scheduler, ThreadState, Timeout};

fn scheduler() -> (Scheduler<u32>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    (Scheduler::new(clock.clone()), clock)
}

#[test]
fn test_every_ready_thread_runs_once_per_round() {
    crate::init_logging();
    let (mut s, _) = scheduler();
    let ids: Vec<_> = (0..5).map(|n| s.spawn(Reference::NULL, n)).collect();
    for _ in 0..3 {
        let mut round: Vec<_> = (0..5).filter_map(|_| s.next()).collect();
        round.sort();
        assert_eq!(round, ids);
    }
}

#[test]
fn test_reattached_thread_joins_back_of_rotation() {
    crate::init_logging();
    let (mut s, _) = scheduler();
    let a = s.spawn(Reference::NULL, 0);
    let b = s.spawn(Reference::NULL, 1);
    let c = s.spawn(Reference::NULL, 2);
    s.detach(b, Timeout::Indefinite);
    assert_eq!(s.ready_queue(), vec![a, c]);
    s.attach(b);
    assert_eq!(s.ready_queue(), vec![a, c, b]);
}

#[test]
fn test_sleepers_wake_in_deadline_order() {
    crate::init_logging();
    let (mut s, clock) = scheduler();
    let a = s.spawn(Reference::NULL, 0);
    let b = s.spawn(Reference::NULL, 1);
    s.detach(a, Timeout::Millis(50));
    s.detach(b, Timeout::Millis(20));
    assert!(s.is_idle());
    assert_eq!(s.next_deadline(), Some(1_020));
    clock.advance(20);
    assert_eq!(s.next(), Some(b));
    clock.advance(30);
    assert_eq!(s.wake_expired(), 1);
    assert_eq!(s.get(a).unwrap().state, ThreadState::Ready);
}

#[test]
fn test_terminated_thread_cannot_be_attached() {
    crate::init_logging();
    let (mut s, _) = scheduler();
    let a = s.spawn(Reference::NULL, 0);
    s.terminate(a);
    assert!(!s.attach(a));
    assert!(!s.detach(a, Timeout::Indefinite));
    assert!(!s.interrupt(a));
    assert_eq!(s.next(), None);
    assert_eq!(s.live_count(), 0);
}

#[test]
fn test_host_interrupt_from_other_thread() {
    crate::init_logging();
    let (mut s, _) = scheduler();
    let a = s.spawn(Reference::NULL, 0);
    s.detach(a, Timeout::Millis(60_000));
    let handle = s.host_handle();
    std::thread::spawn(move || handle.send(HostRequest::Interrupt(a)))
        .join()
        .unwrap();
    assert!(!s.drain_host_requests());
    assert_eq!(s.next(), Some(a));
    assert!(s.take_interrupt(a));
}

#[test]
fn test_stack_state_is_carried() {
    crate::init_logging();
    let (mut s, _) = scheduler();
    let a = s.spawn(Reference::NULL, 7);
    s.get_mut(a).unwrap().stack += 1;
    assert_eq!(s.get(a).unwrap().stack, 8);
}
