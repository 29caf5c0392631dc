//! The monitor protocol between the heap and the scheduler.
//!
//! [`Monitor`](memory_manager::Monitor) only keeps books. These functions
//! turn its answers into scheduling: a thread that has to block is detached
//! with a [`PendingMonitor`], and a thread handed the monitor is reattached.
//! Before a thread with a pending monitor runs again, [`resume`] checks that
//! it owns the monitor with exactly the reentrancy it gave up.

use core_types::{FatalError, Reference, ThreadId};
use memory_manager::{Entry, Heap, Monitor, MonitorError, WaitToken};
use thiserror::Error;

use crate::scheduler::Scheduler;
use crate::thread::{MonitorWait, PendingMonitor, Timeout};

/// Failures of a monitor operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Java-level misuse; becomes `IllegalMonitorStateException`
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    /// Engine-level failure
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Outcome of an operation that may block the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The thread owns the monitor and keeps running
    Acquired,
    /// The thread was detached and must give up its slice
    Blocked,
}

/// What the scheduled thread should do after the resume check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Nothing was pending
    Running,
    /// The pending monitor is owned again with the saved count
    Reacquired(MonitorWait),
    /// Still waiting for the monitor; the thread was detached again
    Blocked,
}

fn monitor_of(heap: &mut Heap, object: Reference) -> Result<&mut Monitor, FatalError> {
    heap.get_mut(object)
        .map(|o| &mut o.monitor)
        .ok_or_else(|| FatalError::InternalConsistency(format!("monitor on dead object {:?}", object)))
}

fn hand_over<S>(scheduler: &mut Scheduler<S>, next: Option<WaitToken>) {
    if let Some(token) = next {
        log::trace!("monitor handed to {}", token.thread);
        scheduler.attach(token.thread);
    }
}

/// `monitorenter` for `thread`. Blocks (detaches) when contended.
pub fn enter<S>(
    heap: &mut Heap,
    scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
) -> Result<Acquire, SyncError> {
    match monitor_of(heap, object)?.enter(thread)? {
        Entry::Acquired => Ok(Acquire::Acquired),
        Entry::Queued => {
            park(scheduler, thread, object, WaitToken { thread, reentrancy: 1 }, MonitorWait::Enter)?;
            scheduler.detach(thread, Timeout::Indefinite);
            Ok(Acquire::Blocked)
        }
    }
}

/// `monitorexit` for `thread`. Reattaches the entrant that took over.
pub fn exit<S>(
    heap: &mut Heap,
    scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
) -> Result<(), SyncError> {
    let next = monitor_of(heap, object)?.exit(thread)?;
    hand_over(scheduler, next);
    Ok(())
}

/// `Object.wait`: releases the monitor entirely and detaches `thread`
/// until notified, interrupted or timed out.
pub fn wait<S>(
    heap: &mut Heap,
    scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
    timeout: Timeout,
) -> Result<(), SyncError> {
    let (token, next) = monitor_of(heap, object)?.wait(thread)?;
    park(scheduler, thread, object, token, MonitorWait::Wait)?;
    scheduler.detach(thread, timeout);
    hand_over(scheduler, next);
    Ok(())
}

/// `Object.notify`. The woken thread runs once the caller releases.
pub fn notify<S>(
    heap: &mut Heap,
    _scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
) -> Result<Option<ThreadId>, SyncError> {
    Ok(monitor_of(heap, object)?.notify(thread)?.map(|t| t.thread))
}

/// `Object.notifyAll`.
pub fn notify_all<S>(
    heap: &mut Heap,
    _scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
) -> Result<Vec<ThreadId>, SyncError> {
    Ok(monitor_of(heap, object)?
        .notify_all(thread)?
        .into_iter()
        .map(|t| t.thread)
        .collect())
}

fn park<S>(
    scheduler: &mut Scheduler<S>,
    thread: ThreadId,
    object: Reference,
    token: WaitToken,
    reason: MonitorWait,
) -> Result<(), FatalError> {
    let record = scheduler
        .get_mut(thread)
        .ok_or_else(|| FatalError::InternalConsistency(format!("unknown thread {}", thread)))?;
    record.pending = Some(PendingMonitor { object, token, reason });
    Ok(())
}

/// Resume check, run each time `thread` is scheduled.
///
/// A thread woken by a hand-off already owns the monitor. One woken some
/// other way (timeout, interrupt, host attach) tries to reacquire and is
/// detached again if the monitor is busy. Owning the monitor with a count
/// other than the saved one is an engine bug.
pub fn resume<S>(heap: &mut Heap, scheduler: &mut Scheduler<S>, thread: ThreadId) -> Result<Resume, FatalError> {
    let Some(pending) = scheduler.get(thread).and_then(|t| t.pending) else {
        return Ok(Resume::Running);
    };
    let monitor = monitor_of(heap, pending.object)?;
    if monitor.owner() == Some(thread) {
        if monitor.count() != pending.token.reentrancy {
            return Err(FatalError::InternalConsistency(format!(
                "{} resumed owning monitor {:?} with count {} but saved {}",
                thread,
                pending.object,
                monitor.count(),
                pending.token.reentrancy
            )));
        }
    } else if monitor.reacquire(pending.token) == Entry::Queued {
        scheduler.detach(thread, Timeout::Indefinite);
        return Ok(Resume::Blocked);
    }
    if let Some(record) = scheduler.get_mut(thread) {
        record.pending = None;
    }
    Ok(Resume::Reacquired(pending.reason))
}
