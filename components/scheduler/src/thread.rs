//! Java thread records.

use core_types::{Reference, ThreadId};
use memory_manager::WaitToken;
use serde::{Deserialize, Serialize};

/// How long a detach lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeout {
    /// Until something reattaches the thread
    Indefinite,
    /// Until the clock passes `now + millis`, or something reattaches it
    Millis(u64),
}

/// Scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadState {
    /// In the rotation
    Ready,
    /// Out of the rotation until the clock reaches the deadline
    DetachedUntil(u64),
    /// Out of the rotation until reattached
    Detached,
    /// Finished; never runs again
    Terminated,
}

/// Why a thread is parked on a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorWait {
    /// Blocked in `monitorenter` or a synchronized method entry
    Enter,
    /// Inside `Object.wait`
    Wait,
}

/// A monitor the thread must own again before it continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMonitor {
    /// The monitor's object
    pub object: Reference,
    /// Reentrancy to restore on resume
    pub token: WaitToken,
    /// Why the thread parked
    pub reason: MonitorWait,
}

/// A Java thread: scheduling state plus the interpreter's execution state
/// `S` (its frame stack).
#[derive(Debug)]
pub struct JavaThread<S> {
    /// Thread id
    pub id: ThreadId,
    /// Scheduling state
    pub state: ThreadState,
    /// Pending interrupt flag
    pub interrupted: bool,
    /// Parked in sleep, wait or join; a pending interrupt raises
    /// `InterruptedException` when the thread resumes
    pub interruptible: bool,
    /// Monitor to reacquire on resume
    pub pending: Option<PendingMonitor>,
    /// The `java/lang/Thread` object, or null for engine-made threads
    pub object: Reference,
    /// Threads joined on this one
    pub joiners: Vec<ThreadId>,
    /// Runs one method for the engine (class initialization, entry points)
    pub synthetic: bool,
    /// Execution state
    pub stack: S,
}

impl<S> JavaThread<S> {
    /// Creates a ready thread.
    pub fn new(id: ThreadId, object: Reference, stack: S) -> Self {
        Self {
            id,
            state: ThreadState::Ready,
            interrupted: false,
            interruptible: false,
            pending: None,
            object,
            joiners: Vec::new(),
            synthetic: false,
            stack,
        }
    }

    /// True unless terminated.
    pub fn is_alive(&self) -> bool {
        self.state != ThreadState::Terminated
    }

    /// True while out of the rotation.
    pub fn is_detached(&self) -> bool {
        matches!(self.state, ThreadState::Detached | ThreadState::DetachedUntil(_))
    }
}
