//! Round-robin cooperative scheduling.
//!
//! Exactly one thread runs at a time. [`Scheduler::next`] hands out ready
//! threads in a stable rotation: a thread that stays ready goes to the back
//! of the queue, a thread that detaches leaves it, and a reattached thread
//! rejoins at the back. No ready thread is skipped.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use core_types::{Reference, ThreadId};

use crate::clock::Clock;
use crate::host::{HostHandle, HostQueue, HostRequest};
use crate::thread::{JavaThread, MonitorWait, ThreadState, Timeout};

/// Thread table and rotation.
#[derive(Debug)]
pub struct Scheduler<S> {
    threads: BTreeMap<ThreadId, JavaThread<S>>,
    ready: VecDeque<ThreadId>,
    next_id: u32,
    current: Option<ThreadId>,
    clock: Arc<dyn Clock>,
    host: HostQueue,
}

impl<S> Scheduler<S> {
    /// Creates an empty scheduler driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            threads: BTreeMap::new(),
            ready: VecDeque::new(),
            next_id: 1,
            current: None,
            clock,
            host: HostQueue::new(),
        }
    }

    /// The time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current time from the clock.
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Handle host threads use to send requests.
    pub fn host_handle(&self) -> HostHandle {
        self.host.handle()
    }

    /// Creates a ready thread at the back of the rotation.
    pub fn spawn(&mut self, object: Reference, stack: S) -> ThreadId {
        let id = ThreadId(self.next_id);
        self.next_id += 1;
        self.insert(JavaThread::new(id, object, stack));
        id
    }

    /// Inserts a prepared thread record, as snapshot restore does. Ready
    /// threads join the rotation in id order of insertion.
    pub fn insert(&mut self, thread: JavaThread<S>) {
        let id = thread.id;
        self.next_id = self.next_id.max(id.0 + 1);
        if thread.state == ThreadState::Ready {
            self.ready.push_back(id);
        }
        log::debug!("thread {} created", id);
        self.threads.insert(id, thread);
    }

    /// Thread record.
    pub fn get(&self, id: ThreadId) -> Option<&JavaThread<S>> {
        self.threads.get(&id)
    }

    /// Mutable thread record.
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut JavaThread<S>> {
        self.threads.get_mut(&id)
    }

    /// All thread records in id order.
    pub fn threads(&self) -> impl Iterator<Item = &JavaThread<S>> {
        self.threads.values()
    }

    /// Ready threads in rotation order.
    pub fn ready_queue(&self) -> Vec<ThreadId> {
        self.ready.iter().copied().collect()
    }

    /// Thread currently running, if any.
    pub fn current(&self) -> Option<ThreadId> {
        self.current
    }

    /// Number of threads not yet terminated.
    pub fn live_count(&self) -> usize {
        self.threads.values().filter(|t| t.is_alive()).count()
    }

    /// Takes the next ready thread and moves it to the back of the rotation.
    /// Expired timers are processed first.
    pub fn next(&mut self) -> Option<ThreadId> {
        self.wake_expired();
        let id = self.ready.pop_front()?;
        self.ready.push_back(id);
        self.current = Some(id);
        log::trace!("scheduling {}", id);
        Some(id)
    }

    /// Clears the current thread at the end of a slice.
    pub fn end_slice(&mut self) {
        self.current = None;
    }

    /// Takes a thread out of the rotation.
    pub fn detach(&mut self, id: ThreadId, timeout: Timeout) -> bool {
        let now = self.now();
        let Some(thread) = self.threads.get_mut(&id) else {
            return false;
        };
        if !thread.is_alive() {
            return false;
        }
        thread.state = match timeout {
            Timeout::Indefinite => ThreadState::Detached,
            Timeout::Millis(millis) => ThreadState::DetachedUntil(now.saturating_add(millis)),
        };
        self.ready.retain(|t| *t != id);
        log::trace!("{} detached ({:?})", id, timeout);
        true
    }

    /// Returns a detached thread to the back of the rotation. Ready and
    /// terminated threads are left alone.
    pub fn attach(&mut self, id: ThreadId) -> bool {
        let Some(thread) = self.threads.get_mut(&id) else {
            return false;
        };
        if !thread.is_detached() {
            return false;
        }
        thread.state = ThreadState::Ready;
        self.ready.push_back(id);
        log::trace!("{} attached", id);
        true
    }

    /// Attaches every thread whose timed detach has expired, in id order.
    pub fn wake_expired(&mut self) -> usize {
        let now = self.now();
        let due: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|t| matches!(t.state, ThreadState::DetachedUntil(deadline) if deadline <= now))
            .map(|t| t.id)
            .collect();
        for id in &due {
            self.attach(*id);
        }
        due.len()
    }

    /// Earliest timed wake-up, if any thread is in a timed detach.
    pub fn next_deadline(&self) -> Option<u64> {
        self.threads
            .values()
            .filter_map(|t| match t.state {
                ThreadState::DetachedUntil(deadline) => Some(deadline),
                _ => None,
            })
            .min()
    }

    /// True when no thread is ready.
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }

    /// Sets the interrupt flag. A thread sleeping, waiting or joining is
    /// reattached at once; a thread blocked entering a monitor stays
    /// blocked. Returns false for unknown or terminated threads.
    pub fn interrupt(&mut self, id: ThreadId) -> bool {
        let Some(thread) = self.threads.get_mut(&id) else {
            return false;
        };
        if !thread.is_alive() {
            return false;
        }
        thread.interrupted = true;
        let entering = matches!(thread.pending, Some(p) if p.reason == MonitorWait::Enter);
        if thread.is_detached() && !entering {
            self.forget_join(id);
            self.attach(id);
        }
        true
    }

    /// Drops `waiter` from every joiner list, so a thread that stopped
    /// joining is not woken by the target's later exit.
    fn forget_join(&mut self, waiter: ThreadId) {
        for thread in self.threads.values_mut() {
            thread.joiners.retain(|j| *j != waiter);
        }
    }

    /// Reads and clears the interrupt flag.
    pub fn take_interrupt(&mut self, id: ThreadId) -> bool {
        self.threads
            .get_mut(&id)
            .map_or(false, |t| std::mem::take(&mut t.interrupted))
    }

    /// Parks `waiter` until `target` terminates. Returns false, without
    /// detaching, if the target is already dead or unknown.
    pub fn join(&mut self, waiter: ThreadId, target: ThreadId) -> bool {
        match self.threads.get_mut(&target) {
            Some(thread) if thread.is_alive() && target != waiter => {
                thread.joiners.push(waiter);
            }
            _ => return false,
        }
        self.detach(waiter, Timeout::Indefinite)
    }

    /// Marks a thread terminated, leaves the rotation and reattaches its
    /// joiners.
    pub fn terminate(&mut self, id: ThreadId) -> Vec<ThreadId> {
        let Some(thread) = self.threads.get_mut(&id) else {
            return Vec::new();
        };
        thread.state = ThreadState::Terminated;
        thread.pending = None;
        let joiners = std::mem::take(&mut thread.joiners);
        self.ready.retain(|t| *t != id);
        if self.current == Some(id) {
            self.current = None;
        }
        self.forget_join(id);
        for joiner in &joiners {
            self.attach(*joiner);
        }
        log::debug!("thread {} terminated", id);
        joiners
    }

    /// Removes one thread record outright, wherever it is in the rotation.
    pub fn remove(&mut self, id: ThreadId) -> Option<JavaThread<S>> {
        self.ready.retain(|t| *t != id);
        if self.current == Some(id) {
            self.current = None;
        }
        self.threads.remove(&id)
    }

    /// Drops terminated records.
    pub fn reap(&mut self) -> Vec<JavaThread<S>> {
        let dead: Vec<ThreadId> = self
            .threads
            .values()
            .filter(|t| !t.is_alive())
            .map(|t| t.id)
            .collect();
        dead.iter().filter_map(|id| self.threads.remove(id)).collect()
    }

    /// Applies queued host requests. Returns true if a stop was requested.
    pub fn drain_host_requests(&mut self) -> bool {
        let mut stop = false;
        for request in self.host.drain() {
            log::trace!("host request {:?}", request);
            match request {
                HostRequest::Attach(id) => {
                    self.attach(id);
                }
                HostRequest::Interrupt(id) => {
                    self.interrupt(id);
                }
                HostRequest::Stop => stop = true,
            }
        }
        stop
    }
}
