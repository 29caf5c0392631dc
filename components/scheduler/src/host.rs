//! Requests from host threads.
//!
//! The engine runs on one host thread. Other host threads (I/O completions,
//! UI callbacks) reach it only through this channel, which the run loop
//! drains between slices.

use crossbeam::channel::{unbounded, Receiver, Sender};

use core_types::ThreadId;

/// Work a host thread asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    /// Reattach a detached thread
    Attach(ThreadId),
    /// Interrupt a thread
    Interrupt(ThreadId),
    /// Stop the run loop after the current slice
    Stop,
}

/// Cloneable, thread-safe sender for [`HostRequest`]s.
#[derive(Debug, Clone)]
pub struct HostHandle {
    sender: Sender<HostRequest>,
}

impl HostHandle {
    /// Queues a request. Returns false if the engine is gone.
    pub fn send(&self, request: HostRequest) -> bool {
        self.sender.send(request).is_ok()
    }
}

/// Receiving end, owned by the scheduler.
#[derive(Debug)]
pub struct HostQueue {
    sender: Sender<HostRequest>,
    receiver: Receiver<HostRequest>,
}

impl Default for HostQueue {
    fn default() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}

impl HostQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle host threads can send through.
    pub fn handle(&self) -> HostHandle {
        HostHandle {
            sender: self.sender.clone(),
        }
    }

    /// Takes every queued request without blocking.
    pub fn drain(&self) -> Vec<HostRequest> {
        self.receiver.try_iter().collect()
    }
}
