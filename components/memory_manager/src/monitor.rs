//! Object monitors.
//!
//! Every heap object carries a [`Monitor`] in its header. The monitor only
//! records ownership and queues; it never blocks. Callers (the interpreter
//! and scheduler) detach and reattach threads based on what the monitor
//! reports.
//!
//! Ownership is handed off directly: when the owner exits for the last time
//! or starts waiting, the first queued entrant becomes the owner with the
//! reentrancy count it asked for, and is returned so the caller can
//! reattach it.

use std::collections::VecDeque;

use core_types::ThreadId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A thread's claim on a monitor: who, and with what reentrancy count.
///
/// Created by `wait` to remember the count to restore, and by a blocked
/// `monitorenter` (count 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitToken {
    /// Thread that owns the claim
    pub thread: ThreadId,
    /// Reentrancy count to hold once the monitor is (re)acquired
    pub reentrancy: u32,
}

/// Monitor misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The thread does not own the monitor; raises
    /// `IllegalMonitorStateException`
    #[error("{thread} does not own the monitor")]
    NotOwner {
        /// Offending thread
        thread: ThreadId,
    },
    /// Reentrancy count would overflow
    #[error("monitor reentrancy overflow on {thread}")]
    Overflow {
        /// Offending thread
        thread: ThreadId,
    },
}

/// Result of trying to enter a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// The thread now owns the monitor
    Acquired,
    /// Another thread owns it; the caller was queued and must detach until
    /// the monitor is handed over
    Queued,
}

/// Per-object monitor state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    owner: Option<ThreadId>,
    count: u32,
    waiters: VecDeque<WaitToken>,
    entrants: VecDeque<WaitToken>,
}

impl Monitor {
    /// Creates an unowned monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current owner.
    pub fn owner(&self) -> Option<ThreadId> {
        self.owner
    }

    /// Reentrancy count of the owner (0 when unowned).
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Threads waiting for a notification, in wait order.
    pub fn waiters(&self) -> impl Iterator<Item = &WaitToken> {
        self.waiters.iter()
    }

    /// Threads queued for ownership, in arrival order.
    pub fn entrants(&self) -> impl Iterator<Item = &WaitToken> {
        self.entrants.iter()
    }

    /// True if nobody owns, waits on or queues for the monitor.
    pub fn is_idle(&self) -> bool {
        self.owner.is_none() && self.waiters.is_empty() && self.entrants.is_empty()
    }

    /// `monitorenter`: acquires, re-enters, or queues `thread`.
    pub fn enter(&mut self, thread: ThreadId) -> Result<Entry, MonitorError> {
        match self.owner {
            None => {
                self.owner = Some(thread);
                self.count = 1;
                Ok(Entry::Acquired)
            }
            Some(owner) if owner == thread => {
                self.count = self
                    .count
                    .checked_add(1)
                    .ok_or(MonitorError::Overflow { thread })?;
                Ok(Entry::Acquired)
            }
            Some(_) => {
                self.queue(WaitToken {
                    thread,
                    reentrancy: 1,
                });
                Ok(Entry::Queued)
            }
        }
    }

    /// `monitorexit`: drops one level of ownership. When the count reaches
    /// zero the monitor passes to the next entrant, which is returned.
    pub fn exit(&mut self, thread: ThreadId) -> Result<Option<WaitToken>, MonitorError> {
        self.check_owner(thread)?;
        self.count -= 1;
        if self.count > 0 {
            return Ok(None);
        }
        self.owner = None;
        Ok(self.hand_off())
    }

    /// `wait`: records a token with the owner's reentrancy count, appends it
    /// to the waiters and releases the monitor fully.
    ///
    /// Returns the token to keep for the resume check and the entrant that
    /// took over the monitor, if any.
    pub fn wait(&mut self, thread: ThreadId) -> Result<(WaitToken, Option<WaitToken>), MonitorError> {
        self.check_owner(thread)?;
        let token = WaitToken {
            thread,
            reentrancy: self.count,
        };
        self.waiters.push_back(token);
        self.owner = None;
        self.count = 0;
        Ok((token, self.hand_off()))
    }

    /// `notify`: moves the longest waiter to the entrant queue. It becomes
    /// owner once the notifier releases the monitor.
    pub fn notify(&mut self, thread: ThreadId) -> Result<Option<WaitToken>, MonitorError> {
        self.check_owner(thread)?;
        let woken = self.waiters.pop_front();
        if let Some(token) = woken {
            self.queue(token);
        }
        Ok(woken)
    }

    /// `notifyAll`: moves every waiter to the entrant queue.
    pub fn notify_all(&mut self, thread: ThreadId) -> Result<Vec<WaitToken>, MonitorError> {
        self.check_owner(thread)?;
        let woken: Vec<WaitToken> = self.waiters.drain(..).collect();
        for token in &woken {
            self.queue(*token);
        }
        Ok(woken)
    }

    /// Reacquires for a waiter that woke without a notification (timeout or
    /// interrupt). The waiter leaves the wait list; if the monitor is free it
    /// takes ownership with its saved count, otherwise it queues.
    pub fn reacquire(&mut self, token: WaitToken) -> Entry {
        self.waiters.retain(|w| w.thread != token.thread);
        if self.owner == Some(token.thread) {
            return Entry::Acquired;
        }
        if self.owner.is_none() && !self.entrants.iter().any(|e| e.thread != token.thread) {
            self.entrants.retain(|e| e.thread != token.thread);
            self.owner = Some(token.thread);
            self.count = token.reentrancy;
            return Entry::Acquired;
        }
        self.queue(token);
        Entry::Queued
    }

    /// Restores the monitor from saved parts. Used by snapshot restore.
    pub fn from_parts(
        owner: Option<ThreadId>,
        count: u32,
        waiters: Vec<WaitToken>,
        entrants: Vec<WaitToken>,
    ) -> Self {
        Self {
            owner,
            count,
            waiters: waiters.into(),
            entrants: entrants.into(),
        }
    }

    fn check_owner(&self, thread: ThreadId) -> Result<(), MonitorError> {
        if self.owner == Some(thread) && self.count > 0 {
            Ok(())
        } else {
            Err(MonitorError::NotOwner { thread })
        }
    }

    fn queue(&mut self, token: WaitToken) {
        if !self.entrants.iter().any(|e| e.thread == token.thread) {
            self.entrants.push_back(token);
        }
    }

    fn hand_off(&mut self) -> Option<WaitToken> {
        let next = self.entrants.pop_front()?;
        self.owner = Some(next.thread);
        self.count = next.reentrancy;
        Some(next)
    }
}
