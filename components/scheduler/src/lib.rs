//! Cooperative thread scheduling for the handset VM.
//!
//! Java threads are green threads multiplexed onto the single engine thread:
//!
//! - [`Scheduler`] keeps the thread table and a stable round-robin rotation
//!   of ready threads, detaching and reattaching them as they block and wake.
//! - [`sync`] drives object monitors: contended entry, `wait`/`notify` with
//!   wait tokens, and the resume check run before a thread continues.
//! - [`Pacer`] throttles execution to a target cycle rate.
//! - [`HostHandle`] lets other host threads post requests to the engine.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use core_types::Reference;
//! use scheduler::{ManualClock, Scheduler, Timeout};
//!
//! let mut scheduler: Scheduler<()> = Scheduler::new(Arc::new(ManualClock::new(0)));
//! let a = scheduler.spawn(Reference::NULL, ());
//! let b = scheduler.spawn(Reference::NULL, ());
//! scheduler.detach(a, Timeout::Millis(10));
//! assert_eq!(scheduler.next(), Some(b));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod host;
pub mod pacing;
pub mod scheduler;
pub mod sync;
pub mod thread;

pub use clock::{Clock, ManualClock, SystemClock};
pub use host::{HostHandle, HostQueue, HostRequest};
pub use pacing::Pacer;
pub use scheduler::Scheduler;
pub use sync::{Acquire, Resume, SyncError};
pub use thread::{JavaThread, MonitorWait, PendingMonitor, ThreadState, Timeout};
