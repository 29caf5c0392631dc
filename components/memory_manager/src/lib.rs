//! Memory Manager - reference-addressed heap and mark-sweep collection
//!
//! This component provides:
//! - [`Heap`]: objects addressed by opaque non-zero handles, with allocation
//!   accounting against a capacity and a VM-wide overflow policy
//! - [`HeapObject`]: class id, monitor header, instance fields and an
//!   optional array, string, mirror or native companion payload
//! - [`Monitor`] and [`WaitToken`]: per-object ownership, waiter and
//!   entrant queues
//! - A mark-sweep collector with companion delete vetoes ([`GcStats`])
//! - [`StaticStorage`]: static fields per class
//!
//! # Examples
//!
//! ```
//! use core_types::{ClassId, OverflowPolicy, ThreadId, ValueKind};
//! use memory_manager::{Entry, Heap, HeapObject, NoRoots};
//!
//! let mut heap = Heap::new(4096, OverflowPolicy::Throw);
//! let lock = heap.allocate(HeapObject::instance(ClassId(1), &[]), &NoRoots).unwrap();
//!
//! let monitor = &mut heap.get_mut(lock).unwrap().monitor;
//! assert_eq!(monitor.enter(ThreadId(1)).unwrap(), Entry::Acquired);
//! assert_eq!(monitor.enter(ThreadId(2)).unwrap(), Entry::Queued);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod gc;
mod heap;
mod monitor;
mod object;
mod statics;

pub use gc::GcStats;
pub use heap::{AllocError, Heap, NoRoots, RootSet, MAX_OBJECT_WEIGHT};
pub use monitor::{Entry, Monitor, MonitorError, WaitToken};
pub use object::{HeapObject, NativeCompanion, Payload};
pub use statics::StaticStorage;
