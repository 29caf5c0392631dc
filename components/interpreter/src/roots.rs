//! Collection roots held by the engine.

use core_types::Reference;
use memory_manager::{RootSet, StaticStorage};
use scheduler::Scheduler;

use crate::frame::Frame;

/// Roots outside the heap: every thread's frames, thread objects and
/// pending monitors, all statics, and the frames of the running thread,
/// which are held outside the scheduler while it runs.
pub(crate) struct EngineRoots<'a> {
    pub(crate) scheduler: &'a Scheduler<Vec<Frame>>,
    pub(crate) statics: &'a StaticStorage,
    pub(crate) active: &'a [Frame],
}

impl RootSet for EngineRoots<'_> {
    fn trace_roots(&self, roots: &mut Vec<Reference>) {
        for thread in self.scheduler.threads() {
            roots.push(thread.object);
            if let Some(pending) = thread.pending {
                roots.push(pending.object);
            }
            for frame in &thread.stack {
                roots.extend(frame.references());
            }
        }
        for frame in self.active {
            roots.extend(frame.references());
        }
        self.statics.trace_roots(roots);
    }
}
