//! Mark-sweep collection.
//!
//! A collection marks everything reachable from the roots, gives companions
//! of unreachable objects a chance to veto deletion, marks from the vetoed
//! objects so nothing they reference is freed, then sweeps and clears every
//! mark bit.

use core_types::Reference;
use serde::{Deserialize, Serialize};

use crate::heap::{Heap, RootSet};

/// Collection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    /// Collections run
    pub collections: u64,
    /// Objects freed
    pub objects_freed: u64,
    /// Objects kept alive by a companion veto
    pub objects_vetoed: u64,
    /// Accounting units reclaimed
    pub bytes_reclaimed: u64,
}

impl GcStats {
    fn absorb(&mut self, cycle: GcStats) {
        self.collections += cycle.collections;
        self.objects_freed += cycle.objects_freed;
        self.objects_vetoed += cycle.objects_vetoed;
        self.bytes_reclaimed += cycle.bytes_reclaimed;
    }
}

impl Heap {
    /// Runs one full collection and returns its statistics.
    pub fn collect(&mut self, roots: &dyn RootSet) -> GcStats {
        let mut queue = Vec::new();
        roots.trace_roots(&mut queue);
        queue.extend(self.pinned.iter().copied());
        queue.extend(self.interned.values().copied());
        queue.extend(self.mirrors.values().copied());
        for object in self.objects.values() {
            if let Some(companion) = object.companion() {
                queue.extend(companion.hidden_references());
            }
        }
        self.mark(queue);

        let mut unreachable: Vec<u32> = self
            .objects
            .iter()
            .filter(|(_, o)| !o.is_reachable() && o.companion().is_some())
            .map(|(h, _)| *h)
            .collect();
        unreachable.sort_unstable();
        let mut vetoed = Vec::new();
        for handle in unreachable {
            let keep = self
                .objects
                .get_mut(&handle)
                .and_then(|o| o.companion_mut())
                .map_or(false, |c| !c.on_delete());
            if keep {
                vetoed.push(Reference(handle));
            }
        }
        let mut cycle = GcStats {
            collections: 1,
            objects_vetoed: vetoed.len() as u64,
            ..GcStats::default()
        };
        self.mark(vetoed);

        let mut reclaimed = 0;
        self.objects.retain(|_, object| {
            if object.is_reachable() {
                object.set_reachable(false);
                true
            } else {
                reclaimed += object.weight();
                cycle.objects_freed += 1;
                false
            }
        });
        self.used -= reclaimed;
        cycle.bytes_reclaimed = reclaimed as u64;
        self.stats.absorb(cycle);
        log::debug!(
            "gc: freed {} objects ({} units), {} vetoed, {} live, {}/{} in use",
            cycle.objects_freed,
            reclaimed,
            cycle.objects_vetoed,
            self.objects.len(),
            self.used,
            self.capacity()
        );
        cycle
    }

    fn mark(&mut self, mut queue: Vec<Reference>) {
        while let Some(reference) = queue.pop() {
            let Some(object) = self.objects.get_mut(&reference.0) else {
                continue;
            };
            if object.is_reachable() {
                continue;
            }
            object.set_reachable(true);
            queue.extend(object.references());
        }
    }
}
