//! The reference table.
//!
//! Objects live in a map keyed by handle. Handles are handed out in
//! increasing order, skip `0` and are never reused while the object they
//! name is alive. Capacity is measured in accounting units (see
//! [`HeapObject::weight`]), not bytes.

use std::sync::Arc;

use core_types::{ClassId, FatalError, OverflowPolicy, Reference, VmConfig};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::gc::GcStats;
use crate::object::HeapObject;

/// Largest single object the heap will expand for, in accounting units.
pub const MAX_OBJECT_WEIGHT: usize = 1 << 28;

/// Allocation failure after a collection and the overflow policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Raise a catchable `OutOfMemoryError` on the allocating thread
    #[error("heap exhausted: {requested} units requested, {used}/{capacity} in use")]
    OutOfMemory {
        /// Units requested
        requested: usize,
        /// Units in use after collection
        used: usize,
        /// Capacity
        capacity: usize,
    },
    /// Stop the engine
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Source of collection roots outside the heap.
///
/// The engine implements this over thread frames, statics, thread objects
/// and pending monitor objects. Interned strings, class mirrors, pinned
/// temporaries and companion hidden references are added by the heap itself.
pub trait RootSet {
    /// Appends every root reference. Nulls are allowed and ignored.
    fn trace_roots(&self, roots: &mut Vec<Reference>);
}

/// No external roots.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRoots;

impl RootSet for NoRoots {
    fn trace_roots(&self, _roots: &mut Vec<Reference>) {}
}

impl RootSet for Vec<Reference> {
    fn trace_roots(&self, roots: &mut Vec<Reference>) {
        roots.extend_from_slice(self);
    }
}

impl<const N: usize> RootSet for [&dyn RootSet; N] {
    fn trace_roots(&self, roots: &mut Vec<Reference>) {
        for set in self {
            set.trace_roots(roots);
        }
    }
}

/// Reference-addressed object heap.
///
/// # Examples
///
/// ```
/// use core_types::{ClassId, OverflowPolicy, ValueKind};
/// use memory_manager::{Heap, HeapObject, NoRoots};
///
/// let mut heap = Heap::new(1024, OverflowPolicy::Throw);
/// let point = heap
///     .allocate(HeapObject::instance(ClassId(3), &[ValueKind::Int, ValueKind::Int]), &NoRoots)
///     .unwrap();
/// assert!(!point.is_null());
/// assert_eq!(heap.used(), 16);
///
/// heap.collect(&NoRoots);
/// assert!(heap.get(point).is_none());
/// ```
#[derive(Debug)]
pub struct Heap {
    pub(crate) objects: FxHashMap<u32, HeapObject>,
    next_handle: u32,
    pub(crate) used: usize,
    capacity: usize,
    overflow: OverflowPolicy,
    pub(crate) pinned: Vec<Reference>,
    pub(crate) interned: FxHashMap<Arc<str>, Reference>,
    pub(crate) mirrors: FxHashMap<ClassId, Reference>,
    pub(crate) stats: GcStats,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            objects: FxHashMap::default(),
            next_handle: 1,
            used: 0,
            capacity,
            overflow,
            pinned: Vec::new(),
            interned: FxHashMap::default(),
            mirrors: FxHashMap::default(),
            stats: GcStats::default(),
        }
    }

    /// Creates a heap sized and governed by an engine configuration.
    pub fn from_config(config: &VmConfig) -> Self {
        Self::new(config.heap_capacity, config.overflow)
    }

    /// Capacity in accounting units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units in use.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Overflow policy.
    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when no objects are live.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Cumulative collection statistics.
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Object behind a reference. Null and dead handles resolve to `None`.
    pub fn get(&self, reference: Reference) -> Option<&HeapObject> {
        self.objects.get(&reference.0)
    }

    /// Mutable object behind a reference.
    pub fn get_mut(&mut self, reference: Reference) -> Option<&mut HeapObject> {
        self.objects.get_mut(&reference.0)
    }

    /// True if the reference names a live object.
    pub fn contains(&self, reference: Reference) -> bool {
        self.objects.contains_key(&reference.0)
    }

    /// Live objects in handle order.
    pub fn objects(&self) -> Vec<(Reference, &HeapObject)> {
        let mut out: Vec<(Reference, &HeapObject)> =
            self.objects.iter().map(|(h, o)| (Reference(*h), o)).collect();
        out.sort_by_key(|(r, _)| *r);
        out
    }

    /// True if `size` more units fit without collecting.
    pub fn fits(&self, size: usize) -> bool {
        self.used.saturating_add(size) <= self.capacity
    }

    /// Allocates an object.
    ///
    /// When the object does not fit, the heap collects with `roots` first.
    /// If it still does not fit the overflow policy decides: grow the
    /// capacity, fail with [`AllocError::OutOfMemory`], or fail fatally.
    pub fn allocate(&mut self, object: HeapObject, roots: &dyn RootSet) -> Result<Reference, AllocError> {
        self.reserve(object.weight(), roots)?;
        Ok(self.insert(object))
    }

    /// Makes room for `size` units without inserting anything.
    ///
    /// Callers building large objects reserve first so an oversized request
    /// fails before any storage is materialized. A request above
    /// [`MAX_OBJECT_WEIGHT`] never grows the heap, even under
    /// [`OverflowPolicy::Expand`].
    pub fn reserve(&mut self, size: usize, roots: &dyn RootSet) -> Result<(), AllocError> {
        if self.fits(size) {
            return Ok(());
        }
        self.collect(roots);
        if self.fits(size) {
            return Ok(());
        }
        match self.overflow {
            OverflowPolicy::Expand if size <= MAX_OBJECT_WEIGHT => {
                let grown = self.capacity.saturating_mul(2).max(self.used + size);
                log::debug!("heap: expanding capacity {} -> {}", self.capacity, grown);
                self.capacity = grown;
                Ok(())
            }
            OverflowPolicy::Expand | OverflowPolicy::Throw => Err(AllocError::OutOfMemory {
                requested: size,
                used: self.used,
                capacity: self.capacity,
            }),
            OverflowPolicy::Abort => Err(FatalError::OutOfMemory {
                requested: size,
                used: self.used,
                capacity: self.capacity,
            }
            .into()),
        }
    }

    /// Inserts an object without checking capacity. Used for objects the
    /// engine must always have, such as the preallocated `OutOfMemoryError`.
    pub fn insert(&mut self, object: HeapObject) -> Reference {
        let handle = self.fresh_handle();
        self.used += object.weight();
        self.objects.insert(handle, object);
        Reference(handle)
    }

    /// Inserts an object under a specific handle, as snapshot restore does.
    /// Returns false if the handle is null or taken.
    pub fn insert_at(&mut self, reference: Reference, object: HeapObject) -> bool {
        if reference.is_null() || self.contains(reference) {
            return false;
        }
        self.used += object.weight();
        self.objects.insert(reference.0, object);
        if reference.0 >= self.next_handle {
            self.next_handle = reference.0.wrapping_add(1).max(1);
        }
        true
    }

    fn fresh_handle(&mut self) -> u32 {
        loop {
            let handle = self.next_handle;
            self.next_handle = self.next_handle.wrapping_add(1).max(1);
            if !self.objects.contains_key(&handle) {
                return handle;
            }
        }
    }

    /// Pins a reference as a temporary root until [`Heap::unpin`].
    pub fn pin(&mut self, reference: Reference) {
        if !reference.is_null() {
            self.pinned.push(reference);
        }
    }

    /// Removes one pin of `reference`.
    pub fn unpin(&mut self, reference: Reference) {
        if let Some(at) = self.pinned.iter().rposition(|r| *r == reference) {
            self.pinned.swap_remove(at);
        }
    }

    /// Interned string object for `text`, if any.
    pub fn interned(&self, text: &str) -> Option<Reference> {
        self.interned.get(text).copied()
    }

    /// Records `reference` as the interned string for `text`. Interned
    /// strings are roots.
    pub fn intern(&mut self, text: Arc<str>, reference: Reference) {
        self.interned.insert(text, reference);
    }

    /// Interned strings.
    pub fn interned_strings(&self) -> Vec<(Arc<str>, Reference)> {
        let mut out: Vec<_> = self.interned.iter().map(|(t, r)| (t.clone(), *r)).collect();
        out.sort_by_key(|(_, r)| *r);
        out
    }

    /// `java/lang/Class` object standing for `class`, if created.
    pub fn mirror(&self, class: ClassId) -> Option<Reference> {
        self.mirrors.get(&class).copied()
    }

    /// Records the mirror of `class`. Mirrors are roots.
    pub fn register_mirror(&mut self, class: ClassId, reference: Reference) {
        self.mirrors.insert(class, reference);
    }

    /// Identity hash code of an object.
    pub fn identity_hash(&self, reference: Reference) -> i32 {
        reference.0 as i32
    }
}
