//! Static field storage.

use core_types::{ClassId, Reference, Value, ValueKind};
use rustc_hash::FxHashMap;

use crate::heap::RootSet;

/// Static fields of every initialized class, indexed by class and slot.
#[derive(Debug, Default, Clone)]
pub struct StaticStorage {
    classes: FxHashMap<ClassId, Vec<Value>>,
}

impl StaticStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates zeroed storage for `class` if it has none yet.
    pub fn ensure(&mut self, class: ClassId, kinds: &[ValueKind]) {
        self.classes
            .entry(class)
            .or_insert_with(|| kinds.iter().map(|k| Value::zero_of(*k)).collect());
    }

    /// Value of a static slot.
    pub fn get(&self, class: ClassId, slot: u16) -> Option<Value> {
        self.classes.get(&class)?.get(usize::from(slot)).copied()
    }

    /// Writes a static slot. Returns false if the slot does not exist.
    pub fn set(&mut self, class: ClassId, slot: u16, value: Value) -> bool {
        match self.classes.get_mut(&class).and_then(|s| s.get_mut(usize::from(slot))) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    /// All slots of one class.
    pub fn slots(&self, class: ClassId) -> Option<&[Value]> {
        self.classes.get(&class).map(Vec::as_slice)
    }

    /// Every class with storage, in id order.
    pub fn classes(&self) -> Vec<ClassId> {
        let mut ids: Vec<ClassId> = self.classes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Replaces the storage of a class, as snapshot restore does.
    pub fn restore(&mut self, class: ClassId, values: Vec<Value>) {
        self.classes.insert(class, values);
    }
}

impl RootSet for StaticStorage {
    fn trace_roots(&self, roots: &mut Vec<Reference>) {
        for values in self.classes.values() {
            roots.extend(values.iter().filter_map(Value::as_reference));
        }
    }
}
