//! Global signature ids
//!
//! Every distinct `name + descriptor` pair gets one [`SignatureId`] for the
//! lifetime of the engine. All classes share the numbering, so a virtual call
//! site carries one integer and dispatch is a table lookup on the receiver's
//! class.

use std::sync::Arc;

use core_types::SignatureId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Inner {
    ids: FxHashMap<(Arc<str>, Arc<str>), SignatureId>,
    names: Vec<(Arc<str>, Arc<str>)>,
}

/// Engine-wide signature numbering.
///
/// # Examples
///
/// ```
/// use linker::SignatureTable;
///
/// let table = SignatureTable::new();
/// let run = table.intern("run", "()V");
/// assert_eq!(table.intern("run", "()V"), run);
/// assert_ne!(table.intern("run", "(I)V"), run);
/// ```
#[derive(Debug, Default)]
pub struct SignatureTable {
    inner: RwLock<Inner>,
}

impl SignatureTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name + descriptor`, assigning the next one if new.
    pub fn intern(&self, name: &str, descriptor: &str) -> SignatureId {
        if let Some(id) = self.get(name, descriptor) {
            return id;
        }
        let mut inner = self.inner.write();
        let key: (Arc<str>, Arc<str>) = (name.into(), descriptor.into());
        if let Some(id) = inner.ids.get(&key) {
            return *id;
        }
        let id = SignatureId(inner.names.len() as u32);
        inner.names.push(key.clone());
        inner.ids.insert(key, id);
        id
    }

    /// Id for `name + descriptor` if already assigned.
    pub fn get(&self, name: &str, descriptor: &str) -> Option<SignatureId> {
        self.inner
            .read()
            .ids
            .get(&(Arc::from(name), Arc::from(descriptor)))
            .copied()
    }

    /// Name and descriptor of an id.
    pub fn describe(&self, id: SignatureId) -> Option<(Arc<str>, Arc<str>)> {
        self.inner.read().names.get(id.0 as usize).cloned()
    }

    /// Number of assigned ids.
    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    /// True if nothing has been assigned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
