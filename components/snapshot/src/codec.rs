//! Companion codecs.
//!
//! Native companions are host types the engine knows nothing about. A host
//! that wants them in images registers a codec under the class name of the
//! objects that carry them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use memory_manager::NativeCompanion;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SnapshotError;

/// Converts one companion type to and from bytes.
pub trait CompanionCodec: Send + Sync {
    /// Encodes a companion. `class` names the carrying object's class.
    fn encode(&self, class: &str, companion: &dyn NativeCompanion) -> Result<Vec<u8>, SnapshotError>;

    /// Rebuilds a companion from [`encode`](Self::encode) output.
    fn decode(&self, class: &str, bytes: &[u8]) -> Result<Box<dyn NativeCompanion>, SnapshotError>;
}

/// Codec for companions that are serde types, stored with bincode.
pub struct SerdeCodec<T>(PhantomData<fn() -> T>);

impl<T> SerdeCodec<T> {
    /// Creates the codec.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompanionCodec for SerdeCodec<T>
where
    T: NativeCompanion + Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, class: &str, companion: &dyn NativeCompanion) -> Result<Vec<u8>, SnapshotError> {
        let value = companion
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| SnapshotError::CompanionType(class.to_string()))?;
        Ok(bincode::serialize(value)?)
    }

    fn decode(&self, _class: &str, bytes: &[u8]) -> Result<Box<dyn NativeCompanion>, SnapshotError> {
        let value: T = bincode::deserialize(bytes)?;
        Ok(Box::new(value))
    }
}

/// Codecs by class name.
#[derive(Default, Clone)]
pub struct CompanionRegistry {
    codecs: FxHashMap<String, Arc<dyn CompanionCodec>>,
}

impl fmt::Debug for CompanionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&String> = self.codecs.keys().collect();
        classes.sort();
        f.debug_struct("CompanionRegistry").field("classes", &classes).finish()
    }
}

impl CompanionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` for companions of objects of `class`.
    pub fn register(&mut self, class: &str, codec: impl CompanionCodec + 'static) -> &mut Self {
        self.codecs.insert(class.to_string(), Arc::new(codec));
        self
    }

    /// Registers a [`SerdeCodec`] for `T`.
    pub fn register_serde<T>(&mut self, class: &str) -> &mut Self
    where
        T: NativeCompanion + Serialize + DeserializeOwned + 'static,
    {
        self.register(class, SerdeCodec::<T>::new())
    }

    /// Codec for `class`.
    pub fn get(&self, class: &str) -> Result<&dyn CompanionCodec, SnapshotError> {
        self.codecs
            .get(class)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| SnapshotError::NoCodec(class.to_string()))
    }
}
