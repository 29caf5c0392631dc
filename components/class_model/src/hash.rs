//! Structural hashing
//!
//! A class hash covers the class's shape: its name, superclass, interfaces,
//! flags, and the name, descriptor and flags of every field and method in
//! declaration order. The constant pool and method bodies are excluded, so
//! two compilations with the same shape hash equal even when their constants
//! differ.

use sha2::{Digest, Sha256};

use crate::class::ClassInfo;
use crate::member::Method;

fn put(hasher: &mut Sha256, text: &str) {
    hasher.update((text.len() as u32).to_be_bytes());
    hasher.update(text.as_bytes());
}

fn method_digest(hasher: &mut Sha256, method: &Method) {
    put(hasher, &method.name);
    put(hasher, &method.descriptor);
    hasher.update(method.flags.bits().to_be_bytes());
}

/// Structural hash of one method, hex encoded.
pub fn method_hash(method: &Method) -> String {
    let mut hasher = Sha256::new();
    method_digest(&mut hasher, method);
    hex::encode(hasher.finalize())
}

impl Method {
    /// Structural hash of this method, hex encoded.
    pub fn structural_hash(&self) -> String {
        method_hash(self)
    }
}

impl ClassInfo {
    /// Structural hash of this class, hex encoded. Computed once.
    pub fn structural_hash(&self) -> &str {
        self.hash.get_or_init(|| {
            let mut hasher = Sha256::new();
            put(&mut hasher, &self.name);
            put(&mut hasher, self.super_name.as_deref().unwrap_or(""));
            hasher.update((self.interface_names.len() as u32).to_be_bytes());
            for interface in &self.interface_names {
                put(&mut hasher, interface);
            }
            hasher.update(self.flags.bits().to_be_bytes());
            hasher.update((self.fields.len() as u32).to_be_bytes());
            for field in &self.fields {
                put(&mut hasher, &field.name);
                put(&mut hasher, &field.descriptor);
                hasher.update(field.flags.bits().to_be_bytes());
            }
            hasher.update((self.methods.len() as u32).to_be_bytes());
            for method in &self.methods {
                method_digest(&mut hasher, method);
            }
            hex::encode(hasher.finalize())
        })
    }
}
