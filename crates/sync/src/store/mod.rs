//! Persistent local key/value storage.
//!
//! The primitives are synchronous and infallible from the caller's point of
//! view: `get` returns `None` for anything unreadable, `set` logs and drops
//! write failures. Cart and wishlist keys are only ever written through
//! [`LocalMirror`], which owns the dedup/merge invariants.

mod file;
mod mirror;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use file::FileStore;
pub use mirror::{Loaded, LocalMirror};

/// Synchronous key/value store scoped to one shopper profile.
pub trait LocalStore: Send + Sync {
    /// Read a value, `None` if absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);

    /// Delete a value. Deleting an absent key is a no-op.
    fn remove(&self, key: &str);
}

impl<T: LocalStore + ?Sized> LocalStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// In-process store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "v");
        assert_eq!(store.get("k").as_deref(), Some("v"));

        store.remove("k");
        store.remove("k");
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("cart", "[]");
        assert_eq!(handle.get("cart").as_deref(), Some("[]"));
    }
}
