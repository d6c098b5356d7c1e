//! In-memory storage implementation

use super::entry::Entry;
use crate::hashtable::HashIndex;
use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::hash::{BuildHasher, BuildHasherDefault};

/// In-memory key-value store
///
/// Keys and values are binary-safe byte strings. Lookups go through the
/// progressive-resizing [`HashIndex`], so no call ever pays for a full rehash.
pub struct MemoryStore {
    /// The key space
    index: HashIndex<Entry>,

    /// Key hasher
    hasher: BuildHasherDefault<SipHasher13>,
}

impl MemoryStore {
    /// Create a new, empty memory store
    pub fn new() -> Self {
        MemoryStore {
            index: HashIndex::new(),
            hasher: BuildHasherDefault::default(),
        }
    }

    fn hash_key(&self, key: &[u8]) -> u64 {
        self.hasher.hash_one(key)
    }

    /// Get a value by key
    pub fn get(&mut self, key: &[u8]) -> Option<&Bytes> {
        let hash = self.hash_key(key);
        self.index
            .lookup(hash, |entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Set a key-value pair, overwriting in place
    ///
    /// Returns true if the key did not exist before.
    pub fn set(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> bool {
        let key = key.into();
        let value = value.into();
        let hash = self.hash_key(&key);

        if let Some(entry) = self.index.lookup_mut(hash, |entry| entry.key == key) {
            entry.value = value;
            return false;
        }

        self.index.insert(Entry::new(key, value, hash));
        true
    }

    /// Delete a key, returns true if the key existed
    pub fn delete(&mut self, key: &[u8]) -> bool {
        let hash = self.hash_key(key);
        self.index.remove(hash, |entry| entry.key == key).is_some()
    }

    /// Check if a key exists
    pub fn exists(&mut self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Get the number of keys
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.index.len(),
            capacity: self.index.capacity(),
            resizing: self.index.is_resizing(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the memory store
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub keys: usize,
    /// Buckets of the newest table generation
    pub capacity: usize,
    pub resizing: bool,
}
