//! Entry structure for key-value pairs

use crate::hashtable::Hashed;
use bytes::Bytes;

/// Represents a single entry in the store
#[derive(Debug, Clone)]
pub struct Entry {
    /// The key
    pub key: Bytes,

    /// The value
    pub value: Bytes,

    /// Cached hash of the key
    hash_code: u64,
}

impl Entry {
    /// Create a new entry for an already-hashed key
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>, hash_code: u64) -> Self {
        Entry {
            key: key.into(),
            value: value.into(),
            hash_code,
        }
    }
}

impl Hashed for Entry {
    fn hash_code(&self) -> u64 {
        self.hash_code
    }
}
