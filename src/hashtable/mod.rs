//! Hash index module
//!
//! An intrusive-style chained hash table that grows by progressive
//! resizing: a new generation is allocated and entries are migrated in
//! small, bounded batches piggy-backed on regular operations.
//! This module knows nothing about keys, values or the protocol.

mod map;
mod table;

pub use map::{HashIndex, INITIAL_CAPACITY, MAX_LOAD_FACTOR, MIGRATION_QUOTA};

/// An entry that can live in a [`HashIndex`]
///
/// The hash code must stay stable for as long as the entry is indexed.
pub trait Hashed {
    fn hash_code(&self) -> u64;
}
