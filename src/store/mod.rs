//! In-memory storage module
//!
//! Maps byte-string keys to byte-string values on top of the hash index.
//! This module is independent of protocol and command handling (loose coupling).

mod entry;
mod memory;

pub use entry::Entry;
pub use memory::{MemoryStore, StoreStats};
