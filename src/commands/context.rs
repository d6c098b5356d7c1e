//! Command execution context

use crate::store::MemoryStore;

/// Context provided to commands during execution
///
/// Gives commands access to the key space without tying them to the
/// server that owns it.
pub struct CommandContext {
    /// The memory store
    pub store: MemoryStore,
}

impl CommandContext {
    /// Create a context around an existing store
    pub fn new(store: MemoryStore) -> Self {
        CommandContext { store }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}
