//! Command dispatcher
//!
//! Routes decoded requests to the appropriate handler.
//! This module provides loose coupling between the server and command implementations.

use crate::commands::{CommandContext, CommandRegistry};
use crate::protocol::{Request, Response};
use crate::store::MemoryStore;
use tracing::debug;

/// Body of the reply to anything that is not a known command
pub const UNKNOWN_COMMAND: &str = "Unknown cmd";

/// Command dispatcher
///
/// Receives argument vectors, validates them, and routes to appropriate handlers.
/// Dispatch never fails: every outcome is a status code plus body.
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Command execution context
    context: CommandContext,
}

impl Dispatcher {
    /// Create a dispatcher serving the given store
    pub fn new(store: MemoryStore) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::new(store),
        }
    }

    /// Dispatch a request
    ///
    /// The first argument names the command (case-insensitive); the rest
    /// must match the command's arity exactly.
    pub fn dispatch(&mut self, request: &Request) -> Response {
        let Some((name, args)) = request.args.split_first() else {
            debug!("Empty argument vector");
            return Response::error(UNKNOWN_COMMAND);
        };

        let Ok(name) = std::str::from_utf8(name) else {
            debug!("Command name is not valid UTF-8");
            return Response::error(UNKNOWN_COMMAND);
        };

        let command = match self.registry.get(name) {
            Some(cmd) if cmd.arity() == args.len() => cmd,
            Some(cmd) => {
                debug!("Wrong arity for {}: {} args", cmd.name(), args.len());
                return Response::error(UNKNOWN_COMMAND);
            }
            None => {
                debug!("Unknown command: {}", name);
                return Response::error(UNKNOWN_COMMAND);
            }
        };

        debug!("Dispatching command: {}", command.name());
        command.execute(&mut self.context, args)
    }

    /// Get reference to the store (for testing/inspection)
    pub fn store(&self) -> &MemoryStore {
        &self.context.store
    }

    /// Get mutable reference to the store (for testing/inspection)
    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.context.store
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}
