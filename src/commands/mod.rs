//! Command execution module
//!
//! Provides a unified interface for all commands through the Command trait.
//! Each command family is implemented in a separate file for high cohesion.

mod context;
mod registry;

// Command implementations
mod key;
mod string;

pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::protocol::Response;
use bytes::Bytes;

/// Command execution trait
///
/// All commands implement this trait with a single execute method.
/// This provides loose coupling between command implementations and the dispatcher.
pub trait Command {
    /// Execute the command with the given context and arguments
    ///
    /// Arguments:
    /// - ctx: mutable reference to the command context (contains the store)
    /// - args: command arguments (excluding the command name itself),
    ///   already checked against `arity`
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> Response;

    /// Get the command name (for debugging/logging)
    fn name(&self) -> &'static str;

    /// Exact number of arguments after the command name
    fn arity(&self) -> usize;
}
