//! Key commands (DEL)

use super::{Command, CommandContext};
use crate::protocol::Response;
use bytes::Bytes;

/// DEL command - Delete a key
///
/// Syntax: DEL key
///
/// Deleting a missing key is not an error.
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> Response {
        ctx.store.delete(&args[0]);
        Response::ok_empty()
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn arity(&self) -> usize {
        1
    }
}
