//! String commands (SET, GET)

use super::{Command, CommandContext};
use crate::protocol::Response;
use bytes::Bytes;

/// SET command - Set a key to a value
///
/// Syntax: SET key value
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> Response {
        // Copy out of the request frame so stored data doesn't pin it
        let key = Bytes::copy_from_slice(&args[0]);
        let value = Bytes::copy_from_slice(&args[1]);

        ctx.store.set(key, value);

        Response::ok_empty()
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn arity(&self) -> usize {
        2
    }
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &mut CommandContext, args: &[Bytes]) -> Response {
        match ctx.store.get(&args[0]) {
            Some(value) => Response::ok(value.clone()),
            None => Response::not_found(),
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn arity(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;

    #[test]
    fn test_set_get() {
        let mut ctx = CommandContext::default();

        let args = vec![Bytes::from("mykey"), Bytes::from("myvalue")];
        let result = SetCommand.execute(&mut ctx, &args);
        assert_eq!(result, Response::ok_empty());

        let args = vec![Bytes::from("mykey")];
        let result = GetCommand.execute(&mut ctx, &args);
        assert_eq!(result, Response::ok("myvalue"));
    }

    #[test]
    fn test_get_nonexistent() {
        let mut ctx = CommandContext::default();

        let args = vec![Bytes::from("nonexistent")];
        let result = GetCommand.execute(&mut ctx, &args);
        assert_eq!(result.status, Status::NotFound);
        assert!(result.body.is_empty());
    }
}
