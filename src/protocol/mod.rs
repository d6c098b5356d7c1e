//! Binary frame protocol
//!
//! This module handles parsing and encoding of the length-prefixed frames
//! exchanged with clients. It is completely independent from other modules
//! (loose coupling).

mod codec;
mod types;

pub use codec::{FrameEncoder, FrameParser};
pub use types::{ProtocolError, Request, Response, Status, HEADER_LEN, MAX_ARGS, MAX_MSG};
