//! Wire-level value types
//!
//! Defines requests, replies and the errors raised while framing them.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Maximum payload length of a single frame
pub const MAX_MSG: usize = 4096;

/// Maximum number of arguments in a request
pub const MAX_ARGS: usize = 1024;

/// Size of every length, count and status field
pub const HEADER_LEN: usize = 4;

/// Reply status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    Err = 1,
    NotFound = 2,
}

impl Status {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Status {
    type Error = ProtocolError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Err),
            2 => Ok(Status::NotFound),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Err => write!(f, "ERR"),
            Status::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// A decoded request: the argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub args: Vec<Bytes>,
}

impl Request {
    pub fn new(args: Vec<Bytes>) -> Self {
        Request { args }
    }

    /// Build a request from anything byte-like
    pub fn from_args<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        Request {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request({} args)", self.args.len())
    }
}

/// A reply: status code plus body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Bytes,
}

impl Response {
    /// Create an OK reply with a body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Response {
            status: Status::Ok,
            body: body.into(),
        }
    }

    /// Create an OK reply with an empty body
    pub fn ok_empty() -> Self {
        Self::ok(Bytes::new())
    }

    /// Create a NOT_FOUND reply
    pub fn not_found() -> Self {
        Response {
            status: Status::NotFound,
            body: Bytes::new(),
        }
    }

    /// Create an ERR reply with a message
    pub fn error(msg: impl Into<Bytes>) -> Self {
        Response {
            status: Status::Err,
            body: msg.into(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} bytes)", self.status, self.body.len())
    }
}

/// Framing and decoding errors
///
/// Every variant is fatal to the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Declared frame length is over the limit
    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_MSG)]
    FrameTooLarge(usize),

    /// Argument count is over the limit
    #[error("{0} arguments exceeds the {max} argument limit", max = MAX_ARGS)]
    TooManyArgs(usize),

    /// A length field points past the end of the payload
    #[error("truncated payload")]
    Truncated,

    /// Bytes left over after the last argument
    #[error("{0} trailing bytes after the last argument")]
    TrailingBytes(usize),

    /// Reply carried a status code we do not know
    #[error("unknown status code {0}")]
    UnknownStatus(u32),
}
