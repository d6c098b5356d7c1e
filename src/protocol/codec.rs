//! Length-prefixed frame parser and encoder
//!
//! ```text
//! Frame      := u32_le(len) payload[len]         len <= MAX_MSG
//! ReqPayload := u32_le(argc) (u32_le(len) bytes[len])*
//! RepPayload := u32_le(status) body
//! ```

use super::types::{ProtocolError, Request, Response, Status, HEADER_LEN, MAX_ARGS, MAX_MSG};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Frame parser
pub struct FrameParser;

impl FrameParser {
    /// Look at the head of a buffer for a complete frame
    ///
    /// Returns Ok(Some(len)) with the payload length if the whole frame is
    /// buffered, Ok(None) if more data is needed, and an error if the
    /// declared length is over the limit.
    pub fn peek_frame(buf: &[u8]) -> Result<Option<usize>, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let len = (&buf[..HEADER_LEN]).get_u32_le() as usize;
        if len > MAX_MSG {
            return Err(ProtocolError::FrameTooLarge(len));
        }

        if buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        Ok(Some(len))
    }

    /// Split one complete frame off the front of `buf` and return its payload
    pub fn take_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        match Self::peek_frame(&buf[..])? {
            Some(len) => {
                buf.advance(HEADER_LEN);
                Ok(Some(buf.split_to(len).freeze()))
            }
            None => Ok(None),
        }
    }

    /// Decode a request payload into its argument vector
    ///
    /// Arguments are zero-copy slices of `payload`.
    pub fn parse_request(payload: &Bytes) -> Result<Request, ProtocolError> {
        let mut cursor = &payload[..];

        if cursor.remaining() < HEADER_LEN {
            return Err(ProtocolError::Truncated);
        }
        let argc = cursor.get_u32_le() as usize;
        if argc > MAX_ARGS {
            return Err(ProtocolError::TooManyArgs(argc));
        }

        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            if cursor.remaining() < HEADER_LEN {
                return Err(ProtocolError::Truncated);
            }
            let len = cursor.get_u32_le() as usize;
            if cursor.remaining() < len {
                return Err(ProtocolError::Truncated);
            }

            let start = payload.len() - cursor.remaining();
            args.push(payload.slice(start..start + len));
            cursor.advance(len);
        }

        if cursor.has_remaining() {
            return Err(ProtocolError::TrailingBytes(cursor.remaining()));
        }

        Ok(Request::new(args))
    }

    /// Decode a reply payload
    pub fn parse_response(payload: &Bytes) -> Result<Response, ProtocolError> {
        if payload.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated);
        }

        let status = Status::try_from((&payload[..HEADER_LEN]).get_u32_le())?;
        Ok(Response {
            status,
            body: payload.slice(HEADER_LEN..),
        })
    }
}

/// Frame encoder
pub struct FrameEncoder;

impl FrameEncoder {
    /// Length of the request payload for `args`
    pub fn request_len(args: &[Bytes]) -> usize {
        HEADER_LEN + args.iter().map(|arg| HEADER_LEN + arg.len()).sum::<usize>()
    }

    /// Encode a request frame into `buf`
    ///
    /// Nothing is written if the frame would break a limit.
    pub fn encode_request(buf: &mut BytesMut, request: &Request) -> Result<(), ProtocolError> {
        if request.args.len() > MAX_ARGS {
            return Err(ProtocolError::TooManyArgs(request.args.len()));
        }

        let len = Self::request_len(&request.args);
        if len > MAX_MSG {
            return Err(ProtocolError::FrameTooLarge(len));
        }

        buf.reserve(HEADER_LEN + len);
        buf.put_u32_le(len as u32);
        buf.put_u32_le(request.args.len() as u32);
        for arg in &request.args {
            buf.put_u32_le(arg.len() as u32);
            buf.put_slice(arg);
        }

        Ok(())
    }

    /// Encode a reply frame into `buf`
    ///
    /// Nothing is written if the frame would break the size limit.
    pub fn encode_response(buf: &mut BytesMut, response: &Response) -> Result<(), ProtocolError> {
        let len = HEADER_LEN + response.body.len();
        if len > MAX_MSG {
            return Err(ProtocolError::FrameTooLarge(len));
        }

        buf.reserve(HEADER_LEN + len);
        buf.put_u32_le(len as u32);
        buf.put_u32_le(response.status.code());
        buf.put_slice(&response.body);

        Ok(())
    }

    /// Encode a request into a fresh buffer
    pub fn request_frame(request: &Request) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::new();
        Self::encode_request(&mut buf, request)?;
        Ok(buf.freeze())
    }
}
