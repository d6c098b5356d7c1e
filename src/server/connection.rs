//! Connection handling
//!
//! Per-connection state machine: fills the read buffer, answers every
//! complete request frame, and drains the write buffer, all without ever
//! blocking. The stream must be in non-blocking mode.

use crate::dispatch::Dispatcher;
use crate::protocol::{FrameEncoder, FrameParser, HEADER_LEN, MAX_MSG};
use bytes::BytesMut;
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Capacity of both the read and the write buffer: one maximal frame
pub const BUFFER_CAPACITY: usize = HEADER_LEN + MAX_MSG;

/// Connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Waiting for (more of) a request frame
    AwaitingRequest,

    /// A reply is buffered and not fully written yet
    SendingResponse,

    /// Terminal; the connection must be dropped
    Closing,
}

/// Readiness a connection is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wants {
    Read,
    Write,
}

/// Connection handler
pub struct Connection<S> {
    /// Non-blocking stream
    stream: S,

    state: ConnState,

    /// Read buffer, never holds more than one maximal frame
    read_buffer: BytesMut,

    /// Write buffer holding the pending reply
    write_buffer: BytesMut,

    /// Bytes of `write_buffer` already sent
    write_sent: usize,
}

impl<S: Read + Write> Connection<S> {
    /// Create a new connection handler
    pub fn new(stream: S) -> Self {
        Connection {
            stream,
            state: ConnState::AwaitingRequest,
            read_buffer: BytesMut::with_capacity(BUFFER_CAPACITY),
            write_buffer: BytesMut::with_capacity(BUFFER_CAPACITY),
            write_sent: 0,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_closing(&self) -> bool {
        self.state == ConnState::Closing
    }

    /// Readiness needed to make progress, None once closing
    pub fn wants(&self) -> Option<Wants> {
        match self.state {
            ConnState::AwaitingRequest => Some(Wants::Read),
            ConnState::SendingResponse => Some(Wants::Write),
            ConnState::Closing => None,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Drive the state machine until it would block or closes
    pub fn handle_io(&mut self, dispatcher: &mut Dispatcher) {
        match self.state {
            ConnState::AwaitingRequest => self.handle_requests(dispatcher),
            ConnState::SendingResponse => {
                self.flush();
                // A finished reply may unblock frames already buffered
                if self.state == ConnState::AwaitingRequest {
                    self.handle_requests(dispatcher);
                }
            }
            ConnState::Closing => {}
        }
    }

    /// Answer buffered frames, then read more, until blocked
    fn handle_requests(&mut self, dispatcher: &mut Dispatcher) {
        loop {
            while self.try_one_request(dispatcher) {}

            if self.state != ConnState::AwaitingRequest || !self.fill_buffer() {
                return;
            }
        }
    }

    /// Read whatever the socket has into the read buffer
    ///
    /// Returns true if bytes were read and the connection is still open.
    /// Only called when no complete frame is buffered, so there is room.
    fn fill_buffer(&mut self) -> bool {
        let filled = self.read_buffer.len();
        debug_assert!(filled < BUFFER_CAPACITY);

        // Reserving reclaims the space of frames already split off the front
        self.read_buffer.resize(BUFFER_CAPACITY, 0);
        let result = loop {
            match self.stream.read(&mut self.read_buffer[filled..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let read = result.as_ref().map_or(0, |n| *n);
        self.read_buffer.truncate(filled + read);

        match result {
            Ok(0) => {
                if filled > 0 {
                    warn!("Unexpected EOF with {} bytes of a partial frame", filled);
                } else {
                    debug!("EOF");
                }
                self.state = ConnState::Closing;
                false
            }
            Ok(n) => {
                debug!("Read {} bytes", n);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!("Read error: {}", e);
                self.state = ConnState::Closing;
                false
            }
        }
    }

    /// Handle one complete frame from the read buffer
    ///
    /// Returns true if a reply was produced and fully flushed, so the next
    /// buffered frame can be processed right away.
    fn try_one_request(&mut self, dispatcher: &mut Dispatcher) -> bool {
        if self.state != ConnState::AwaitingRequest {
            return false;
        }

        let payload = match FrameParser::take_frame(&mut self.read_buffer) {
            Ok(Some(payload)) => payload,
            Ok(None) => return false,
            Err(e) => {
                warn!("Protocol error: {}", e);
                self.state = ConnState::Closing;
                return false;
            }
        };

        let request = match FrameParser::parse_request(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!("Bad request: {}", e);
                self.state = ConnState::Closing;
                return false;
            }
        };

        debug!("Parsed {}", request);
        let response = dispatcher.dispatch(&request);
        debug!("Response: {}", response);

        if let Err(e) = FrameEncoder::encode_response(&mut self.write_buffer, &response) {
            warn!("Cannot encode reply: {}", e);
            self.state = ConnState::Closing;
            return false;
        }

        self.state = ConnState::SendingResponse;
        self.flush();

        self.state == ConnState::AwaitingRequest
    }

    /// Write the pending reply until done or blocked
    fn flush(&mut self) {
        while self.try_flush_buffer() {}
    }

    /// Returns true if part of the reply is still pending and writing may continue
    fn try_flush_buffer(&mut self) -> bool {
        let result = loop {
            match self.stream.write(&self.write_buffer[self.write_sent..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(0) => {
                warn!("Write returned zero bytes");
                self.state = ConnState::Closing;
                false
            }
            Ok(n) => {
                self.write_sent += n;
                debug_assert!(self.write_sent <= self.write_buffer.len());

                if self.write_sent == self.write_buffer.len() {
                    // Reply fully sent, go back to reading
                    self.write_buffer.clear();
                    self.write_sent = 0;
                    self.state = ConnState::AwaitingRequest;
                    return false;
                }
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!("Write error: {}", e);
                self.state = ConnState::Closing;
                false
            }
        }
    }

    /// Bytes buffered but not yet consumed as a frame
    pub fn pending_input(&self) -> usize {
        self.read_buffer.len()
    }

    /// Bytes of the current reply not yet written
    pub fn pending_output(&self) -> usize {
        self.write_buffer.len() - self.write_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Request, Response};
    use bytes::Bytes;
    use std::collections::VecDeque;

    /// In-memory non-blocking stream
    #[derive(Default)]
    struct MockStream {
        /// Chunks returned by successive reads
        incoming: VecDeque<Vec<u8>>,
        /// Peer closed its side once `incoming` is drained
        eof: bool,
        written: Vec<u8>,
        /// Bytes accepted before writes would block; None = unlimited
        write_budget: Option<usize>,
        /// Next read fails with `Interrupted`
        interrupt_read: bool,
        /// Next write fails with `Interrupted`
        interrupt_write: bool,
        /// Writes report zero bytes accepted
        write_zero: bool,
    }

    impl MockStream {
        fn deliver(&mut self, bytes: &[u8]) {
            self.incoming.push_back(bytes.to_vec());
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if std::mem::take(&mut self.interrupt_read) {
                return Err(io::ErrorKind::Interrupted.into());
            }
            let Some(mut chunk) = self.incoming.pop_front() else {
                if self.eof {
                    return Ok(0);
                }
                return Err(io::ErrorKind::WouldBlock.into());
            };

            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.incoming.push_front(chunk.split_off(n));
            }
            Ok(n)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if std::mem::take(&mut self.interrupt_write) {
                return Err(io::ErrorKind::Interrupted.into());
            }
            if self.write_zero {
                return Ok(0);
            }
            let n = match self.write_budget {
                Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
                Some(budget) => budget.min(buf.len()),
                None => buf.len(),
            };
            if let Some(budget) = self.write_budget.as_mut() {
                *budget -= n;
            }
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn request(args: &[&str]) -> Vec<u8> {
        let request = Request::from_args(args.iter().map(|a| a.to_string()));
        FrameEncoder::request_frame(&request).unwrap().to_vec()
    }

    /// Split the bytes written so far into decoded replies
    fn replies(conn: &Connection<MockStream>) -> Vec<Response> {
        let mut buf = BytesMut::from(&conn.stream().written[..]);
        let mut out = Vec::new();
        while let Some(payload) = FrameParser::take_frame(&mut buf).unwrap() {
            out.push(FrameParser::parse_response(&payload).unwrap());
        }
        assert!(buf.is_empty(), "partial reply on the wire");
        out
    }

    #[test]
    fn test_single_request() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        conn.stream_mut().deliver(&request(&["set", "k", "v1"]));
        conn.handle_io(&mut dispatcher);

        assert_eq!(conn.state(), ConnState::AwaitingRequest);
        assert_eq!(conn.wants(), Some(Wants::Read));
        assert_eq!(replies(&conn), vec![Response::ok_empty()]);
        assert_eq!(dispatcher.store().len(), 1);
    }

    #[test]
    fn test_partial_delivery() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());
        let frame = request(&["get", "missing"]);

        conn.stream_mut().deliver(&frame[..3]);
        conn.handle_io(&mut dispatcher);
        assert_eq!(conn.state(), ConnState::AwaitingRequest);
        assert_eq!(conn.pending_input(), 3);
        assert!(replies(&conn).is_empty());

        conn.stream_mut().deliver(&frame[3..]);
        conn.handle_io(&mut dispatcher);
        assert_eq!(conn.pending_input(), 0);
        assert_eq!(replies(&conn), vec![Response::not_found()]);
    }

    #[test]
    fn test_pipelined_requests_in_one_read() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        let mut bytes = request(&["set", "k", "v"]);
        bytes.extend(request(&["get", "k"]));
        bytes.extend(request(&["bogus"]));
        conn.stream_mut().deliver(&bytes);
        conn.handle_io(&mut dispatcher);

        assert_eq!(
            replies(&conn),
            vec![Response::ok_empty(), Response::ok("v"), Response::error("Unknown cmd")]
        );
        assert_eq!(conn.state(), ConnState::AwaitingRequest);
    }

    #[test]
    fn test_blocked_write_resumes_and_drains_buffered_frames() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream {
            write_budget: Some(3),
            ..Default::default()
        });

        let mut bytes = request(&["set", "a", "1"]);
        bytes.extend(request(&["get", "a"]));
        conn.stream_mut().deliver(&bytes);
        conn.handle_io(&mut dispatcher);

        // First reply only partly written, second frame still buffered
        assert_eq!(conn.state(), ConnState::SendingResponse);
        assert_eq!(conn.wants(), Some(Wants::Write));
        assert_eq!(conn.stream().written.len(), 3);
        assert!(conn.pending_output() > 0);
        assert!(conn.pending_input() > 0);

        // Writability comes back
        conn.stream_mut().write_budget = None;
        conn.handle_io(&mut dispatcher);

        assert_eq!(conn.state(), ConnState::AwaitingRequest);
        assert_eq!(conn.pending_output(), 0);
        assert_eq!(conn.pending_input(), 0);
        assert_eq!(replies(&conn), vec![Response::ok_empty(), Response::ok("1")]);
    }

    #[test]
    fn test_interrupted_read_and_write_are_retried() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream {
            interrupt_read: true,
            interrupt_write: true,
            ..Default::default()
        });

        conn.stream_mut().deliver(&request(&["set", "k", "v"]));
        conn.handle_io(&mut dispatcher);

        assert_eq!(conn.state(), ConnState::AwaitingRequest);
        assert!(!conn.stream().interrupt_read);
        assert!(!conn.stream().interrupt_write);
        assert_eq!(replies(&conn), vec![Response::ok_empty()]);
        assert_eq!(dispatcher.store().len(), 1);
    }

    #[test]
    fn test_zero_byte_write_closes() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream {
            write_zero: true,
            ..Default::default()
        });

        conn.stream_mut().deliver(&request(&["get", "k"]));
        conn.handle_io(&mut dispatcher);

        assert!(conn.is_closing());
        assert_eq!(conn.wants(), None);
        assert!(conn.stream().written.is_empty());
    }

    #[test]
    fn test_orderly_eof_closes() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        conn.stream_mut().deliver(&request(&["del", "k"]));
        conn.stream_mut().eof = true;
        conn.handle_io(&mut dispatcher);

        assert!(conn.is_closing());
        assert_eq!(conn.wants(), None);
        assert_eq!(replies(&conn), vec![Response::ok_empty()]);
    }

    #[test]
    fn test_eof_mid_frame_closes() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());
        let frame = request(&["set", "k", "v"]);

        conn.stream_mut().deliver(&frame[..frame.len() - 1]);
        conn.stream_mut().eof = true;
        conn.handle_io(&mut dispatcher);

        assert!(conn.is_closing());
        assert!(replies(&conn).is_empty());
        assert!(dispatcher.store().is_empty());
    }

    #[test]
    fn test_oversized_frame_closes_without_reply() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        conn.stream_mut().deliver(&((MAX_MSG + 1) as u32).to_le_bytes());
        conn.handle_io(&mut dispatcher);

        assert!(conn.is_closing());
        assert!(conn.stream().written.is_empty());
    }

    #[test]
    fn test_malformed_payload_closes_without_reply() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        // Valid frame header, argument length overruns the payload
        let mut frame = 8u32.to_le_bytes().to_vec();
        frame.extend_from_slice(&1u32.to_le_bytes());
        frame.extend_from_slice(&100u32.to_le_bytes());
        conn.stream_mut().deliver(&frame);
        conn.handle_io(&mut dispatcher);

        assert!(conn.is_closing());
        assert!(conn.stream().written.is_empty());
    }

    #[test]
    fn test_maximal_request_fits_buffer() {
        let mut dispatcher = Dispatcher::default();
        let mut conn = Connection::new(MockStream::default());

        // argc + "set" + "k" + value fill the payload exactly
        let value = "x".repeat(MAX_MSG - 4 - (4 + 3) - (4 + 1) - 4);
        let frame = request(&["set", "k", value.as_str()]);
        assert_eq!(frame.len(), BUFFER_CAPACITY);

        // Deliver twice in small pieces to exercise buffer reuse
        for chunk in frame.chunks(1000) {
            conn.stream_mut().deliver(chunk);
        }
        conn.handle_io(&mut dispatcher);
        for chunk in request(&["get", "k"]).chunks(5) {
            conn.stream_mut().deliver(chunk);
        }
        conn.handle_io(&mut dispatcher);

        assert_eq!(
            replies(&conn),
            vec![Response::ok_empty(), Response::ok(Bytes::from(value))]
        );
    }
}
