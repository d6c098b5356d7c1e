//! Asynchronous client
//!
//! Speaks the frame protocol over a tokio `TcpStream`. Requests can be sent
//! one at a time or pipelined: all frames are written before any reply is read.

use crate::protocol::{FrameEncoder, FrameParser, Request, Response, HEADER_LEN, MAX_MSG};
use anyhow::{bail, Context};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Client connection
pub struct Client {
    stream: TcpStream,

    /// Frames accumulated but not yet written
    write_buffer: BytesMut,
}

impl Client {
    /// Connect to a server
    pub async fn connect(addr: impl ToSocketAddrs) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("failed to connect")?;
        stream.set_nodelay(true)?;

        Ok(Client {
            stream,
            write_buffer: BytesMut::with_capacity(HEADER_LEN + MAX_MSG),
        })
    }

    /// Queue a request frame without sending it
    pub fn queue(&mut self, request: &Request) -> anyhow::Result<()> {
        FrameEncoder::encode_request(&mut self.write_buffer, request)?;
        Ok(())
    }

    /// Write every queued frame
    pub async fn flush(&mut self) -> anyhow::Result<()> {
        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;
        self.write_buffer.clear();
        Ok(())
    }

    /// Send one request frame
    pub async fn send_request(&mut self, request: &Request) -> anyhow::Result<()> {
        self.queue(request)?;
        self.flush().await
    }

    /// Read one reply frame
    pub async fn read_response(&mut self) -> anyhow::Result<Response> {
        let mut header = [0u8; HEADER_LEN];
        self.stream
            .read_exact(&mut header)
            .await
            .context("connection closed before reply")?;

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_MSG {
            bail!("reply of {} bytes exceeds the {} byte limit", len, MAX_MSG);
        }

        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .context("connection closed mid-reply")?;

        let response = FrameParser::parse_response(&Bytes::from(payload))?;
        debug!("Received {}", response);
        Ok(response)
    }

    /// Send a request and wait for its reply
    pub async fn query(&mut self, request: &Request) -> anyhow::Result<Response> {
        self.send_request(request).await?;
        self.read_response().await
    }

    /// Write all requests, then read their replies in order
    pub async fn pipeline(&mut self, requests: &[Request]) -> anyhow::Result<Vec<Response>> {
        for request in requests {
            self.queue(request)?;
        }
        self.flush().await?;

        let mut responses = Vec::with_capacity(requests.len());
        for _ in requests {
            responses.push(self.read_response().await?);
        }
        Ok(responses)
    }

    /// GET key
    pub async fn get(&mut self, key: impl Into<Bytes>) -> anyhow::Result<Response> {
        self.query(&Request::new(vec![Bytes::from_static(b"get"), key.into()]))
            .await
    }

    /// SET key value
    pub async fn set(
        &mut self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> anyhow::Result<Response> {
        self.query(&Request::new(vec![
            Bytes::from_static(b"set"),
            key.into(),
            value.into(),
        ]))
        .await
    }

    /// DEL key
    pub async fn del(&mut self, key: impl Into<Bytes>) -> anyhow::Result<Response> {
        self.query(&Request::new(vec![Bytes::from_static(b"del"), key.into()]))
            .await
    }

    /// Write raw bytes, bypassing framing (for tests and debugging)
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Whether the server has closed the connection
    ///
    /// Only meaningful when no reply is outstanding.
    pub async fn is_closed_by_peer(&mut self) -> anyhow::Result<bool> {
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte).await {
            Ok(0) => Ok(true),
            Ok(_) => bail!("unexpected data from server"),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}
