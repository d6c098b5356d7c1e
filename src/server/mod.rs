//! Server module
//!
//! Handles TCP connections and runs the event loop.
//! A single thread waits on one `mio::Poll`; every ready connection's state
//! machine is driven until it would block, so no request ever waits on
//! another connection's I/O. Command processing is delegated to the dispatcher.

mod connection;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use anyhow::Context;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub use connection::{ConnState, Connection, Wants, BUFFER_CAPACITY};

/// Token of the listening socket
const LISTENER: Token = Token(0);

/// A registered client connection
struct Client {
    conn: Connection<TcpStream>,
    addr: SocketAddr,

    /// Interest currently registered with the poller
    registered: Wants,
}

fn interest_for(wants: Wants) -> Interest {
    match wants {
        Wants::Read => Interest::READABLE,
        Wants::Write => Interest::WRITABLE,
    }
}

/// Single-threaded, poll-driven server
pub struct Server {
    poll: Poll,
    listener: TcpListener,

    /// Connection registry; removing an entry closes the socket
    connections: HashMap<Token, Client>,
    next_token: usize,

    dispatcher: Dispatcher,
    config: ServerConfig,
}

impl Server {
    /// Bind the listening socket with an empty store
    pub fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        Self::with_dispatcher(config, Dispatcher::default())
    }

    /// Bind the listening socket, serving through the given dispatcher
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher) -> anyhow::Result<Self> {
        let addr: SocketAddr = config
            .addr
            .parse()
            .with_context(|| format!("invalid listen address '{}'", config.addr))?;

        // mio listeners are non-blocking from the start
        let mut listener =
            TcpListener::bind(addr).with_context(|| format!("failed to bind {}", addr))?;
        let poll = Poll::new().context("failed to create poller")?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("failed to register listener")?;

        Ok(Server {
            poll,
            listener,
            connections: HashMap::new(),
            next_token: LISTENER.0 + 1,
            dispatcher,
            config,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run the event loop forever
    pub fn run(&mut self) -> anyhow::Result<()> {
        info!("FerrumKV server listening on {}", self.local_addr()?);

        let mut events = Events::with_capacity(self.config.max_events);
        loop {
            self.run_once(&mut events)?;
        }
    }

    /// One readiness wait followed by handling of every ready socket
    pub fn run_once(&mut self, events: &mut Events) -> anyhow::Result<()> {
        let timeout = self.config.poll_timeout_ms.map(Duration::from_millis);

        match self.poll.poll(events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e).context("poll failed"),
        }

        for event in events.iter() {
            match event.token() {
                LISTENER => self.accept_connections(),
                token => self.connection_ready(token),
            }
        }

        Ok(())
    }

    /// Accept every pending connection
    ///
    /// Readiness is edge-triggered, so the backlog is drained in one go.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) = self
                        .poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)
                    {
                        warn!("Failed to register connection from {}: {}", addr, e);
                        continue;
                    }

                    info!("New connection from {}", addr);
                    self.connections.insert(
                        token,
                        Client {
                            conn: Connection::new(stream),
                            addr,
                            registered: Wants::Read,
                        },
                    );
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("accept() error: {}", e);
                    return;
                }
            }
        }
    }

    /// Drive one connection and update its registration
    fn connection_ready(&mut self, token: Token) {
        let Some(client) = self.connections.get_mut(&token) else {
            debug!("Event for unknown token {:?}", token);
            return;
        };

        client.conn.handle_io(&mut self.dispatcher);

        match client.conn.wants() {
            None => self.close(token),
            Some(wants) if wants != client.registered => {
                let result = self.poll.registry().reregister(
                    client.conn.stream_mut(),
                    token,
                    interest_for(wants),
                );
                match result {
                    Ok(()) => client.registered = wants,
                    Err(e) => {
                        warn!("Failed to reregister {}: {}", client.addr, e);
                        self.close(token);
                    }
                }
            }
            Some(_) => {}
        }
    }

    /// Remove a connection from the registry, closing its socket
    fn close(&mut self, token: Token) {
        let Some(mut client) = self.connections.remove(&token) else {
            return;
        };

        if let Err(e) = self.poll.registry().deregister(client.conn.stream_mut()) {
            debug!("Failed to deregister {}: {}", client.addr, e);
        }
        info!("Connection closed: {}", client.addr);
    }
}
