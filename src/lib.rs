//! FerrumKV - A single-threaded, poll-driven in-memory key-value store
//!
//! FerrumKV is designed with strong cohesion and loose coupling principles:
//! - Each module has a single, well-defined responsibility
//! - Modules communicate through clear, minimal interfaces
//! - No circular dependencies between modules
//!
//! The key space lives in a hash index that resizes progressively, so no
//! single request ever pays for a full rehash, and one event loop thread
//! multiplexes every client connection.

pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod hashtable;
pub mod protocol;
pub mod server;
pub mod store;

/// Re-export commonly used types
pub use client::Client;
pub use commands::{Command, CommandContext};
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use hashtable::{HashIndex, Hashed};
pub use protocol::{ProtocolError, Request, Response, Status};
pub use server::Server;
pub use store::{Entry, MemoryStore};
