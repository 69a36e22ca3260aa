//! Multi-room Line Chat Server Library
//!
//! A telnet-style chat server built with tokio. Clients connect over plain
//! TCP and talk in newline-terminated lines.
//!
//! # Features
//! - Default user names, `\rename` to change them
//! - Named rooms created on demand and destroyed when the last member leaves
//! - Room broadcast with self/other line prefixes
//! - Room and member listings, `\whoami`, `\exit`
//! - Disconnection handling
//!
//! # Architecture
//! - `Registry` is the shared directory of clients and rooms, guarded by one
//!   lock and backed by an injected key-value store
//! - Each connection runs a `Session` task with its own writer task
//! - `CommandDispatcher` maps command lines to registry operations
//! - `Broadcaster` queues each copy straight onto its recipient's sink
//!
//! # Example
//! ```ignore
//! use room_chat::{ChatServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(Config::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{Broadcaster, DeliveryReport};
pub use client::Client;
pub use command::{Command, CommandDispatcher, Reply, Scope};
pub use config::Config;
pub use error::{AppError, ConfigError, RegistryError, SendError, SessionError};
pub use message::{Author, COMMAND_MARKER};
pub use registry::{Departure, Registry};
pub use room::Room;
pub use server::ChatServer;
pub use session::{handle_connection, Session};
pub use store::{Expiration, KeyValueStore, MemoryStore, StoreValue};
pub use types::{ClientId, RoomName};
