//! Key-value store collaborator
//!
//! The registry keeps its two tables in an injected store under fixed keys.
//! `MemoryStore` is the in-process implementation used by the server.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::client::Client;
use crate::room::Room;
use crate::types::{ClientId, RoomName};

/// Key holding the client id → Client table
pub const CLIENTS_KEY: &str = "clients";

/// Key holding the room name → Room table
pub const ROOMS_KEY: &str = "rooms";

/// Values the registry stores
#[derive(Debug, Clone)]
pub enum StoreValue {
    Clients(HashMap<ClientId, Client>),
    Rooms(HashMap<RoomName, Room>),
}

/// How long a stored value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Never,
    After(Duration),
}

/// Get/Set storage service
///
/// Implementations do not need their own locking: the registry serializes
/// every access behind its lock.
pub trait KeyValueStore: Send {
    /// Look up a value; `None` if absent or expired
    fn get(&self, key: &str) -> Option<StoreValue>;

    /// Insert or replace a value
    fn set(&mut self, key: &str, value: StoreValue, expiration: Expiration);
}

#[derive(Debug)]
struct Entry {
    value: StoreValue,
    expires_at: Option<Instant>,
}

/// In-memory store with optional per-entry expiration
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        let entry = self.entries.get(key)?;
        match entry.expires_at {
            Some(deadline) if deadline <= Instant::now() => None,
            _ => Some(entry.value.clone()),
        }
    }

    fn set(&mut self, key: &str, value: StoreValue, expiration: Expiration) {
        let expires_at = match expiration {
            Expiration::Never => None,
            Expiration::After(ttl) => Some(Instant::now() + ttl),
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
    }
}
