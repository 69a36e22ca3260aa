//! Shared client and room directory
//!
//! The single source of truth for who is connected and who is in which room.
//! Both tables live in a [`KeyValueStore`]; every operation takes the
//! registry lock, loads the tables, applies its change, writes them back and
//! releases the lock before returning. Nothing here performs I/O on client
//! streams, so callers copy what they need out of the returned values and
//! write to sockets afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::RegistryError;
use crate::room::Room;
use crate::store::{Expiration, KeyValueStore, MemoryStore, StoreValue, CLIENTS_KEY, ROOMS_KEY};
use crate::types::{ClientId, RoomName};

/// A client leaving a room, with the members left behind to notify
#[derive(Debug, Clone)]
pub struct Departure {
    /// Snapshot of the leaving client
    pub client: Client,
    /// The room that was left
    pub room: RoomName,
    /// Members still in the room; empty if the room was destroyed
    pub remaining: Vec<Client>,
}

/// Registry tables as loaded from the store for one operation
struct Tables {
    clients: HashMap<ClientId, Client>,
    rooms: HashMap<RoomName, Room>,
}

impl Tables {
    fn load(store: &dyn KeyValueStore) -> Self {
        let clients = match store.get(CLIENTS_KEY) {
            Some(StoreValue::Clients(clients)) => clients,
            _ => HashMap::new(),
        };
        let rooms = match store.get(ROOMS_KEY) {
            Some(StoreValue::Rooms(rooms)) => rooms,
            _ => HashMap::new(),
        };
        Self { clients, rooms }
    }

    fn save(self, store: &mut dyn KeyValueStore) {
        store.set(CLIENTS_KEY, StoreValue::Clients(self.clients), Expiration::Never);
        store.set(ROOMS_KEY, StoreValue::Rooms(self.rooms), Expiration::Never);
    }

    fn resolve(&self, ids: &[ClientId]) -> Vec<Client> {
        ids.iter()
            .filter_map(|id| self.clients.get(id).cloned())
            .collect()
    }

    fn names(&self, ids: &[ClientId]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.clients.get(id))
            .map(|client| client.display_name.clone())
            .collect()
    }

    fn set_room(&mut self, id: ClientId, room: Option<RoomName>) {
        if let Some(client) = self.clients.get_mut(&id) {
            client.current_room = room;
        }
    }

    /// Take a client out of its current room, destroying the room if it empties
    fn detach(&mut self, id: ClientId) -> Option<Departure> {
        let client = self.clients.get_mut(&id)?;
        let room_name = client.current_room.take()?;
        let leaver = client.clone();

        let mut remaining = Vec::new();
        if let Some(room) = self.rooms.get_mut(&room_name) {
            if room.remove_member(id) {
                self.rooms.remove(&room_name);
                debug!("Room {} deleted (empty)", room_name);
            } else {
                remaining = room.members.clone();
            }
        }

        Some(Departure {
            remaining: self.resolve(&remaining),
            client: leaver,
            room: room_name,
        })
    }
}

/// The shared registry
///
/// Constructed once at startup and handed to every session behind an `Arc`.
pub struct Registry {
    store: Mutex<Box<dyn KeyValueStore>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry backed by a [`MemoryStore`]
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    /// Create a registry backed by the given store
    pub fn with_store(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn KeyValueStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let store = self.lock();
        f(&Tables::load(&**store))
    }

    fn update<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut store = self.lock();
        let mut tables = Tables::load(&**store);
        let out = f(&mut tables);
        tables.save(&mut **store);
        out
    }

    /// Like `update`, but nothing is written back when `f` fails
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut store = self.lock();
        let mut tables = Tables::load(&**store);
        let out = f(&mut tables)?;
        tables.save(&mut **store);
        Ok(out)
    }

    /// Register a freshly connected client
    pub fn register_client(
        &self,
        id: ClientId,
        sink: mpsc::Sender<String>,
    ) -> Result<Client, RegistryError> {
        self.mutate(|tables| {
            if tables.clients.contains_key(&id) {
                return Err(RegistryError::ClientConflict(id));
            }
            let client = Client::new(id, sink);
            tables.clients.insert(id, client.clone());
            info!("Client {} registered, total clients: {}", id, tables.clients.len());
            Ok(client)
        })
    }

    /// Remove a client, taking it out of its room first
    ///
    /// A no-op for unknown ids. Returns the departure if the client was in a room.
    pub fn unregister_client(&self, id: ClientId) -> Option<Departure> {
        self.update(|tables| {
            let departure = tables.detach(id);
            if tables.clients.remove(&id).is_some() {
                info!("Client {} unregistered, total clients: {}", id, tables.clients.len());
            }
            departure
        })
    }

    /// Change a client's display name, returning the previous one
    pub fn rename_client(&self, id: ClientId, new_name: &str) -> Result<String, RegistryError> {
        self.mutate(|tables| {
            let client = tables
                .clients
                .get_mut(&id)
                .ok_or(RegistryError::ClientNotFound(id))?;
            Ok(std::mem::replace(
                &mut client.display_name,
                new_name.to_string(),
            ))
        })
    }

    /// Create a room with `creator` as its only member
    ///
    /// The creator leaves its previous room first; that departure is returned
    /// so the caller can notify the members left behind.
    pub fn create_room(
        &self,
        name: &RoomName,
        creator: ClientId,
    ) -> Result<Option<Departure>, RegistryError> {
        self.mutate(|tables| {
            if tables.rooms.contains_key(name) {
                return Err(RegistryError::RoomAlreadyExists(name.clone()));
            }
            if !tables.clients.contains_key(&creator) {
                return Err(RegistryError::ClientNotFound(creator));
            }

            let departure = tables.detach(creator);
            tables
                .rooms
                .insert(name.clone(), Room::new(name.clone(), creator));
            tables.set_room(creator, Some(name.clone()));
            info!("Client {} created room {}", creator, name);
            Ok(departure)
        })
    }

    /// Append a client to an existing room, leaving its previous room first
    pub fn join_room(
        &self,
        name: &RoomName,
        id: ClientId,
    ) -> Result<Option<Departure>, RegistryError> {
        self.mutate(|tables| {
            let client = tables
                .clients
                .get(&id)
                .ok_or(RegistryError::ClientNotFound(id))?;
            if !tables.rooms.contains_key(name) {
                return Err(RegistryError::RoomNotFound(name.clone()));
            }
            if client.is_in(name) {
                return Err(RegistryError::AlreadyMember(name.clone()));
            }

            let departure = tables.detach(id);
            if let Some(room) = tables.rooms.get_mut(name) {
                room.add_member(id);
                info!(
                    "Client {} joined room {}, members: {}",
                    id,
                    room.name,
                    room.member_count()
                );
            }
            tables.set_room(id, Some(name.clone()));
            Ok(departure)
        })
    }

    /// Take a client out of `name`
    ///
    /// A no-op when `name` is `None` or the client is not in that room.
    pub fn leave_room(&self, name: Option<&RoomName>, id: ClientId) -> Option<Departure> {
        let name = name?;
        self.update(|tables| {
            let in_room = tables
                .clients
                .get(&id)
                .is_some_and(|client| client.is_in(name));
            if in_room {
                info!("Client {} left room {}", id, name);
                tables.detach(id)
            } else {
                None
            }
        })
    }

    /// Snapshot of every room and its members' display names, in name order
    pub fn list_rooms(&self) -> BTreeMap<RoomName, Vec<String>> {
        self.read(|tables| {
            tables
                .rooms
                .iter()
                .map(|(name, room)| (name.clone(), tables.names(&room.members)))
                .collect()
        })
    }

    /// Display names of a room's members in join order, `None` if no such room
    pub fn list_members(&self, name: &RoomName) -> Option<Vec<String>> {
        self.read(|tables| {
            tables
                .rooms
                .get(name)
                .map(|room| tables.names(&room.members))
        })
    }

    /// Snapshot of a room's members, `None` if no such room
    pub fn members(&self, name: &RoomName) -> Option<Vec<Client>> {
        self.read(|tables| {
            tables
                .rooms
                .get(name)
                .map(|room| tables.resolve(&room.members))
        })
    }

    /// Snapshot of one client
    pub fn client(&self, id: ClientId) -> Option<Client> {
        self.read(|tables| tables.clients.get(&id).cloned())
    }

    /// Snapshot of one client together with the members of its current room
    ///
    /// Both come from the same read; the member list is empty when the client
    /// is not in a room.
    pub fn audience(&self, id: ClientId) -> Option<(Client, Vec<Client>)> {
        self.read(|tables| {
            let client = tables.clients.get(&id)?.clone();
            let members = client
                .current_room
                .as_ref()
                .and_then(|name| tables.rooms.get(name))
                .map(|room| tables.resolve(&room.members))
                .unwrap_or_default();
            Some((client, members))
        })
    }

    /// Number of registered clients
    pub fn client_count(&self) -> usize {
        self.read(|tables| tables.clients.len())
    }
}
