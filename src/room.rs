//! Room struct definition
//!
//! Represents a named chat room with an ordered member list.

use crate::types::{ClientId, RoomName};

/// Chat Room
///
/// Members are kept in join order; that order is what listings show.
/// A room with no members must not be kept in the registry.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room name for identification
    pub name: RoomName,
    /// Members in join order
    pub members: Vec<ClientId>,
}

impl Room {
    /// Create a new room with the given name and its first member
    pub fn new(name: RoomName, creator: ClientId) -> Self {
        Self {
            name,
            members: vec![creator],
        }
    }

    /// Check if no one is left in the room
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if a client is in this room
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }

    /// Append a member
    ///
    /// Returns false if the client was already a member.
    pub fn add_member(&mut self, client_id: ClientId) -> bool {
        if self.contains(client_id) {
            false
        } else {
            self.members.push(client_id);
            true
        }
    }

    /// Remove a member (handle leaving)
    ///
    /// Returns true if the room should be deleted (no members left).
    pub fn remove_member(&mut self, client_id: ClientId) -> bool {
        self.members.retain(|member| *member != client_id);
        self.is_empty()
    }

    /// Get the number of members in the room
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
