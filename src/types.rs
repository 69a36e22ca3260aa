//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: time-ordered UUID assigned when a connection is accepted
//! - `RoomName`: user-chosen room name

use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v7: a millisecond timestamp followed by random bits, so ids
/// sort by connection time and concurrent connects do not collide.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new client ID stamped with the current time
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room name
///
/// Rooms are keyed by the exact (trimmed) name the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName(pub String);

impl RoomName {
    /// Create a RoomName from user input, trimming surrounding whitespace
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for RoomName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_unique() {
        let id1 = ClientId::new();
        let id2 = ClientId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_id_time_ordered() {
        let id = ClientId::new();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[test]
    fn test_room_name_trimmed() {
        let name = RoomName::from("  broom ");
        assert_eq!(name.as_str(), "broom");
        assert_eq!(name.to_string(), "broom");
    }

    #[test]
    fn test_room_name_case_preserved() {
        assert_ne!(RoomName::from("Broom"), RoomName::from("broom"));
    }
}
