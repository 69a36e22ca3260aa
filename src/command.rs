//! Command parsing and dispatch
//!
//! Turns a `\command argument` line into a registry operation and a
//! user-facing reply that is either private to the issuer or broadcast to
//! the issuer's room.

use std::sync::Arc;

use tracing::debug;

use crate::error::RegistryError;
use crate::message::COMMAND_MARKER;
use crate::registry::{Departure, Registry};
use crate::types::{ClientId, RoomName};

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `\rename <name>` (or the older `\name <name>`)
    Rename(String),
    /// `\create <room>`
    Create(RoomName),
    /// `\join <room>`
    Join(RoomName),
    /// `\list [room]`
    List(Option<RoomName>),
    /// `\list-rooms`
    ListRooms,
    /// `\leave`
    Leave,
    /// `\whoami`
    WhoAmI,
    /// `\dm ...`, not supported yet
    DirectMessage,
    /// `\exit`
    Exit,
    /// Anything else, including a known command missing its argument
    Invalid(String),
}

impl Command {
    /// Parse a trimmed input line that starts with the command marker
    ///
    /// The command word runs up to the first space; the rest, trimmed, is
    /// the argument.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, argument) = match line.split_once(' ') {
            Some((word, rest)) => (word, Some(rest.trim()).filter(|arg| !arg.is_empty())),
            None => (line, None),
        };

        let Some(name) = word.strip_prefix(COMMAND_MARKER) else {
            return Command::Invalid(word.to_string());
        };

        match (name, argument) {
            ("rename" | "name", Some(new_name)) => Command::Rename(new_name.to_string()),
            ("create", Some(room)) => Command::Create(RoomName::new(room)),
            ("join", Some(room)) => Command::Join(RoomName::new(room)),
            ("list", room) => Command::List(room.map(RoomName::new)),
            ("list-rooms", _) => Command::ListRooms,
            ("leave", _) => Command::Leave,
            ("whoami", _) => Command::WhoAmI,
            ("dm", _) => Command::DirectMessage,
            ("exit", _) => Command::Exit,
            _ => Command::Invalid(word.to_string()),
        }
    }
}

/// Where a reply goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only to the issuing client
    Private,
    /// To the issuing client's current room
    Room,
}

/// Result of dispatching one command
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub scope: Scope,
    /// Set when the command moved the client out of a room
    pub departure: Option<Departure>,
    /// Set when the session should end after delivering the reply
    pub terminate: bool,
}

impl Reply {
    fn private(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scope: Scope::Private,
            departure: None,
            terminate: false,
        }
    }

    fn room(text: impl Into<String>) -> Self {
        Self {
            scope: Scope::Room,
            ..Self::private(text)
        }
    }

    fn with_departure(mut self, departure: Option<Departure>) -> Self {
        self.departure = departure;
        self
    }
}

/// Stateless command router over the shared registry
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<Registry>,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Run one command line on behalf of `client_id`
    pub fn dispatch(&self, client_id: ClientId, line: &str) -> Reply {
        let command = Command::parse(line);
        debug!("Client {} issued {:?}", client_id, command);

        let Some(client) = self.registry.client(client_id) else {
            return Reply::private(RegistryError::ClientNotFound(client_id).to_string());
        };

        match command {
            Command::Rename(new_name) => match self.registry.rename_client(client_id, &new_name) {
                Ok(old_name) => Reply::room(format!("User: {old_name} has become -> {new_name}")),
                Err(e) => Reply::private(e.to_string()),
            },
            Command::Create(room) => match self.registry.create_room(&room, client_id) {
                Ok(departure) => {
                    Reply::private(format!("New room created: {room}")).with_departure(departure)
                }
                Err(RegistryError::RoomAlreadyExists(_)) => Reply::private(format!(
                    "Room already exists - use `{COMMAND_MARKER}join` to join the chat."
                )),
                Err(e) => Reply::private(e.to_string()),
            },
            Command::Join(room) => match self.registry.join_room(&room, client_id) {
                Ok(departure) => {
                    Reply::room(format!("{} has entered: {room}", client.display_name))
                        .with_departure(departure)
                }
                Err(RegistryError::RoomNotFound(_)) => Reply::private(format!(
                    "Room `{room}` doesn't exist - try creating it with `{COMMAND_MARKER}create`"
                )),
                Err(RegistryError::AlreadyMember(_)) => {
                    Reply::private(format!("You're already in {room}!"))
                }
                Err(e) => Reply::private(e.to_string()),
            },
            Command::List(room) => {
                let Some(room) = room.or(client.current_room) else {
                    return Reply::private(format!(
                        "You aren't in a room - try `{COMMAND_MARKER}list <room>`"
                    ));
                };
                match self.registry.list_members(&room) {
                    Some(members) => Reply::private(format_members(&members)),
                    None => Reply::private(format!("No such room {room}!")),
                }
            }
            Command::ListRooms => Reply::private(self.format_rooms()),
            Command::Leave => {
                let Some(room) = client.current_room else {
                    return Reply::private("You aren't in a room.");
                };
                let departure = self.registry.leave_room(Some(&room), client_id);
                Reply::private(format!("You have left room {room}")).with_departure(departure)
            }
            Command::WhoAmI => {
                let room = client
                    .current_room
                    .as_ref()
                    .map_or("None", RoomName::as_str);
                Reply::private(format!(
                    "\nClient Name: {}\nCurrent Room: {room}",
                    client.display_name
                ))
            }
            Command::DirectMessage => Reply::private("Direct messages aren't supported yet."),
            Command::Exit => Reply {
                terminate: true,
                ..Reply::room(format!("{} has gone offline", client.display_name))
            },
            Command::Invalid(word) => Reply::private(format!("Invalid command: `{word}`")),
        }
    }

    fn format_rooms(&self) -> String {
        let rooms = self.registry.list_rooms();
        if rooms.is_empty() {
            return "No rooms yet - make one!".to_string();
        }
        let mut text = String::from("\nCurrent rooms: \n");
        for (name, members) in rooms {
            text.push_str(&format!("  Room: {name}\n  Members:\n"));
            for member in members {
                text.push_str(&format!("\t{member}\n"));
            }
        }
        text
    }
}

fn format_members(members: &[String]) -> String {
    let mut text = String::from("\nCurrent Members:\n");
    for member in members {
        text.push_str(&format!("\t{member}\n"));
    }
    text
}
