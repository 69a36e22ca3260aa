//! Wire protocol definitions
//!
//! Line-oriented UTF-8 text: every outbound line is prefixed with the
//! speaker's display name and a separator that tells the recipient
//! whether the line is their own (`>`) or someone else's (`:`).

use crate::types::{ClientId, RoomName};

/// Leading character that marks an input line as a command
pub const COMMAND_MARKER: char = '\\';

/// Separator used on a recipient's own lines
pub const SELF_SEPARATOR: char = '>';

/// Separator used on lines attributed to another client
pub const OTHER_SEPARATOR: char = ':';

/// Who a response line is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    /// The recipient itself; always rendered in self form
    Own,
    /// A named client; rendered in self form only when it is the recipient's name
    Named(String),
}

/// Format one outbound line for a recipient
pub fn format_line(recipient: &str, message: &str, author: &Author) -> String {
    match author {
        Author::Named(name) if name != recipient => {
            format!("{name}{OTHER_SEPARATOR} {message}\n")
        }
        _ => format!("{recipient}{SELF_SEPARATOR} {message}\n"),
    }
}

/// Greeting written (unprefixed) right after registration
pub fn welcome(id: ClientId) -> String {
    format!(
        "\nWe've set your user name with a default - `{id}`\n\
         If you'd like to reset it, please use the '{COMMAND_MARKER}rename' command.\n\n"
    )
}

/// Sent to the members that remain after someone leaves a room
pub fn departure_notice(name: &str, room: &RoomName) -> String {
    format!("{name} has left {room}.")
}
