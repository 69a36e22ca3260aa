//! Error types for the chat server
//!
//! Defines registry, session, configuration and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ClientId, RoomName};

/// Application-level errors
///
/// Only these terminate the whole server; everything else is scoped
/// to a single session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error while binding or inspecting the listener (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The accept socket itself failed (fatal)
    #[error("Accept error: {0}")]
    Accept(#[source] std::io::Error),
}

/// Registry operation errors
///
/// Returned as values; a failed operation never mutates the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A client with this id is already registered
    #[error("User Conflict: {0} user already in service. Please try again.")]
    ClientConflict(ClientId),

    /// No client with this id is registered
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// No room with this name exists
    #[error("Room not found: {0}")]
    RoomNotFound(RoomName),

    /// A room with this name already exists
    #[error("Room already exists: {0}")]
    RoomAlreadyExists(RoomName),

    /// The client is already in the target room
    #[error("Already in room: {0}")]
    AlreadyMember(RoomName),
}

/// Per-connection errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The client could not be registered; the connection is closed
    #[error("Registration failed: {0}")]
    Registration(#[from] RegistryError),

    /// Transport read or write failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame was not valid UTF-8
    #[error("Invalid UTF-8 input: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable or argument held a value that could not be parsed
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed or saturated channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The recipient's sink is full; the line was dropped
    #[error("Channel full")]
    ChannelFull,
}
