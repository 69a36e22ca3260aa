//! Client struct definition
//!
//! Represents a connected client with their state and output sink.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::{format_line, Author};
use crate::types::{ClientId, RoomName};

/// Connected client information
///
/// Holds all state related to a connected client: the immutable id, the
/// mutable display name, the room it currently occupies and the sink its
/// session's writer task drains.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// User-chosen label, defaults to the id's string form
    pub display_name: String,
    /// Room this client occupies, if any
    pub current_room: Option<RoomName>,
    /// Server → Client line channel
    pub sink: mpsc::Sender<String>,
}

impl Client {
    /// Create a new client with the given ID and sink
    pub fn new(id: ClientId, sink: mpsc::Sender<String>) -> Self {
        Self {
            id,
            display_name: id.to_string(),
            current_room: None,
            sink,
        }
    }

    /// Send raw text to this client
    ///
    /// Returns an error if the channel is closed (client disconnected).
    pub async fn write_string(&self, text: impl Into<String>) -> Result<(), SendError> {
        self.sink
            .send(text.into())
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Send a prefixed response line to this client
    pub async fn write_response(&self, message: &str, author: &Author) -> Result<(), SendError> {
        self.write_string(format_line(&self.display_name, message, author))
            .await
    }

    /// Queue a prefixed response line without waiting
    ///
    /// Lines queued from one task reach the sink in call order. A full sink
    /// drops the line instead of waiting for the writer to catch up.
    pub fn queue_response(&self, message: &str, author: &Author) -> Result<(), SendError> {
        self.sink
            .try_send(format_line(&self.display_name, message, author))
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::ChannelFull,
                TrySendError::Closed(_) => SendError::ChannelClosed,
            })
    }

    /// Check if this client is in the given room
    pub fn is_in(&self, room: &RoomName) -> bool {
        self.current_room.as_ref() == Some(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let id = ClientId::new();
        let client = Client::new(id, tx);

        assert_eq!(client.display_name, id.to_string());
        assert!(client.current_room.is_none());
    }

    #[tokio::test]
    async fn test_write_response_own() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut client = Client::new(ClientId::new(), tx);
        client.display_name = "Han Solo".to_string();

        client.write_response("Hi", &Author::Own).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "Han Solo> Hi\n");
    }

    #[tokio::test]
    async fn test_write_response_named() {
        let (tx, mut rx) = mpsc::channel(32);
        let mut client = Client::new(ClientId::new(), tx);
        client.display_name = "Han Solo".to_string();

        client
            .write_response("Hi", &Author::Named("Leia Organa".to_string()))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), "Leia Organa: Hi\n");
    }

    #[test]
    fn test_queue_response_keeps_order_and_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(2);
        let mut client = Client::new(ClientId::new(), tx);
        client.display_name = "Han Solo".to_string();
        let leia = Author::Named("Leia Organa".to_string());

        client.queue_response("one", &leia).unwrap();
        client.queue_response("two", &Author::Own).unwrap();
        assert!(matches!(
            client.queue_response("three", &leia),
            Err(SendError::ChannelFull)
        ));

        assert_eq!(rx.try_recv().unwrap(), "Leia Organa: one\n");
        assert_eq!(rx.try_recv().unwrap(), "Han Solo> two\n");
        assert!(rx.try_recv().is_err());

        drop(rx);
        assert!(matches!(
            client.queue_response("four", &leia),
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_write_to_closed_sink() {
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(ClientId::new(), tx);
        drop(rx);

        assert!(matches!(
            client.write_string("Hi").await,
            Err(SendError::ChannelClosed)
        ));
    }
}
