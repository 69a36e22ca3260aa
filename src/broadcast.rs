//! Room fan-out
//!
//! Delivers one message to every member of a room. Each copy is queued on its
//! recipient's sink before the call returns, so consecutive messages from one
//! session reach every recipient in the order they were sent. A recipient
//! whose sink is full or closed loses that copy; the failure is only logged.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::Client;
use crate::error::SendError;
use crate::message::{departure_notice, Author};
use crate::registry::{Departure, Registry};
use crate::types::RoomName;

/// Outcome of a finished broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn record(&mut self, recipient: &Client, result: Result<(), SendError>) {
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => {
                warn!("Delivery to {} failed: {}", recipient.id, e);
                self.failed += 1;
            }
        }
    }
}

/// Room broadcaster
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Send `message` from `sender` to everyone in `room`
    ///
    /// The sender's own copy is in self form, everyone else sees it
    /// attributed to the sender. If the room has no members (or `room` is
    /// `None`) the message goes back to the sender alone.
    pub async fn broadcast_to_room(
        &self,
        message: &str,
        room: Option<&RoomName>,
        sender: &Client,
    ) -> DeliveryReport {
        let members = room
            .and_then(|name| self.registry.members(name))
            .unwrap_or_default();
        self.deliver(message, sender, members).await
    }

    /// Send `message` from `sender` to an already taken member snapshot
    ///
    /// Other members' copies never wait on their sinks. The sender's own
    /// copy waits for room on the sender's sink, which only holds back the
    /// sender's own session.
    pub async fn deliver(
        &self,
        message: &str,
        sender: &Client,
        members: Vec<Client>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if members.is_empty() {
            debug!("Nobody in room, echoing to {}", sender.id);
            report.record(sender, sender.write_response(message, &Author::Own).await);
            return report;
        }

        let author = Author::Named(sender.display_name.clone());
        let mut echo = false;
        for member in &members {
            if member.id == sender.id {
                echo = true;
            } else {
                report.record(member, member.queue_response(message, &author));
            }
        }
        if echo {
            report.record(sender, sender.write_response(message, &Author::Own).await);
        }
        report
    }

    /// Tell the members left behind that someone left
    ///
    /// The leaving client is not among the recipients.
    pub fn announce_departure(&self, departure: Departure) -> DeliveryReport {
        let notice = departure_notice(&departure.client.display_name, &departure.room);
        let author = Author::Named(departure.client.display_name.clone());
        let mut report = DeliveryReport::default();
        for member in &departure.remaining {
            report.record(member, member.queue_response(&notice, &author));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::types::ClientId;

    fn register(registry: &Registry, name: &str) -> (Client, mpsc::Receiver<String>) {
        register_with_capacity(registry, name, 8)
    }

    fn register_with_capacity(
        registry: &Registry,
        name: &str,
        capacity: usize,
    ) -> (Client, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = ClientId::new();
        registry.register_client(id, tx).unwrap();
        registry.rename_client(id, name).unwrap();
        (registry.client(id).unwrap(), rx)
    }

    fn room(name: &str) -> RoomName {
        RoomName::from(name)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_member() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let (chewie, mut chewie_rx) = register(&registry, "Chewbacca");
        let (leia, mut leia_rx) = register(&registry, "Leia Organa");
        registry.create_room(&room("broom"), han.id).unwrap();
        registry.join_room(&room("broom"), chewie.id).unwrap();
        registry.join_room(&room("broom"), leia.id).unwrap();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let report = broadcaster
            .broadcast_to_room("test", Some(&room("broom")), &han)
            .await;

        assert_eq!(report, DeliveryReport { delivered: 3, failed: 0 });
        assert_eq!(han_rx.try_recv().unwrap(), "Han Solo> test\n");
        assert_eq!(chewie_rx.try_recv().unwrap(), "Han Solo: test\n");
        assert_eq!(leia_rx.try_recv().unwrap(), "Han Solo: test\n");
    }

    #[tokio::test]
    async fn test_broadcast_alone_writes_to_self() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let report = broadcaster.broadcast_to_room("test", None, &han).await;

        assert_eq!(report.delivered, 1);
        assert_eq!(han_rx.try_recv().unwrap(), "Han Solo> test\n");
    }

    #[tokio::test]
    async fn test_broadcast_to_missing_room_writes_to_self() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let report = broadcaster
            .broadcast_to_room("test", Some(&room("vroom")), &han)
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(han_rx.try_recv().unwrap(), "Han Solo> test\n");
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_stop_others() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let (chewie, chewie_rx) = register(&registry, "Chewbacca");
        let (leia, mut leia_rx) = register(&registry, "Leia Organa");
        registry.create_room(&room("broom"), han.id).unwrap();
        registry.join_room(&room("broom"), chewie.id).unwrap();
        registry.join_room(&room("broom"), leia.id).unwrap();
        drop(chewie_rx);
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let report = broadcaster
            .broadcast_to_room("test", Some(&room("broom")), &leia)
            .await;

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 1 });
        assert_eq!(han_rx.try_recv().unwrap(), "Leia Organa: test\n");
        assert_eq!(leia_rx.try_recv().unwrap(), "Leia Organa> test\n");
    }

    #[tokio::test]
    async fn test_full_recipient_does_not_block_sender() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let (chewie, mut chewie_rx) = register_with_capacity(&registry, "Chewbacca", 1);
        registry.create_room(&room("broom"), han.id).unwrap();
        registry.join_room(&room("broom"), chewie.id).unwrap();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let first = broadcaster
            .broadcast_to_room("one", Some(&room("broom")), &han)
            .await;
        let second = broadcaster
            .broadcast_to_room("two", Some(&room("broom")), &han)
            .await;

        assert_eq!(first, DeliveryReport { delivered: 2, failed: 0 });
        assert_eq!(second, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(han_rx.try_recv().unwrap(), "Han Solo> one\n");
        assert_eq!(han_rx.try_recv().unwrap(), "Han Solo> two\n");
        assert_eq!(chewie_rx.try_recv().unwrap(), "Han Solo: one\n");
        assert!(chewie_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_consecutive_broadcasts_arrive_in_order() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register_with_capacity(&registry, "Han Solo", 64);
        let (chewie, mut chewie_rx) = register_with_capacity(&registry, "Chewbacca", 64);
        registry.create_room(&room("broom"), han.id).unwrap();
        registry.join_room(&room("broom"), chewie.id).unwrap();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        for i in 0..40 {
            broadcaster
                .broadcast_to_room(&format!("m{i}"), Some(&room("broom")), &han)
                .await;
        }

        for i in 0..40 {
            assert_eq!(han_rx.recv().await.unwrap(), format!("Han Solo> m{i}\n"));
            assert_eq!(chewie_rx.recv().await.unwrap(), format!("Han Solo: m{i}\n"));
        }
    }

    #[tokio::test]
    async fn test_departure_skips_leaver() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        let (chewie, mut chewie_rx) = register(&registry, "Chewbacca");
        registry.create_room(&room("broom"), han.id).unwrap();
        registry.join_room(&room("broom"), chewie.id).unwrap();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let departure = registry
            .leave_room(Some(&room("broom")), chewie.id)
            .unwrap();
        let report = broadcaster.announce_departure(departure);

        assert_eq!(report.delivered, 1);
        assert_eq!(han_rx.try_recv().unwrap(), "Chewbacca: Chewbacca has left broom.\n");
        assert!(chewie_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_departure_from_destroyed_room_sends_nothing() {
        let registry = Arc::new(Registry::new());
        let (han, mut han_rx) = register(&registry, "Han Solo");
        registry.create_room(&room("broom"), han.id).unwrap();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let departure = registry.leave_room(Some(&room("broom")), han.id).unwrap();
        let report = broadcaster.announce_departure(departure);

        assert_eq!(report, DeliveryReport::default());
        assert!(han_rx.try_recv().is_err());
    }
}
