//! Fan-out of stamped messages to every peer but the sender.

use chatline_protocol::Message;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use crate::registry::ConnectionRegistry;

/// Queue `message` for every registered peer except `message.from`.
///
/// Best-effort: a full or closed peer is skipped so one slow or dead
/// connection cannot hold up the rest. Returns how many peers accepted
/// the frame.
pub async fn broadcast(registry: &ConnectionRegistry, message: &Message) -> usize {
    let peers = registry.snapshot().await;
    let mut delivered = 0;

    for peer in peers.iter().filter(|p| p.identity != message.from) {
        match peer.tx.try_send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                debug!(
                    component = "broadcast",
                    event = "broadcast.peer_full",
                    connection_id = peer.id,
                    identity = %peer.identity,
                    message_id = message.id,
                    "Peer outbound queue full, frame dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    component = "broadcast",
                    event = "broadcast.peer_closed",
                    connection_id = peer.id,
                    identity = %peer.identity,
                    message_id = message.id,
                    "Peer outbound queue closed, frame dropped"
                );
            }
        }
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{next_connection_id, Connection};
    use chatline_protocol::MessageDraft;
    use tokio::sync::mpsc;

    use crate::message_log::MessageLog;

    fn stamped(from: &str) -> Message {
        MessageLog::new()
            .append(MessageDraft::new(from, "public-chat", "hi"))
            .unwrap()
    }

    async fn join(
        registry: &ConnectionRegistry,
        identity: &str,
        capacity: usize,
    ) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(capacity);
        registry
            .register(Connection::new(next_connection_id(), identity.into(), tx))
            .await;
        rx
    }

    #[tokio::test]
    async fn delivers_to_everyone_but_sender() {
        let registry = ConnectionRegistry::new();
        let mut alice = join(&registry, "alice", 4).await;
        let mut bob = join(&registry, "bob", 4).await;
        let mut carol = join(&registry, "carol", 4).await;

        let message = stamped("alice");
        assert_eq!(broadcast(&registry, &message).await, 2);

        assert_eq!(bob.try_recv().unwrap(), message);
        assert_eq!(carol.try_recv().unwrap(), message);
        assert!(alice.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_peer_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let gone = join(&registry, "bob", 4).await;
        drop(gone);
        let mut carol = join(&registry, "carol", 4).await;

        let message = stamped("alice");
        assert_eq!(broadcast(&registry, &message).await, 1);
        assert_eq!(carol.try_recv().unwrap(), message);
        // A dead peer stays registered until its own handler closes.
        assert!(registry.contains("bob").await);
    }

    #[tokio::test]
    async fn full_peer_is_skipped() {
        let registry = ConnectionRegistry::new();
        let mut slow = join(&registry, "bob", 1).await;
        let mut carol = join(&registry, "carol", 4).await;

        let first = stamped("alice");
        let second = stamped("alice");
        broadcast(&registry, &first).await;
        assert_eq!(broadcast(&registry, &second).await, 1);

        assert_eq!(slow.try_recv().unwrap(), first);
        assert!(slow.try_recv().is_err());
        assert_eq!(carol.try_recv().unwrap(), first);
        assert_eq!(carol.try_recv().unwrap(), second);
    }

    #[tokio::test]
    async fn empty_registry_delivers_nothing() {
        let registry = ConnectionRegistry::new();
        assert_eq!(broadcast(&registry, &stamped("alice")).await, 0);
    }
}
