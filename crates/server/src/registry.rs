//! Connection registry: the set of currently reachable peers.
//!
//! One live `Connection` per identity. Every operation takes the same
//! exclusive lock, and fan-out works from an owned snapshot so no lock is
//! held while frames are queued to peers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chatline_protocol::Message;
use tokio::sync::{mpsc, Mutex};

/// Outbound half of a peer's transport, drained by its writer task.
pub type PeerSender = mpsc::Sender<Message>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection id.
pub fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// A registered peer.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: u64,
    pub identity: String,
    pub avatar: String,
    pub tx: PeerSender,
}

impl Connection {
    pub fn new(id: u64, identity: String, tx: PeerSender) -> Self {
        let avatar = chatline_protocol::avatar_marker(&identity).unwrap_or_default();
        Self {
            id,
            identity,
            avatar,
            tx,
        }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `connection.identity`.
    ///
    /// Returns the replaced connection, if any. The replaced peer is not
    /// notified; it simply stops receiving broadcasts.
    pub async fn register(&self, connection: Connection) -> Option<Connection> {
        let mut connections = self.connections.lock().await;
        connections.insert(connection.identity.clone(), connection)
    }

    /// Remove the entry for `identity`, whoever owns it.
    pub async fn deregister(&self, identity: &str) -> Option<Connection> {
        self.connections.lock().await.remove(identity)
    }

    /// Remove the entry for `identity` only if it still belongs to
    /// `connection_id`. A connection that was replaced by a later
    /// handshake must not evict its replacement when it closes.
    pub async fn release(&self, identity: &str, connection_id: u64) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get(identity) {
            Some(existing) if existing.id == connection_id => {
                connections.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// Consistent copy of all live connections, ordered by identity.
    pub async fn snapshot(&self) -> Vec<Connection> {
        let mut peers: Vec<Connection> = self.connections.lock().await.values().cloned().collect();
        peers.sort_by(|a, b| a.identity.cmp(&b.identity));
        peers
    }

    #[cfg(test)]
    pub async fn contains(&self, identity: &str) -> bool {
        self.connections.lock().await.contains_key(identity)
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }
}
