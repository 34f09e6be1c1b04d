//! Application state

use chatline_protocol::{Message, MessageDraft, Session};
use tokio::sync::Mutex;
use tracing::debug;

use crate::directory::SessionDirectory;
use crate::error::ChatError;
use crate::message_log::MessageLog;
use crate::registry::ConnectionRegistry;

/// Message log and session directory, guarded together.
#[derive(Default)]
pub struct ChatStore {
    pub log: MessageLog,
    pub directory: SessionDirectory,
}

/// Result of recording an inbound message.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub message: Message,
    /// Whether a directory session picked up the message as its summary.
    pub summary_updated: bool,
}

/// Shared server context, created once at startup.
///
/// Two independent critical sections: `connections` (its own lock) and
/// `chat`. Code that needs both must take `chat` first and release it
/// before touching `connections`.
pub struct AppState {
    pub connections: ConnectionRegistry,
    chat: Mutex<ChatStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_directory(SessionDirectory::seeded())
    }

    pub fn with_directory(directory: SessionDirectory) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            chat: Mutex::new(ChatStore {
                log: MessageLog::new(),
                directory,
            }),
        }
    }

    /// Append `draft` to the log and refresh the recipient's summary
    /// in one critical section.
    pub async fn record(&self, draft: MessageDraft) -> Result<Recorded, ChatError> {
        let mut chat = self.chat.lock().await;
        let message = chat.log.append(draft)?;
        let summary_updated =
            chat.directory
                .update_summary(&message.to, &message.content, message.timestamp);
        debug!(
            component = "chat",
            event = "chat.message.recorded",
            message_id = message.id,
            to = %message.to,
            session = chat.directory.get(&message.to).map(|s| s.name.as_str()),
            summary_updated,
            log_len = chat.log.len(),
            "Message recorded"
        );
        Ok(Recorded {
            message,
            summary_updated,
        })
    }

    /// Current session list.
    pub async fn sessions(&self) -> Vec<Session> {
        self.chat.lock().await.directory.list().to_vec()
    }

    /// Messages addressed to `recipient`, in append order.
    pub async fn history(&self, recipient: &str) -> Vec<Message> {
        self.chat
            .lock()
            .await
            .log
            .history(recipient)
            .cloned()
            .collect()
    }

    /// Drop every registration, releasing the registry's handle on each
    /// peer's outbound queue. Returns how many peers were still live.
    pub async fn disconnect_all(&self) -> usize {
        let mut dropped = 0;
        for peer in self.connections.snapshot().await {
            if self.connections.deregister(&peer.identity).await.is_some() {
                dropped += 1;
            }
        }
        dropped
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
