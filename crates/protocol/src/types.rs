//! Core types shared across the protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the room every relay starts with.
pub const PUBLIC_ROOM_ID: &str = "public-chat";

/// A chat message as stored, broadcast and echoed by the relay.
///
/// Everything except `from`, `to` and `content` is assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub from: String,
    pub to: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub avatar: String,
}

/// The client-populated part of a message frame.
///
/// Server-assigned fields a client may include (`id`, `timestamp`,
/// `is_read`, `avatar`) are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub content: String,
}

impl MessageDraft {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            content: content.into(),
        }
    }
}

/// A chat destination with a rolling summary of its latest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub is_group: bool,
    pub last_msg: String,
    pub last_time: DateTime<Utc>,
    /// Reserved; the relay has no read receipts and never increments it.
    pub unread: u32,
}

impl Session {
    /// The public room seeded into every directory at startup.
    pub fn public_room() -> Self {
        Self {
            id: PUBLIC_ROOM_ID.to_string(),
            name: "公共聊天室".to_string(),
            avatar: "https://img.icons8.com/fluency/96/000000/chat.png".to_string(),
            is_group: true,
            last_msg: "欢迎加入公共聊天室".to_string(),
            last_time: Utc::now(),
            unread: 0,
        }
    }
}
