//! Append-only message log.
//!
//! Ids start at 1 and grow by one per successful append. The log itself is
//! not synchronized; `state::ChatStore` keeps it behind the chat lock so id
//! allocation and the push happen in one critical section.

use chatline_protocol::{avatar_marker, Message, MessageDraft};
use chrono::Utc;

use crate::error::ChatError;

pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `draft` with the next id, the current time and the sender's
    /// avatar, then append it.
    ///
    /// A draft with an empty sender is rejected without consuming an id.
    pub fn append(&mut self, draft: MessageDraft) -> Result<Message, ChatError> {
        let avatar = avatar_marker(&draft.from).ok_or(ChatError::EmptySender)?;
        let message = Message {
            id: self.next_id,
            from: draft.from,
            to: draft.to,
            content: draft.content,
            timestamp: Utc::now(),
            is_read: false,
            avatar,
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Messages addressed to `recipient`, in append order.
    pub fn history<'a>(&'a self, recipient: &'a str) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages.iter().filter(move |m| m.to == recipient)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(from: &str, to: &str, content: &str) -> MessageDraft {
        MessageDraft::new(from, to, content)
    }

    #[test]
    fn append_stamps_server_fields() {
        let mut log = MessageLog::new();
        let message = log.append(draft("alice", "public-chat", "hi")).unwrap();

        assert_eq!(message.id, 1);
        assert_eq!(message.from, "alice");
        assert_eq!(message.to, "public-chat");
        assert_eq!(message.content, "hi");
        assert!(!message.is_read);
        assert_eq!(message.avatar, "a");
    }

    #[test]
    fn ids_are_sequential_without_gaps() {
        let mut log = MessageLog::new();
        let ids: Vec<u64> = (0..5)
            .map(|i| log.append(draft("bob", "room", &i.to_string())).unwrap().id)
            .collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn empty_sender_is_rejected_without_consuming_an_id() {
        let mut log = MessageLog::new();
        let err = log.append(draft("", "room", "hi")).unwrap_err();
        assert!(matches!(err, ChatError::EmptySender));
        assert_eq!(log.len(), 0);

        let message = log.append(draft("carol", "room", "hi")).unwrap();
        assert_eq!(message.id, 1);
    }

    #[test]
    fn timestamps_do_not_go_backwards() {
        let mut log = MessageLog::new();
        let first = log.append(draft("a", "r", "1")).unwrap();
        let second = log.append(draft("a", "r", "2")).unwrap();
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn history_filters_by_recipient_in_append_order() {
        let mut log = MessageLog::new();
        log.append(draft("alice", "public-chat", "one")).unwrap();
        log.append(draft("bob", "bob-and-alice", "two")).unwrap();
        log.append(draft("bob", "public-chat", "three")).unwrap();

        let contents: Vec<&str> = log
            .history("public-chat")
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["one", "three"]);

        let ids: Vec<u64> = log.history("public-chat").map(|m| m.id).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[test]
    fn history_for_unknown_recipient_is_empty() {
        let mut log = MessageLog::new();
        log.append(draft("alice", "public-chat", "one")).unwrap();
        assert_eq!(log.history("nobody").count(), 0);
    }
}
