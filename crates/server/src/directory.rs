//! Session directory: chat destinations with a rolling last-message summary.
//!
//! Sessions are pre-provisioned. A message addressed to an unknown id is
//! still logged and broadcast, but never creates a directory entry.

use chatline_protocol::Session;
use chrono::{DateTime, Utc};

pub struct SessionDirectory {
    sessions: Vec<Session>,
}

impl SessionDirectory {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    /// Directory holding only the public room.
    pub fn seeded() -> Self {
        Self::new(vec![Session::public_room()])
    }

    /// Overwrite the summary of session `recipient`.
    ///
    /// Returns `false` when no such session exists; that is a normal outcome.
    pub fn update_summary(
        &mut self,
        recipient: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == recipient) else {
            return false;
        };
        session.last_msg = content.to_string();
        session.last_time = timestamp;
        true
    }

    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_protocol::PUBLIC_ROOM_ID;

    #[test]
    fn seeded_directory_has_only_public_room() {
        let directory = SessionDirectory::seeded();
        assert_eq!(directory.list().len(), 1);
        assert_eq!(directory.list()[0].id, PUBLIC_ROOM_ID);
    }

    #[test]
    fn update_summary_overwrites_existing_session() {
        let mut directory = SessionDirectory::seeded();
        let now = Utc::now();

        assert!(directory.update_summary(PUBLIC_ROOM_ID, "hi", now));

        let room = directory.get(PUBLIC_ROOM_ID).unwrap();
        assert_eq!(room.last_msg, "hi");
        assert_eq!(room.last_time, now);
        assert_eq!(room.unread, 0);
    }

    #[test]
    fn update_summary_for_unknown_id_changes_nothing() {
        let mut directory = SessionDirectory::seeded();
        let before = directory.list().to_vec();

        assert!(!directory.update_summary("nonexistent-id", "hi", Utc::now()));
        assert_eq!(directory.list(), before.as_slice());
        assert!(directory.get("nonexistent-id").is_none());
    }

    #[test]
    fn list_preserves_order() {
        let mut second = Session::public_room();
        second.id = "team".into();
        second.name = "Team".into();
        let directory = SessionDirectory::new(vec![Session::public_room(), second]);

        let ids: Vec<&str> = directory.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, [PUBLIC_ROOM_ID, "team"]);
        assert_eq!(directory.get("team").map(|s| s.name.as_str()), Some("Team"));
    }
}
