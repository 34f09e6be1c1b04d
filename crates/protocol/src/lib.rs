//! chatline protocol
//!
//! Wire types shared by the chatline relay and its clients.
//! Message frames travel as JSON text over WebSocket; the HTTP API
//! returns the same shapes.

pub mod types;

pub use types::*;

/// Avatar marker for an identity: its first character.
///
/// Returns `None` for the empty identity.
pub fn avatar_marker(identity: &str) -> Option<String> {
    identity.chars().next().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::avatar_marker;

    #[test]
    fn avatar_is_first_character() {
        assert_eq!(avatar_marker("alice").as_deref(), Some("a"));
        assert_eq!(avatar_marker("Bob").as_deref(), Some("B"));
    }

    #[test]
    fn avatar_handles_multibyte_first_character() {
        assert_eq!(avatar_marker("élodie").as_deref(), Some("é"));
        assert_eq!(avatar_marker("小明").as_deref(), Some("小"));
    }

    #[test]
    fn empty_identity_has_no_avatar() {
        assert!(avatar_marker("").is_none());
    }
}
