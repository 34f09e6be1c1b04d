//! Error types for the relay core and its configuration.

use thiserror::Error;

/// Failures scoped to a single connection.
///
/// None of these are surfaced to peers; the affected connection is closed.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message sender is empty")]
    EmptySender,

    #[error("handshake identity is empty")]
    EmptyIdentity,

    #[error("malformed message frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    #[error("frame is not valid UTF-8: {0}")]
    NonUtf8Frame(#[from] std::string::FromUtf8Error),

    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
