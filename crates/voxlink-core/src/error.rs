use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A convenience `Result` alias using [`VoxlinkError`].
pub type VoxlinkResult<T> = Result<T, VoxlinkError>;

/// Top-level error type for the Voxlink client.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum VoxlinkError {
    /// A failure on the bidirectional streaming connection.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A failure acquiring local media devices (mic/camera/display).
    #[error("Capture error: {0}")]
    Capture(String),

    /// A media encode/decode failure (PCM framing, playback buffers).
    #[error("Media error: {0}")]
    Media(String),

    /// An error raised inside a tool handler.
    #[error("Tool error: {0}")]
    Tool(String),

    /// A session lifecycle or persistence error.
    #[error("Session error: {0}")]
    Session(String),

    /// An error in configuration validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured classification of a connection failure.
///
/// The transport layer is expected to classify its own failures; the
/// message-substring fallback in [`TransportError::is_retriable`] exists
/// only for [`TransportErrorKind::Other`] and is deliberately narrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Transient network-level failure (DNS, reset, unreachable).
    Network,
    /// The remote service reported itself unavailable or overloaded.
    Unavailable,
    /// The handshake or an in-flight operation was aborted.
    Aborted,
    /// The session setup payload was rejected.
    InvalidConfig,
    /// Authentication or authorization failure.
    PermissionDenied,
    /// The connection was closed by the remote side.
    Closed,
    /// Unclassified; retriability decided by message inspection.
    Other,
}

/// A connection failure with a structured kind and human-readable message.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    /// Structured failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable detail from the transport layer.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error with the given kind and message.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an unclassified error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    /// Whether a connection attempt that failed with this error is worth
    /// retrying.
    ///
    /// Structured kinds decide directly. `Other` falls back to matching
    /// transient signatures in the message text.
    pub fn is_retriable(&self) -> bool {
        match self.kind {
            TransportErrorKind::Network
            | TransportErrorKind::Unavailable
            | TransportErrorKind::Aborted => true,
            TransportErrorKind::InvalidConfig
            | TransportErrorKind::PermissionDenied
            | TransportErrorKind::Closed => false,
            TransportErrorKind::Other => {
                let lower = self.message.to_lowercase();
                lower.contains("network")
                    || lower.contains("unavailable")
                    || lower.contains("aborted")
            }
        }
    }
}
