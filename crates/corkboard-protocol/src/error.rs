//! Error types for the protocol layer.
//!
//! Everything in here is a protocol violation from the server's point of
//! view: the session that produced it is ended, other sessions carry on.

use corkboard_transport::FrameKind;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing or unknown
    /// `type` discriminator, or fields of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A complete message of the wrong kind for the session's state,
    /// e.g. binary data with no pending upload.
    #[error("unexpected {kind} message while {state}")]
    UnexpectedGram {
        state: &'static str,
        kind: FrameKind,
    },

    /// A fragment's kind differs from the message it continues.
    #[error("{fragment} fragment continues an open {open} message")]
    KindMismatch { open: FrameKind, fragment: FrameKind },

    /// Data was appended to a message that is already complete.
    #[error("append to a completed message")]
    GramCompleted,

    /// A text message is not valid UTF-8.
    #[error("text message is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}
