//! Error types for the session layer.

use corkboard_transport::ConnectionId;

/// Errors from the session registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is registered for this connection.
    #[error("session {0} not found")]
    NotFound(ConnectionId),

    /// A session is already registered for this connection.
    #[error("session {0} is already registered")]
    AlreadyRegistered(ConnectionId),

    /// The session's outbound queue is full: its writer is not keeping up.
    #[error("session {0} is not keeping up")]
    Lagging(ConnectionId),

    /// The session's outbound queue is gone: its writer has stopped.
    #[error("session {0} is no longer receiving")]
    Closed(ConnectionId),
}
