//! Unified error type for the Corkboard server.

use corkboard_protocol::ProtocolError;
use corkboard_session::SessionError;
use corkboard_store::StoreError;
use corkboard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Any of these ending a session's handler ends that session only; the
/// accept loop and every other session keep running.
#[derive(Debug, thiserror::Error)]
pub enum CorkboardError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol violation (bad message, wrong message kind, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session registry error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A store error (unknown card, image write failure, board file).
    #[error(transparent)]
    Store(#[from] StoreError),
}
