//! Transport abstraction layer for Corkboard.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! duplex, message-oriented connections. A connection yields raw
//! [`Fragment`]s; putting them back together into whole messages is the
//! protocol layer's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`
//!
//! The in-memory [`MemoryConnection`] is always available. It lets tests
//! (and embedders) drive a session fragment by fragment without a socket.

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryPeer};
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs, shared by every transport.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    ///
    /// Ids are handed out in increasing order, so sorting by id sorts by
    /// connection time.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Whether a message carries UTF-8 text or raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Text,
    Binary,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// One piece of a logical message as it arrived on the wire.
///
/// A message may be split over any number of fragments. All fragments of
/// one message share the same `kind`, and only the last one has
/// `end_of_message` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
    pub end_of_message: bool,
}

impl Fragment {
    /// A fragment that is a whole message on its own.
    pub fn whole(kind: FrameKind, payload: Vec<u8>) -> Self {
        Self {
            kind,
            payload,
            end_of_message: true,
        }
    }
}

/// Accepts new incoming connections.
///
/// Accepting only takes the next socket off the listener. Any protocol
/// handshake happens later in [`Pending::upgrade`], so a peer that never
/// completes it cannot hold up the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// An accepted socket that has not been upgraded yet.
    type Pending: Pending<Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for and accepts the next incoming socket.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Pending, Self::Error>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted socket waiting for its handshake.
pub trait Pending: Send + 'static {
    /// The connection produced by a successful handshake.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the handshake and yields the connection.
    fn upgrade(
        self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;

    /// The remote address, if known.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// A single duplex connection.
///
/// Methods return `Send` futures so a connection can be driven from a
/// spawned Tokio task. `send` and `recv` may be called concurrently from
/// different tasks.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one complete message to the remote peer.
    fn send(
        &self,
        kind: FrameKind,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next fragment from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Fragment>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_increasing() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b > a, "later connections must sort after earlier ones");
    }

    #[test]
    fn test_fragment_whole_marks_end_of_message() {
        let frag = Fragment::whole(FrameKind::Binary, vec![1, 2]);
        assert!(frag.end_of_message);
        assert_eq!(frag.kind, FrameKind::Binary);
    }

    #[test]
    fn test_frame_kind_display() {
        assert_eq!(FrameKind::Text.to_string(), "text");
        assert_eq!(FrameKind::Binary.to_string(), "binary");
    }
}
