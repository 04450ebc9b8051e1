//! In-memory connection pair backed by Tokio channels.
//!
//! [`MemoryConnection`] is the server side and implements [`Connection`];
//! [`MemoryPeer`] is the client side. Unlike the WebSocket transport the
//! peer controls fragmentation, so a single message can be delivered in
//! as many pieces as a test wants.

use tokio::sync::{mpsc, Mutex};

use crate::{Connection, ConnectionId, Fragment, FrameKind, TransportError};

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Fragment>>,
    /// `None` once the connection has been closed by the server.
    outbound: std::sync::Mutex<Option<mpsc::UnboundedSender<(FrameKind, Vec<u8>)>>>,
}

/// Client side of an in-memory connection.
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Fragment>>,
    outbound: mpsc::UnboundedReceiver<(FrameKind, Vec<u8>)>,
}

impl MemoryConnection {
    /// Creates a connected pair.
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let conn = MemoryConnection {
            id: ConnectionId::next(),
            inbound: Mutex::new(in_rx),
            outbound: std::sync::Mutex::new(Some(out_tx)),
        };
        let peer = MemoryPeer {
            inbound: Some(in_tx),
            outbound: out_rx,
        };
        (conn, peer)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(
        &self,
        kind: FrameKind,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let guard = self
            .outbound
            .lock()
            .map_err(|_| TransportError::ConnectionClosed("poisoned".into()))?;
        let tx = guard.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed by server".into())
        })?;
        tx.send((kind, data.to_vec())).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Fragment>, Self::Error> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if let Ok(mut guard) = self.outbound.lock() {
            guard.take();
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryPeer {
    /// Sends one fragment. `end_of_message` marks the last piece.
    pub fn send_fragment(
        &self,
        kind: FrameKind,
        payload: &[u8],
        end_of_message: bool,
    ) -> Result<(), TransportError> {
        let tx = self.inbound.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed by peer".into())
        })?;
        tx.send(Fragment {
            kind,
            payload: payload.to_vec(),
            end_of_message,
        })
        .map_err(|_| TransportError::ConnectionClosed("server dropped".into()))
    }

    /// Sends a whole text message in one fragment.
    pub fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send_fragment(FrameKind::Text, text.as_bytes(), true)
    }

    /// Sends a whole binary message in one fragment.
    pub fn send_binary(&self, data: &[u8]) -> Result<(), TransportError> {
        self.send_fragment(FrameKind::Binary, data, true)
    }

    /// Receives the next message sent by the server.
    ///
    /// Returns `None` once the server has closed the connection and every
    /// queued message has been read.
    pub async fn recv(&mut self) -> Option<(FrameKind, Vec<u8>)> {
        self.outbound.recv().await
    }

    /// Closes the client side; the server's next `recv` yields `Ok(None)`.
    pub fn close(&mut self) {
        self.inbound.take();
    }
}
