//! `CorkboardServer` builder and server loop.
//!
//! This is the entry point for running a board. It ties together all the
//! layers: transport → protocol → session → store.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use corkboard_protocol::{Card, Codec, JsonCodec};
use corkboard_store::{CardStore, ImageStore, StoreError};
use corkboard_transport::{Connection, Pending, Transport, TransportError, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::board::Board;
use crate::handler::handle_connection;
use crate::{BoardConfig, CorkboardError};

/// How long a freshly accepted client has to finish the WebSocket
/// handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared server state passed to each connection handler task.
///
/// The board lock serializes every change together with its broadcast.
/// Images have their own lock inside [`ImageStore`].
pub(crate) struct ServerState<C: Codec> {
    pub(crate) board: Mutex<Board<C>>,
    pub(crate) images: ImageStore,
    pub(crate) codec: C,
}

impl<C: Codec> ServerState<C> {
    pub(crate) fn new(board: Board<C>, images: ImageStore, codec: C) -> Self {
        Self {
            board: Mutex::new(board),
            images,
            codec,
        }
    }
}

/// Builder for configuring and starting a Corkboard server.
///
/// # Example
///
/// ```rust,no_run
/// use corkboard::prelude::*;
///
/// # async fn start() -> Result<(), CorkboardError> {
/// let server = CorkboardServer::builder()
///     .bind("0.0.0.0:8080")
///     .board_file("desk.json")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CorkboardServerBuilder {
    config: BoardConfig,
}

impl CorkboardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: BoardConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn board_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.board_file = path.into();
        self
    }

    pub fn data_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_root = path.into();
        self
    }

    pub fn cache_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_root = path.into();
        self
    }

    pub fn link_prefix(mut self, prefix: &str) -> Self {
        self.config.link_prefix = prefix.to_string();
        self
    }

    /// Sets how many grams may wait for one session before it is
    /// disconnected.
    pub fn session_queue(mut self, capacity: usize) -> Self {
        self.config.session_queue = capacity;
        self
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: BoardConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the board, prepares the directories and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Fails if the board file exists but cannot be read as a board, if a
    /// directory cannot be created, or if the address cannot be bound.
    pub async fn build(self) -> Result<CorkboardServer<JsonCodec>, CorkboardError> {
        let config = self.config;

        let cards = CardStore::open(&config.board_file).await?;
        let images = ImageStore::open(&config.data_root, config.link_prefix.as_str()).await?;
        tokio::fs::create_dir_all(&config.cache_root)
            .await
            .map_err(StoreError::Io)?;
        let transport = WebSocketTransport::bind(&config.bind_addr).await?;

        let codec = JsonCodec;
        let board = Board::new(cards, codec, config.session_queue);
        let state = Arc::new(ServerState::new(board, images, codec));

        Ok(CorkboardServer {
            transport,
            handle: ServerHandle { state },
        })
    }
}

impl Default for CorkboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Corkboard server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct CorkboardServer<C: Codec> {
    transport: WebSocketTransport,
    handle: ServerHandle<C>,
}

impl CorkboardServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CorkboardServerBuilder {
        CorkboardServerBuilder::new()
    }
}

impl<C: Codec> CorkboardServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle that stays usable after the server starts running.
    pub fn handle(&self) -> ServerHandle<C> {
        self.handle.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), CorkboardError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Each accepted connection gets its own task, which also runs the
    /// WebSocket handshake, so a client that never completes it holds up
    /// nobody else. A failed accept is logged and the loop carries on. Sessions already running are left
    /// to finish on their own.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), CorkboardError> {
        let addr = self.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(%addr, "Corkboard server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        self.handle.upgrade_and_serve(pending);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
        Ok(())
    }
}

/// Cheap, cloneable access to a server's board.
pub struct ServerHandle<C: Codec> {
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Clone for ServerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: Codec> ServerHandle<C> {
    /// Runs a session on an already-accepted connection in a new task.
    ///
    /// This is how the accept loop serves WebSocket clients; it also
    /// accepts any other [`Connection`], such as an in-memory one.
    pub fn serve<T>(&self, conn: T) -> JoinHandle<()>
    where
        T: Connection<Error = TransportError>,
    {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let conn_id = conn.id();
            if let Err(e) = handle_connection(conn, state).await {
                tracing::debug!(%conn_id, error = %e, "connection ended with error");
            }
        })
    }

    /// Completes the handshake of a freshly accepted connection in a new
    /// task, then runs its session there.
    ///
    /// A handshake that fails or takes longer than five seconds is logged
    /// and the connection is dropped.
    pub fn upgrade_and_serve<P>(&self, pending: P) -> JoinHandle<()>
    where
        P: Pending<Error = TransportError>,
        P::Connection: Connection<Error = TransportError>,
    {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let peer = pending.peer_addr();
            let conn = match tokio::time::timeout(HANDSHAKE_TIMEOUT, pending.upgrade()).await {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    tracing::debug!(?peer, error = %e, "handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(?peer, "handshake timed out");
                    return;
                }
            };
            let conn_id = conn.id();
            if let Err(e) = handle_connection(conn, state).await {
                tracing::debug!(%conn_id, error = %e, "connection ended with error");
            }
        })
    }

    /// A snapshot of every card in board order.
    pub async fn cards(&self) -> Vec<(String, Card)> {
        self.state.board.lock().await.cards()
    }

    /// How many sessions are registered right now.
    pub async fn session_count(&self) -> usize {
        self.state.board.lock().await.session_count()
    }

    /// Reads back a stored image.
    pub async fn image(&self, name: &str) -> Result<Vec<u8>, CorkboardError> {
        Ok(self.state.images.read(name).await?)
    }
}
