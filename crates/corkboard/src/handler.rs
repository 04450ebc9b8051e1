//! Per-connection handler: join, read loop, cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the session and queue the board's backlog for it
//!   2. Spawn a writer task that drains the session's queue to the socket
//!   3. Loop: receive fragments → reassemble grams → dispatch commands
//!   4. On any exit, unregister; the writer flushes what is left and
//!      closes the connection

use std::sync::Arc;

use corkboard_protocol::{Codec, Reassembler};
use corkboard_session::Outbox;
use corkboard_transport::{Connection, ConnectionId, TransportError};

use crate::dispatch::Dispatcher;
use crate::server::ServerState;
use crate::CorkboardError;

/// Drop guard that removes a session from the board when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct SessionGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.board.lock().await.leave(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<T, C>(
    conn: T,
    state: Arc<ServerState<C>>,
) -> Result<(), CorkboardError>
where
    T: Connection<Error = TransportError>,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Join and guard together: if joining fails there is nothing to clean
    // up, if it succeeds the guard is immediately active.
    let outbox = state.board.lock().await.join(conn_id)?;
    let _guard = SessionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    tokio::spawn(write_outbox(Arc::clone(&conn), outbox));

    let result = read_loop(conn.as_ref(), &state).await;
    if let Err(e) = &result {
        tracing::info!(%conn_id, error = %e, "session aborted");
    }

    // _guard drops here → leave fires → outbox closes → writer closes.
    // A session dropped for lagging has its outbox closed already.
    result
}

/// Receives until the peer closes or something goes wrong.
async fn read_loop<T, C>(
    conn: &T,
    state: &Arc<ServerState<C>>,
) -> Result<(), CorkboardError>
where
    T: Connection<Error = TransportError>,
    C: Codec,
{
    let conn_id = conn.id();
    let mut reassembler = Reassembler::new();
    let mut dispatcher = Dispatcher::new(conn_id, Arc::clone(state));

    while let Some(fragment) = conn.recv().await? {
        if let Some(gram) = reassembler.push(fragment)? {
            tracing::debug!(%conn_id, kind = %gram.kind(), bytes = gram.len(), "gram received");
            dispatcher.handle(gram).await?;
        }
    }

    tracing::info!(%conn_id, "connection closed cleanly");
    Ok(())
}

/// Sends queued grams in order, then closes the connection once the
/// session's queue is closed.
async fn write_outbox<T>(conn: Arc<T>, mut outbox: Outbox)
where
    T: Connection<Error = TransportError>,
{
    let conn_id = conn.id();
    while let Some(gram) = outbox.recv().await {
        if let Err(e) = conn.send(gram.kind(), gram.data()).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}
