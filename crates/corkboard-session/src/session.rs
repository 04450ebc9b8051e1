//! A single connected session and its outbound queue.

use std::time::Instant;

use corkboard_protocol::Gram;
use corkboard_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

/// The receiving end of a session's outbound queue, drained by the
/// connection's writer task.
pub type Outbox = mpsc::Receiver<Gram>;

/// The registry's record of one connected client.
///
/// Created when a connection is accepted, dropped when it closes. Dropping
/// the `Session` closes its queue, which lets the writer task finish.
#[derive(Debug)]
pub struct Session {
    /// The connection this session lives on.
    pub id: ConnectionId,

    /// When the session was registered.
    pub connected_at: Instant,

    sender: mpsc::Sender<Gram>,
}

impl Session {
    /// Creates a session and the queue its writer task reads from.
    ///
    /// The queue holds at most `capacity` grams (at least one). A session
    /// whose writer falls that far behind is treated as gone.
    pub fn new(id: ConnectionId, capacity: usize) -> (Self, Outbox) {
        let (sender, outbox) = mpsc::channel(capacity.max(1));
        let session = Self {
            id,
            connected_at: Instant::now(),
            sender,
        };
        (session, outbox)
    }

    /// Queues a gram for delivery without waiting.
    ///
    /// # Errors
    /// - [`SessionError::Lagging`] if the queue is full
    /// - [`SessionError::Closed`] if the writer task has already stopped
    pub fn send(&self, gram: Gram) -> Result<(), SessionError> {
        self.sender.try_send(gram).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::Lagging(self.id),
            TrySendError::Closed(_) => SessionError::Closed(self.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_to_full_queue_returns_lagging() {
        let (session, mut outbox) = Session::new(ConnectionId::new(1), 2);
        session.send(Gram::text(b"a".to_vec())).unwrap();
        session.send(Gram::text(b"b".to_vec())).unwrap();

        assert!(matches!(
            session.send(Gram::text(b"c".to_vec())),
            Err(SessionError::Lagging(_))
        ));

        outbox.try_recv().unwrap();
        session.send(Gram::text(b"c".to_vec())).unwrap();
    }

    #[test]
    fn test_send_after_outbox_dropped_returns_closed() {
        let (session, outbox) = Session::new(ConnectionId::new(1), 4);
        drop(outbox);
        assert!(matches!(
            session.send(Gram::text(b"a".to_vec())),
            Err(SessionError::Closed(_))
        ));
    }

    #[test]
    fn test_new_with_zero_capacity_still_holds_one() {
        let (session, _outbox) = Session::new(ConnectionId::new(1), 0);
        session.send(Gram::text(b"a".to_vec())).unwrap();
    }
}
