//! The session registry: every connected session, in connection order.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. The server keeps it in
//! the same mutex as the card store, so that "change the board, then tell
//! everyone" is a single critical section and no two notifications can
//! ever be observed in different orders by different sessions.

use std::collections::BTreeMap;

use corkboard_protocol::Gram;
use corkboard_transport::ConnectionId;

use crate::{Session, SessionError};

/// Tracks connected sessions and delivers grams to them.
///
/// ```text
/// accept ──→ register() ──→ send_to() / broadcast() ──→ unregister()
/// ```
///
/// Sessions are kept in a `BTreeMap` keyed by [`ConnectionId`]. Ids grow
/// with connection time, so iteration (and therefore broadcast) order is
/// the order in which sessions connected.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<ConnectionId, Session>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the connection already has
    /// one.
    pub fn register(&mut self, session: Session) -> Result<(), SessionError> {
        let id = session.id;
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyRegistered(id));
        }
        self.sessions.insert(id, session);
        tracing::info!(conn_id = %id, sessions = self.sessions.len(), "session registered");
        Ok(())
    }

    /// Removes a session and hands it back.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the connection has no session.
    pub fn unregister(&mut self, id: ConnectionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        tracing::info!(conn_id = %id, sessions = self.sessions.len(), "session unregistered");
        Ok(session)
    }

    /// Delivers a gram to one session.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the connection has no session
    /// - [`SessionError::Lagging`] if its queue is full
    /// - [`SessionError::Closed`] if its writer has stopped
    pub fn send_to(&self, id: ConnectionId, gram: Gram) -> Result<(), SessionError> {
        self.sessions
            .get(&id)
            .ok_or(SessionError::NotFound(id))?
            .send(gram)
    }

    /// Delivers a gram to every registered session, in registry order.
    ///
    /// A session that cannot take the gram, because its queue is full or
    /// its writer has stopped, is removed. Dropping it closes its queue,
    /// so its writer flushes what it has and closes the connection. A
    /// session therefore never silently misses a change. Returns how many
    /// sessions the gram was queued for.
    pub fn broadcast(&mut self, gram: &Gram) -> usize {
        let mut delivered = 0;
        self.sessions.retain(|id, session| match session.send(gram.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "dropping session that cannot take broadcast");
                false
            }
        });
        tracing::debug!(delivered, bytes = gram.len(), "broadcast");
        delivered
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Ids of every registered session, in registry order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
