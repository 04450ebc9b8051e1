//! The board: every card and every session, behind one lock.
//!
//! A [`Board`] owns both the [`CardStore`] and the [`SessionRegistry`].
//! The server keeps it in a single `tokio::sync::Mutex`, and every method
//! here that changes the cards also queues the resulting notification for
//! every session before returning. Queueing never waits on the network, so
//! the lock is held only for in-memory work plus the board file write. A
//! session whose queue is full is dropped instead of waited for.
//!
//! ```text
//! dispatcher ──lock──→ Board::add_card ──→ CardStore::insert
//!                                      ──→ CardStore::save
//!                                      ──→ SessionRegistry::broadcast
//!            ←unlock──
//! ```

use corkboard_protocol::{Card, Codec, Command};
use corkboard_session::{Outbox, Session, SessionRegistry};
use corkboard_store::CardStore;
use corkboard_transport::ConnectionId;

use crate::CorkboardError;

/// Cards plus the sessions that watch them.
pub struct Board<C: Codec> {
    cards: CardStore,
    registry: SessionRegistry,
    codec: C,
    /// Grams a session may have queued on top of its join backlog.
    queue_capacity: usize,
}

impl<C: Codec> Board<C> {
    pub fn new(cards: CardStore, codec: C, queue_capacity: usize) -> Self {
        Self {
            cards,
            registry: SessionRegistry::new(),
            codec,
            queue_capacity,
        }
    }

    /// Registers a session for `conn_id` and queues one `add_card` per
    /// stored card for it, in board order. Returns the queue the
    /// connection's writer drains.
    ///
    /// Because this runs under the board lock, the new session sees every
    /// card exactly once: either in this backlog, or in a later broadcast.
    /// The queue is sized so the whole backlog fits.
    pub fn join(&mut self, conn_id: ConnectionId) -> Result<Outbox, CorkboardError> {
        let backlog = self
            .cards
            .iter()
            .map(|(id, card)| {
                self.codec.encode_gram(&Command::AddCard {
                    id: Some(id.to_string()),
                    card: card.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (session, outbox) = Session::new(conn_id, self.queue_capacity + backlog.len());
        self.registry.register(session)?;
        let cards = backlog.len();
        for gram in backlog {
            self.registry.send_to(conn_id, gram)?;
        }
        tracing::info!(%conn_id, cards, "session joined");
        Ok(outbox)
    }

    /// Removes a session. Dropping it closes its outbound queue.
    pub fn leave(&mut self, conn_id: ConnectionId) {
        match self.registry.unregister(conn_id) {
            Ok(session) => {
                tracing::info!(
                    %conn_id,
                    connected_for = ?session.connected_at.elapsed(),
                    "session left"
                );
            }
            Err(e) => tracing::debug!(%conn_id, error = %e, "leave ignored"),
        }
    }

    /// Stores a card and tells every session about it.
    ///
    /// With `id` the card is stored under that id; without, a fresh one is
    /// generated. The notification carries `id` exactly as given. Returns
    /// the stored id.
    ///
    /// # Errors
    /// [`StoreError::DuplicateId`](corkboard_store::StoreError::DuplicateId)
    /// if `id` is already taken. Nothing is stored or sent in that case.
    pub async fn add_card(
        &mut self,
        id: Option<String>,
        card: Card,
    ) -> Result<String, CorkboardError> {
        let notification = self.codec.encode_gram(&Command::AddCard {
            id: id.clone(),
            card: card.clone(),
        })?;

        let card_id = match id {
            Some(id) => {
                self.cards.insert(id.clone(), card)?;
                id
            }
            None => self.cards.append(card),
        };
        tracing::debug!(%card_id, cards = self.cards.len(), "card added");

        self.persist().await;
        self.registry.broadcast(&notification);
        Ok(card_id)
    }

    /// Replaces a text card's body and tells every session about it.
    ///
    /// # Errors
    /// - [`StoreError::CardNotFound`](corkboard_store::StoreError::CardNotFound)
    ///   for an unknown id
    /// - [`StoreError::Immutable`](corkboard_store::StoreError::Immutable)
    ///   unless both the stored card and `value` are text
    pub async fn update_card(
        &mut self,
        id: String,
        value: Card,
    ) -> Result<(), CorkboardError> {
        let notification = self.codec.encode_gram(&Command::UpdateCard {
            id: id.clone(),
            value: value.clone(),
        })?;

        self.cards.update(&id, value)?;
        tracing::debug!(card_id = %id, "card updated");

        self.persist().await;
        self.registry.broadcast(&notification);
        Ok(())
    }

    /// Sends the current id list to one session only.
    pub fn list_card_ids(
        &self,
        requester: ConnectionId,
    ) -> Result<(), CorkboardError> {
        let reply = self.codec.encode_gram(&Command::ListCardIds {
            ids: Some(self.cards.ids()),
        })?;
        self.registry.send_to(requester, reply)?;
        Ok(())
    }

    /// A snapshot of every card in board order.
    pub fn cards(&self) -> Vec<(String, Card)> {
        self.cards.list()
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Saves the board file. A failure is logged and the in-memory board
    /// stays authoritative; the next change tries again.
    async fn persist(&self) {
        if self.cards.path().is_none() {
            return;
        }
        if let Err(e) = self.cards.save().await {
            tracing::warn!(error = %e, "failed to save board");
        }
    }
}
