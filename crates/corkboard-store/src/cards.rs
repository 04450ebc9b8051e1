//! The card store: every card on the board, keyed by id, in the order
//! the cards were added.
//!
//! The store is a plain single-owner structure. It is not thread-safe by
//! itself; the server keeps it behind the same lock as the session
//! registry so that a mutation and its broadcast form one step.
//!
//! # Board file
//!
//! ```json
//! {
//!   "cards": {
//!     "3f9a0c1d2e4b5a67": { "type": "text", "text": "hello" }
//!   }
//! }
//! ```
//!
//! Entries are written and read back in board order. Before a save
//! overwrites the file, the previous version is copied to
//! `<file>.backup`. If an id appears twice in a file, the later card
//! wins and keeps the earlier position.

use std::path::{Path, PathBuf};

use corkboard_protocol::Card;
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Every card on the board.
#[derive(Debug, Default)]
pub struct CardStore {
    /// Cards in insertion order. Positions never change: there is no
    /// removal.
    cards: IndexMap<String, Card>,

    /// Where [`save`](Self::save) writes to. Set by [`open`](Self::open)
    /// and [`load`](Self::load).
    path: Option<PathBuf>,
}

/// The board file document.
#[derive(Serialize, Deserialize)]
struct BoardFile<C> {
    cards: C,
}

impl CardStore {
    /// Creates an empty store with no board file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the board file at `path`.
    ///
    /// A missing file is not an error: the board starts empty and the
    /// file is created by the first save. A malformed file is an error,
    /// so that it is never silently overwritten.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::new();
        match store.load(&path).await {
            Ok(()) => {}
            Err(StoreError::Missing(_)) => {
                tracing::warn!(
                    path = %path.display(),
                    "board file not found, starting with an empty board"
                );
                store.path = Some(path);
            }
            Err(e) => return Err(e),
        }
        Ok(store)
    }

    /// Replaces the in-memory cards with the contents of `path`, and
    /// makes `path` the save target.
    ///
    /// # Errors
    /// - [`StoreError::Missing`] if the file does not exist
    /// - [`StoreError::Malformed`] if it is not a board document
    pub async fn load(&mut self, path: &Path) -> Result<(), StoreError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(path.to_path_buf()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        let file: BoardFile<IndexMap<String, Card>> =
            serde_json::from_slice(&bytes).map_err(StoreError::Malformed)?;

        self.cards = file.cards;
        self.path = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            cards = self.cards.len(),
            "board loaded"
        );
        Ok(())
    }

    /// Writes every card to the board file, keeping a `.backup` of the
    /// previous version.
    pub async fn save(&self) -> Result<(), StoreError> {
        let path = self.path.as_deref().ok_or(StoreError::NoPath)?;
        self.save_to(path).await
    }

    /// Like [`save`](Self::save) but to an explicit path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if tokio::fs::try_exists(path).await? {
            tokio::fs::copy(path, backup_path(path)).await?;
        }
        let doc = BoardFile { cards: &self.cards };
        let mut bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| StoreError::Io(e.into()))?;
        bytes.push(b'\n');
        tokio::fs::write(path, bytes).await?;
        tracing::debug!(
            path = %path.display(),
            cards = self.cards.len(),
            "board saved"
        );
        Ok(())
    }

    /// Adds a card under a freshly generated id and returns the id.
    pub fn append(&mut self, card: Card) -> String {
        let id = loop {
            let candidate = generate_id();
            if !self.cards.contains_key(&candidate) {
                break candidate;
            }
        };
        self.cards.insert(id.clone(), card);
        id
    }

    /// Adds a card under a caller-chosen id.
    ///
    /// # Errors
    /// [`StoreError::DuplicateId`] if the id is taken.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        card: Card,
    ) -> Result<(), StoreError> {
        let id = id.into();
        if self.cards.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        self.cards.insert(id, card);
        Ok(())
    }

    /// Replaces the body of the text card stored under `id`.
    ///
    /// # Errors
    /// - [`StoreError::CardNotFound`] if no card has this id
    /// - [`StoreError::Immutable`] if either the stored card or the new
    ///   value is not a text card
    pub fn update(&mut self, id: &str, card: Card) -> Result<(), StoreError> {
        let slot = self
            .cards
            .get_mut(id)
            .ok_or_else(|| StoreError::CardNotFound(id.to_string()))?;
        if !slot.is_text() || !card.is_text() {
            return Err(StoreError::Immutable(id.to_string()));
        }
        *slot = card;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.contains_key(id)
    }

    /// A snapshot of every `(id, card)` pair in board order.
    pub fn list(&self) -> Vec<(String, Card)> {
        self.cards
            .iter()
            .map(|(id, card)| (id.clone(), card.clone()))
            .collect()
    }

    /// Iterates `(id, card)` pairs in board order without copying.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Card)> {
        self.cards.iter().map(|(id, card)| (id.as_str(), card))
    }

    /// Every id in board order.
    pub fn ids(&self) -> Vec<String> {
        self.cards.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The file [`save`](Self::save) writes to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// `desk.json` → `desk.json.backup`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

/// 16 lowercase hex digits (64 random bits).
fn generate_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
