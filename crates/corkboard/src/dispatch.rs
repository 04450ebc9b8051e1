//! Per-session protocol state machine.
//!
//! ```text
//!                   text: add_card / update_card / list_card_ids
//!                 ┌─────┐
//!                 ▼     │
//!          ┌─────────────────┐  text: upload_image_card  ┌────────────────────────┐
//!   ──────→│ AwaitingCommand │──────────────────────────→│ AwaitingBinaryPayload  │
//!          └─────────────────┘←──────────────────────────└────────────────────────┘
//!                  │                 binary: image bytes              │
//!                  │ binary                                      text │
//!                  ▼                                                  ▼
//!                error                                              error
//! ```
//!
//! Any error returned from [`Dispatcher::handle`] ends the session.

use std::sync::Arc;

use corkboard_protocol::{Card, Codec, Command, FrameKind, Gram, ProtocolError};
use corkboard_transport::ConnectionId;

use crate::server::ServerState;
use crate::CorkboardError;

/// Where a session is in the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherState {
    /// Expecting a text command.
    AwaitingCommand,

    /// An `upload_image_card` was received; the next message must be the
    /// image bytes.
    AwaitingBinaryPayload { filename: String },
}

impl DispatcherState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingCommand => "awaiting_command",
            Self::AwaitingBinaryPayload { .. } => "awaiting_binary_payload",
        }
    }
}

/// Interprets one session's grams as commands.
pub struct Dispatcher<C: Codec> {
    conn_id: ConnectionId,
    state: DispatcherState,
    shared: Arc<ServerState<C>>,
}

impl<C: Codec> Dispatcher<C> {
    pub(crate) fn new(conn_id: ConnectionId, shared: Arc<ServerState<C>>) -> Self {
        Self {
            conn_id,
            state: DispatcherState::AwaitingCommand,
            shared,
        }
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    /// Handles one completed gram.
    ///
    /// # Errors
    /// - [`ProtocolError::UnexpectedGram`] for a binary gram with no upload
    ///   pending, or a text gram while one is
    /// - [`ProtocolError::Decode`] for text that is not a command
    /// - any error from applying the command to the board
    pub async fn handle(&mut self, gram: Gram) -> Result<(), CorkboardError> {
        match (&self.state, gram.kind()) {
            (DispatcherState::AwaitingCommand, FrameKind::Text) => {
                let command: Command = self.shared.codec.decode_gram(&gram)?;
                tracing::debug!(conn_id = %self.conn_id, command = command.kind(), "command");
                self.apply(command).await
            }
            (DispatcherState::AwaitingBinaryPayload { .. }, FrameKind::Binary) => {
                self.finish_upload(gram).await
            }
            (state, kind) => Err(ProtocolError::UnexpectedGram {
                state: state.name(),
                kind,
            }
            .into()),
        }
    }

    async fn apply(&mut self, command: Command) -> Result<(), CorkboardError> {
        match command {
            Command::AddCard { id, card } => {
                let card = match card {
                    Card::Image { filename, .. } => {
                        let filename = self.shared.images.resolve(&filename).await?;
                        let link = self.shared.images.link_for(&filename);
                        Card::Image {
                            filename,
                            link: Some(link),
                        }
                    }
                    text => text,
                };
                self.shared.board.lock().await.add_card(id, card).await?;
            }
            Command::UpdateCard { id, value } => {
                self.shared.board.lock().await.update_card(id, value).await?;
            }
            Command::UploadImageCard {
                card: Card::Image { filename, .. },
            } => {
                tracing::debug!(conn_id = %self.conn_id, %filename, "awaiting image bytes");
                self.state = DispatcherState::AwaitingBinaryPayload { filename };
            }
            Command::UploadImageCard { card } => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "upload_image_card needs an image card, got {}",
                    card.kind()
                ))
                .into());
            }
            Command::ListCardIds { .. } => {
                self.shared.board.lock().await.list_card_ids(self.conn_id)?;
            }
        }
        Ok(())
    }

    /// Writes the pending image, then announces its card.
    ///
    /// The file is written and synced before the board lock is taken.
    async fn finish_upload(&mut self, gram: Gram) -> Result<(), CorkboardError> {
        let DispatcherState::AwaitingBinaryPayload { filename } =
            std::mem::replace(&mut self.state, DispatcherState::AwaitingCommand)
        else {
            return Err(ProtocolError::UnexpectedGram {
                state: DispatcherState::AwaitingCommand.name(),
                kind: gram.kind(),
            }
            .into());
        };

        let stored = self.shared.images.add(&filename, gram.data()).await?;
        let card = Card::Image {
            link: Some(self.shared.images.link_for(&stored)),
            filename: stored,
        };
        let card_id = self.shared.board.lock().await.add_card(None, card).await?;
        tracing::info!(conn_id = %self.conn_id, %card_id, bytes = gram.len(), "image card added");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corkboard_protocol::JsonCodec;
    use corkboard_session::Outbox;
    use corkboard_store::{CardStore, ImageStore, StoreError};

    use crate::board::Board;

    struct Fixture {
        _dir: tempfile::TempDir,
        shared: Arc<ServerState<JsonCodec>>,
        dispatcher: Dispatcher<JsonCodec>,
        outbox: Outbox,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path().join("data"), "/images")
            .await
            .unwrap();
        let board = Board::new(CardStore::new(), JsonCodec, 64);
        let shared = Arc::new(ServerState::new(board, images, JsonCodec));

        let conn_id = ConnectionId::new(1);
        let outbox = shared.board.lock().await.join(conn_id).unwrap();

        let dispatcher = Dispatcher::new(conn_id, Arc::clone(&shared));
        Fixture {
            _dir: dir,
            shared,
            dispatcher,
            outbox,
        }
    }

    fn text(json: &str) -> Gram {
        Gram::text(json.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_handle_upload_then_binary_stores_linked_card() {
        let mut f = fixture().await;

        f.dispatcher
            .handle(text(r#"{"type":"upload_image_card","card":{"type":"image","filename":"cat.png"}}"#))
            .await
            .unwrap();
        assert_eq!(
            f.dispatcher.state(),
            &DispatcherState::AwaitingBinaryPayload { filename: "cat.png".into() }
        );

        f.dispatcher.handle(Gram::binary(b"PNGDATA".to_vec())).await.unwrap();

        assert_eq!(f.dispatcher.state(), &DispatcherState::AwaitingCommand);
        let cards = f.shared.board.lock().await.cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(
            cards[0].1,
            Card::Image {
                filename: "cat.png".into(),
                link: Some("/images/cat.png".into())
            }
        );
        assert_eq!(f.shared.images.read("cat.png").await.unwrap(), b"PNGDATA");

        let note: Command = JsonCodec.decode_gram(&f.outbox.try_recv().unwrap()).unwrap();
        assert_eq!(note, Command::AddCard { id: None, card: cards[0].1.clone() });
    }

    #[tokio::test]
    async fn test_handle_binary_without_upload_is_unexpected() {
        let mut f = fixture().await;
        let result = f.dispatcher.handle(Gram::binary(vec![1, 2, 3])).await;
        assert!(matches!(
            result,
            Err(CorkboardError::Protocol(ProtocolError::UnexpectedGram {
                kind: FrameKind::Binary,
                ..
            }))
        ));
        assert!(f.shared.board.lock().await.cards().is_empty());
    }

    #[tokio::test]
    async fn test_handle_upload_twice_is_unexpected() {
        let mut f = fixture().await;
        let upload = r#"{"type":"upload_image_card","card":{"type":"image","filename":"a.png"}}"#;
        f.dispatcher.handle(text(upload)).await.unwrap();

        let result = f.dispatcher.handle(text(upload)).await;

        assert!(matches!(
            result,
            Err(CorkboardError::Protocol(ProtocolError::UnexpectedGram {
                state: "awaiting_binary_payload",
                kind: FrameKind::Text,
            }))
        ));
        assert!(f.outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_upload_with_text_card_is_invalid() {
        let mut f = fixture().await;
        let result = f
            .dispatcher
            .handle(text(r#"{"type":"upload_image_card","card":{"type":"text","text":"no"}}"#))
            .await;
        assert!(matches!(
            result,
            Err(CorkboardError::Protocol(ProtocolError::InvalidMessage(_)))
        ));
        assert_eq!(f.dispatcher.state(), &DispatcherState::AwaitingCommand);
    }

    #[tokio::test]
    async fn test_handle_unsupported_image_announces_nothing() {
        let mut f = fixture().await;
        f.dispatcher
            .handle(text(r#"{"type":"upload_image_card","card":{"type":"image","filename":"notes.txt"}}"#))
            .await
            .unwrap();

        let result = f.dispatcher.handle(Gram::binary(b"text".to_vec())).await;

        assert!(matches!(
            result,
            Err(CorkboardError::Store(StoreError::UnsupportedImage(_)))
        ));
        assert!(f.outbox.try_recv().is_err());
        assert!(f.shared.board.lock().await.cards().is_empty());
    }

    #[tokio::test]
    async fn test_handle_add_card_echoes_exact_bytes() {
        let mut f = fixture().await;
        let hello = r#"{"type":"add_card","card":{"type":"text","text":"hello"}}"#;

        f.dispatcher.handle(text(hello)).await.unwrap();

        assert_eq!(f.outbox.try_recv().unwrap().data(), hello.as_bytes());
        let cards = f.shared.board.lock().await.cards();
        assert_eq!(cards.last().map(|(_, c)| c), Some(&Card::text("hello")));
    }

    #[tokio::test]
    async fn test_handle_add_image_card_requires_stored_image() {
        let mut f = fixture().await;
        let add = r#"{"type":"add_card","card":{"type":"image","filename":"dog.png","link":"http://evil"}}"#;

        let missing = f.dispatcher.handle(text(add)).await;
        assert!(matches!(
            missing,
            Err(CorkboardError::Store(StoreError::ImageNotFound(_)))
        ));

        f.shared.images.add("dog.png", b"woof").await.unwrap();
        f.dispatcher.handle(text(add)).await.unwrap();

        let cards = f.shared.board.lock().await.cards();
        assert_eq!(
            cards[0].1,
            Card::Image {
                filename: "dog.png".into(),
                link: Some("/images/dog.png".into())
            }
        );
    }

    #[tokio::test]
    async fn test_handle_update_missing_id_fails_without_broadcast() {
        let mut f = fixture().await;
        let result = f
            .dispatcher
            .handle(text(r#"{"type":"update_card","id":"missing-id","value":{"type":"text","text":"x"}}"#))
            .await;
        assert!(matches!(
            result,
            Err(CorkboardError::Store(StoreError::CardNotFound(_)))
        ));
        assert!(f.outbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_undecodable_text_is_decode_error() {
        let mut f = fixture().await;
        let result = f.dispatcher.handle(text(r#"{"type":"delete_card","id":"x"}"#)).await;
        assert!(matches!(
            result,
            Err(CorkboardError::Protocol(ProtocolError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_handle_list_card_ids_replies_with_ids() {
        let mut f = fixture().await;
        f.dispatcher
            .handle(text(r#"{"type":"add_card","id":"c1","card":{"type":"text","text":"a"}}"#))
            .await
            .unwrap();
        f.outbox.try_recv().unwrap();

        f.dispatcher.handle(text(r#"{"type":"list_card_ids"}"#)).await.unwrap();

        assert_eq!(
            f.outbox.try_recv().unwrap().data(),
            br#"{"type":"list_card_ids","ids":["c1"]}"#
        );
    }
}
