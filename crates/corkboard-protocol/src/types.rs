//! Card and command types: everything that travels on the wire as text.
//!
//! Both [`Card`] and [`Command`] are sum types discriminated by a `type`
//! field. Serde's internally tagged representation reads that field
//! wherever it appears in the object, so `{"text":"hi","type":"text"}`
//! decodes the same as `{"type":"text","text":"hi"}`. A missing or
//! unrecognised `type` is a decode error.
//!
//! Variant tags are `snake_case` (`add_card`, `upload_image_card`) and
//! field names are `lowerCamelCase`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// One unit of content on the board.
///
/// ```text
/// {"type":"text","text":"hello"}
/// {"type":"image","filename":"cat.png","link":"/images/cat.png"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Card {
    /// Free text. The only kind of card whose body may be replaced.
    Text { text: String },

    /// A reference to an uploaded image file.
    ///
    /// `link` is filled in by the server; whatever a client sends there is
    /// discarded.
    Image {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<String>,
    },
}

impl Card {
    /// Shorthand for a text card.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Shorthand for an image card with no link yet.
    pub fn image(filename: impl Into<String>) -> Self {
        Self::Image {
            filename: filename.into(),
            link: None,
        }
    }

    /// Returns `true` for [`Card::Text`].
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// The discriminator this card is encoded with.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A protocol command. The same type is used for client requests and for
/// the notifications the server sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Append a card to the board.
    ///
    /// From a client, `id` optionally names the new card. From the server,
    /// it echoes the request's `id`, or carries the stored id when a new
    /// session is being brought up to date.
    AddCard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        card: Card,
    },

    /// Replace the body of an existing text card.
    UpdateCard { id: String, value: Card },

    /// Announce an image upload. The raw image bytes follow in the next
    /// message on the same connection, as a binary message.
    UploadImageCard { card: Card },

    /// Ask for every card id. `ids` is only present in the server's reply.
    ListCardIds {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ids: Option<Vec<String>>,
    },
}

impl Command {
    /// The discriminator this command is encoded with.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddCard { .. } => "add_card",
            Self::UpdateCard { .. } => "update_card",
            Self::UploadImageCard { .. } => "upload_image_card",
            Self::ListCardIds { .. } => "list_card_ids",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! These pin down the exact JSON shapes, since browser clients
    //! match on them by hand.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_card_json_format() {
        let json = serde_json::to_value(Card::text("hello")).unwrap();
        assert_eq!(json, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn test_image_card_without_link_omits_field() {
        let json = serde_json::to_value(Card::image("cat.png")).unwrap();
        assert_eq!(json, json!({"type": "image", "filename": "cat.png"}));
    }

    #[test]
    fn test_image_card_with_link_json_format() {
        let card = Card::Image {
            filename: "cat.png".into(),
            link: Some("/images/cat.png".into()),
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["link"], "/images/cat.png");
    }

    #[test]
    fn test_add_card_serializes_to_exact_bytes() {
        let cmd = Command::AddCard {
            id: None,
            card: Card::text("hello"),
        };
        let text = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            text,
            r#"{"type":"add_card","card":{"type":"text","text":"hello"}}"#
        );
    }

    #[test]
    fn test_update_card_json_format() {
        let cmd = Command::UpdateCard {
            id: "c1".into(),
            value: Card::text("x"),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            json,
            json!({"type": "update_card", "id": "c1", "value": {"type": "text", "text": "x"}})
        );
    }

    #[test]
    fn test_list_card_ids_request_has_no_ids() {
        let cmd: Command =
            serde_json::from_str(r#"{"type":"list_card_ids"}"#).unwrap();
        assert_eq!(cmd, Command::ListCardIds { ids: None });
    }

    #[test]
    fn test_discriminator_may_come_last() {
        let cmd: Command = serde_json::from_str(
            r#"{"card":{"filename":"a.png","type":"image"},"type":"upload_image_card"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::UploadImageCard {
                card: Card::image("a.png")
            }
        );
    }

    #[test]
    fn test_unknown_command_type_is_rejected() {
        let result: Result<Command, _> =
            serde_json::from_str(r#"{"type":"delete_card","id":"c1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_command_type_is_rejected() {
        let result: Result<Command, _> =
            serde_json::from_str(r#"{"card":{"type":"text","text":"a"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_card_type_is_rejected() {
        let result: Result<Card, _> =
            serde_json::from_str(r#"{"type":"video","url":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_matches_encoded_discriminator() {
        let commands = [
            Command::AddCard {
                id: Some("a".into()),
                card: Card::text("t"),
            },
            Command::UpdateCard {
                id: "a".into(),
                value: Card::text("t"),
            },
            Command::UploadImageCard {
                card: Card::image("i.png"),
            },
            Command::ListCardIds {
                ids: Some(vec!["a".into()]),
            },
        ];
        for cmd in commands {
            let json = serde_json::to_value(&cmd).unwrap();
            assert_eq!(json["type"], cmd.kind());
        }
    }
}
