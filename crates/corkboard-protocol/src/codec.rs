//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The rest of the server only needs something that implements
//! [`Codec`]; [`JsonCodec`] is the one the browser client speaks.

use serde::{de::DeserializeOwned, Serialize};

use crate::{Gram, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec can be shared by every session
/// task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Encodes a value as a completed text [`Gram`], ready to send.
    fn encode_gram<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Gram, ProtocolError> {
        Ok(Gram::text(self.encode(value)?))
    }

    /// Decodes a completed text [`Gram`].
    ///
    /// # Errors
    /// Fails if the gram is binary or not valid UTF-8, as well as on
    /// any decode error.
    fn decode_gram<T: DeserializeOwned>(
        &self,
        gram: &Gram,
    ) -> Result<T, ProtocolError> {
        let text = gram.as_text()?;
        self.decode(text.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use corkboard_protocol::{Card, Codec, Command, JsonCodec};
///
/// let codec = JsonCodec;
/// let cmd = Command::AddCard { id: None, card: Card::text("hello") };
///
/// let bytes = codec.encode(&cmd).unwrap();
/// let decoded: Command = codec.decode(&bytes).unwrap();
/// assert_eq!(cmd, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
