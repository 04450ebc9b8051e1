//! Grams: whole logical messages rebuilt from transport fragments.
//!
//! A [`Gram`] accumulates the payloads of consecutive fragments until one
//! arrives with `end_of_message` set. From then on it is read-only. The
//! [`Reassembler`] holds at most one open gram per connection and hands
//! each gram out exactly once, when it completes.
//!
//! ```text
//! Fragment(text, "{\"ty", more)  ─┐
//! Fragment(text, "pe\":", more)  ─┼─→ Gram(text, "{\"type\":...}", completed)
//! Fragment(text, "...}", end)    ─┘
//! ```

use corkboard_transport::{Fragment, FrameKind};

use crate::ProtocolError;

/// One reassembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gram {
    kind: FrameKind,
    data: Vec<u8>,
    completed: bool,
}

impl Gram {
    /// Opens an empty gram of the given kind.
    pub fn start(kind: FrameKind) -> Self {
        Self {
            kind,
            data: Vec::new(),
            completed: false,
        }
    }

    /// A completed text gram, e.g. an encoded notification.
    pub fn text(data: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Text,
            data,
            completed: true,
        }
    }

    /// A completed binary gram.
    pub fn binary(data: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Binary,
            data,
            completed: true,
        }
    }

    /// Appends a fragment's payload. `end_of_message` completes the gram.
    ///
    /// # Errors
    /// [`ProtocolError::GramCompleted`] if the gram is already complete.
    pub fn append(
        &mut self,
        payload: &[u8],
        end_of_message: bool,
    ) -> Result<(), ProtocolError> {
        if self.completed {
            return Err(ProtocolError::GramCompleted);
        }
        self.data.extend_from_slice(payload);
        self.completed = end_of_message;
        Ok(())
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// The bytes received so far.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Views a completed text gram as a string.
    ///
    /// # Errors
    /// - [`ProtocolError::InvalidMessage`] for binary or incomplete grams
    /// - [`ProtocolError::NotUtf8`] if the bytes are not UTF-8
    pub fn as_text(&self) -> Result<&str, ProtocolError> {
        if self.kind != FrameKind::Text {
            return Err(ProtocolError::InvalidMessage(
                "expected a text message".into(),
            ));
        }
        if !self.completed {
            return Err(ProtocolError::InvalidMessage(
                "message is not complete".into(),
            ));
        }
        Ok(std::str::from_utf8(&self.data)?)
    }
}

/// Rebuilds grams from a single connection's fragment stream.
#[derive(Debug, Default)]
pub struct Reassembler {
    open: Option<Gram>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fragment in arrival order.
    ///
    /// Returns the gram once its final fragment arrives, `None` while it
    /// is still open.
    ///
    /// # Errors
    /// [`ProtocolError::KindMismatch`] if a fragment's kind differs from
    /// the open gram's. The open gram is discarded.
    pub fn push(
        &mut self,
        fragment: Fragment,
    ) -> Result<Option<Gram>, ProtocolError> {
        let mut gram = match self.open.take() {
            Some(gram) if gram.kind() != fragment.kind => {
                return Err(ProtocolError::KindMismatch {
                    open: gram.kind(),
                    fragment: fragment.kind,
                });
            }
            Some(gram) => gram,
            None => Gram::start(fragment.kind),
        };

        gram.append(&fragment.payload, fragment.end_of_message)?;

        if gram.is_completed() {
            Ok(Some(gram))
        } else {
            self.open = Some(gram);
            Ok(None)
        }
    }

    /// `true` when no message is partially received.
    pub fn is_idle(&self) -> bool {
        self.open.is_none()
    }
}
