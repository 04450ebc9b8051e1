//! Wire protocol for Corkboard.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Card`], [`Command`]): the tagged unions that travel
//!   as text messages.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   converted to/from bytes.
//! - **Grams** ([`Gram`], [`Reassembler`]): whole messages rebuilt
//!   from transport fragments.
//! - **Errors** ([`ProtocolError`]): every way a peer can break the
//!   protocol.
//!
//! ```text
//! Transport (fragments) → Reassembler (grams) → Codec (commands)
//! ```

mod codec;
mod error;
mod gram;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use gram::{Gram, Reassembler};
pub use types::{Card, Command};

/// Re-exported so downstream crates need not depend on the transport
/// just to name a gram's kind.
pub use corkboard_transport::FrameKind;
