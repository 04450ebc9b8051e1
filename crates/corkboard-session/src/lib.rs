//! Session tracking for Corkboard.
//!
//! A session is one live connection. The [`SessionRegistry`] knows every
//! session that is currently connected and can deliver a gram to one of
//! them or to all of them.
//!
//! # How it fits in the stack
//!
//! ```text
//! Board (above)        ← registry + card store behind one lock
//!     ↕
//! Session Layer        ← who is connected, where their grams go
//!     ↕
//! Protocol Layer       ← Gram
//! ```
//!
//! Delivery is a non-blocking push onto each session's bounded outbound
//! queue; a per-connection writer task drains the queue onto the socket.
//! Grams pushed while the caller holds a lock therefore reach every
//! session in lock order. A session whose queue fills up is dropped.

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Outbox, Session};
