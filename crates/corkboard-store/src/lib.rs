//! Storage for Corkboard: the cards on the board and the image files
//! behind image cards.
//!
//! - [`CardStore`]: the keyed, ordered card collection and its JSON
//!   board file (with a `.backup` of the previous version).
//! - [`ImageStore`]: uploaded image files behind a readers-writer lock.
//!
//! Neither type knows about sessions or broadcasting. The server composes
//! them with the session registry.

mod cards;
mod error;
mod images;

pub use cards::{backup_path, CardStore};
pub use error::StoreError;
pub use images::ImageStore;
