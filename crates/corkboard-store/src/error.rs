//! Error types for the store layer.

use std::path::PathBuf;

/// Errors from the card store and the image store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No card is stored under this id.
    #[error("card {0} not found")]
    CardNotFound(String),

    /// A card is already stored under this id.
    #[error("card id {0} is already taken")]
    DuplicateId(String),

    /// Only text cards can be replaced, and only by text cards.
    #[error("card {0} cannot be updated: only text cards are mutable")]
    Immutable(String),

    /// The board file does not exist.
    #[error("board file {} does not exist", .0.display())]
    Missing(PathBuf),

    /// The board file exists but is not a valid board document.
    #[error("board file is malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The store was never given a file to save to.
    #[error("no board file configured")]
    NoPath,

    /// Reading or writing the board file failed.
    #[error("board file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing an image file failed.
    #[error("image I/O failed for {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The image name is empty or only a directory reference.
    #[error("invalid image file name {0:?}")]
    InvalidFilename(String),

    /// The image's extension is not one of the accepted formats.
    #[error("unsupported image format: {0:?}")]
    UnsupportedImage(String),

    /// No stored image has this name.
    #[error("image {0} not found")]
    ImageNotFound(String),
}
