//! Server configuration.

use std::path::PathBuf;

/// Where the server listens and where it keeps its files.
///
/// Start from `BoardConfig::default()` and override the fields you care
/// about, or set them one by one on
/// [`CorkboardServerBuilder`](crate::CorkboardServerBuilder).
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// `host:port` to accept WebSocket connections on.
    pub bind_addr: String,

    /// The JSON board file. Created on the first change if missing.
    pub board_file: PathBuf,

    /// Directory uploaded images are written to.
    pub data_root: PathBuf,

    /// Scratch directory for derived files. Created at startup.
    pub cache_root: PathBuf,

    /// URL prefix image cards link to.
    pub link_prefix: String,

    /// How many grams may wait in one session's outbound queue. A
    /// session that falls further behind is disconnected.
    pub session_queue: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            board_file: PathBuf::from("desk.json"),
            data_root: PathBuf::from("data"),
            cache_root: PathBuf::from("cache"),
            link_prefix: "/images".to_string(),
            session_queue: 1024,
        }
    }
}
