//! # Corkboard
//!
//! A real-time shared card board served over WebSocket.
//!
//! Clients add text and image cards and edit text cards. Every change is
//! saved to a JSON board file and broadcast to every connected client, in
//! the same order for everyone. A client that connects late first receives
//! every card already on the board.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corkboard::prelude::*;
//!
//! # async fn start() -> Result<(), CorkboardError> {
//! let server = CorkboardServer::builder()
//!     .bind("127.0.0.1:8080")
//!     .board_file("desk.json")
//!     .data_root("data")
//!     .build()
//!     .await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod board;
pub mod cli;
mod config;
mod dispatch;
mod error;
mod handler;
mod server;

pub use board::Board;
pub use config::BoardConfig;
pub use dispatch::{Dispatcher, DispatcherState};
pub use error::CorkboardError;
pub use server::{CorkboardServer, CorkboardServerBuilder, ServerHandle};

/// Convenience re-exports for typical usage.
pub mod prelude {
    pub use crate::{
        BoardConfig, CorkboardError, CorkboardServer, CorkboardServerBuilder,
        ServerHandle,
    };
    pub use corkboard_protocol::{Card, Codec, Command, FrameKind, JsonCodec};
    pub use corkboard_transport::{MemoryConnection, MemoryPeer};
}
