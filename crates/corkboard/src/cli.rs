//! Command line flags for the `corkboard` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::BoardConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to accept WebSocket connections on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind to.
    #[arg(short, long, default_value = "127.0.0.1")]
    pub addr: String,

    /// Board file the cards are saved to.
    #[arg(short, long, default_value = "desk.json")]
    pub desk: PathBuf,

    /// Directory uploaded images are stored in.
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Directory for derived files.
    #[arg(long, default_value = "cache")]
    pub cache_root: PathBuf,

    /// URL prefix image cards link to.
    #[arg(long, default_value = "/images")]
    pub link_prefix: String,
}

impl Cli {
    pub fn into_config(self) -> BoardConfig {
        BoardConfig {
            bind_addr: format!("{}:{}", self.addr, self.port),
            board_file: self.desk,
            data_root: self.data_root,
            cache_root: self.cache_root,
            link_prefix: self.link_prefix,
            ..BoardConfig::default()
        }
    }
}
