//! chunkfetch file server.
//!
//! Publishes the regular files of one directory under a name prefix.
//! [`ResponseBuilder`] answers a single interest; [`FileServer`] pulls
//! interests from a [`Portal`](chunkfetch_portal::Portal) one at a time and
//! sends back whatever the builder produces.

mod config;
mod response;
mod server;

use chunkfetch_portal::PortalError;
use chunkfetch_protocol::ProtocolError;
use chunkfetch_transfer::TransferError;

pub use config::ServerConfig;
pub use response::ResponseBuilder;
pub use server::{FileServer, run};

/// Errors produced by the file server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("portal error: {0}")]
    Portal(#[from] PortalError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
