//! chunkfetch client.
//!
//! [`Client::execute`] runs one transfer: it requests chunk 0, 1, 2, ...
//! of a `list` or `fetch` resource, one at a time, and feeds each response
//! to a reassembly engine until the final chunk arrives.

mod client;
mod config;

use chunkfetch_portal::PortalError;
use chunkfetch_protocol::ProtocolError;
use chunkfetch_transfer::TransferError;

pub use client::{Client, TransferOutcome, connect};
pub use config::ClientConfig;

/// Errors produced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("portal error: {0}")]
    Portal(#[from] PortalError),

    #[error("transfer aborted: {0}")]
    TransferAborted(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("invalid configuration: {0}")]
    Config(String),
}
