//! Error types for portals.

use chunkfetch_protocol::ProtocolError;

/// Errors produced while sending or receiving over a portal.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid name: {0}")]
    Name(#[from] ProtocolError),

    #[error("connection timed out")]
    Timeout,

    #[error("portal closed")]
    Closed,
}
