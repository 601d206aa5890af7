//! Error types for name handling.

/// Errors produced while parsing or decoding names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The name does not have the expected command/target/chunk layout.
    #[error("malformed name: {0}")]
    MalformedName(String),

    /// The text form of a name could not be parsed.
    #[error("invalid name URI: {0}")]
    InvalidUri(String),

    /// The command segment is well formed but not a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
