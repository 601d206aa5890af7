//! Server configuration.
//!
//! Stored as TOML; every field is optional and falls back to its default.
//! Command-line flags are applied on top by the binary.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chunkfetch_protocol::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, DOMAIN_PREFIX};
use chunkfetch_protocol::{CommandMatching, ResourceName};
use serde::{Deserialize, Serialize};

use crate::ServerError;

/// File server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Payload bytes per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Directory whose regular files are served. Required.
    #[serde(default)]
    pub source_dir: PathBuf,

    /// Chunk each file into memory on first request and serve from there.
    #[serde(default)]
    pub pre_chunk: bool,

    /// Log every request at info level.
    #[serde(default)]
    pub verbose: bool,

    /// Name prefix the server answers for.
    #[serde(default = "default_listen_prefix")]
    pub listen_prefix: String,

    #[serde(default)]
    pub command_matching: CommandMatching,

    /// TCP address of the listening portal.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_listen_prefix() -> String {
    DOMAIN_PREFIX.into()
}

fn default_bind() -> SocketAddr {
    ([0, 0, 0, 0], DEFAULT_PORT).into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            source_dir: PathBuf::new(),
            pre_chunk: false,
            verbose: false,
            listen_prefix: default_listen_prefix(),
            command_matching: CommandMatching::default(),
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parsed listen prefix.
    pub fn prefix(&self) -> Result<ResourceName, ServerError> {
        self.listen_prefix.parse().map_err(|e| {
            ServerError::Config(format!("invalid listen prefix {:?}: {e}", self.listen_prefix))
        })
    }

    /// Checks that the server can run with these settings.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.chunk_size == 0 {
            return Err(ServerError::Config("chunk size must be positive".into()));
        }
        if self.source_dir.as_os_str().is_empty() {
            return Err(ServerError::Config("source directory is required".into()));
        }
        if !self.source_dir.is_dir() {
            return Err(ServerError::Config(format!(
                "not a directory: {}",
                self.source_dir.display()
            )));
        }
        self.prefix()?;
        Ok(())
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.source_dir.as_os_str().is_empty() {
            "MISSING".to_string()
        } else {
            self.source_dir.display().to_string()
        };
        writeln!(f, "Server configuration:")?;
        writeln!(f, "  listen prefix:    [{}]", self.listen_prefix)?;
        writeln!(f, "  pre-chunk:        [{}]", self.pre_chunk)?;
        writeln!(f, "  source directory: [{dir}]")?;
        writeln!(f, "  chunk size:       [{}]", self.chunk_size)?;
        writeln!(f, "  verbose:          [{}]", self.verbose)?;
        writeln!(f, "  command matching: [{:?}]", self.command_matching)?;
        write!(f, "  bind:             [{}]", self.bind)
    }
}
