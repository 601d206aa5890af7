use std::path::PathBuf;
use std::time::Duration;

use chunkfetch_protocol::ResourceName;
use chunkfetch_protocol::constants::{DEFAULT_PORT, DOMAIN_PREFIX};
use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name prefix the server publishes under.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Address of the server's TCP portal.
    #[serde(default = "default_server")]
    pub server: String,

    /// Directory fetched files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-response receive timeout in seconds. Unset waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_prefix() -> String {
    DOMAIN_PREFIX.into()
}

fn default_server() -> String {
    format!("127.0.0.1:{DEFAULT_PORT}")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            server: default_server(),
            output_dir: default_output_dir(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn prefix(&self) -> Result<ResourceName, ClientError> {
        self.prefix
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid prefix {:?}: {e}", self.prefix)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.prefix().unwrap().to_string(), DOMAIN_PREFIX);
        assert_eq!(config.server, "127.0.0.1:9695");
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.timeout().is_none());
    }

    #[test]
    fn timeout_in_seconds() {
        let config = ClientConfig {
            timeout_secs: Some(3),
            ..ClientConfig::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn invalid_prefix() {
        let config = ClientConfig {
            prefix: "tutorial".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.prefix(), Err(ClientError::Config(_))));
    }
}
