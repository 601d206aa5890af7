//! The client transfer loop.
//!
//! Exactly one chunk request is outstanding at a time. Chunk `i + 1` is
//! requested only after chunk `i` was accepted by the reassembly engine.

use std::path::PathBuf;
use std::time::Duration;

use chunkfetch_portal::{Portal, TcpPortal};
use chunkfetch_protocol::addressing::{append_chunk_index, encode_request};
use chunkfetch_protocol::{Command, ContentObject, Interest, Message, ResourceName};
use chunkfetch_transfer::{
    ChunkSink, FileSink, ListingSink, Progress, ProgressCallback, ReassemblyEngine,
    SpeedCalculator, TransferProgress, validate_file_name,
};
use tracing::{debug, info, warn};

use crate::{ClientConfig, ClientError};

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Reassembled directory listing.
    Listing(String),
    /// A fetched file written to disk.
    File { path: PathBuf, bytes: u64, chunks: u64 },
}

/// Requests resources from a file server over a portal.
pub struct Client<P: Portal> {
    portal: P,
    prefix: ResourceName,
    output_dir: PathBuf,
    timeout: Option<Duration>,
    on_progress: Option<ProgressCallback>,
}

impl<P: Portal> Client<P> {
    pub fn new(portal: P, prefix: ResourceName, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            portal,
            prefix,
            output_dir: output_dir.into(),
            timeout: None,
            on_progress: None,
        }
    }

    /// Builds a client from `config` over an already connected portal.
    pub fn from_config(portal: P, config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(portal, config.prefix()?, &config.output_dir).with_timeout(config.timeout()))
    }

    /// Gives up when no response arrives within `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn prefix(&self) -> &ResourceName {
        &self.prefix
    }

    /// Runs one `list` or `fetch` transfer to completion.
    pub async fn execute(&mut self, command: &Command) -> Result<TransferOutcome, ClientError> {
        let request = encode_request(&self.prefix, command);
        info!(command = command.keyword(), name = %request, "starting transfer");

        match command {
            Command::List => {
                let (listing, _) = self.transfer(&request, ListingSink::new()).await?;
                Ok(TransferOutcome::Listing(listing))
            }
            Command::Fetch(target) => {
                validate_file_name(target)?;
                let path = self.output_dir.join(target);
                let (bytes, chunks) = self.transfer(&request, FileSink::new(&path)).await?;
                info!(path = %path.display(), bytes, chunks, "file received");
                Ok(TransferOutcome::File {
                    path,
                    bytes,
                    chunks,
                })
            }
        }
    }

    /// Requests chunk 0, 1, ... of `request` until the final chunk is accepted.
    ///
    /// Returns the sink output and the number of chunks received.
    async fn transfer<S: ChunkSink>(
        &mut self,
        request: &ResourceName,
        sink: S,
    ) -> Result<(S::Output, u64), ClientError> {
        let mut engine = ReassemblyEngine::new(sink);
        let mut speed = SpeedCalculator::default();
        let mut index = 0u64;

        loop {
            let content = self.request_chunk(append_chunk_index(request, index)).await?;
            let chunk_index = content.chunk_index()?;
            let final_index = content.final_chunk;

            let progress = engine.accept(chunk_index, &content.payload, final_index)?;
            speed.add_sample(content.payload.len() as u64);
            debug!(
                chunk = chunk_index,
                final_chunk = final_index,
                remaining = progress.remaining(),
                "chunk accepted"
            );

            if let Some(callback) = &self.on_progress {
                callback(&TransferProgress {
                    chunk_index,
                    final_index,
                    bytes_received: engine.bytes_received(),
                    bytes_per_second: speed.bytes_per_second(),
                });
            }

            match progress {
                Progress::Complete(output) => return Ok((output, chunk_index + 1)),
                Progress::Remaining(_) => index = chunk_index + 1,
            }
        }
    }

    /// Sends one interest and waits for the content object with the same name.
    async fn request_chunk(&mut self, name: ResourceName) -> Result<ContentObject, ClientError> {
        self.portal
            .send(Interest::new(name.clone()).into())
            .await
            .map_err(|e| ClientError::TransferAborted(e.to_string()))?;

        loop {
            let received = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.portal.receive())
                    .await
                    .map_err(|_| {
                        warn!(%name, timeout = ?limit, "no response");
                        ClientError::Timeout
                    })?,
                None => self.portal.receive().await,
            };

            match received {
                Ok(Some(Message::Content(content))) if content.name == name => return Ok(content),
                Ok(Some(other)) => {
                    debug!(name = %other.name(), "ignoring unrelated message");
                }
                Ok(None) => {
                    return Err(ClientError::TransferAborted(
                        "portal closed before the transfer completed".into(),
                    ));
                }
                Err(e) => return Err(ClientError::TransferAborted(e.to_string())),
            }
        }
    }
}

/// Connects to the server named in `config` over TCP.
pub async fn connect(config: &ClientConfig) -> Result<Client<TcpPortal>, ClientError> {
    let portal = TcpPortal::connect(config.server.as_str()).await?;
    Client::from_config(portal, config)
}
