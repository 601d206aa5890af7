//! Turning one interest into (at most) one content object.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkfetch_protocol::addressing::encode_request;
use chunkfetch_protocol::{Command, CommandMatching, ContentObject, Interest, Request, ResourceName};
use chunkfetch_transfer::{
    ChunkCache, Chunker, FileResource, MemoryResource, TransferError, build_chunk_list,
    generate_listing, validate_file_name,
};
use tracing::debug;

use crate::{ServerConfig, ServerError};

/// Answers interests for the files of one directory.
///
/// Stateless across requests except for the pre-chunk cache, which lives
/// as long as the builder.
#[derive(Debug)]
pub struct ResponseBuilder {
    source_dir: PathBuf,
    prefix: ResourceName,
    matching: CommandMatching,
    chunker: Chunker,
    pre_chunk: bool,
    cache: ChunkCache,
}

impl ResponseBuilder {
    pub fn new(source_dir: impl Into<PathBuf>, prefix: ResourceName, chunk_size: usize) -> Self {
        Self {
            source_dir: source_dir.into(),
            prefix,
            matching: CommandMatching::default(),
            chunker: Chunker::new(chunk_size),
            pre_chunk: false,
            cache: ChunkCache::new(),
        }
    }

    /// Builds a responder from validated settings.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        Ok(
            Self::new(&config.source_dir, config.prefix()?, config.chunk_size)
                .with_pre_chunk(config.pre_chunk)
                .with_command_matching(config.command_matching),
        )
    }

    pub fn with_pre_chunk(mut self, pre_chunk: bool) -> Self {
        self.pre_chunk = pre_chunk;
        self
    }

    pub fn with_command_matching(mut self, matching: CommandMatching) -> Self {
        self.matching = matching;
        self
    }

    pub fn prefix(&self) -> &ResourceName {
        &self.prefix
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Produces the response for `interest`, or `None` if it cannot be
    /// answered (malformed name, unknown command, missing file, or a chunk
    /// past the end).
    pub fn respond(&self, interest: &Interest) -> Option<ContentObject> {
        match self.try_respond(interest) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!(name = %interest.name, reason = %e, "no response");
                None
            }
        }
    }

    /// Like [`respond`](Self::respond), reporting why no response was made.
    pub fn try_respond(&self, interest: &Interest) -> Result<ContentObject, ServerError> {
        let request = Request::decode(&interest.name, &self.prefix, self.matching)?;
        let index = request.chunk_index;

        let (payload, final_chunk): (Arc<[u8]>, u64) = match &request.command {
            Command::List => {
                let listing = MemoryResource::new(generate_listing(&self.source_dir)?);
                let chunk = self.chunker.chunk(&listing, index)?;
                (chunk.payload.into(), chunk.final_index)
            }
            Command::Fetch(target) => {
                validate_file_name(target)?;
                let file = FileResource::new(self.source_dir.join(target));
                if !file.is_available() {
                    return Err(TransferError::ResourceUnavailable {
                        path: file.path().to_path_buf(),
                        source: io::Error::new(io::ErrorKind::NotFound, "no such regular file"),
                    }
                    .into());
                }
                if self.pre_chunk {
                    self.cached_chunk(&request.command, &file, index)?
                } else {
                    let chunk = self.chunker.chunk(&file, index)?;
                    (chunk.payload.into(), chunk.final_index)
                }
            }
        };

        Ok(ContentObject::new(interest.name.clone(), payload, final_chunk))
    }

    /// Keyed by the re-encoded request, so every spelling of a command
    /// shares one entry.
    fn cached_chunk(
        &self,
        command: &Command,
        file: &FileResource,
        index: u64,
    ) -> Result<(Arc<[u8]>, u64), TransferError> {
        let key = encode_request(&self.prefix, command).to_string();
        let list = self.cache.get_or_build(&key, || {
            debug!(key = %key, path = %file.path().display(), "pre-chunking into memory");
            build_chunk_list(key.as_str(), file, &self.chunker)
        })?;

        let final_index = list.final_index();
        let payload = list
            .get(index)
            .ok_or(TransferError::ChunkOutOfRange { index, final_index })?;
        Ok((payload, final_index))
    }
}
