//! Chunking, pre-chunked caching and in-order reassembly.
//!
//! The publish side splits a resource (a file or a generated directory
//! listing) into numbered chunks with [`Chunker`], optionally memoizing the
//! whole split in a [`ChunkCache`]. The receive side feeds chunks, in
//! order, into a [`ReassemblyEngine`] until the final chunk arrives.

mod cache;
mod chunker;
mod listing;
mod progress;
mod reassembly;
mod validation;

use std::path::PathBuf;

pub use cache::{ChunkCache, ChunkList, build_chunk_list};
pub use chunker::{
    Chunk, ChunkSource, Chunker, FileResource, MemoryResource, final_chunk_index,
    num_chunks_required,
};
pub use listing::generate_listing;
pub use progress::{ProgressCallback, SpeedCalculator, TransferProgress};
pub use reassembly::{ChunkSink, FileSink, ListingSink, Progress, ReassemblyEngine};
pub use validation::validate_file_name;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resource unavailable: {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk {index} out of range (final chunk is {final_index})")]
    ChunkOutOfRange { index: u64, final_index: u64 },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk out of order: expected {expected}, received {received}")]
    OutOfOrder { expected: u64, received: u64 },
}

impl TransferError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransferError::ResourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
