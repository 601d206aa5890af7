use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkfetch_protocol::constants::DEFAULT_CHUNK_SIZE;

use crate::TransferError;

// ---------------------------------------------------------------------------
// Chunk arithmetic
// ---------------------------------------------------------------------------

/// Number of chunks needed for `length` bytes. Never less than 1: an empty
/// resource is one empty chunk.
pub fn num_chunks_required(length: u64, chunk_size: usize) -> u64 {
    let chunk_size = chunk_size.max(1) as u64;
    length.div_ceil(chunk_size).max(1)
}

/// Index of the last chunk for `length` bytes.
pub fn final_chunk_index(length: u64, chunk_size: usize) -> u64 {
    num_chunks_required(length, chunk_size) - 1
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A byte-producing resource that can be read by range.
///
/// `len` is queried on every chunk so that sources may grow between calls.
pub trait ChunkSource {
    fn len(&self) -> Result<u64, TransferError>;

    /// Reads up to `len` bytes at `offset`. Short reads at end of data are
    /// not an error.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError>;

    fn is_empty(&self) -> Result<bool, TransferError> {
        Ok(self.len()? == 0)
    }
}

/// A file on disk, reopened for every call.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the path currently names a readable regular file.
    pub fn is_available(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

impl ChunkSource for FileResource {
    fn len(&self) -> Result<u64, TransferError> {
        let meta = std::fs::metadata(&self.path)
            .map_err(|e| TransferError::unavailable(&self.path, e))?;
        if !meta.is_file() {
            return Err(TransferError::unavailable(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        Ok(meta.len())
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let unavailable = |e| TransferError::unavailable(&self.path, e);

        let mut file = std::fs::File::open(&self.path).map_err(unavailable)?;
        file.seek(SeekFrom::Start(offset)).map_err(unavailable)?;

        let mut buf = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(unavailable)?;
        Ok(buf)
    }
}

/// An in-memory resource such as a generated listing.
#[derive(Debug, Clone, Default)]
pub struct MemoryResource {
    data: Arc<[u8]>,
}

impl MemoryResource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ChunkSource for MemoryResource {
    fn len(&self) -> Result<u64, TransferError> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data[start..end].to_vec())
    }
}

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// One chunk of a resource, with the final index at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub final_index: u64,
    pub payload: Vec<u8>,
}

/// Splits resources into fixed-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl Chunker {
    /// Creates a chunker. If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the current final chunk index of `source`.
    pub fn final_index<S: ChunkSource + ?Sized>(&self, source: &S) -> Result<u64, TransferError> {
        Ok(final_chunk_index(source.len()?, self.chunk_size))
    }

    /// Reads chunk `index` from the source's current content.
    ///
    /// The length is re-read on every call, so a file that grows between
    /// requests yields a larger final index on later chunks.
    pub fn chunk<S: ChunkSource + ?Sized>(
        &self,
        source: &S,
        index: u64,
    ) -> Result<Chunk, TransferError> {
        let length = source.len()?;
        let final_index = final_chunk_index(length, self.chunk_size);
        if index > final_index {
            return Err(TransferError::ChunkOutOfRange { index, final_index });
        }

        let offset = index * self.chunk_size as u64;
        let want = (length - offset).min(self.chunk_size as u64) as usize;
        let payload = source.read_at(offset, want)?;

        Ok(Chunk {
            index,
            final_index,
            payload,
        })
    }

    /// Reads the whole resource once and splits it into every chunk.
    pub fn chunk_all<S: ChunkSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Vec<Arc<[u8]>>, TransferError> {
        let length = source.len()?;
        let length = usize::try_from(length).map_err(|_| {
            TransferError::Io(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("resource of {length} bytes does not fit in memory"),
            ))
        })?;

        let data = source.read_at(0, length)?;
        if data.is_empty() {
            return Ok(vec![Arc::from(Vec::new())]);
        }
        Ok(data.chunks(self.chunk_size).map(Arc::from).collect())
    }
}
