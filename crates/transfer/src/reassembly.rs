//! In-order reassembly of chunk responses.
//!
//! Chunks must arrive as `0, 1, 2, ...`. Chunk 0 always (re)starts the
//! transfer; anything else that is not the next expected index is rejected
//! with [`TransferError::OutOfOrder`] rather than written to the sink.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::TransferError;

/// Destination of a reassembled resource.
pub trait ChunkSink {
    type Output;

    /// Discards anything accumulated so far.
    fn reset(&mut self) -> Result<(), TransferError>;

    fn append(&mut self, payload: &[u8]) -> Result<(), TransferError>;

    /// Completes the resource and produces the result.
    fn finish(&mut self) -> Result<Self::Output, TransferError>;
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Collects a directory listing in memory.
#[derive(Debug, Default)]
pub struct ListingSink {
    buf: Vec<u8>,
}

impl ListingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChunkSink for ListingSink {
    type Output = String;

    fn reset(&mut self) -> Result<(), TransferError> {
        self.buf.clear();
        Ok(())
    }

    fn append(&mut self, payload: &[u8]) -> Result<(), TransferError> {
        self.buf.extend_from_slice(payload);
        Ok(())
    }

    fn finish(&mut self) -> Result<String, TransferError> {
        Ok(String::from_utf8_lossy(&std::mem::take(&mut self.buf)).into_owned())
    }
}

/// Writes a fetched file sequentially.
///
/// The file is truncated on chunk 0 and the handle stays open until the
/// final chunk. Nothing is removed if the transfer is abandoned.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    written: u64,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn open(&mut self) -> Result<&mut File, TransferError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl ChunkSink for FileSink {
    /// Total bytes written.
    type Output = u64;

    fn reset(&mut self) -> Result<(), TransferError> {
        self.file = Some(File::create(&self.path)?);
        self.written = 0;
        Ok(())
    }

    fn append(&mut self, payload: &[u8]) -> Result<(), TransferError> {
        self.open()?.write_all(payload)?;
        self.written += payload.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, TransferError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }
        Ok(self.written)
    }
}

// ---------------------------------------------------------------------------
// ReassemblyEngine
// ---------------------------------------------------------------------------

/// Result of accepting one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<T> {
    /// Chunks still expected after this one (`final - index`).
    Remaining(u64),
    /// The final chunk was processed.
    Complete(T),
}

impl<T> Progress<T> {
    pub fn remaining(&self) -> u64 {
        match self {
            Progress::Remaining(n) => *n,
            Progress::Complete(_) => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Progress::Complete(_))
    }
}

/// Per-transfer reassembly state.
#[derive(Debug)]
pub struct ReassemblyEngine<S: ChunkSink> {
    sink: S,
    next_index: u64,
    final_index: Option<u64>,
    bytes_received: u64,
    started: bool,
    complete: bool,
}

impl<S: ChunkSink> ReassemblyEngine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            next_index: 0,
            final_index: None,
            bytes_received: 0,
            started: false,
            complete: false,
        }
    }

    /// Index the engine expects next.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Final index reported by the most recent chunk.
    pub fn final_index(&self) -> Option<u64> {
        self.final_index
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Processes one chunk in arrival order.
    pub fn accept(
        &mut self,
        index: u64,
        payload: &[u8],
        final_index: u64,
    ) -> Result<Progress<S::Output>, TransferError> {
        if index == 0 {
            self.sink.reset()?;
            self.next_index = 0;
            self.bytes_received = 0;
            self.started = true;
            self.complete = false;
        } else if !self.started || self.complete || index != self.next_index {
            return Err(TransferError::OutOfOrder {
                expected: self.next_index,
                received: index,
            });
        }

        if index > final_index {
            return Err(TransferError::ChunkOutOfRange { index, final_index });
        }

        self.sink.append(payload)?;
        self.bytes_received += payload.len() as u64;
        self.final_index = Some(final_index);
        self.next_index = index + 1;

        if index == final_index {
            self.complete = true;
            return Ok(Progress::Complete(self.sink.finish()?));
        }
        Ok(Progress::Remaining(final_index - index))
    }
}
