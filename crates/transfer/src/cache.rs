//! Memoized, fully chunked resources.
//!
//! A [`ChunkList`] is built at most once per resource key and then served
//! for the lifetime of the [`ChunkCache`] that owns it. Entries are never
//! refreshed: a file that changes after its first build keeps being served
//! from the original chunks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::TransferError;
use crate::chunker::{ChunkSource, Chunker};

/// Every chunk of one resource, precomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkList {
    key: String,
    chunks: Vec<Arc<[u8]>>,
}

impl ChunkList {
    /// Wraps precomputed payloads. An empty list is normalized to a single
    /// empty chunk.
    pub fn new(key: impl Into<String>, mut chunks: Vec<Arc<[u8]>>) -> Self {
        if chunks.is_empty() {
            chunks.push(Arc::from(Vec::new()));
        }
        Self {
            key: key.into(),
            chunks,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Shared payload of chunk `index`, or `None` when out of range.
    pub fn get(&self, index: u64) -> Option<Arc<[u8]>> {
        let index = usize::try_from(index).ok()?;
        self.chunks.get(index).cloned()
    }

    pub fn num_chunks(&self) -> u64 {
        self.chunks.len() as u64
    }

    pub fn final_index(&self) -> u64 {
        self.num_chunks() - 1
    }

    /// Total payload bytes across all chunks.
    pub fn total_len(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }
}

/// Reads `source` once and materializes every chunk.
pub fn build_chunk_list<S: ChunkSource + ?Sized>(
    key: impl Into<String>,
    source: &S,
    chunker: &Chunker,
) -> Result<ChunkList, TransferError> {
    Ok(ChunkList::new(key, chunker.chunk_all(source)?))
}

type Slot = Arc<Mutex<Option<Arc<ChunkList>>>>;

/// Per-key build-once cache of [`ChunkList`]s.
///
/// The map lock is held only to find or insert a key's slot; the slot lock
/// is held while building, so concurrent callers for the same key wait for
/// the first build instead of starting their own. Different keys build in
/// parallel.
#[derive(Debug, Default)]
pub struct ChunkCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the list for `key`, calling `build` only if no earlier call
    /// succeeded. A failed build leaves the key empty so a later request can
    /// retry.
    pub fn get_or_build<F>(&self, key: &str, build: F) -> Result<Arc<ChunkList>, TransferError>
    where
        F: FnOnce() -> Result<ChunkList, TransferError>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = entry.as_ref() {
            return Ok(Arc::clone(list));
        }

        let list = Arc::new(build()?);
        debug!(
            key,
            chunks = list.num_chunks(),
            bytes = list.total_len(),
            "built chunk list"
        );
        *entry = Some(Arc::clone(&list));
        Ok(list)
    }

    /// Returns the list for `key` if it has been built.
    pub fn get(&self, key: &str) -> Option<Arc<ChunkList>> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(key)?)
        };
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    /// Number of keys with a built list.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::chunker::MemoryResource;

    fn source() -> MemoryResource {
        MemoryResource::new((0..250u32).map(|i| i as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn build_chunk_list_materializes_every_chunk() {
        let list = build_chunk_list("k", &source(), &Chunker::new(100)).unwrap();
        assert_eq!(list.num_chunks(), 3);
        assert_eq!(list.final_index(), 2);
        assert_eq!(list.get(2).unwrap().len(), 50);
        assert!(list.get(3).is_none());
        assert!(list.get(u64::MAX).is_none());
        assert_eq!(list.total_len(), 250);
    }

    #[test]
    fn empty_resource_has_one_chunk() {
        let list = build_chunk_list("k", &MemoryResource::default(), &Chunker::new(100)).unwrap();
        assert_eq!(list.final_index(), 0);
        assert!(list.get(0).unwrap().is_empty());
        assert_eq!(ChunkList::new("k", Vec::new()).num_chunks(), 1);
    }

    #[test]
    fn get_or_build_builds_once() {
        let cache = ChunkCache::new();
        let calls = AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, Ordering::SeqCst);
            build_chunk_list("k", &source(), &Chunker::new(100))
        };

        let first = cache.get_or_build("k", build).unwrap();
        let second = cache.get_or_build("k", build).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        for i in 0..first.num_chunks() {
            assert_eq!(first.get(i), second.get(i));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache = ChunkCache::new();
        let result = cache.get_or_build("k", || {
            Err(TransferError::InvalidPath("boom".into()))
        });
        assert!(result.is_err());
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());

        let list = cache
            .get_or_build("k", || build_chunk_list("k", &source(), &Chunker::new(100)))
            .unwrap();
        assert_eq!(list.num_chunks(), 3);
    }

    #[test]
    fn entries_are_not_refreshed() {
        let cache = ChunkCache::new();
        cache
            .get_or_build("k", || build_chunk_list("k", &source(), &Chunker::new(100)))
            .unwrap();
        let list = cache
            .get_or_build("k", || {
                build_chunk_list("k", &MemoryResource::default(), &Chunker::new(100))
            })
            .unwrap();
        assert_eq!(list.num_chunks(), 3);
    }

    #[test]
    fn concurrent_callers_trigger_one_build() {
        let cache = Arc::new(ChunkCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_build("lci:/ccnx/tutorial/fetch/a.bin", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            build_chunk_list("a", &source(), &Chunker::new(100))
                        })
                        .unwrap()
                })
            })
            .collect();

        let lists: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for list in &lists[1..] {
            assert!(Arc::ptr_eq(list, &lists[0]));
        }
    }

    #[test]
    fn distinct_keys_build_separately() {
        let cache = ChunkCache::new();
        let a = cache
            .get_or_build("a", || build_chunk_list("a", &source(), &Chunker::new(100)))
            .unwrap();
        let b = cache
            .get_or_build("b", || build_chunk_list("b", &source(), &Chunker::new(50)))
            .unwrap();
        assert_eq!(a.num_chunks(), 3);
        assert_eq!(b.num_chunks(), 5);
        assert_eq!(cache.len(), 2);
    }
}
