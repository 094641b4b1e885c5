//! Chunk-id keyed text storage with per-source cascade.

use std::collections::HashMap;

use scholar_core::{Chunk, ChunkId};

/// Durable key→record mapping from chunk id to chunk text and metadata.
///
/// Kept in lock-step with the vector index by [`crate::Library`]; this type
/// alone only guarantees its own bookkeeping (the per-source id lists stay
/// consistent with the chunk map).
#[derive(Debug, Default)]
pub struct ChunkStore {
    /// Chunks keyed by id.
    chunks: HashMap<ChunkId, Chunk>,
    /// Chunk ids grouped by source document, in ingestion order.
    by_source: HashMap<String, Vec<ChunkId>>,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Inserts a chunk, replacing any existing record with the same id.
    pub fn insert(&mut self, chunk: Chunk) {
        let source_ids = self.by_source.entry(chunk.source_id.clone()).or_default();
        if !source_ids.contains(&chunk.id) {
            source_ids.push(chunk.id);
        }
        self.chunks.insert(chunk.id, chunk);
    }

    /// Looks up one chunk by id.
    pub fn get(&self, id: &ChunkId) -> Option<&Chunk> {
        self.chunks.get(id)
    }

    /// Looks up chunks by id, preserving the order of the requested ids.
    ///
    /// Missing ids yield `None` in their position rather than being skipped,
    /// so callers can detect pairing violations.
    pub fn get_batch(&self, ids: &[ChunkId]) -> Vec<Option<&Chunk>> {
        ids.iter().map(|id| self.chunks.get(id)).collect()
    }

    /// Removes one chunk by id.
    pub fn remove(&mut self, id: &ChunkId) -> Option<Chunk> {
        let chunk = self.chunks.remove(id)?;
        if let Some(source_ids) = self.by_source.get_mut(&chunk.source_id) {
            source_ids.retain(|existing| existing != id);
            if source_ids.is_empty() {
                self.by_source.remove(&chunk.source_id);
            }
        }
        Some(chunk)
    }

    /// Removes every chunk belonging to a source document, returning their ids.
    pub fn remove_source(&mut self, source_id: &str) -> Vec<ChunkId> {
        let Some(ids) = self.by_source.remove(source_id) else {
            return Vec::new();
        };
        for id in &ids {
            self.chunks.remove(id);
        }
        ids
    }

    /// Iterates over all stored chunks.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, offset: usize) -> Chunk {
        Chunk::new(text, source, offset)
    }

    #[test]
    fn batch_lookup_preserves_requested_order() {
        let mut store = ChunkStore::new();
        let first = chunk("one", "doc", 0);
        let second = chunk("two", "doc", 3);
        let first_id = first.id;
        let second_id = second.id;
        store.insert(first);
        store.insert(second);

        let fetched = store.get_batch(&[second_id, first_id]);
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].map(|found| found.text.as_str()), Some("two"));
        assert_eq!(fetched[1].map(|found| found.text.as_str()), Some("one"));
    }

    #[test]
    fn missing_ids_surface_as_none() {
        let store = ChunkStore::new();
        let fetched = store.get_batch(&[ChunkId::new()]);
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].is_none());
    }

    #[test]
    fn remove_source_cascades() {
        let mut store = ChunkStore::new();
        let keep = chunk("keep", "doc-a", 0);
        let keep_id = keep.id;
        store.insert(keep);
        store.insert(chunk("gone", "doc-b", 0));
        store.insert(chunk("also gone", "doc-b", 10));

        let removed = store.remove_source("doc-b");
        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&keep_id).is_some());

        assert!(store.remove_source("doc-b").is_empty());
    }

    #[test]
    fn remove_updates_source_grouping() {
        let mut store = ChunkStore::new();
        let only = chunk("text", "doc", 0);
        let only_id = only.id;
        store.insert(only);

        assert!(store.remove(&only_id).is_some());
        assert!(store.remove(&only_id).is_none());
        assert!(store.remove_source("doc").is_empty());
        assert!(store.is_empty());
    }
}
