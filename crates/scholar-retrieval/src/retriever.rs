//! Retrieval manager composing the embedder with the paired library.

use std::path::Path;
use std::sync::RwLock;

use scholar_core::{ChunkId, Error, IgnoreRwLock as _, Result, RetrievalResult};
use tracing::{debug, info};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, chunk_text};
use crate::embedding::EmbeddingProvider;
use crate::library::Library;

/// Ingestion and top-k retrieval over a shared chunk library.
///
/// The library sits behind an `RwLock`: queries interleave freely while
/// ingest/delete serialize, and no guard is held across an await point —
/// embedding always happens before the lock is taken, so a failed embedding
/// call can never leave a partial insert behind.
pub struct Retriever<E: EmbeddingProvider> {
    /// Embedding client used for both ingestion and queries.
    embedder: E,
    /// Paired vector index + chunk store.
    library: RwLock<Library>,
    /// Chunk window size in characters.
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    chunk_overlap: usize,
}

impl<E: EmbeddingProvider> Retriever<E> {
    /// Creates a retriever over an empty library with default chunking.
    pub fn with_provider(embedder: E) -> Self {
        Self {
            embedder,
            library: RwLock::new(Library::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Sets the chunking window; validated on the next ingest call.
    #[must_use]
    pub fn with_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }

    /// Checks that the embedding model can be reached.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if it cannot.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.embedder.ensure_model_available().await
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.library.read_ignore_poison().len()
    }

    /// Whether the library holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.library.read_ignore_poison().is_empty()
    }

    /// Ingests a document: chunk, embed, and index under one write guard.
    ///
    /// The whole call is atomic with respect to readers and to failure: the
    /// text is embedded before any store is touched, so an embedding failure
    /// aborts with nothing inserted, and an index rejection rolls back every
    /// pair this call already wrote.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for bad chunk settings and
    /// `EmbeddingUnavailable` if the embedder fails.
    pub async fn ingest(&self, text: &str, source_id: &str) -> Result<Vec<ChunkId>> {
        let chunks = chunk_text(text, source_id, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            debug!("ingest of empty source '{source_id}' produced no chunks");
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let chunk_count = chunks.len();
        let mut library = self.library.write_ignore_poison();
        let mut inserted: Vec<ChunkId> = Vec::with_capacity(chunk_count);
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            let id = chunk.id;
            if let Err(error) = library.insert_pair(chunk, vector) {
                for done in &inserted {
                    library.remove_pair(done);
                }
                return Err(error);
            }
            inserted.push(id);
        }
        drop(library);

        info!("ingested {chunk_count} chunks from source '{source_id}'");
        Ok(inserted)
    }

    /// Removes every chunk of a source document from index and store.
    ///
    /// Returns the removed ids.
    pub fn remove_source(&self, source_id: &str) -> Vec<ChunkId> {
        let removed = self
            .library
            .write_ignore_poison()
            .remove_source(source_id);
        if !removed.is_empty() {
            info!("removed {} chunks of source '{source_id}'", removed.len());
        }
        removed
    }

    /// Returns the top `k` chunks for a query string, most relevant first.
    ///
    /// An empty library yields an empty result; `k` beyond the population
    /// yields everything available, still ranked. Results are never served
    /// from a cache.
    ///
    /// # Errors
    /// Returns `InvalidParameter` when `k` is zero and `EmbeddingUnavailable`
    /// if the query cannot be embedded — there is no retrieval fallback.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::InvalidParameter(
                "retrieval k must be positive".to_owned(),
            ));
        }

        let vector = self.embedder.embed(query).await?;
        self.library.read_ignore_poison().search(&vector, k)
    }

    /// Writes a durable snapshot of the library.
    ///
    /// # Errors
    /// Returns an error if encoding or filesystem operations fail.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.library.read_ignore_poison().save(path)
    }

    /// Replaces the in-memory library with a snapshot, if one exists.
    ///
    /// Returns whether a snapshot was loaded.
    ///
    /// # Errors
    /// Returns an error if the snapshot exists but cannot be read or decoded.
    pub fn load_snapshot(&self, path: &Path) -> Result<bool> {
        match Library::load(path)? {
            Some(loaded) => {
                *self.library.write_ignore_poison() = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingClient;

    fn retriever() -> Retriever<HashEmbeddingClient> {
        Retriever::with_provider(HashEmbeddingClient::with_dimension(32))
            .with_chunking(20, 5)
    }

    #[tokio::test]
    async fn retrieve_rejects_zero_k() {
        let retriever = retriever();
        let result = retriever.retrieve("anything", 0).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn empty_library_yields_empty_result() {
        let retriever = retriever();
        let result = retriever.retrieve("anything", 3).await;
        assert!(result.is_ok());
        assert_eq!(result.map(|hits| hits.len()).unwrap_or(99), 0);
    }

    #[tokio::test]
    async fn ingest_then_retrieve_finds_identical_text() {
        let retriever = retriever();
        let ingested = retriever
            .ingest("The mitochondria is the powerhouse of the cell.", "bio")
            .await;
        assert!(ingested.is_ok(), "ingest failed");

        // The hash embedder maps identical text to the identical vector, so
        // querying with a chunk's exact text puts that chunk at distance zero.
        let hits = match retriever.retrieve("The mitochondria is ", 1).await {
            Ok(hits) => hits,
            Err(error) => panic!("retrieve failed: {error}"),
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "The mitochondria is ");
        assert_eq!(hits[0].chunk.offset, 0);
        assert!(hits[0].score.abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn k_beyond_population_returns_all_ranked() {
        let retriever = retriever();
        let ingested = retriever.ingest("short text", "doc").await;
        assert!(ingested.is_ok());

        let hits = match retriever.retrieve("short text", 50).await {
            Ok(hits) => hits,
            Err(error) => panic!("retrieve failed: {error}"),
        };
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn deleted_source_never_surfaces_again() {
        let retriever = retriever();
        let ingested = retriever
            .ingest("alpha beta gamma delta epsilon zeta", "doc-gone")
            .await;
        let ids = match ingested {
            Ok(ids) => ids,
            Err(error) => panic!("ingest failed: {error}"),
        };
        assert!(!ids.is_empty());

        let removed = retriever.remove_source("doc-gone");
        assert_eq!(removed.len(), ids.len());

        let hits = match retriever.retrieve("alpha beta gamma", 10).await {
            Ok(hits) => hits,
            Err(error) => panic!("retrieve failed: {error}"),
        };
        assert!(hits.is_empty());
        assert!(retriever.is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trip_preserves_retrieval() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("failed to create temp dir: {error}"),
        };
        let path = dir.path().join("library.bin");

        let retriever = retriever();
        let ingested = retriever
            .ingest("Plants convert sunlight into sugar through photosynthesis.", "bio")
            .await;
        assert!(ingested.is_ok());
        assert!(retriever.save_snapshot(&path).is_ok());

        let restored = Retriever::with_provider(HashEmbeddingClient::with_dimension(32))
            .with_chunking(20, 5);
        let loaded = restored.load_snapshot(&path);
        assert!(matches!(loaded, Ok(true)));
        assert_eq!(restored.len(), retriever.len());

        let original = retriever.retrieve("sunlight into sugar", 3).await;
        let replayed = restored.retrieve("sunlight into sugar", 3).await;
        assert!(original.is_ok() && replayed.is_ok());
        if let (Ok(original), Ok(replayed)) = (original, replayed) {
            let original_ids: Vec<_> = original.iter().map(|hit| hit.chunk.id).collect();
            let replayed_ids: Vec<_> = replayed.iter().map(|hit| hit.chunk.id).collect();
            assert_eq!(original_ids, replayed_ids);
        }
    }
}
