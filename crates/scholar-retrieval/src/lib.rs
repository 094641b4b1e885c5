//! Chunking, embedding, and exact nearest-neighbor retrieval over study material.
//!
//! Ingested text is cut into overlapping fixed-size chunks, embedded through a
//! pluggable provider, and held in a paired vector-index/chunk-store library
//! that supports durable snapshots. The [`Retriever`] composes the pieces into
//! the ingest/retrieve surface the workflow graphs consume.

/// Fixed-size overlapping chunking of ingested text.
pub mod chunking;
/// Embedding provider boundary and clients.
pub mod embedding;
/// Exact nearest-neighbor vector index.
pub mod index;
/// Paired vector-index + chunk-store with snapshot persistence.
pub mod library;
/// Chunk-id keyed text storage with per-source cascade.
pub mod store;

mod retriever;

pub use chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, chunk_text};
pub use embedding::{EmbeddingProvider, HashEmbeddingClient, OllamaEmbeddingClient};
pub use index::VectorIndex;
pub use library::Library;
pub use retriever::Retriever;
pub use store::ChunkStore;
