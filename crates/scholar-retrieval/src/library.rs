//! Paired vector-index + chunk-store with snapshot persistence.

use std::fs;
use std::path::Path;

use bincode::config::standard as bincode_config;
use bincode::{Decode, Encode, decode_from_slice, encode_to_vec};
use scholar_core::{Chunk, ChunkId, Error, Result, ScoredChunk};
use tracing::{info, warn};

use crate::index::VectorIndex;
use crate::store::ChunkStore;

/// Snapshot record for one stored chunk.
#[derive(Debug, Encode, Decode)]
struct SnapshotChunk {
    /// Chunk id in string form.
    id: String,
    /// Chunk text.
    text: String,
    /// Source document identifier.
    source_id: String,
    /// Start position in the source text, in characters.
    offset: u64,
    /// Chunk length in characters.
    length: u64,
}

/// Snapshot record for one stored vector.
#[derive(Debug, Encode, Decode)]
struct SnapshotVector {
    /// Chunk id in string form.
    id: String,
    /// Embedding vector.
    vector: Vec<f32>,
    /// Insertion rank, preserved across save/load for deterministic ties.
    seq: u64,
}

/// On-disk form of a [`Library`].
///
/// The chunk and vector sections are stored separately, mirroring the two
/// stores; the load path reconciles them and drops orphans from either side.
#[derive(Debug, Encode, Decode)]
struct LibrarySnapshot {
    /// Format version for invalidation.
    version: u32,
    /// Chunk-store section.
    chunks: Vec<SnapshotChunk>,
    /// Vector-index section.
    vectors: Vec<SnapshotVector>,
}

impl LibrarySnapshot {
    const VERSION: u32 = 1;
}

/// The paired vector index and chunk store behind the retriever.
///
/// Every chunk id present in one side exists in the other; all mutation goes
/// through pair-wise operations so a reader holding the surrounding lock sees
/// the pre-write or post-write state, never a torn one.
#[derive(Debug, Default)]
pub struct Library {
    /// Vector side of the pair.
    index: VectorIndex,
    /// Text side of the pair.
    store: ChunkStore,
}

impl Library {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the library holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Inserts a chunk and its vector as one pair.
    ///
    /// The chunk text is written first; if the index rejects the vector the
    /// text write is rolled back so no id exists in one store without the
    /// other.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the vector is empty or its dimension does
    /// not match the index.
    pub fn insert_pair(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        let id = chunk.id;
        self.store.insert(chunk);
        if let Err(error) = self.index.insert(id, vector) {
            self.store.remove(&id);
            return Err(error);
        }
        Ok(())
    }

    /// Removes a chunk and its vector as one pair.
    pub fn remove_pair(&mut self, id: &ChunkId) -> bool {
        let had_chunk = self.store.remove(id).is_some();
        let had_vector = self.index.delete(id);
        had_chunk || had_vector
    }

    /// Removes every chunk belonging to a source document from both stores.
    ///
    /// Returns the removed ids.
    pub fn remove_source(&mut self, source_id: &str) -> Vec<ChunkId> {
        let ids = self.store.remove_source(source_id);
        for id in &ids {
            self.index.delete(id);
        }
        ids
    }

    /// Returns up to `k` chunks nearest to the query vector, most relevant
    /// first.
    ///
    /// # Errors
    /// Returns `InvalidParameter` on dimension mismatch, or an integrity
    /// error if a ranked id has no stored text — stale hits are never
    /// silently dropped.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let hits = self.index.query(vector, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let chunk = self.store.get(&id).ok_or_else(|| {
                Error::Other(format!("index returned id {id} with no stored chunk"))
            })?;
            results.push(ScoredChunk {
                chunk: chunk.clone(),
                score,
            });
        }
        Ok(results)
    }

    /// Serializes both stores into a snapshot.
    fn to_snapshot(&self) -> LibrarySnapshot {
        let chunks = self
            .store
            .iter()
            .map(|chunk| SnapshotChunk {
                id: chunk.id.to_string(),
                text: chunk.text.clone(),
                source_id: chunk.source_id.clone(),
                offset: chunk.offset as u64,
                length: chunk.length as u64,
            })
            .collect();

        let vectors = self
            .index
            .iter_entries()
            .map(|(id, vector, seq)| SnapshotVector {
                id: id.to_string(),
                vector: vector.to_vec(),
                seq,
            })
            .collect();

        LibrarySnapshot {
            version: LibrarySnapshot::VERSION,
            chunks,
            vectors,
        }
    }

    /// Rebuilds a library from a snapshot, dropping orphans from either
    /// section so the pairing invariant holds before any query is served.
    fn from_snapshot(snapshot: LibrarySnapshot) -> Self {
        let mut library = Self::new();
        let mut orphans = 0_usize;

        let mut chunks: std::collections::HashMap<String, SnapshotChunk> = snapshot
            .chunks
            .into_iter()
            .map(|chunk| (chunk.id.clone(), chunk))
            .collect();

        for entry in snapshot.vectors {
            let Some(chunk) = chunks.remove(&entry.id) else {
                orphans += 1;
                continue;
            };
            let Ok(id) = ChunkId::parse(&entry.id) else {
                orphans += 1;
                continue;
            };

            library.store.insert(Chunk {
                id,
                text: chunk.text,
                source_id: chunk.source_id,
                offset: chunk.offset as usize,
                length: chunk.length as usize,
            });
            if library
                .index
                .insert_with_seq(id, entry.vector, entry.seq)
                .is_err()
            {
                // Dimension stray in the snapshot: drop the whole pair.
                library.store.remove(&id);
                orphans += 1;
            }
        }

        // Chunks never matched by a vector.
        orphans += chunks.len();

        if orphans > 0 {
            warn!("snapshot reconciliation dropped {orphans} orphaned entries");
        }

        library
    }

    /// Writes a durable snapshot of both stores.
    ///
    /// The snapshot is encoded to a temp file and atomically renamed into
    /// place so a crash mid-write leaves the previous snapshot intact.
    ///
    /// # Errors
    /// Returns an error if encoding or any filesystem operation fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.to_snapshot();
        let bytes = encode_to_vec(&snapshot, bincode_config())
            .map_err(|error| Error::Snapshot(format!("failed to encode snapshot: {error}")))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, path)?;

        info!(
            "saved library snapshot ({} chunks) to {}",
            snapshot.chunks.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads a snapshot if one exists at `path`.
    ///
    /// Returns `None` when no snapshot file exists or its version does not
    /// match (the caller rebuilds from empty rather than serving skewed data).
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(path)?;
        let (snapshot, _): (LibrarySnapshot, usize) =
            decode_from_slice(&bytes, bincode_config())
                .map_err(|error| Error::Snapshot(format!("failed to decode snapshot: {error}")))?;

        if snapshot.version != LibrarySnapshot::VERSION {
            warn!(
                "snapshot version {} does not match {}; rebuilding from empty",
                snapshot.version,
                LibrarySnapshot::VERSION
            );
            return Ok(None);
        }

        let library = Self::from_snapshot(snapshot);
        info!(
            "loaded library snapshot ({} chunks) from {}",
            library.len(),
            path.display()
        );
        Ok(Some(library))
    }

    /// Checks the pairing invariant; returns ids present in only one store.
    pub fn unpaired_ids(&self) -> Vec<ChunkId> {
        let mut unpaired: Vec<ChunkId> = self
            .store
            .iter()
            .filter(|chunk| !self.index.contains(&chunk.id))
            .map(|chunk| chunk.id)
            .collect();
        for (id, _, _) in self.index.iter_entries() {
            if self.store.get(&id).is_none() {
                unpaired.push(id);
            }
        }
        unpaired
    }
}
