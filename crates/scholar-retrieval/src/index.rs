//! Exact nearest-neighbor vector index.

use std::cmp::Ordering;
use std::collections::HashMap;

use scholar_core::{ChunkId, Error, Result};

/// Stored vector plus the rank it was first inserted at.
#[derive(Debug, Clone)]
struct IndexEntry {
    /// Embedding vector.
    vector: Vec<f32>,
    /// Insertion rank, used to break distance ties deterministically.
    seq: u64,
}

/// Exact (brute-force) nearest-neighbor index over squared Euclidean distance.
///
/// Correctness over latency: every query scans all vectors, so recall against
/// a brute-force baseline is 1.0 by construction. Ties on distance are broken
/// by insertion order (earlier id wins), which makes query output fully
/// deterministic for identical inputs. The first inserted vector fixes the
/// index dimension.
#[derive(Debug, Default)]
pub struct VectorIndex {
    /// Stored vectors keyed by chunk id.
    entries: HashMap<ChunkId, IndexEntry>,
    /// Dimension fixed by the first insert.
    dimension: Option<usize>,
    /// Next insertion rank.
    next_seq: u64,
}

impl VectorIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension fixed by the first insert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the index holds a vector for `id`.
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.entries.contains_key(id)
    }

    /// Adds or replaces the vector for `id`.
    ///
    /// Replacing keeps the original insertion rank so deterministic
    /// tie-breaking is unaffected by re-ingestion.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the vector is empty or its dimension
    /// does not match the index dimension.
    pub fn insert(&mut self, id: ChunkId, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::InvalidParameter(
                "cannot index an empty vector".to_owned(),
            ));
        }
        match self.dimension {
            None => self.dimension = Some(vector.len()),
            Some(dimension) if dimension != vector.len() => {
                return Err(Error::InvalidParameter(format!(
                    "vector dimension {} does not match index dimension {dimension}",
                    vector.len()
                )));
            }
            Some(_) => {}
        }

        let seq = match self.entries.get(&id) {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.entries.insert(id, IndexEntry { vector, seq });
        Ok(())
    }

    /// Removes the vector for `id`; subsequent queries never return it.
    ///
    /// Returns whether a vector was present.
    pub fn delete(&mut self, id: &ChunkId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Returns up to `k` nearest neighbors as `(id, distance)`, ascending by
    /// squared Euclidean distance, ties broken by insertion order.
    ///
    /// An empty index yields an empty result; `k` larger than the population
    /// yields everything, still ranked.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the query dimension does not match the
    /// index dimension.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(ChunkId, f32)>> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dimension) = self.dimension
            && dimension != vector.len()
        {
            return Err(Error::InvalidParameter(format!(
                "query dimension {} does not match index dimension {dimension}",
                vector.len()
            )));
        }

        let mut scored: Vec<(ChunkId, f32, u64)> = self
            .entries
            .iter()
            .map(|(id, entry)| (*id, squared_distance(vector, &entry.vector), entry.seq))
            .collect();

        scored.sort_unstable_by(|first, second| {
            first
                .1
                .partial_cmp(&second.1)
                .unwrap_or(Ordering::Equal)
                .then(first.2.cmp(&second.2))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, distance, _)| (id, distance))
            .collect())
    }

    /// Iterates over stored vectors with their insertion ranks.
    pub(crate) fn iter_entries(&self) -> impl Iterator<Item = (ChunkId, &[f32], u64)> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, entry.vector.as_slice(), entry.seq))
    }

    /// Re-inserts an entry with a preserved insertion rank (snapshot load).
    ///
    /// # Errors
    /// Returns `InvalidParameter` on dimension mismatch.
    pub(crate) fn insert_with_seq(&mut self, id: ChunkId, vector: Vec<f32>, seq: u64) -> Result<()> {
        self.insert(id, vector)?;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.seq = seq;
        }
        self.next_seq = self.next_seq.max(seq + 1);
        Ok(())
    }
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_distance(first: &[f32], second: &[f32]) -> f32 {
    first
        .iter()
        .zip(second.iter())
        .map(|(left, right)| {
            let diff = left - right;
            diff * diff
        })
        .sum()
}
