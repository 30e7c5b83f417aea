//! Exact brute-force [`VectorIndex`].
//!
//! Entries live in a `Vec` behind a `parking_lot::RwLock`: searches share the
//! read lock, inserts take the write lock once per batch. Every search scores
//! every stored vector, so results are exact and deterministic.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::embedding::{dot, is_unit, l2_norm};
use crate::error::IndexError;
use crate::models::ChunkRef;

use super::{IndexEntry, Neighbor, VectorIndex};

/// In-memory exact index over unit vectors.
pub struct FlatIndex {
    dims: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl FlatIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn validate(&self, vector: &[f32], chunk: &ChunkRef) -> Result<(), IndexError> {
        if vector.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                got: vector.len(),
            });
        }
        if !is_unit(vector) {
            return Err(IndexError::NotNormalized {
                key: chunk.key(),
                norm: l2_norm(vector) as f32,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn kind(&self) -> &str {
        "flat-exact"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    async fn insert_batch(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in &entries {
            self.validate(&entry.vector, &entry.chunk)?;
        }
        let added = entries.len();
        let mut stored = self.entries.write();
        stored.extend(entries);
        tracing::debug!(added, total = stored.len(), "flat index insert");
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        exclude_submission: Option<&str>,
    ) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let stored = self.entries.read();
        let mut scored: Vec<(usize, f64)> = stored
            .iter()
            .enumerate()
            .filter(|(_, e)| exclude_submission != Some(e.chunk.submission_id.as_str()))
            .map(|(pos, e)| (pos, dot(query, &e.vector)))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| Neighbor {
                chunk: stored[pos].chunk.clone(),
                score,
            })
            .collect())
    }

    async fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        Ok(self.entries.read().clone())
    }
}
