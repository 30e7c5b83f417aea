//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage and nearest-neighbour
//! operations the matcher needs, so the exact [`flat::FlatIndex`] can be
//! swapped for an approximate or remote backend without touching scoring.
//!
//! # Contract
//!
//! | Method | Guarantee |
//! |--------|-----------|
//! | [`insert_batch`](VectorIndex::insert_batch) | All entries become visible together or none do, even if the future is dropped |
//! | [`search`](VectorIndex::search) | At most `k` results, descending score, ties broken by insertion order |
//! | [`entries`](VectorIndex::entries) | Every entry in insertion order |
//!
//! Stored and query vectors are unit length, so cosine similarity is a dot
//! product. Approximate backends must document their recall bound; all tests
//! run against the exact flat index.

pub mod flat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::models::ChunkRef;

pub use flat::FlatIndex;

/// A stored vector with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: ChunkRef,
    pub vector: Vec<f32>,
}

/// One search hit.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub chunk: ChunkRef,
    /// Raw cosine similarity in `[-1.0, 1.0]`.
    pub score: f64,
}

/// Abstract nearest-neighbour index over unit vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend name for stats output (e.g. `"flat-exact"`).
    fn kind(&self) -> &str;

    /// Vector width, fixed at construction.
    fn dims(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one vector.
    async fn insert(&self, vector: Vec<f32>, chunk: ChunkRef) -> Result<(), IndexError> {
        self.insert_batch(vec![IndexEntry { chunk, vector }]).await
    }

    /// Append many vectors atomically.
    async fn insert_batch(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Return the `k` nearest stored chunks, skipping any owned by
    /// `exclude_submission`. Exclusion happens before the `k` cut.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        exclude_submission: Option<&str>,
    ) -> Result<Vec<Neighbor>, IndexError>;

    /// Export every entry in insertion order.
    async fn entries(&self) -> Result<Vec<IndexEntry>, IndexError>;
}
