//! # plagscan core
//!
//! Shared, runtime-agnostic logic for plagscan: data models, error taxonomy,
//! chunking, source normalization, the embedder trait, the vector index,
//! the submission store, and plagiarism scoring.
//!
//! This crate contains no tokio, HTTP clients, filesystem I/O, or other
//! native-only dependencies. Timeouts, providers, and persistence live in the
//! `plagscan` app crate.
//!
//! ```text
//! source ─▶ chunk ─▶ normalize ─▶ Embedder ─▶ unit vectors
//!                                                │
//!                     ┌──────────────────────────┤
//!                     ▼                          ▼
//!              VectorIndex::insert      matcher::build_report ─▶ CheckReport
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod store;

pub use error::{DetectionError, EmbeddingError, IndexError};
