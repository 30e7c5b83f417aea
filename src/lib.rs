//! # plagscan
//!
//! Detects copied and paraphrased code across submissions by embedding
//! overlapping word windows of each file and searching for near neighbours
//! above a similarity threshold.
//!
//! The algorithms (chunking, normalization, scoring, the vector index, and
//! the submission store) live in `plagscan-core`. This crate adds the
//! runtime around them: configuration, logging, embedding providers,
//! timeouts, snapshots, and the `plagscan` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ source file │──▶│ Chunk+Embed  │──▶│ FlatIndex   │
//! │             │   │ (Embedder)   │   │ + Store     │
//! └─────────────┘   └──────────────┘   └──────┬──────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                   ┌───────────┐      ┌────────────┐
//!                   │ Detector  │      │  snapshot  │
//!                   │ (reports) │      │   (JSON)   │
//!                   └───────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! plagscan ingest team_a/solution.py --team "Team A"
//! plagscan check team_b/solution.py --team "Team B"
//! plagscan compare a.py b.py c.py
//! plagscan stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`embedding`] | Embedding providers (hashing, OpenAI, Ollama, local) |
//! | [`detector`] | The detection pipeline |
//! | [`snapshot`] | JSON persistence between CLI runs |
//! | [`ingest`] | File reading and `ingest` |
//! | [`check`] | `check` and `recheck` |
//! | [`compare`] | Leaderboard comparison |
//! | [`get`] | Submission listing and retrieval |
//! | [`stats`] | Index statistics |

pub mod check;
pub mod compare;
pub mod config;
pub mod detector;
pub mod embedding;
pub mod get;
pub mod ingest;
pub mod logging;
pub mod snapshot;
pub mod stats;
