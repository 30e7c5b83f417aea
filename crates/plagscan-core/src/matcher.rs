//! Chunk-level matching and submission-level aggregation.
//!
//! The matcher operates entirely through the [`VectorIndex`] trait and never
//! embeds or stores anything itself. The calling application embeds the
//! submission's chunks, bounds the index calls with its own timeouts, and
//! commits the submission after the report is built.
//!
//! # Scoring Algorithm
//!
//! 1. For every chunk, fetch the `top_k` nearest indexed chunks, excluding the
//!    submission's own chunks.
//! 2. A chunk is flagged when its best similarity is `>= threshold`.
//! 3. Its contribution is the best similarity when flagged, otherwise `0`.
//! 4. Plagiarism % = mean contribution × 100; originality = 100 − plagiarism.
//! 5. Top matches: every match across all chunks, deduplicated by matched
//!    chunk (highest score kept), sorted descending, capped at
//!    `top_matches_limit`.

use chrono::Utc;
use indexmap::IndexMap;

use crate::error::{DetectionError, IndexError, Result};
use crate::index::{Neighbor, VectorIndex};
use crate::models::{CheckReport, ChunkMatch, ChunkResult, Submission};

/// Scoring parameters, decoupled from application config.
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    threshold: f64,
    top_k: usize,
    top_matches_limit: usize,
}

impl DetectionParams {
    /// Fails with [`DetectionError::Configuration`] when `threshold` is
    /// outside `[0, 1]` or `top_k` is zero.
    pub fn new(threshold: f64, top_k: usize, top_matches_limit: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DetectionError::Configuration(format!(
                "similarity_threshold must be in [0.0, 1.0], got {}",
                threshold
            )));
        }
        if top_k == 0 {
            return Err(DetectionError::Configuration(
                "top_k must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            threshold,
            top_k,
            top_matches_limit,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn top_matches_limit(&self) -> usize {
        self.top_matches_limit
    }
}

/// Query the index once per vector, excluding `submission_id`'s own chunks.
///
/// Results are in the same order as `vectors`.
pub async fn find_neighbors<I: VectorIndex + ?Sized>(
    index: &I,
    submission_id: &str,
    vectors: &[Vec<f32>],
    top_k: usize,
) -> std::result::Result<Vec<Vec<Neighbor>>, IndexError> {
    let mut all = Vec::with_capacity(vectors.len());
    for v in vectors {
        all.push(index.search(v, top_k, Some(submission_id)).await?);
    }
    Ok(all)
}

/// Aggregate per-chunk neighbours into a [`CheckReport`].
///
/// `neighbors[i]` must hold the hits for `submission.chunks[i]`. Neighbours
/// owned by the submission itself are ignored even if the index returned them.
pub fn build_report(
    submission: &Submission,
    neighbors: Vec<Vec<Neighbor>>,
    params: &DetectionParams,
) -> CheckReport {
    let mut chunk_results = Vec::with_capacity(submission.chunks.len());

    for (chunk, hits) in submission.chunks.iter().zip(neighbors) {
        let matches: Vec<ChunkMatch> = hits
            .into_iter()
            .filter(|n| n.chunk.submission_id != submission.id)
            .map(|n| ChunkMatch {
                query_chunk: chunk.index,
                query_start_line: chunk.start_line,
                query_end_line: chunk.end_line,
                exact: n.chunk.hash == chunk.hash,
                matched: n.chunk,
                similarity: n.score.clamp(0.0, 1.0),
            })
            .collect();

        let best_similarity = matches
            .iter()
            .map(|m| m.similarity)
            .fold(0.0f64, f64::max);
        let flagged = !matches.is_empty() && best_similarity >= params.threshold;
        let contribution = if flagged { best_similarity } else { 0.0 };

        chunk_results.push(ChunkResult {
            index: chunk.index,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            text: chunk.text.clone(),
            best_similarity,
            flagged,
            contribution,
            matches,
        });
    }

    let total_chunks = chunk_results.len();
    let flagged_chunk_count = chunk_results.iter().filter(|r| r.flagged).count();
    let overall_plagiarism_percentage = if total_chunks == 0 {
        0.0
    } else {
        let sum: f64 = chunk_results.iter().map(|r| r.contribution).sum();
        (sum / total_chunks as f64 * 100.0).clamp(0.0, 100.0)
    };

    let top_similar_chunks = top_matches(&chunk_results, params.top_matches_limit);

    CheckReport {
        submission_id: submission.id.clone(),
        team_name: submission.team_name.clone(),
        submission_name: submission.submission_name.clone(),
        language: submission.language.clone(),
        checked_at: Utc::now(),
        total_chunks,
        overall_plagiarism_percentage,
        overall_originality_score: 100.0 - overall_plagiarism_percentage,
        flagged_chunk_count,
        chunk_results,
        top_similar_chunks,
    }
}

/// Search and aggregate in one call, without timeouts.
pub async fn check_submission<I: VectorIndex + ?Sized>(
    index: &I,
    submission: &Submission,
    vectors: &[Vec<f32>],
    params: &DetectionParams,
) -> Result<CheckReport> {
    let neighbors = find_neighbors(index, &submission.id, vectors, params.top_k).await?;
    Ok(build_report(submission, neighbors, params))
}

/// Highest-scoring matches across all chunks, one per matched chunk.
fn top_matches(results: &[ChunkResult], limit: usize) -> Vec<ChunkMatch> {
    let mut best: IndexMap<String, &ChunkMatch> = IndexMap::new();

    for m in results.iter().flat_map(|r| r.matches.iter()) {
        let key = m.matched.key();
        let replace = best
            .get(&key)
            .map_or(true, |existing| m.similarity > existing.similarity);
        if replace {
            best.insert(key, m);
        }
    }

    let mut top: Vec<ChunkMatch> = best.into_values().cloned().collect();
    top.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    top.truncate(limit);
    top
}
