//! Core data models used throughout plagscan.
//!
//! These types represent the submissions, chunks, matches, and reports that
//! flow through the detection pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Build the composite key shared by a chunk and its embedding vector.
pub fn chunk_key(submission_id: &str, index: usize) -> String {
    format!("{}:{}", submission_id, index)
}

/// A bounded, overlapping slice of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub submission_id: String,
    /// Ordinal position within the parent file.
    pub index: usize,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    /// Verbatim source slice.
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    pub fn key(&self) -> String {
        chunk_key(&self.submission_id, self.index)
    }
}

/// Raw file handed to ingest or evaluate, before chunking.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub content: String,
    pub team_name: String,
    pub submission_name: String,
    pub language: String,
    pub file_name: Option<String>,
}

impl SubmissionInput {
    pub fn new(
        content: impl Into<String>,
        team_name: impl Into<String>,
        submission_name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            team_name: team_name.into(),
            submission_name: submission_name.into(),
            language: language.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// A processed file together with its chunks. Immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub team_name: String,
    pub submission_name: String,
    pub language: String,
    pub file_name: Option<String>,
    /// Size of the original content in bytes.
    pub file_size: usize,
    pub uploaded_at: DateTime<Utc>,
    pub chunks: Vec<Chunk>,
}

impl Submission {
    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            id: self.id.clone(),
            team_name: self.team_name.clone(),
            submission_name: self.submission_name.clone(),
            language: self.language.clone(),
            file_name: self.file_name.clone(),
            file_size: self.file_size,
            chunk_count: self.chunks.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Listing view of a [`Submission`] without chunk bodies.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSummary {
    pub id: String,
    pub team_name: String,
    pub submission_name: String,
    pub language: String,
    pub file_name: Option<String>,
    pub file_size: usize,
    pub chunk_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// Provenance stored alongside each vector in the index.
///
/// Carries enough of the owning submission to render a match without a
/// store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub submission_id: String,
    pub chunk_index: usize,
    pub team_name: String,
    pub submission_name: String,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub hash: String,
}

impl ChunkRef {
    pub fn new(submission: &Submission, chunk: &Chunk) -> Self {
        Self {
            submission_id: submission.id.clone(),
            chunk_index: chunk.index,
            team_name: submission.team_name.clone(),
            submission_name: submission.submission_name.clone(),
            language: submission.language.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            text: chunk.text.clone(),
            hash: chunk.hash.clone(),
        }
    }

    pub fn key(&self) -> String {
        chunk_key(&self.submission_id, self.chunk_index)
    }
}

/// One query chunk matched against one previously indexed chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMatch {
    pub query_chunk: usize,
    pub query_start_line: usize,
    pub query_end_line: usize,
    pub matched: ChunkRef,
    /// Cosine similarity clamped to `[0.0, 1.0]`.
    pub similarity: f64,
    /// Both chunks have identical text.
    pub exact: bool,
}

/// Scoring outcome for a single chunk of the checked file.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    /// Highest similarity among `matches`, `0.0` when there are none.
    pub best_similarity: f64,
    pub flagged: bool,
    /// `best_similarity` when flagged, otherwise `0.0`.
    pub contribution: f64,
    pub matches: Vec<ChunkMatch>,
}

/// Submission-level plagiarism report.
///
/// Percentages are kept at full precision and rounded to one decimal place
/// only when serialized. The reported originality is derived from the
/// rounded plagiarism figure, so the two reported values always sum to 100.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub submission_id: String,
    pub team_name: String,
    pub submission_name: String,
    pub language: String,
    pub checked_at: DateTime<Utc>,
    pub total_chunks: usize,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub overall_plagiarism_percentage: f64,
    #[serde(serialize_with = "serialize_complement_one_decimal")]
    pub overall_originality_score: f64,
    pub flagged_chunk_count: usize,
    pub chunk_results: Vec<ChunkResult>,
    pub top_similar_chunks: Vec<ChunkMatch>,
}

impl CheckReport {
    /// Plagiarism percentage as reported to users.
    pub fn plagiarism_display(&self) -> f64 {
        round_one_decimal(self.overall_plagiarism_percentage)
    }

    /// Originality score as reported to users.
    pub fn originality_display(&self) -> f64 {
        complement_one_decimal(self.overall_originality_score)
    }
}

/// Returned by ingest for later reference.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub submission_id: String,
    pub chunk_count: usize,
}

/// One row of a multi-submission originality comparison.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub submission_id: String,
    pub team_name: String,
    pub submission_name: String,
    #[serde(serialize_with = "serialize_complement_one_decimal")]
    pub originality_score: f64,
    #[serde(serialize_with = "serialize_one_decimal")]
    pub plagiarism_percentage: f64,
    pub flagged_chunk_count: usize,
    pub chunk_count: usize,
    /// Submission owning the single strongest match, if any.
    pub closest_submission: Option<String>,
}

/// Aggregate numbers about the in-memory index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_submissions: usize,
    pub total_chunks: usize,
    pub total_vectors: usize,
    pub dimension: usize,
    pub index_kind: String,
    pub model: String,
}

/// Round to one decimal place for display.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round an originality score so that it complements the rounded plagiarism
/// percentage it was derived from (`100 - plagiarism`).
pub fn complement_one_decimal(originality: f64) -> f64 {
    round_one_decimal(100.0 - round_one_decimal(100.0 - originality))
}

fn serialize_complement_one_decimal<S: Serializer>(
    value: &f64,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(complement_one_decimal(*value))
}

fn serialize_one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_one_decimal(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_key_format() {
        assert_eq!(chunk_key("abc", 3), "abc:3");
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(99.99999), 100.0);
        assert_eq!(round_one_decimal(12.34), 12.3);
        assert_eq!(round_one_decimal(0.0), 0.0);
    }

    #[test]
    fn test_complement_follows_rounded_plagiarism() {
        // 6.25 rounds up to 6.3, so originality must be 93.7, not 93.8.
        assert_eq!(round_one_decimal(6.25), 6.3);
        assert_eq!(complement_one_decimal(93.75), 93.7);
        assert_eq!(complement_one_decimal(100.0), 100.0);
        assert_eq!(complement_one_decimal(0.0), 0.0);
    }

    #[test]
    fn test_report_serializes_rounded_percentages() {
        let report = CheckReport {
            submission_id: "s".into(),
            team_name: "t".into(),
            submission_name: "n".into(),
            language: "rust".into(),
            checked_at: Utc::now(),
            total_chunks: 3,
            overall_plagiarism_percentage: 33.333_333,
            overall_originality_score: 66.666_667,
            flagged_chunk_count: 1,
            chunk_results: Vec::new(),
            top_similar_chunks: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall_plagiarism_percentage"], 33.3);
        assert_eq!(json["overall_originality_score"], 66.7);
        assert!((report.overall_plagiarism_percentage - 33.333_333).abs() < 1e-9);
    }
}
