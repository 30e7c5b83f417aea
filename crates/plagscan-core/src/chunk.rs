//! Word-window source chunker.
//!
//! Splits a source file into overlapping [`Chunk`]s of at most
//! `max_chunk_size` whitespace-delimited words. Splitting never happens inside
//! a word, and each chunk keeps the verbatim source slice it covers so line
//! numbers stay exact even though windows are counted in words.
//!
//! Each chunk carries a SHA-256 hash of its text, used to mark exact copies
//! when matches are reported.
//!
//! # Algorithm
//!
//! 1. Record the byte span of every word (maximal run of non-whitespace).
//! 2. Window `i` starts at word `i × (max_chunk_size − overlap)` and spans up
//!    to `max_chunk_size` words.
//! 3. Stop after the first window that reaches the last word, so the final
//!    chunk is never wholly contained in its predecessor.
//! 4. Line numbers come from counting `\n` before the window's first and last
//!    byte.
//!
//! Consecutive chunks share exactly `overlap` words. Input with no words
//! yields no chunks.
//!
//! # Example
//!
//! ```rust
//! use plagscan_core::chunk::{chunk_source, ChunkParams};
//!
//! let params = ChunkParams::new(8, 1).unwrap();
//! let chunks = chunk_source("sub-1", "fn main() {\n    println!(\"hi\");\n}\n", &params);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].start_line, 1);
//! assert_eq!(chunks[0].end_line, 3);
//! ```

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{DetectionError, Result};
use crate::models::{Chunk, Submission, SubmissionInput};

/// Validated window parameters, both counted in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    max_chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Fails with [`DetectionError::Configuration`] unless
    /// `0 <= overlap < max_chunk_size`.
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self> {
        if max_chunk_size == 0 {
            return Err(DetectionError::Configuration(
                "max_chunk_size must be > 0".to_string(),
            ));
        }
        if overlap >= max_chunk_size {
            return Err(DetectionError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than max_chunk_size ({})",
                overlap, max_chunk_size
            )));
        }
        Ok(Self {
            max_chunk_size,
            overlap,
        })
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Words between the starts of consecutive chunks. Always `>= 1`.
    pub fn stride(&self) -> usize {
        self.max_chunk_size - self.overlap
    }
}

/// Split `source` into overlapping word windows owned by `submission_id`.
///
/// Indices are contiguous from 0 and line ranges are non-decreasing.
pub fn chunk_source(submission_id: &str, source: &str, params: &ChunkParams) -> Vec<Chunk> {
    let words = word_spans(source);
    if words.is_empty() {
        return Vec::new();
    }

    let newlines: Vec<usize> = source
        .bytes()
        .enumerate()
        .filter(|(_, b)| *b == b'\n')
        .map(|(i, _)| i)
        .collect();
    let line_of = |byte: usize| newlines.partition_point(|&nl| nl < byte) + 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + params.max_chunk_size).min(words.len());
        let first_byte = words[start].0;
        let last_end = words[end - 1].1;

        chunks.push(make_chunk(
            submission_id,
            chunks.len(),
            &source[first_byte..last_end],
            line_of(first_byte),
            line_of(last_end - 1),
        ));

        if end == words.len() {
            break;
        }
        start += params.stride();
    }

    chunks
}

/// Assign a fresh id to `input` and chunk its content.
///
/// The returned submission is not stored or indexed yet.
pub fn build_submission(input: &SubmissionInput, params: &ChunkParams) -> Submission {
    let id = Uuid::new_v4().to_string();
    let chunks = chunk_source(&id, &input.content, params);
    Submission {
        id,
        team_name: input.team_name.clone(),
        submission_name: input.submission_name.clone(),
        language: input.language.clone(),
        file_name: input.file_name.clone(),
        file_size: input.content.len(),
        uploaded_at: Utc::now(),
        chunks,
    }
}

/// Byte spans `(start, end)` of every whitespace-delimited word.
fn word_spans(source: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, ch) in source.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = word_start.take() {
                spans.push((s, i));
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(s) = word_start {
        spans.push((s, source.len()));
    }

    spans
}

/// Create a single [`Chunk`] with a SHA-256 content hash.
fn make_chunk(
    submission_id: &str,
    index: usize,
    text: &str,
    start_line: usize,
    end_line: usize,
) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        submission_id: submission_id.to_string(),
        index,
        start_line,
        end_line,
        text: text.to_string(),
        hash,
    }
}
