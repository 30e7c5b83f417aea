//! Reading source files into submissions and the `plagscan ingest` command.

use anyhow::{bail, Context, Result};
use std::path::Path;

use plagscan_core::models::SubmissionInput;
use plagscan_core::normalize::language_for_extension;

use crate::detector::Detector;

pub const DEFAULT_TEAM: &str = "Unknown Team";
pub const DEFAULT_SUBMISSION: &str = "Unknown Submission";
/// Used when no language is given and the extension is unrecognised.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Labels attached to a file when it becomes a submission.
#[derive(Debug, Clone, Default)]
pub struct SubmissionMeta {
    pub team_name: Option<String>,
    pub submission_name: Option<String>,
    pub language: Option<String>,
}

/// Read `path` as UTF-8 source and label it.
///
/// Files over `max_file_bytes` are refused before they are read.
pub fn read_submission(
    path: &Path,
    meta: &SubmissionMeta,
    max_file_bytes: usize,
) -> Result<SubmissionInput> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    if size > max_file_bytes as u64 {
        bail!(
            "{} is {} bytes, limit is {} bytes (limits.max_file_bytes)",
            path.display(),
            size,
            max_file_bytes
        );
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8 text", path.display()))?;

    let language = meta
        .language
        .clone()
        .or_else(|| detect_language(path).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let mut input = SubmissionInput::new(
        content,
        meta.team_name.as_deref().unwrap_or(DEFAULT_TEAM),
        meta.submission_name.as_deref().unwrap_or(DEFAULT_SUBMISSION),
        language,
    );
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        input = input.with_file_name(name);
    }
    Ok(input)
}

/// Language name for a path's extension, if recognised.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(language_for_extension)
}

/// Run `plagscan ingest`: index each file as a separate submission.
///
/// Every file is read before the first one is indexed, so unreadable,
/// oversized, or non-UTF-8 files abort the command with nothing indexed.
/// Files indexed before a later indexing failure stay indexed.
pub async fn run_ingest(
    detector: &Detector,
    files: &[std::path::PathBuf],
    meta: &SubmissionMeta,
    json: bool,
) -> Result<()> {
    let max = detector.settings().max_file_bytes;
    let inputs = files
        .iter()
        .map(|path| read_submission(path, meta, max))
        .collect::<Result<Vec<_>>>()?;
    let mut receipts = Vec::with_capacity(files.len());

    for (path, input) in files.iter().zip(inputs) {
        let receipt = detector
            .ingest(input)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;

        if !json {
            println!(
                "ingested {} → {} ({} chunks)",
                path.display(),
                receipt.submission_id,
                receipt.chunk_count
            );
        }
        receipts.push(receipt);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&receipts)?);
    }
    Ok(())
}
