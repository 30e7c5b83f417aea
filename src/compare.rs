//! `plagscan compare`: originality leaderboard for a batch of files.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use plagscan_core::models::{complement_one_decimal, round_one_decimal, LeaderboardEntry};

use crate::detector::Detector;
use crate::ingest::{read_submission, SubmissionMeta};

/// Index every file, score each against all others, and print the ranking.
///
/// Team names are `<team_prefix>-<n>` in argument order; submission names are
/// the file stems.
pub async fn run_compare(
    detector: &Detector,
    files: &[PathBuf],
    team_prefix: &str,
    language: Option<&str>,
    json: bool,
) -> Result<()> {
    let max = detector.settings().max_file_bytes;
    let mut inputs = Vec::with_capacity(files.len());
    for (i, path) in files.iter().enumerate() {
        let meta = SubmissionMeta {
            team_name: Some(format!("{}-{}", team_prefix, i + 1)),
            submission_name: Some(file_stem(path)),
            language: language.map(str::to_string),
        };
        inputs.push(read_submission(path, &meta, max)?);
    }

    let leaderboard = detector
        .compare(inputs)
        .await
        .context("Failed to compare submissions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&leaderboard)?);
    } else {
        print_leaderboard(&leaderboard);
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn print_leaderboard(entries: &[LeaderboardEntry]) {
    println!(
        "{:<5} {:<12} {:<24} {:>11} {:>11} {:>9}",
        "rank", "team", "submission", "originality", "plagiarism", "flagged"
    );
    for (rank, e) in entries.iter().enumerate() {
        println!(
            "{:<5} {:<12} {:<24} {:>10.1}% {:>10.1}% {:>4} / {:<4}",
            rank + 1,
            e.team_name,
            e.submission_name,
            complement_one_decimal(e.originality_score),
            round_one_decimal(e.plagiarism_percentage),
            e.flagged_chunk_count,
            e.chunk_count,
        );
    }
}
