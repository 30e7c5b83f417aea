//! `plagscan check` and `plagscan recheck`.

use anyhow::{Context, Result};
use std::path::Path;

use plagscan_core::models::CheckReport;

use crate::detector::Detector;
use crate::ingest::{read_submission, SubmissionMeta};

/// Widest chunk excerpt printed per match.
const EXCERPT_CHARS: usize = 80;

/// Score a file against the index, then add it to the index.
pub async fn run_check(
    detector: &Detector,
    file: &Path,
    meta: &SubmissionMeta,
    json: bool,
) -> Result<()> {
    let input = read_submission(file, meta, detector.settings().max_file_bytes)?;
    let report = detector
        .evaluate(input)
        .await
        .with_context(|| format!("Failed to check {}", file.display()))?;
    emit(&report, json)
}

/// Score an already stored submission against every other one.
pub async fn run_recheck(detector: &Detector, id: &str, json: bool) -> Result<()> {
    let report = detector.recheck(id).await?;
    emit(&report, json)
}

fn emit(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    println!("--- Check Report ---");
    println!("submission:  {}", report.submission_id);
    println!("team:        {}", report.team_name);
    println!("name:        {}", report.submission_name);
    println!("language:    {}", report.language);
    println!("checked_at:  {}", report.checked_at.to_rfc3339());
    println!();
    println!("plagiarism:  {:.1}%", report.plagiarism_display());
    println!("originality: {:.1}%", report.originality_display());
    println!(
        "flagged:     {} / {} chunks",
        report.flagged_chunk_count, report.total_chunks
    );

    if report.top_similar_chunks.is_empty() {
        println!();
        println!("No similar chunks found.");
        return;
    }

    println!();
    println!("--- Top Matches ({}) ---", report.top_similar_chunks.len());
    for (i, m) in report.top_similar_chunks.iter().enumerate() {
        println!(
            "{}. {:.3}{}  lines {}-{}  ↔  {} / {} (chunk {}, lines {}-{})",
            i + 1,
            m.similarity,
            if m.exact { " exact" } else { "" },
            m.query_start_line,
            m.query_end_line,
            m.matched.team_name,
            m.matched.submission_name,
            m.matched.chunk_index,
            m.matched.start_line,
            m.matched.end_line,
        );
        println!("    {}", excerpt(&m.matched.text));
    }
}

/// First line of `text`, cut at [`EXCERPT_CHARS`] characters.
fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > EXCERPT_CHARS {
        let cut: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
