//! Submission listing and retrieval by ID.
//!
//! Backs `plagscan submissions` and `plagscan show <id>`.

use anyhow::Result;

use crate::detector::Detector;

/// List stored submissions in upload order.
pub async fn run_submissions(detector: &Detector, json: bool) -> Result<()> {
    let submissions = detector.submissions().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&submissions)?);
        return Ok(());
    }

    if submissions.is_empty() {
        println!("No submissions stored.");
        return Ok(());
    }

    for s in &submissions {
        println!(
            "{}  {:<16} {:<24} {:<10} {:>4} chunks  {}",
            s.id,
            s.team_name,
            s.submission_name,
            s.language,
            s.chunk_count,
            s.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

/// Print one submission with all of its chunks.
pub async fn run_show(detector: &Detector, id: &str, json: bool) -> Result<()> {
    let submission = detector.submission(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(submission.as_ref())?);
        return Ok(());
    }

    println!("--- Submission ---");
    println!("id:          {}", submission.id);
    println!("team:        {}", submission.team_name);
    println!("name:        {}", submission.submission_name);
    println!("language:    {}", submission.language);
    if let Some(ref file) = submission.file_name {
        println!("file:        {}", file);
    }
    println!("size:        {} bytes", submission.file_size);
    println!("uploaded_at: {}", submission.uploaded_at.to_rfc3339());
    println!();
    println!("--- Chunks ({}) ---", submission.chunks.len());
    for chunk in &submission.chunks {
        println!(
            "[{}] lines {}-{}",
            chunk.index, chunk.start_line, chunk.end_line
        );
        println!("{}", chunk.text);
        println!();
    }
    Ok(())
}
