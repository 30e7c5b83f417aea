//! Index statistics.
//!
//! A quick summary of what is indexed: submission and chunk counts, vector
//! width, index backend, and embedding model. Used by `plagscan stats`.

use anyhow::Result;

use crate::config::Config;
use crate::detector::Detector;

pub async fn run_stats(config: &Config, detector: &Detector, json: bool) -> Result<()> {
    let stats = detector.stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let snapshot_size = std::fs::metadata(&config.store.snapshot)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("plagscan — Index Stats");
    println!("======================");
    println!();
    println!("  Snapshot:    {}", config.store.snapshot.display());
    println!("  Size:        {}", format_bytes(snapshot_size));
    println!();
    println!("  Submissions: {}", stats.total_submissions);
    println!("  Chunks:      {}", stats.total_chunks);
    println!("  Vectors:     {}", stats.total_vectors);
    println!("  Dimension:   {}", stats.dimension);
    println!("  Index:       {}", stats.index_kind);
    println!("  Model:       {}", stats.model);
    println!();

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
