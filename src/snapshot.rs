//! JSON snapshots of the submission store and vector index.
//!
//! The detector itself is process-lifetime and in-memory. The CLI loads a
//! snapshot before each command and writes it back afterwards so state
//! survives between invocations.
//!
//! ```json
//! { "version": 1, "model": "hashing-v1", "dims": 384,
//!   "submissions": [ { "submission": { ... }, "vectors": [[...], ...] } ] }
//! ```
//!
//! Writes go to a sibling temp file that is then renamed over the target, so
//! a crash mid-write never leaves a truncated snapshot.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use plagscan_core::models::Submission;

use crate::detector::Detector;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub model: String,
    pub dims: usize,
    pub submissions: Vec<SnapshotRecord>,
}

/// One submission with a vector per chunk, in chunk order.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub submission: Submission,
    pub vectors: Vec<Vec<f32>>,
}

/// Write the detector's full state to `path`.
pub async fn save(path: &Path, detector: &Detector) -> Result<()> {
    let exported = detector
        .export()
        .await
        .context("Failed to export index for snapshot")?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        model: detector.embedder().model_name().to_string(),
        dims: detector.embedder().dims(),
        submissions: exported
            .into_iter()
            .map(|(submission, vectors)| SnapshotRecord {
                submission: submission.as_ref().clone(),
                vectors,
            })
            .collect(),
    };

    let json = serde_json::to_vec(&snapshot).context("Failed to serialize snapshot")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .with_context(|| format!("Failed to write snapshot: {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace snapshot: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        submissions = snapshot.submissions.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Restore the snapshot at `path` into `detector`. Returns the number of
/// submissions loaded; a missing file loads nothing.
///
/// Fails when the snapshot was produced by a different model or vector width.
pub async fn load(path: &Path, detector: &Detector) -> Result<usize> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no snapshot; starting empty");
        return Ok(0);
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        bail!(
            "Unsupported snapshot version {} (expected {})",
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }
    let model = detector.embedder().model_name();
    let dims = detector.embedder().dims();
    if snapshot.model != model || snapshot.dims != dims {
        bail!(
            "Snapshot {} was built with {} ({} dims) but the configured embedder is {} ({} dims). \
             Remove the snapshot or restore the original embedding settings.",
            path.display(),
            snapshot.model,
            snapshot.dims,
            model,
            dims
        );
    }

    let count = snapshot.submissions.len();
    for record in snapshot.submissions {
        let id = record.submission.id.clone();
        detector
            .restore(record.submission, record.vectors)
            .await
            .with_context(|| format!("Failed to restore submission {}", id))?;
    }

    tracing::debug!(path = %path.display(), submissions = count, "snapshot loaded");
    Ok(count)
}
