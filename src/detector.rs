//! The detection pipeline.
//!
//! [`Detector`] owns the injected embedder, the vector index, and the
//! submission store, and runs every public operation against them:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`ingest`](Detector::ingest) | chunk → embed → commit |
//! | [`evaluate`](Detector::evaluate) | chunk → embed → search → report → commit |
//! | [`recheck`](Detector::recheck) | re-embed a stored submission → search → report |
//! | [`compare`](Detector::compare) | commit a batch, then score each against the rest |
//!
//! # Commit Ordering
//!
//! A submission becomes visible only after its report (if any) is built.
//! The commit appends all of its vectors to the index in one batch and then
//! adds it to the store, both under one async mutex. An error, timeout, or
//! dropped future before that point leaves the index and store untouched.
//!
//! Raw index searches do not take the mutex, so a search can return a chunk
//! whose submission is still being committed. Store reads
//! ([`submission`](Detector::submission), [`submissions`](Detector::submissions),
//! [`stats`](Detector::stats)) take it and therefore wait for that commit.
//!
//! The embedding call, the search pass over a submission's chunks, and the
//! index insert are each bounded by the configured timeout.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use plagscan_core::chunk::{build_submission, ChunkParams};
use plagscan_core::embedding::{prepare_vectors, Embedder};
use plagscan_core::error::Result;
use plagscan_core::index::{FlatIndex, IndexEntry, VectorIndex};
use plagscan_core::matcher::{build_report, check_submission, DetectionParams};
use plagscan_core::models::{
    CheckReport, ChunkRef, IndexStats, IngestReceipt, LeaderboardEntry, Submission,
    SubmissionInput, SubmissionSummary,
};
use plagscan_core::normalize::embedding_input;
use plagscan_core::store::SubmissionStore;
use plagscan_core::DetectionError;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::embedding::create_embedder;

/// Pipeline knobs that are not capabilities.
#[derive(Debug, Clone, Copy)]
pub struct DetectorSettings {
    pub chunk_params: ChunkParams,
    pub detection: DetectionParams,
    pub strip_comments: bool,
    pub max_file_bytes: usize,
    pub timeout: Duration,
}

impl DetectorSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            chunk_params: config.chunk_params()?,
            detection: config.detection_params()?,
            strip_comments: config.chunking.strip_comments,
            max_file_bytes: config.limits.max_file_bytes,
            timeout: config.timeout(),
        })
    }
}

/// Wire the configured embedder to a fresh exact index and empty store.
pub fn build_detector(config: &Config) -> anyhow::Result<Detector> {
    let embedder = create_embedder(&config.embedding)?;
    let index = Arc::new(FlatIndex::new(embedder.dims()));
    let detector = Detector::new(
        embedder,
        index,
        Arc::new(SubmissionStore::new()),
        DetectorSettings::from_config(config)?,
    )?;
    Ok(detector)
}

pub struct Detector {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<SubmissionStore>,
    settings: DetectorSettings,
    commit_lock: Mutex<()>,
}

impl Detector {
    /// Fails with [`DetectionError::Configuration`] when the embedder and the
    /// index disagree on vector width.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<SubmissionStore>,
        settings: DetectorSettings,
    ) -> Result<Self> {
        if embedder.dims() != index.dims() {
            return Err(DetectionError::Configuration(format!(
                "embedder '{}' produces {} dimensions but the index holds {}",
                embedder.model_name(),
                embedder.dims(),
                index.dims()
            )));
        }
        Ok(Self {
            embedder,
            index,
            store,
            settings,
            commit_lock: Mutex::new(()),
        })
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Chunk, embed, and index a file so later checks can match against it.
    ///
    /// Files with no words are rejected with
    /// [`DetectionError::EmptySubmission`].
    pub async fn ingest(&self, input: SubmissionInput) -> Result<IngestReceipt> {
        let submission = self.prepare(&input)?;
        if submission.chunks.is_empty() {
            return Err(DetectionError::EmptySubmission);
        }

        let vectors = self.embed_chunks(&submission).await?;
        let receipt = IngestReceipt {
            submission_id: submission.id.clone(),
            chunk_count: submission.chunks.len(),
        };
        let team = submission.team_name.clone();
        self.commit(submission, vectors).await?;

        tracing::info!(
            submission = %receipt.submission_id,
            team = %team,
            chunks = receipt.chunk_count,
            "ingested submission"
        );
        Ok(receipt)
    }

    /// Score a file against everything indexed so far, then index it.
    ///
    /// A file with no words yields an all-original report and is not stored.
    pub async fn evaluate(&self, input: SubmissionInput) -> Result<CheckReport> {
        let submission = self.prepare(&input)?;
        if submission.chunks.is_empty() {
            tracing::debug!("empty submission checked; nothing to store");
            return Ok(build_report(&submission, Vec::new(), &self.settings.detection));
        }

        let vectors = self.embed_chunks(&submission).await?;
        let report = self.score(&submission, &vectors).await?;

        self.commit(submission, vectors).await?;

        tracing::info!(
            submission = %report.submission_id,
            plagiarism = report.plagiarism_display(),
            flagged = report.flagged_chunk_count,
            chunks = report.total_chunks,
            "checked submission"
        );
        Ok(report)
    }

    /// Score a stored submission against every other one. Nothing is stored.
    pub async fn recheck(&self, submission_id: &str) -> Result<CheckReport> {
        let submission = self.submission(submission_id).await?;
        let vectors = self.embed_chunks(&submission).await?;
        self.score(&submission, &vectors).await
    }

    /// Index a batch of files, then score each one against all others.
    ///
    /// Needs at least two inputs. Every input is embedded before anything is
    /// committed and the batch goes in as one commit, so either all inputs
    /// are stored or none are. Entries are sorted by originality (highest
    /// first), ties by plagiarism (lowest first).
    pub async fn compare(&self, inputs: Vec<SubmissionInput>) -> Result<Vec<LeaderboardEntry>> {
        if inputs.len() < 2 {
            return Err(DetectionError::Configuration(format!(
                "compare needs at least 2 submissions, got {}",
                inputs.len()
            )));
        }

        let mut prepared = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let submission = self.prepare(input)?;
            if submission.chunks.is_empty() {
                return Err(DetectionError::EmptySubmission);
            }
            let vectors = self.embed_chunks(&submission).await?;
            prepared.push((submission, vectors));
        }

        let (submissions, vectors): (Vec<Submission>, Vec<Vec<Vec<f32>>>) =
            prepared.into_iter().unzip();
        let committed = self
            .commit_batch(submissions.into_iter().zip(vectors.iter().cloned()).collect())
            .await?;

        let mut entries = Vec::with_capacity(committed.len());
        for (submission, vectors) in committed.iter().zip(&vectors) {
            let report = self.score(submission, vectors).await?;
            entries.push(LeaderboardEntry {
                submission_id: submission.id.clone(),
                team_name: submission.team_name.clone(),
                submission_name: submission.submission_name.clone(),
                originality_score: report.overall_originality_score,
                plagiarism_percentage: report.overall_plagiarism_percentage,
                flagged_chunk_count: report.flagged_chunk_count,
                chunk_count: report.total_chunks,
                closest_submission: report
                    .top_similar_chunks
                    .first()
                    .map(|m| m.matched.submission_id.clone()),
            });
        }

        entries.sort_by(|a, b| {
            b.originality_score
                .total_cmp(&a.originality_score)
                .then(a.plagiarism_percentage.total_cmp(&b.plagiarism_percentage))
        });

        tracing::info!(submissions = entries.len(), "compared submissions");
        Ok(entries)
    }

    /// Counts are read under the commit lock, so they never straddle a commit.
    pub async fn stats(&self) -> IndexStats {
        let _guard = self.commit_lock.lock().await;
        IndexStats {
            total_submissions: self.store.len(),
            total_chunks: self.store.total_chunks(),
            total_vectors: self.index.len(),
            dimension: self.index.dims(),
            index_kind: self.index.kind().to_string(),
            model: self.embedder.model_name().to_string(),
        }
    }

    pub async fn submissions(&self) -> Vec<SubmissionSummary> {
        let _guard = self.commit_lock.lock().await;
        self.store.list()
    }

    /// Waits for any in-flight commit, so an id returned by a concurrent
    /// search always resolves.
    pub async fn submission(&self, submission_id: &str) -> Result<Arc<Submission>> {
        let _guard = self.commit_lock.lock().await;
        self.store
            .get(submission_id)
            .ok_or_else(|| DetectionError::UnknownSubmission(submission_id.to_string()))
    }

    /// Re-admit a previously exported submission with its stored vectors.
    ///
    /// Vectors are validated and normalized exactly like fresh embeddings.
    pub async fn restore(&self, submission: Submission, vectors: Vec<Vec<f32>>) -> Result<()> {
        let vectors = prepare_vectors(vectors, submission.chunks.len(), self.index.dims())?;
        self.commit(submission, vectors).await?;
        Ok(())
    }

    /// Every stored submission with its vectors in chunk order, read under
    /// the commit lock.
    pub async fn export(&self) -> Result<Vec<(Arc<Submission>, Vec<Vec<f32>>)>> {
        let _guard = self.commit_lock.lock().await;
        let entries = self.bounded("index export", self.index.entries()).await?;

        let mut by_key: HashMap<String, Vec<f32>> = entries
            .into_iter()
            .map(|e| (e.chunk.key(), e.vector))
            .collect();

        let mut out = Vec::with_capacity(self.store.len());
        for submission in self.store.all() {
            let mut vectors = Vec::with_capacity(submission.chunks.len());
            for chunk in &submission.chunks {
                let vector = by_key.remove(&chunk.key()).ok_or_else(|| {
                    plagscan_core::IndexError::Unavailable(format!(
                        "no vector stored for chunk {}",
                        chunk.key()
                    ))
                })?;
                vectors.push(vector);
            }
            out.push((submission, vectors));
        }
        Ok(out)
    }

    /// Size check, then chunking under a fresh id.
    fn prepare(&self, input: &SubmissionInput) -> Result<Submission> {
        let size = input.content.len();
        if size > self.settings.max_file_bytes {
            return Err(DetectionError::SubmissionTooLarge {
                size,
                limit: self.settings.max_file_bytes,
            });
        }
        Ok(build_submission(input, &self.settings.chunk_params))
    }

    /// One embedder call for all chunks, then validation and normalization.
    async fn embed_chunks(&self, submission: &Submission) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = submission
            .chunks
            .iter()
            .map(|c| embedding_input(&c.text, &submission.language, self.settings.strip_comments))
            .collect();

        tracing::debug!(
            submission = %submission.id,
            chunks = texts.len(),
            model = self.embedder.model_name(),
            "embedding chunks"
        );
        let raw = self.bounded("embedding", self.embedder.embed(&texts)).await?;
        Ok(prepare_vectors(raw, texts.len(), self.embedder.dims())?)
    }

    /// Search every chunk's neighbours and build the report, as one bounded
    /// index pass.
    async fn score(&self, submission: &Submission, vectors: &[Vec<f32>]) -> Result<CheckReport> {
        self.bounded(
            "index search",
            check_submission(
                self.index.as_ref(),
                submission,
                vectors,
                &self.settings.detection,
            ),
        )
        .await
    }

    async fn commit(&self, submission: Submission, vectors: Vec<Vec<f32>>) -> Result<()> {
        self.commit_batch(vec![(submission, vectors)]).await?;
        Ok(())
    }

    /// Append every vector of the batch in one index insert, then add the
    /// submissions to the store in order. Nothing is written unless every id
    /// is new.
    async fn commit_batch(
        &self,
        batch: Vec<(Submission, Vec<Vec<f32>>)>,
    ) -> Result<Vec<Arc<Submission>>> {
        let mut submissions = Vec::with_capacity(batch.len());
        let mut entries = Vec::new();
        for (submission, vectors) in batch {
            entries.extend(submission.chunks.iter().zip(vectors).map(|(chunk, vector)| {
                IndexEntry {
                    chunk: ChunkRef::new(&submission, chunk),
                    vector,
                }
            }));
            submissions.push(submission);
        }

        let _guard = self.commit_lock.lock().await;
        let mut seen = HashSet::new();
        for submission in &submissions {
            if self.store.contains(&submission.id) || !seen.insert(submission.id.as_str()) {
                return Err(DetectionError::DuplicateSubmission(submission.id.clone()));
            }
        }
        self.bounded("index insert", self.index.insert_batch(entries))
            .await?;
        submissions
            .into_iter()
            .map(|submission| self.store.insert(submission))
            .collect()
    }

    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T>
    where
        DetectionError: From<E>,
    {
        match tokio::time::timeout(self.settings.timeout, fut).await {
            Ok(result) => result.map_err(DetectionError::from),
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.settings.timeout, "operation timed out");
                Err(DetectionError::Timeout {
                    operation,
                    elapsed: self.settings.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plagscan_core::embedding::HashingEmbedder;
    use plagscan_core::index::FlatIndex;

    fn default_settings() -> DetectorSettings {
        DetectorSettings::from_config(&Config::default()).unwrap()
    }

    fn detector(dims: usize) -> Detector {
        let settings = DetectorSettings {
            chunk_params: ChunkParams::new(6, 2).unwrap(),
            ..default_settings()
        };
        Detector::new(
            Arc::new(HashingEmbedder::new(dims)),
            Arc::new(FlatIndex::new(dims)),
            Arc::new(SubmissionStore::new()),
            settings,
        )
        .unwrap()
    }

    fn input(content: &str) -> SubmissionInput {
        SubmissionInput::new(content, "team", "entry", "python")
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = Detector::new(
            Arc::new(HashingEmbedder::new(16)),
            Arc::new(FlatIndex::new(32)),
            Arc::new(SubmissionStore::new()),
            default_settings(),
        );
        assert!(matches!(result, Err(DetectionError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_ingest_commits_every_chunk() {
        let d = detector(64);
        let receipt = d
            .ingest(input("alpha beta gamma delta epsilon zeta eta theta iota"))
            .await
            .unwrap();
        assert_eq!(receipt.chunk_count, 2);

        let stats = d.stats().await;
        assert_eq!(stats.total_submissions, 1);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_vectors, 2);
        assert_eq!(stats.dimension, 64);
        assert_eq!(stats.model, "hashing-v1");
    }

    #[tokio::test]
    async fn test_empty_ingest_rejected_and_empty_check_not_stored() {
        let d = detector(32);
        assert!(matches!(
            d.ingest(input("   \n ")).await,
            Err(DetectionError::EmptySubmission)
        ));

        let report = d.evaluate(input("")).await.unwrap();
        assert_eq!(report.total_chunks, 0);
        assert_eq!(report.overall_plagiarism_percentage, 0.0);
        assert!(d.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_stores_after_scoring() {
        let d = detector(64);
        let report = d.evaluate(input("one two three four five")).await.unwrap();
        assert_eq!(report.flagged_chunk_count, 0);
        assert!(d.submission(&report.submission_id).await.is_ok());

        let again = d.evaluate(input("one two three four five")).await.unwrap();
        assert_eq!(again.flagged_chunk_count, 1);
        assert_eq!(
            again.top_similar_chunks[0].matched.submission_id,
            report.submission_id
        );
        assert!(again.top_similar_chunks[0].exact);
    }

    #[tokio::test]
    async fn test_recheck_unknown_id() {
        let d = detector(16);
        assert!(matches!(
            d.recheck("nope").await,
            Err(DetectionError::UnknownSubmission(_))
        ));
    }

    #[tokio::test]
    async fn test_compare_needs_two_inputs() {
        let d = detector(16);
        assert!(matches!(
            d.compare(vec![input("a b c")]).await,
            Err(DetectionError::Configuration(_))
        ));
        assert!(d.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_then_restore_into_fresh_detector() {
        let d = detector(32);
        d.ingest(input("fn main() { println!(\"hi\"); } more words here"))
            .await
            .unwrap();
        let exported = d.export().await.unwrap();
        assert_eq!(exported.len(), 1);

        let fresh = detector(32);
        for (submission, vectors) in exported {
            fresh
                .restore(submission.as_ref().clone(), vectors)
                .await
                .unwrap();
        }
        assert_eq!(fresh.stats().await.total_vectors, d.stats().await.total_vectors);
    }
}
