//! End-to-end tests of the detection pipeline through the library API.
//!
//! All tests use the deterministic hashing embedder and the exact flat index,
//! so scores are reproducible.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plagscan::config::Config;
use plagscan::detector::{Detector, DetectorSettings};
use plagscan_core::chunk::ChunkParams;
use plagscan_core::embedding::{l2_norm, Embedder, HashingEmbedder};
use plagscan_core::index::{FlatIndex, IndexEntry, Neighbor, VectorIndex};
use plagscan_core::models::SubmissionInput;
use plagscan_core::store::SubmissionStore;
use plagscan_core::{DetectionError, EmbeddingError, IndexError};
use std::sync::atomic::{AtomicUsize, Ordering};

const DIMS: usize = 384;

fn settings() -> DetectorSettings {
    DetectorSettings::from_config(&Config::default()).unwrap()
}

fn detector_with(embedder: Arc<dyn Embedder>, settings: DetectorSettings) -> Detector {
    let dims = embedder.dims();
    Detector::new(
        embedder,
        Arc::new(FlatIndex::new(dims)),
        Arc::new(SubmissionStore::new()),
        settings,
    )
    .unwrap()
}

fn detector() -> Detector {
    detector_with(Arc::new(HashingEmbedder::new(DIMS)), settings())
}

/// 20-word windows with 5 words of overlap.
fn small_window_detector() -> Detector {
    let settings = DetectorSettings {
        chunk_params: ChunkParams::new(20, 5).unwrap(),
        ..settings()
    };
    detector_with(Arc::new(HashingEmbedder::new(DIMS)), settings)
}

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .chunks(7)
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn input(content: impl Into<String>, team: &str) -> SubmissionInput {
    SubmissionInput::new(content, team, "entry", "python")
}

#[tokio::test]
async fn identical_file_is_fully_flagged() {
    let d = small_window_detector();
    let source = words("tok", 155);

    let receipt = d.ingest(input(source.clone(), "A")).await.unwrap();
    assert_eq!(receipt.chunk_count, 10);

    let report = d.evaluate(input(source, "B")).await.unwrap();
    assert_eq!(report.total_chunks, 10);
    assert_eq!(report.flagged_chunk_count, 10);
    assert_eq!(report.plagiarism_display(), 100.0);
    assert_eq!(report.originality_display(), 0.0);
    assert!(report
        .top_similar_chunks
        .iter()
        .all(|m| m.matched.submission_id == receipt.submission_id && m.exact));
    assert_eq!(report.top_similar_chunks.len(), 10);
}

#[tokio::test]
async fn unrelated_file_is_not_flagged() {
    let d = small_window_detector();
    d.ingest(input(words("alpha", 155), "A")).await.unwrap();

    let report = d.evaluate(input(words("omega", 155), "B")).await.unwrap();
    assert_eq!(report.flagged_chunk_count, 0);
    assert!(report.overall_plagiarism_percentage < 1.0);
    assert!(report
        .chunk_results
        .iter()
        .all(|r| r.best_similarity < 0.8));
}

#[tokio::test]
async fn recheck_right_after_ingest_excludes_self() {
    let d = small_window_detector();
    let receipt = d.ingest(input(words("solo", 60), "A")).await.unwrap();

    let report = d.recheck(&receipt.submission_id).await.unwrap();
    assert_eq!(report.overall_plagiarism_percentage, 0.0);
    assert_eq!(report.flagged_chunk_count, 0);
    assert!(report.top_similar_chunks.is_empty());
    assert_eq!(d.stats().await.total_submissions, 1, "recheck stores nothing");
}

#[tokio::test]
async fn percentages_always_sum_to_one_hundred() {
    let d = small_window_detector();
    d.ingest(input(words("shared", 40), "A")).await.unwrap();

    let mixed = format!("{}\n{}", words("shared", 40), words("fresh", 40));
    let report = d.evaluate(input(mixed, "B")).await.unwrap();

    assert!(report.flagged_chunk_count > 0);
    assert!(report.flagged_chunk_count < report.total_chunks);
    let sum = report.overall_plagiarism_percentage + report.overall_originality_score;
    assert!((sum - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn empty_file_check_and_ingest() {
    let d = detector();

    let report = d.evaluate(input("", "A")).await.unwrap();
    assert_eq!(report.overall_plagiarism_percentage, 0.0);
    assert_eq!(report.flagged_chunk_count, 0);
    assert!(report.top_similar_chunks.is_empty());

    assert!(matches!(
        d.ingest(input(" \n\t ", "A")).await,
        Err(DetectionError::EmptySubmission)
    ));
    assert_eq!(d.stats().await.total_vectors, 0);
}

#[tokio::test]
async fn comment_only_edit_still_matches() {
    let d = detector();
    let original = "def total(xs):\n    # add them up\n    s = 0\n    for x in xs:\n        s += x\n    return s\n";
    let disguised = "def total(xs):\n    # Sum every element of the list,\n    # written from scratch by us.\n    s = 0\n    for x in xs:\n        s += x  # accumulate\n    return s\n";

    d.ingest(input(original, "A")).await.unwrap();
    let report = d.evaluate(input(disguised, "B")).await.unwrap();

    assert_eq!(report.flagged_chunk_count, 1);
    assert!(report.chunk_results[0].best_similarity > 0.999);
    assert!(!report.top_similar_chunks[0].exact, "raw text differs");
}

#[tokio::test]
async fn oversized_submission_rejected() {
    let settings = DetectorSettings {
        max_file_bytes: 16,
        ..settings()
    };
    let d = detector_with(Arc::new(HashingEmbedder::new(DIMS)), settings);

    let err = d
        .ingest(input("this content is longer than sixteen bytes", "A"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DetectionError::SubmissionTooLarge { limit: 16, .. }
    ));
}

#[tokio::test]
async fn stored_vectors_are_unit_length() {
    let d = small_window_detector();
    d.ingest(input(words("norm", 90), "A")).await.unwrap();

    for (_, vectors) in d.export().await.unwrap() {
        for v in vectors {
            assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        }
    }
}

/// Never answers within any reasonable timeout.
struct SlowEmbedder;

#[async_trait]
impl Embedder for SlowEmbedder {
    fn model_name(&self) -> &str {
        "slow"
    }
    fn dims(&self) -> usize {
        8
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![vec![1.0; 8]; texts.len()])
    }
}

#[tokio::test]
async fn timeout_commits_nothing() {
    let settings = DetectorSettings {
        timeout: Duration::from_millis(50),
        ..settings()
    };
    let d = detector_with(Arc::new(SlowEmbedder), settings);

    let err = d.evaluate(input("a b c d", "A")).await.unwrap_err();
    assert!(matches!(err, DetectionError::Timeout { .. }));
    assert!(err.is_retryable());

    let stats = d.stats().await;
    assert_eq!(stats.total_submissions, 0);
    assert_eq!(stats.total_vectors, 0);
}

/// Returns one vector fewer than asked for.
struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    fn model_name(&self) -> &str {
        "short"
    }
    fn dims(&self) -> usize {
        4
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(vec![vec![0.5; 4]; texts.len().saturating_sub(1)])
    }
}

#[tokio::test]
async fn embedder_count_mismatch_is_an_embedding_error() {
    let d = detector_with(Arc::new(ShortEmbedder), settings());

    let err = d.ingest(input("x = 1", "A")).await.unwrap_err();
    assert!(matches!(
        err,
        DetectionError::Embedding(EmbeddingError::CountMismatch {
            expected: 1,
            got: 0
        })
    ));
    assert!(d.submissions().await.is_empty());
}

#[tokio::test]
async fn compare_ranks_by_originality() {
    let d = small_window_detector();
    let copied = words("copy", 50);

    let inputs = vec![
        input(copied.clone(), "Team-1"),
        input(words("unique", 50), "Team-2"),
        input(copied, "Team-3"),
    ];

    let board = d.compare(inputs).await.unwrap();
    assert_eq!(board.len(), 3);
    assert_eq!(board[0].team_name, "Team-2");
    assert_eq!(board[0].plagiarism_percentage, 0.0);
    assert_eq!(board[0].flagged_chunk_count, 0);

    for entry in &board[1..] {
        assert!(entry.plagiarism_percentage > 99.0);
        assert_eq!(entry.flagged_chunk_count, entry.chunk_count);
    }
    assert_eq!(board[1].closest_submission.as_deref(), Some(board[2].submission_id.as_str()));
    assert_eq!(board[2].closest_submission.as_deref(), Some(board[1].submission_id.as_str()));
    assert_eq!(d.stats().await.total_submissions, 3);
}

#[tokio::test]
async fn concurrent_checks_never_lose_vectors() {
    let d = Arc::new(small_window_detector());

    let mut handles = Vec::new();
    for i in 0..8 {
        let d = Arc::clone(&d);
        handles.push(tokio::spawn(async move {
            d.evaluate(input(words(&format!("t{}x", i), 45), "T"))
                .await
                .unwrap()
        }));
    }
    let mut chunks = 0;
    for h in handles {
        chunks += h.await.unwrap().total_chunks;
    }

    let stats = d.stats().await;
    assert_eq!(stats.total_submissions, 8);
    assert_eq!(stats.total_vectors, chunks);
    assert_eq!(stats.total_chunks, chunks);
}

/// Flat index that counts batch inserts and can fail them or hold them open.
struct InstrumentedIndex {
    inner: FlatIndex,
    batches: AtomicUsize,
    fail_inserts: bool,
    hold_after_insert: Duration,
}

impl InstrumentedIndex {
    fn new(dims: usize) -> Self {
        Self {
            inner: FlatIndex::new(dims),
            batches: AtomicUsize::new(0),
            fail_inserts: false,
            hold_after_insert: Duration::ZERO,
        }
    }
}

#[async_trait]
impl VectorIndex for InstrumentedIndex {
    fn kind(&self) -> &str {
        "instrumented"
    }
    fn dims(&self) -> usize {
        self.inner.dims()
    }
    fn len(&self) -> usize {
        self.inner.len()
    }
    async fn insert_batch(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(IndexError::Unavailable("disk full".into()));
        }
        self.inner.insert_batch(entries).await?;
        tokio::time::sleep(self.hold_after_insert).await;
        Ok(())
    }
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        exclude_submission: Option<&str>,
    ) -> Result<Vec<Neighbor>, IndexError> {
        self.inner.search(query, k, exclude_submission).await
    }
    async fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        self.inner.entries().await
    }
}

fn detector_on(index: Arc<InstrumentedIndex>) -> Detector {
    let settings = DetectorSettings {
        chunk_params: ChunkParams::new(20, 5).unwrap(),
        ..settings()
    };
    Detector::new(
        Arc::new(HashingEmbedder::new(DIMS)),
        index,
        Arc::new(SubmissionStore::new()),
        settings,
    )
    .unwrap()
}

fn three_inputs() -> Vec<SubmissionInput> {
    vec![
        input(words("copy", 50), "Team-1"),
        input(words("unique", 50), "Team-2"),
        input(words("copy", 50), "Team-3"),
    ]
}

#[tokio::test]
async fn compare_commits_the_batch_in_one_insert() {
    let index = Arc::new(InstrumentedIndex::new(DIMS));
    let d = detector_on(Arc::clone(&index));

    d.compare(three_inputs()).await.unwrap();
    assert_eq!(index.batches.load(Ordering::SeqCst), 1);
    assert_eq!(d.submissions().await.len(), 3);
}

#[tokio::test]
async fn compare_insert_failure_stores_nothing() {
    let index = Arc::new(InstrumentedIndex {
        fail_inserts: true,
        ..InstrumentedIndex::new(DIMS)
    });
    let d = detector_on(Arc::clone(&index));

    let err = d.compare(three_inputs()).await.unwrap_err();
    assert!(matches!(err, DetectionError::Index(IndexError::Unavailable(_))));
    assert!(d.submissions().await.is_empty());
    assert_eq!(index.len(), 0);
}

#[tokio::test]
async fn searched_chunk_resolves_to_its_submission_mid_commit() {
    let index = Arc::new(InstrumentedIndex {
        hold_after_insert: Duration::from_millis(300),
        ..InstrumentedIndex::new(DIMS)
    });
    let d = Arc::new(detector_on(Arc::clone(&index)));

    let ingesting = {
        let d = Arc::clone(&d);
        tokio::spawn(async move { d.ingest(input(words("race", 30), "A")).await })
    };

    let mut waited = 0;
    while index.is_empty() {
        assert!(waited < 200, "insert never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
        waited += 1;
    }

    let query = HashingEmbedder::new(DIMS).embed_one("race0");
    let hits = d.index().search(&query, 1, None).await.unwrap();
    let owner = hits[0].chunk.submission_id.clone();
    let submission = d.submission(&owner).await.unwrap();
    assert_eq!(submission.team_name, "A");

    ingesting.await.unwrap().unwrap();
}
