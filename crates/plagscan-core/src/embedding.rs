//! Embedder trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! the [`HashingEmbedder`] reference backend, and pure helpers for
//! normalization and similarity.
//!
//! Network-backed providers (OpenAI, Ollama, fastembed) live in the
//! `plagscan` app crate.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::EmbeddingError;

/// Allowed deviation from unit length for stored and query vectors.
///
/// Norms are accumulated in `f64`, so vectors scaled by
/// [`normalize_in_place`] land well inside this bound.
pub const NORM_TOLERANCE: f32 = 1e-6;

/// Trait for embedding backends.
///
/// `embed` receives every chunk of one submission in a single call and must
/// return one vector per input, in input order. Implementations may batch or
/// retry internally; the pipeline itself never retries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Euclidean norm, accumulated in `f64`.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Scale `v` to unit length. Returns `false` (leaving `v` untouched) when the
/// norm is zero or not finite.
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if !norm.is_finite() || norm < f64::from(f32::EPSILON) {
        return false;
    }
    for x in v.iter_mut() {
        *x = (*x as f64 / norm) as f32;
    }
    true
}

pub fn is_unit(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= f64::from(NORM_TOLERANCE)
}

/// Dot product, accumulated in `f64`. Equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

/// Compute cosine similarity between two vectors of any length.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = l2_norm(a) * l2_norm(b);
    if denom < f64::from(f32::EPSILON) {
        return 0.0;
    }

    (dot(a, b) / denom) as f32
}

/// Validate a provider response and unit-normalize every vector.
///
/// Checks the vector count against `expected_count` and every width against
/// `dims`.
pub fn prepare_vectors(
    mut vectors: Vec<Vec<f32>>,
    expected_count: usize,
    dims: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingError::CountMismatch {
            expected: expected_count,
            got: vectors.len(),
        });
    }
    for (position, v) in vectors.iter_mut().enumerate() {
        if v.len() != dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dims,
                got: v.len(),
            });
        }
        if !normalize_in_place(v) {
            return Err(EmbeddingError::ZeroVector { position });
        }
    }
    Ok(vectors)
}

// ============ Hashing Embedder ============

/// Deterministic, offline embedder based on signed feature hashing.
///
/// Each text is tokenized into identifiers, numbers, and single punctuation
/// characters. Every unigram and adjacent-token bigram is hashed with SHA-256
/// into one of `dims` buckets with a ±1 sign, and the accumulated vector is
/// unit-normalized. Identical texts embed identically and texts sharing no
/// tokens land near orthogonal, which makes it the exact-results backend for
/// tests and the default when no model is configured.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub const MODEL_NAME: &'static str = "hashing-v1";

    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed one text. The result is unit length unless the text has no tokens.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<&str> = token_re().find_iter(text).map(|m| m.as_str()).collect();
        let mut v = vec![0.0f32; self.dims];

        for tok in &tokens {
            self.add_feature(&mut v, &["u", tok]);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut v, &["b", pair[0], pair[1]]);
        }

        normalize_in_place(&mut v);
        v
    }

    fn add_feature(&self, v: &mut [f32], parts: &[&str]) {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        let h = u64::from_le_bytes(word);

        let bucket = (h % self.dims as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|[0-9]+|[^\sA-Za-z0-9_]").expect("valid regex"))
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_normalize_in_place() {
        let mut v = vec![3.0, 4.0];
        assert!(normalize_in_place(&mut v));
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        assert!(!normalize_in_place(&mut zero));
        let mut nan = vec![f32::NAN, 1.0];
        assert!(!normalize_in_place(&mut nan));
    }

    #[test]
    fn test_prepare_vectors_validates() {
        let ok = prepare_vectors(vec![vec![2.0, 0.0], vec![0.0, 5.0]], 2, 2).unwrap();
        assert!(ok.iter().all(|v| is_unit(v)));

        assert!(matches!(
            prepare_vectors(vec![vec![1.0, 0.0]], 2, 2),
            Err(EmbeddingError::CountMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            prepare_vectors(vec![vec![1.0, 0.0, 0.0]], 1, 2),
            Err(EmbeddingError::DimensionMismatch { expected: 2, got: 3 })
        ));
        assert!(matches!(
            prepare_vectors(vec![vec![1.0, 0.0], vec![0.0, 0.0]], 2, 2),
            Err(EmbeddingError::ZeroVector { position: 1 })
        ));
    }

    #[test]
    fn test_hashing_embedder_unit_and_deterministic() {
        let e = HashingEmbedder::new(384);
        let a = e.embed_one("for i in range(10): total += i");
        let b = e.embed_one("for i in range(10): total += i");
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hashing_embedder_separates_unrelated_text() {
        let e = HashingEmbedder::new(384);
        let a = e.embed_one("def compute_total(items): return sum(item.price for item in items)");
        let b = e.embed_one("qwx7 zzkp vlor9 mmnb2 ttqe plok8 uurh jjdk3 wwpe");
        let same = e.embed_one("def compute_total(items): return sum(item.price for item in items)");
        assert!(dot(&a, &b) < 0.5);
        assert!((dot(&a, &same) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hashing_embedder_batch_preserves_order() {
        let e = HashingEmbedder::new(64);
        let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        let out = e.embed(&texts).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], e.embed_one("alpha beta"));
        assert_eq!(out[1], e.embed_one("gamma delta"));
    }
}
