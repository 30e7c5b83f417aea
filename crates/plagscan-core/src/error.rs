//! Error taxonomy for the detection pipeline.
//!
//! [`DetectionError`] is what every public pipeline operation returns. The
//! embedder and the vector index report their own failures through
//! [`EmbeddingError`] and [`IndexError`], which convert into
//! `DetectionError` with `?` and stay reachable through
//! [`std::error::Error::source`].

use std::time::Duration;

use thiserror::Error;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DetectionError>;

/// Failure of an embedding provider or of the vectors it returned.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider cannot serve requests (disabled, model missing, not running).
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The provider accepted the request but failed to produce embeddings.
    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A vector with zero (or non-finite) norm cannot be normalized.
    #[error("embedding {position} has zero or non-finite norm")]
    ZeroVector { position: usize },
}

/// Failure of a vector index operation.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector has {got} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vector for {key} is not unit length (norm {norm})")]
    NotNormalized { key: String, norm: f32 },

    /// Backend-specific failure (remote index unreachable and so on).
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for ingest, evaluate, and the other pipeline operations.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Invalid chunking or detection parameters. Raised when parameters are
    /// built, before any work starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The submitted file has no words to index.
    #[error("submission has no content to index")]
    EmptySubmission,

    #[error("submission is {size} bytes, limit is {limit} bytes")]
    SubmissionTooLarge { size: usize, limit: usize },

    #[error("unknown submission: {0}")]
    UnknownSubmission(String),

    #[error("submission {0} is already stored")]
    DuplicateSubmission(String),

    #[error("embedding failed")]
    Embedding(#[from] EmbeddingError),

    #[error("vector index failed")]
    Index(#[from] IndexError),

    /// A bounded wait expired. Nothing was committed.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },
}

impl DetectionError {
    /// Whether the caller may simply retry the same operation.
    ///
    /// Rejections (empty or oversized input, bad configuration, unknown ids)
    /// will fail again with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DetectionError::Embedding(_) | DetectionError::Index(_) | DetectionError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_embedding_error_is_wrapped_with_source() {
        let err: DetectionError = EmbeddingError::Unavailable("model not loaded".into()).into();
        assert!(matches!(err, DetectionError::Embedding(_)));
        let source = err.source().expect("wrapped cause");
        assert!(source.to_string().contains("model not loaded"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(DetectionError::Timeout {
            operation: "embed",
            elapsed: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(DetectionError::from(IndexError::Unavailable("down".into())).is_retryable());
        assert!(!DetectionError::EmptySubmission.is_retryable());
        assert!(!DetectionError::Configuration("overlap".into()).is_retryable());
    }
}
