//! In-memory submission store.
//!
//! Owns every [`Submission`] and its chunks for the life of the process.
//! Submissions are kept in upload order behind a `parking_lot::RwLock`, so
//! listings are stable and readers never block each other.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{DetectionError, Result};
use crate::models::{Submission, SubmissionSummary};

#[derive(Default)]
pub struct SubmissionStore {
    submissions: RwLock<IndexMap<String, Arc<Submission>>>,
}

impl SubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a submission. Submissions are immutable, so an id that is already
    /// present is rejected rather than overwritten.
    pub fn insert(&self, submission: Submission) -> Result<Arc<Submission>> {
        let mut map = self.submissions.write();
        if map.contains_key(&submission.id) {
            return Err(DetectionError::DuplicateSubmission(submission.id));
        }
        let submission = Arc::new(submission);
        map.insert(submission.id.clone(), Arc::clone(&submission));
        Ok(submission)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Submission>> {
        self.submissions.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.submissions.read().contains_key(id)
    }

    /// Summaries in upload order.
    pub fn list(&self) -> Vec<SubmissionSummary> {
        self.submissions
            .read()
            .values()
            .map(|s| s.summary())
            .collect()
    }

    /// Full submissions in upload order.
    pub fn all(&self) -> Vec<Arc<Submission>> {
        self.submissions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.submissions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_chunks(&self) -> usize {
        self.submissions
            .read()
            .values()
            .map(|s| s.chunks.len())
            .sum()
    }
}
