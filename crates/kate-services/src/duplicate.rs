//! Duplicate detection against a category's stored list.

use std::sync::Arc;

use kate_core::error::{AppError, Result};
use kate_core::traits::InsultRepo;

#[derive(Clone)]
pub struct DuplicateChecker {
    insults: Arc<dyn InsultRepo>,
}

impl DuplicateChecker {
    pub fn new(insults: Arc<dyn InsultRepo>) -> Self {
        Self { insults }
    }

    /// Exact, case-sensitive match. A missing category holds no duplicates.
    /// Store failures propagate so the caller can fail the submission.
    pub async fn is_duplicate(&self, category: &str, text: &str) -> Result<bool> {
        let stored = self
            .insults
            .get_category(category)
            .await
            .map_err(AppError::store)?;
        Ok(stored.is_some_and(|c| c.contains(text)))
    }
}
