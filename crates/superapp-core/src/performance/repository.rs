use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::domain::{PerformanceReview, ReviewId};
use crate::ledger::domain::UserId;
use crate::ledger::repository::RepositoryError;

/// Storage abstraction for performance reviews.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, review: PerformanceReview) -> Result<PerformanceReview, RepositoryError>;
    fn update(&self, review: PerformanceReview) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<PerformanceReview>, RepositoryError>;
    fn for_user(&self, user_id: &UserId) -> Result<Vec<PerformanceReview>, RepositoryError>;
}

/// Process-local review store.
#[derive(Default)]
pub struct InMemoryReviewStore {
    reviews: Mutex<BTreeMap<ReviewId, PerformanceReview>>,
}

impl InMemoryReviewStore {
    fn reviews(&self) -> MutexGuard<'_, BTreeMap<ReviewId, PerformanceReview>> {
        self.reviews.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReviewRepository for InMemoryReviewStore {
    fn insert(&self, review: PerformanceReview) -> Result<PerformanceReview, RepositoryError> {
        let mut reviews = self.reviews();
        if reviews.contains_key(&review.id) {
            return Err(RepositoryError::Conflict);
        }
        reviews.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn update(&self, review: PerformanceReview) -> Result<(), RepositoryError> {
        let mut reviews = self.reviews();
        match reviews.get_mut(&review.id) {
            Some(existing) => {
                *existing = review;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<PerformanceReview>, RepositoryError> {
        Ok(self.reviews().get(id).cloned())
    }

    fn for_user(&self, user_id: &UserId) -> Result<Vec<PerformanceReview>, RepositoryError> {
        Ok(self
            .reviews()
            .values()
            .filter(|review| &review.user_id == user_id)
            .cloned()
            .collect())
    }
}
