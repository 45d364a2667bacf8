use super::domain::ReviewId;
use crate::ledger::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum PerformanceError {
    #[error("KPI weights add up to {total}, expected 100")]
    WeightMismatch { total: u32 },
    #[error("cannot {action} a review in state {from}")]
    InvalidStateTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error("KPI {metric} has weight {weight}, expected 0 to 100")]
    InvalidWeight { metric: String, weight: u8 },
    #[error("review has no KPI at index {index}")]
    KpiNotFound { index: usize },
    #[error("review {0} not found")]
    ReviewNotFound(ReviewId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
