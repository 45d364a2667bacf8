//! KPI-based performance reviews and the score handed to payroll.

pub mod domain;
mod error;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Kpi, ManagerAssessment, PerformanceReview, ReviewId, ReviewStatus, SelfAssessment,
};
pub use error::PerformanceError;
pub use repository::{InMemoryReviewStore, ReviewRepository};
pub use router::review_router;
pub use scoring::{compute_score, finalize};
pub use service::ReviewService;
