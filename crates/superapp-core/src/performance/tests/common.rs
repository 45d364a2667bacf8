use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::ledger::domain::{Operator, OperatorRole, UserId};
use crate::ledger::memory::InMemoryNotifications;
use crate::performance::domain::{Kpi, PerformanceReview, ReviewId, ReviewStatus};
use crate::performance::repository::InMemoryReviewStore;
use crate::performance::service::ReviewService;

pub(super) type MemoryReviews = ReviewService<InMemoryReviewStore, InMemoryNotifications>;

pub(super) fn build_service() -> (MemoryReviews, Arc<InMemoryNotifications>) {
    let notifications = Arc::new(InMemoryNotifications::default());
    let service = ReviewService::new(
        Arc::new(InMemoryReviewStore::default()),
        notifications.clone(),
    );
    (service, notifications)
}

pub(super) fn manager() -> Operator {
    Operator::new("mgr-07", OperatorRole::Manager)
}

pub(super) fn kpi(metric: &str, target: f64, actual: f64, weight: u8) -> Kpi {
    Kpi::new(metric, target, weight).with_actual(actual)
}

pub(super) fn review(status: ReviewStatus, kpis: Vec<Kpi>) -> PerformanceReview {
    PerformanceReview {
        id: ReviewId("rev-test".to_string()),
        user_id: UserId("emp-301".to_string()),
        period: "2025-Q1".to_string(),
        kpis,
        final_score: None,
        status,
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
