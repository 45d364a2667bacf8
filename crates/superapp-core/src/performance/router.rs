use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Kpi, ManagerAssessment, PerformanceReview, ReviewId, SelfAssessment};
use super::repository::ReviewRepository;
use super::service::ReviewService;
use super::PerformanceError;
use crate::ledger::domain::{Operator, UserId};
use crate::ledger::repository::{NotificationPublisher, RepositoryError};

type SharedService<R, N> = Arc<ReviewService<R, N>>;

/// Router builder exposing the review workflow.
pub fn review_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/reviews", post(create_handler::<R, N>))
        .route("/api/v1/reviews/:review_id", get(review_handler::<R, N>))
        .route(
            "/api/v1/reviews/:review_id/self-assessment",
            post(self_assessment_handler::<R, N>),
        )
        .route(
            "/api/v1/reviews/:review_id/manager-assessment",
            post(manager_assessment_handler::<R, N>),
        )
        .route(
            "/api/v1/reviews/:review_id/finalize",
            post(finalize_handler::<R, N>),
        )
        .with_state(service)
}

/// Review summary returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub user_id: UserId,
    pub period: String,
    pub status: &'static str,
    pub total_weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    pub kpis: Vec<Kpi>,
}

impl From<PerformanceReview> for ReviewView {
    fn from(review: PerformanceReview) -> Self {
        Self {
            status: review.status.label(),
            total_weight: review.total_weight(),
            final_score: review.final_score,
            id: review.id,
            user_id: review.user_id,
            period: review.period,
            kpis: review.kpis,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewPayload {
    pub user_id: String,
    pub period: String,
    pub kpis: Vec<Kpi>,
}

#[derive(Debug, Deserialize)]
pub struct SelfAssessmentPayload {
    #[serde(default)]
    pub comments: Vec<SelfAssessment>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizePayload {
    pub operator: Operator,
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(payload): Json<CreateReviewPayload>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.create_review(UserId(payload.user_id), payload.period, payload.kpis) {
        Ok(review) => (StatusCode::CREATED, Json(ReviewView::from(review))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(review_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    review_response(service.get(&ReviewId(review_id)))
}

pub(crate) async fn self_assessment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(review_id): Path<String>,
    Json(payload): Json<SelfAssessmentPayload>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    review_response(service.submit_self_assessment(&ReviewId(review_id), payload.comments))
}

pub(crate) async fn manager_assessment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(review_id): Path<String>,
    Json(payload): Json<ManagerAssessment>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    review_response(service.record_manager_assessment(&ReviewId(review_id), payload))
}

pub(crate) async fn finalize_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(review_id): Path<String>,
    Json(payload): Json<FinalizePayload>,
) -> Response
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    review_response(service.finalize(&payload.operator, &ReviewId(review_id)))
}

fn review_response(result: Result<PerformanceReview, PerformanceError>) -> Response {
    match result {
        Ok(review) => (StatusCode::OK, Json(ReviewView::from(review))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: PerformanceError) -> Response {
    let (status, code) = match &err {
        PerformanceError::WeightMismatch { .. } => (StatusCode::CONFLICT, "weight_mismatch"),
        PerformanceError::InvalidStateTransition { .. } => {
            (StatusCode::CONFLICT, "invalid_state_transition")
        }
        PerformanceError::InvalidWeight { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_weight")
        }
        PerformanceError::KpiNotFound { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "kpi_not_found"),
        PerformanceError::ReviewNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        PerformanceError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, "conflict")
        }
        PerformanceError::Repository(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        PerformanceError::Repository(RepositoryError::Unavailable(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository_unavailable")
        }
    };
    let payload = json!({
        "error": code,
        "message": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
