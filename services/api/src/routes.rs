use crate::infra::{AppState, Wallets};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use superapp_core::error::AppError;
use superapp_core::ledger::wallet_router;
use superapp_core::payroll::{PayrollInput, PayrollSlip};
use superapp_core::performance::{review_router, PerformanceError, ReviewId};

/// Payslip request. The score comes either inline or from a finalized review.
#[derive(Debug, Deserialize)]
pub(crate) struct PayslipRequest {
    #[serde(flatten)]
    pub(crate) input: PayrollInput,
    #[serde(default)]
    pub(crate) performance_score: Option<f64>,
    #[serde(default)]
    pub(crate) review_id: Option<String>,
}

pub(crate) fn with_service_routes(wallets: Arc<Wallets>, state: &AppState) -> axum::Router {
    wallet_router(wallets)
        .merge(review_router(state.reviews.clone()))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/payroll/payslip",
            axum::routing::post(payslip_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn payslip_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<PayslipRequest>,
) -> Result<Json<PayrollSlip>, Response> {
    let score = match (payload.review_id, payload.performance_score) {
        (Some(review_id), _) => review_score(&state, ReviewId(review_id))?,
        (None, Some(score)) => score,
        (None, None) => {
            let body = json!({
                "error": "missing_score",
                "message": "provide performance_score or review_id",
            });
            return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response());
        }
    };

    state
        .payroll
        .compute(&payload.input, score)
        .map(Json)
        .map_err(|err| AppError::from(err).into_response())
}

fn review_score(state: &AppState, review_id: ReviewId) -> Result<f64, Response> {
    let review = state
        .reviews
        .get(&review_id)
        .map_err(|err| AppError::from(err).into_response())?;
    review.payroll_score().ok_or_else(|| {
        AppError::from(PerformanceError::InvalidStateTransition {
            from: review.status.label(),
            action: "compute a payslip from",
        })
        .into_response()
    })
}
