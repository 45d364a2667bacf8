use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::performance::router::review_router;

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn review_workflow_over_http() {
    let (service, _notifications) = build_service();
    let app = review_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/reviews",
            json!({
                "user_id": "emp-320",
                "period": "2025-Q1",
                "kpis": [
                    { "metric": "Sales", "target": 100.0, "actual": 50.0, "weight": 100 }
                ]
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    let id = created["id"].as_str().expect("review id").to_string();
    assert_eq!(created["status"], "pending");

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/reviews/{id}/finalize"),
            json!({ "operator": { "id": "mgr-07", "role": "Manager" } }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/v1/reviews/{id}/self-assessment"),
            json!({ "comments": [{ "index": 0, "comment": "Half the quota" }] }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post(
            &format!("/api/v1/reviews/{id}/finalize"),
            json!({ "operator": { "id": "mgr-07", "role": "Manager" } }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "finalized");
    assert_eq!(body["final_score"], 50.0);
}

#[tokio::test]
async fn weight_mismatch_maps_to_conflict() {
    let (service, _notifications) = build_service();
    let review = service
        .create_review(
            crate::ledger::domain::UserId("emp-321".to_string()),
            "2025-Q1",
            vec![kpi("Sales", 100.0, 100.0, 60), kpi("NPS", 100.0, 100.0, 30)],
        )
        .expect("create");
    service
        .submit_self_assessment(&review.id, Vec::new())
        .expect("self assessment");
    let app = review_router(Arc::new(service));

    let response = app
        .oneshot(post(
            &format!("/api/v1/reviews/{}/finalize", review.id),
            json!({ "operator": { "id": "mgr-07", "role": "Manager" } }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json_body(response).await["error"], "weight_mismatch");
}
