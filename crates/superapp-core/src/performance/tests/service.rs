use super::common::*;
use crate::ledger::domain::UserId;
use crate::performance::domain::{ManagerAssessment, ReviewStatus, SelfAssessment};
use crate::performance::PerformanceError;

fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

#[test]
fn review_moves_through_every_stage() {
    let (service, notifications) = build_service();
    let review = service
        .create_review(
            user("emp-310"),
            "2025-Q1",
            vec![kpi("Sales", 200.0, 0.0, 70), kpi("NPS", 80.0, 0.0, 30)],
        )
        .expect("create");
    assert_eq!(review.status, ReviewStatus::Pending);

    let review = service
        .submit_self_assessment(
            &review.id,
            vec![SelfAssessment {
                index: 0,
                comment: "Closed two enterprise deals".to_string(),
            }],
        )
        .expect("self assessment");
    assert_eq!(review.status, ReviewStatus::SelfAssessmentComplete);
    assert_eq!(
        review.kpis[0].employee_comment.as_deref(),
        Some("Closed two enterprise deals")
    );

    for (index, actual) in [(0, 200.0), (1, 40.0)] {
        service
            .record_manager_assessment(
                &review.id,
                ManagerAssessment {
                    index,
                    actual,
                    comment: Some("verified".to_string()),
                },
            )
            .expect("manager assessment");
    }

    let finalized = service.finalize(&manager(), &review.id).expect("finalize");
    assert_close(finalized.final_score.expect("score"), 70.0 + 15.0);
    assert_eq!(service.get(&review.id).expect("get"), finalized);
    assert!(notifications
        .events()
        .iter()
        .any(|event| event.template == "review_finalized"));
}

#[test]
fn finalized_reviews_reject_every_edit() {
    let (service, _notifications) = build_service();
    let review = service
        .create_review(user("emp-311"), "2025-Q1", vec![kpi("Sales", 100.0, 90.0, 100)])
        .expect("create");
    service
        .submit_self_assessment(&review.id, Vec::new())
        .expect("self assessment");
    service.finalize(&manager(), &review.id).expect("finalize");

    let edit = service.record_manager_assessment(
        &review.id,
        ManagerAssessment {
            index: 0,
            actual: 150.0,
            comment: None,
        },
    );
    assert!(matches!(
        edit,
        Err(PerformanceError::InvalidStateTransition { from: "finalized", .. })
    ));
    assert!(matches!(
        service.submit_self_assessment(&review.id, Vec::new()),
        Err(PerformanceError::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        service.finalize(&manager(), &review.id),
        Err(PerformanceError::InvalidStateTransition { .. })
    ));
    assert_close(
        service.get(&review.id).expect("get").final_score.expect("score"),
        90.0,
    );
}

#[test]
fn mismatched_weights_keep_the_review_open() {
    let (service, _notifications) = build_service();
    let review = service
        .create_review(
            user("emp-312"),
            "2025-Q1",
            vec![kpi("Sales", 100.0, 100.0, 60), kpi("NPS", 100.0, 100.0, 30)],
        )
        .expect("create");
    service
        .submit_self_assessment(&review.id, Vec::new())
        .expect("self assessment");

    assert!(matches!(
        service.finalize(&manager(), &review.id),
        Err(PerformanceError::WeightMismatch { total: 90 })
    ));
    let stored = service.get(&review.id).expect("get");
    assert_eq!(stored.status, ReviewStatus::SelfAssessmentComplete);
    assert_eq!(stored.final_score, None);
}

#[test]
fn weights_above_one_hundred_are_rejected_at_creation() {
    let (service, _notifications) = build_service();
    assert!(matches!(
        service.create_review(user("emp-313"), "2025-Q1", vec![kpi("Sales", 100.0, 0.0, 101)]),
        Err(PerformanceError::InvalidWeight { weight: 101, .. })
    ));
}

#[test]
fn unknown_kpi_index_and_review_are_reported() {
    let (service, _notifications) = build_service();
    let review = service
        .create_review(user("emp-314"), "2025-Q1", vec![kpi("Sales", 100.0, 0.0, 100)])
        .expect("create");

    assert!(matches!(
        service.record_manager_assessment(
            &review.id,
            ManagerAssessment {
                index: 3,
                actual: 10.0,
                comment: None,
            },
        ),
        Err(PerformanceError::KpiNotFound { index: 3 })
    ));
    assert!(matches!(
        service.get(&crate::performance::domain::ReviewId("rev-missing".to_string())),
        Err(PerformanceError::ReviewNotFound(_))
    ));
    assert_eq!(
        service.reviews_for(&user("emp-314")).expect("list").len(),
        1
    );
}
