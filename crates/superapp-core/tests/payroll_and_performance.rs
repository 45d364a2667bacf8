//! From KPI review to payslip: the finalized score feeds the payroll
//! calculator, and nothing else does.

mod common {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use superapp_core::ledger::InMemoryNotifications;
    use superapp_core::payroll::{IncentiveCurve, PayrollInput, PayrollRates};
    use superapp_core::performance::{InMemoryReviewStore, ReviewService};

    pub(super) fn reviews() -> ReviewService<InMemoryReviewStore, InMemoryNotifications> {
        ReviewService::new(
            Arc::new(InMemoryReviewStore::default()),
            Arc::new(InMemoryNotifications::default()),
        )
    }

    pub(super) fn rates() -> PayrollRates {
        PayrollRates {
            pph21_rate: Decimal::new(5, 2),
            ppn_rate: Decimal::new(11, 2),
            pension_wage_cap: Some(10_042_300),
            incentive: IncentiveCurve::Linear {
                pool_percent: Decimal::new(10, 2),
            },
        }
    }

    pub(super) fn input(employee_id: &str, base_salary: i64) -> PayrollInput {
        PayrollInput {
            employee_id: employee_id.to_string(),
            employee_name: "Rina Kartika".to_string(),
            period: "2025-03".to_string(),
            base_salary: Some(base_salary),
            fixed_allowance: 750_000,
            attendance: None,
        }
    }
}

use superapp_core::ledger::{Operator, OperatorRole, UserId};
use superapp_core::payroll::{compute_payslip, PayrollCalculator};
use superapp_core::performance::{Kpi, ManagerAssessment, PerformanceError};

use common::*;

#[test]
fn finalized_review_score_drives_the_incentive() {
    let reviews = reviews();
    let review = reviews
        .create_review(
            UserId("emp-701".to_string()),
            "2025-Q1",
            vec![
                Kpi::new("Outlet visits", 120.0, 60),
                Kpi::new("Collection rate", 95.0, 40),
            ],
        )
        .expect("create");
    reviews
        .submit_self_assessment(&review.id, Vec::new())
        .expect("self assessment");
    for (index, actual) in [(0, 180.0), (1, 47.5)] {
        reviews
            .record_manager_assessment(
                &review.id,
                ManagerAssessment {
                    index,
                    actual,
                    comment: None,
                },
            )
            .expect("manager assessment");
    }

    let hr = Operator::new("hr-01", OperatorRole::Hr);
    let finalized = reviews.finalize(&hr, &review.id).expect("finalize");
    let score = finalized.payroll_score().expect("finalized score");
    assert!((score - (72.0 + 20.0)).abs() < 1e-9);

    let calculator = PayrollCalculator::new(rates()).expect("rates");
    let slip = calculator
        .compute(&input("emp-701", 6_000_000), score)
        .expect("slip");
    assert_eq!(slip.pendapatan.insentif_kinerja, 552_000);
    assert_eq!(
        slip.take_home_pay,
        slip.total_pendapatan - slip.total_potongan
    );
    assert_eq!(
        slip,
        compute_payslip(&input("emp-701", 6_000_000), score, &rates()).expect("recomputed")
    );
}

#[test]
fn unfinished_review_offers_no_payroll_score() {
    let reviews = reviews();
    let review = reviews
        .create_review(
            UserId("emp-702".to_string()),
            "2025-Q1",
            vec![Kpi::new("Outlet visits", 100.0, 50), Kpi::new("NPS", 100.0, 40)],
        )
        .expect("create");
    reviews
        .submit_self_assessment(&review.id, Vec::new())
        .expect("self assessment");

    let hr = Operator::new("hr-01", OperatorRole::Hr);
    assert!(matches!(
        reviews.finalize(&hr, &review.id),
        Err(PerformanceError::WeightMismatch { total: 90 })
    ));
    assert_eq!(reviews.get(&review.id).expect("get").payroll_score(), None);
}

#[test]
fn higher_scores_never_lower_take_home_pay() {
    let calculator = PayrollCalculator::new(rates()).expect("rates");
    let slips: Vec<_> = [0.0, 45.5, 80.0, 100.0, 119.9, 120.0, 180.0]
        .into_iter()
        .map(|score| {
            calculator
                .compute(&input("emp-703", 7_250_000), score)
                .expect("slip")
        })
        .collect();
    for pair in slips.windows(2) {
        assert!(pair[1].pendapatan.insentif_kinerja >= pair[0].pendapatan.insentif_kinerja);
        assert!(pair[1].take_home_pay >= pair[0].take_home_pay);
    }
}
