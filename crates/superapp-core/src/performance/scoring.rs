use super::domain::{Kpi, PerformanceReview, ReviewStatus};
use super::PerformanceError;

/// Per-KPI achievement ceiling, in percent.
pub const ACHIEVEMENT_CAP: f64 = 120.0;

/// Weight total a review must reach before it can be finalized.
pub const REQUIRED_WEIGHT: u32 = 100;

/// Achievement of a single KPI, in percent, clamped to `0..=ACHIEVEMENT_CAP`.
///
/// Negative actuals floor at 0 rather than subtracting from the weighted
/// score. A non-positive target or a non-finite actual also yields 0.
pub fn achievement(kpi: &Kpi) -> f64 {
    if kpi.target > 0.0 && kpi.actual.is_finite() {
        (kpi.actual / kpi.target * 100.0).clamp(0.0, ACHIEVEMENT_CAP)
    } else {
        0.0
    }
}

/// Weighted score across KPIs. The cap applies per KPI before weighting.
pub fn compute_score(kpis: &[Kpi]) -> f64 {
    kpis.iter()
        .map(|kpi| achievement(kpi) / 100.0 * f64::from(kpi.weight))
        .sum()
}

/// Closes a review that has completed self assessment and whose weights add
/// up to exactly 100.
pub fn finalize(mut review: PerformanceReview) -> Result<PerformanceReview, PerformanceError> {
    if review.status != ReviewStatus::SelfAssessmentComplete {
        return Err(PerformanceError::InvalidStateTransition {
            from: review.status.label(),
            action: "finalize",
        });
    }
    let total = review.total_weight();
    if total != REQUIRED_WEIGHT {
        return Err(PerformanceError::WeightMismatch { total });
    }
    review.final_score = Some(compute_score(&review.kpis));
    review.status = ReviewStatus::Finalized;
    Ok(review)
}
