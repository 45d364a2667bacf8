use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One weighted objective within a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub metric: String,
    pub target: f64,
    #[serde(default)]
    pub actual: f64,
    /// Share of the final score, 0 to 100.
    pub weight: u8,
    #[serde(default)]
    pub employee_comment: Option<String>,
    #[serde(default)]
    pub manager_comment: Option<String>,
}

impl Kpi {
    pub fn new(metric: impl Into<String>, target: f64, weight: u8) -> Self {
        Self {
            metric: metric.into(),
            target,
            actual: 0.0,
            weight,
            employee_comment: None,
            manager_comment: None,
        }
    }

    pub fn with_actual(mut self, actual: f64) -> Self {
        self.actual = actual;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    SelfAssessmentComplete,
    Finalized,
}

impl ReviewStatus {
    pub fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::SelfAssessmentComplete => "self_assessment_complete",
            ReviewStatus::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReview {
    pub id: ReviewId,
    pub user_id: UserId,
    pub period: String,
    pub kpis: Vec<Kpi>,
    pub final_score: Option<f64>,
    pub status: ReviewStatus,
}

impl PerformanceReview {
    pub fn total_weight(&self) -> u32 {
        self.kpis.iter().map(|kpi| u32::from(kpi.weight)).sum()
    }

    /// Score handed to payroll; only available once the review is finalized.
    pub fn payroll_score(&self) -> Option<f64> {
        match self.status {
            ReviewStatus::Finalized => self.final_score,
            _ => None,
        }
    }
}

/// Employee comment for the KPI at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfAssessment {
    pub index: usize,
    pub comment: String,
}

/// Manager evaluation of the KPI at `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerAssessment {
    pub index: usize,
    pub actual: f64,
    #[serde(default)]
    pub comment: Option<String>,
}
