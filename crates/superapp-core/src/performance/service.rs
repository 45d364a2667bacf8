use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::domain::{
    Kpi, ManagerAssessment, PerformanceReview, ReviewId, ReviewStatus, SelfAssessment,
};
use super::repository::ReviewRepository;
use super::scoring;
use super::PerformanceError;
use crate::ledger::domain::{Operator, UserId};
use crate::ledger::repository::{LedgerNotification, NotificationPublisher, RepositoryError};

/// Repository-backed review workflow: creation, self assessment, manager
/// assessment and finalization.
pub struct ReviewService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    sequence: AtomicU64,
    edits: Mutex<()>,
}

impl<R, N> ReviewService<R, N>
where
    R: ReviewRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            notifications,
            sequence: AtomicU64::new(1),
            edits: Mutex::new(()),
        }
    }

    pub fn create_review(
        &self,
        user_id: UserId,
        period: impl Into<String>,
        kpis: Vec<Kpi>,
    ) -> Result<PerformanceReview, PerformanceError> {
        if let Some(kpi) = kpis.iter().find(|kpi| kpi.weight > 100) {
            return Err(PerformanceError::InvalidWeight {
                metric: kpi.metric.clone(),
                weight: kpi.weight,
            });
        }
        let id = ReviewId(format!(
            "rev-{:06}",
            self.sequence.fetch_add(1, Ordering::Relaxed)
        ));
        let review = PerformanceReview {
            id,
            user_id,
            period: period.into(),
            kpis,
            final_score: None,
            status: ReviewStatus::Pending,
        };
        let stored = self.repository.insert(review)?;
        info!(review = %stored.id, user = %stored.user_id, "performance review created");
        Ok(stored)
    }

    /// Records employee comments and closes the self-assessment stage.
    pub fn submit_self_assessment(
        &self,
        id: &ReviewId,
        comments: Vec<SelfAssessment>,
    ) -> Result<PerformanceReview, PerformanceError> {
        self.edit(id, |mut review| {
            if review.status != ReviewStatus::Pending {
                return Err(PerformanceError::InvalidStateTransition {
                    from: review.status.label(),
                    action: "submit_self_assessment",
                });
            }
            for entry in comments {
                let kpi = kpi_at(&mut review.kpis, entry.index)?;
                kpi.employee_comment = Some(entry.comment);
            }
            review.status = ReviewStatus::SelfAssessmentComplete;
            Ok(review)
        })
    }

    pub fn record_manager_assessment(
        &self,
        id: &ReviewId,
        assessment: ManagerAssessment,
    ) -> Result<PerformanceReview, PerformanceError> {
        self.edit(id, |mut review| {
            if review.status == ReviewStatus::Finalized {
                return Err(PerformanceError::InvalidStateTransition {
                    from: review.status.label(),
                    action: "record_manager_assessment",
                });
            }
            let kpi = kpi_at(&mut review.kpis, assessment.index)?;
            kpi.actual = assessment.actual;
            if assessment.comment.is_some() {
                kpi.manager_comment = assessment.comment;
            }
            Ok(review)
        })
    }

    pub fn finalize(
        &self,
        operator: &Operator,
        id: &ReviewId,
    ) -> Result<PerformanceReview, PerformanceError> {
        let review = self.edit(id, scoring::finalize)?;
        info!(
            review = %review.id,
            operator = %operator,
            score = review.final_score.unwrap_or_default(),
            "performance review finalized"
        );

        let mut notification = LedgerNotification::new("review_finalized", &review.user_id)
            .with_detail("review_id", &review.id)
            .with_detail("period", &review.period);
        if let Some(score) = review.final_score {
            notification = notification.with_detail("final_score", format!("{score:.2}"));
        }
        if let Err(err) = self.notifications.publish(notification) {
            warn!(review = %review.id, error = %err, "notification delivery failed");
        }
        Ok(review)
    }

    pub fn get(&self, id: &ReviewId) -> Result<PerformanceReview, PerformanceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| PerformanceError::ReviewNotFound(id.clone()))
    }

    pub fn reviews_for(&self, user_id: &UserId) -> Result<Vec<PerformanceReview>, PerformanceError> {
        Ok(self.repository.for_user(user_id)?)
    }

    fn edit<F>(&self, id: &ReviewId, change: F) -> Result<PerformanceReview, PerformanceError>
    where
        F: FnOnce(PerformanceReview) -> Result<PerformanceReview, PerformanceError>,
    {
        let _guard = self.edits.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.get(id)?;
        let next = change(current).map_err(|err| {
            debug!(review = %id, error = %err, "review edit rejected");
            err
        })?;
        self.repository.update(next.clone()).map_err(|err| match err {
            RepositoryError::NotFound => PerformanceError::ReviewNotFound(id.clone()),
            other => PerformanceError::Repository(other),
        })?;
        Ok(next)
    }
}

fn kpi_at(kpis: &mut [Kpi], index: usize) -> Result<&mut Kpi, PerformanceError> {
    kpis.get_mut(index)
        .ok_or(PerformanceError::KpiNotFound { index })
}
