//! PayLater credit-limit lifecycle.
//!
//! The transitions here are pure: they validate against the current
//! [`PayLaterAccount`] and return the next one. The wallet service decides
//! when a new state is committed, so a rejected step never leaks.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayLaterStatus {
    #[default]
    NotApplied,
    Pending,
    PendingFinanceApproval,
    Approved,
    Rejected,
}

impl PayLaterStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PayLaterStatus::NotApplied => "not_applied",
            PayLaterStatus::Pending => "pending",
            PayLaterStatus::PendingFinanceApproval => "pending_finance_approval",
            PayLaterStatus::Approved => "approved",
            PayLaterStatus::Rejected => "rejected",
        }
    }

    fn awaiting_decision(self) -> bool {
        matches!(
            self,
            PayLaterStatus::Pending | PayLaterStatus::PendingFinanceApproval
        )
    }
}

/// Per-user credit facility. `0 <= remaining_limit <= limit` at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayLaterAccount {
    pub status: PayLaterStatus,
    pub limit: i64,
    pub remaining_limit: i64,
}

impl PayLaterAccount {
    pub fn outstanding(&self) -> i64 {
        self.limit - self.remaining_limit
    }

    /// Returns the account unchanged when an application is already in flight
    /// or approved.
    pub fn apply(self) -> Self {
        match self.status {
            PayLaterStatus::NotApplied | PayLaterStatus::Rejected => Self {
                status: PayLaterStatus::Pending,
                ..self
            },
            PayLaterStatus::Pending
            | PayLaterStatus::PendingFinanceApproval
            | PayLaterStatus::Approved => self,
        }
    }

    pub fn escalate(self) -> Result<Self, LedgerError> {
        if self.status != PayLaterStatus::Pending {
            return Err(self.invalid("escalate to finance"));
        }
        Ok(Self {
            status: PayLaterStatus::PendingFinanceApproval,
            ..self
        })
    }

    pub fn approve(self, limit: i64) -> Result<Self, LedgerError> {
        if !self.status.awaiting_decision() {
            return Err(self.invalid("approve"));
        }
        if limit <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount: limit,
                reason: "PayLater limit must be positive".to_string(),
            });
        }
        Ok(Self {
            status: PayLaterStatus::Approved,
            limit,
            remaining_limit: limit,
        })
    }

    pub fn reject(self) -> Result<Self, LedgerError> {
        if !self.status.awaiting_decision() {
            return Err(self.invalid("reject"));
        }
        Ok(Self {
            status: PayLaterStatus::Rejected,
            limit: 0,
            remaining_limit: 0,
        })
    }

    /// Reserve `amount` of the remaining limit for a purchase.
    pub fn consume(self, amount: i64) -> Result<Self, LedgerError> {
        if self.status != PayLaterStatus::Approved {
            return Err(self.invalid("consume limit"));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "PayLater purchases must be positive".to_string(),
            });
        }
        if amount > self.remaining_limit {
            return Err(LedgerError::InsufficientLimit {
                requested: amount,
                remaining: self.remaining_limit,
            });
        }
        Ok(Self {
            remaining_limit: self.remaining_limit - amount,
            ..self
        })
    }

    /// Restore limit after a repayment; never exceeds the approved limit.
    pub fn repay(self, amount: i64) -> Result<Self, LedgerError> {
        if self.status != PayLaterStatus::Approved {
            return Err(self.invalid("record repayment"));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "repayments must be positive".to_string(),
            });
        }
        Ok(Self {
            remaining_limit: self.remaining_limit.saturating_add(amount).min(self.limit),
            ..self
        })
    }

    fn invalid(&self, action: &'static str) -> LedgerError {
        LedgerError::InvalidStateTransition {
            from: self.status.label().to_string(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved(limit: i64) -> PayLaterAccount {
        PayLaterAccount::default()
            .apply()
            .approve(limit)
            .expect("pending application can be approved")
    }

    #[test]
    fn apply_is_a_no_op_once_pending_or_approved() {
        let pending = PayLaterAccount::default().apply();
        assert_eq!(pending.status, PayLaterStatus::Pending);
        assert_eq!(pending.apply(), pending);

        let account = approved(1_000_000);
        assert_eq!(account.apply(), account);
    }

    #[test]
    fn rejected_applicants_can_reapply() {
        let rejected = PayLaterAccount::default()
            .apply()
            .reject()
            .expect("pending can be rejected");
        assert_eq!(rejected.status, PayLaterStatus::Rejected);
        assert_eq!(rejected.apply().status, PayLaterStatus::Pending);
    }

    #[test]
    fn approve_requires_an_open_application() {
        match PayLaterAccount::default().approve(500_000) {
            Err(LedgerError::InvalidStateTransition { from, .. }) => {
                assert_eq!(from, "not_applied")
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[test]
    fn finance_escalation_still_allows_approval() {
        let account = PayLaterAccount::default()
            .apply()
            .escalate()
            .expect("pending can be escalated")
            .approve(2_000_000)
            .expect("finance approves");
        assert_eq!(account.status, PayLaterStatus::Approved);
        assert_eq!(account.remaining_limit, 2_000_000);
    }

    #[test]
    fn consume_rejects_amounts_over_remaining_limit() {
        let account = approved(5_000_000);
        match account.consume(6_000_000) {
            Err(LedgerError::InsufficientLimit {
                requested,
                remaining,
            }) => {
                assert_eq!(requested, 6_000_000);
                assert_eq!(remaining, 5_000_000);
            }
            other => panic!("expected insufficient limit, got {other:?}"),
        }

        let account = account.consume(2_000_000).expect("within limit");
        assert_eq!(account.remaining_limit, 3_000_000);
        assert_eq!(account.outstanding(), 2_000_000);
    }

    #[test]
    fn repayment_is_capped_at_limit() {
        let account = approved(1_000_000)
            .consume(400_000)
            .expect("within limit")
            .repay(900_000)
            .expect("repayment recorded");
        assert_eq!(account.remaining_limit, 1_000_000);
    }
}
