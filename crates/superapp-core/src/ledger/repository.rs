use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Transaction, TransactionId, UserId, Wallet};
use super::paylater::PayLaterAccount;

/// Per-user mutable state: the wallet projection and the PayLater facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub user_id: UserId,
    pub wallet: Wallet,
    pub pay_later: PayLaterAccount,
}

impl AccountRecord {
    pub fn open(user_id: UserId) -> Self {
        Self {
            user_id,
            wallet: Wallet::default(),
            pay_later: PayLaterAccount::default(),
        }
    }
}

/// One atomic unit of work handed to the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerCommit {
    /// Replacement snapshots for every account the operation touched.
    pub accounts: Vec<AccountRecord>,
    /// New log entries.
    pub appended: Vec<Transaction>,
    /// Existing entries whose status left `Pending`.
    pub settled: Vec<Transaction>,
}

impl LedgerCommit {
    pub fn account(record: AccountRecord) -> Self {
        Self {
            accounts: vec![record],
            ..Self::default()
        }
    }
}

/// Storage abstraction backing the wallet ledger.
///
/// `commit` must be all-or-nothing: either every account snapshot and log
/// change in the batch becomes visible, or none does.
pub trait LedgerRepository: Send + Sync {
    fn create_account(&self, record: AccountRecord) -> Result<AccountRecord, RepositoryError>;
    fn account(&self, user_id: &UserId) -> Result<Option<AccountRecord>, RepositoryError>;
    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError>;
    fn transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, RepositoryError>;
    fn find_by_idempotency_key(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<Transaction>, RepositoryError>;
    fn next_transaction_id(&self) -> Result<TransactionId, RepositoryError>;
    fn commit(&self, commit: LedgerCommit) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for the notification/toast system.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: LedgerNotification) -> Result<(), NotificationError>;
}

/// Event payload describing a committed ledger change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerNotification {
    pub template: String,
    pub user_id: UserId,
    pub details: BTreeMap<String, String>,
}

impl LedgerNotification {
    pub fn new(template: &str, user_id: &UserId) -> Self {
        Self {
            template: template.to_string(),
            user_id: user_id.clone(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
