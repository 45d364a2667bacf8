use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::ledger::clock::FixedClock;
use crate::ledger::domain::{
    Operator, OperatorRole, Transaction, TransactionId, TransactionRequest, TransactionType,
    UserId,
};
use crate::ledger::memory::{InMemoryLedgerStore, InMemoryNotifications};
use crate::ledger::repository::{
    AccountRecord, LedgerCommit, LedgerNotification, LedgerRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};
use crate::ledger::service::WalletService;

pub(super) type MemoryService = WalletService<InMemoryLedgerStore, InMemoryNotifications>;

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn finance() -> Operator {
    Operator::new("fin-01", OperatorRole::Finance)
}

pub(super) fn admin() -> Operator {
    Operator::new("adm-01", OperatorRole::Admin)
}

pub(super) fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    ))
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryLedgerStore>,
    Arc<InMemoryNotifications>,
) {
    let store = Arc::new(InMemoryLedgerStore::default());
    let notifications = Arc::new(InMemoryNotifications::default());
    let service = WalletService::with_clock(store.clone(), notifications.clone(), clock());
    (service, store, notifications)
}

/// Open a wallet for `id` and top it up with `balance` when non-zero.
pub(super) fn funded(service: &MemoryService, id: &str, balance: i64) -> UserId {
    let user_id = user(id);
    service
        .open_wallet(user_id.clone())
        .expect("wallet opens");
    if balance > 0 {
        service
            .apply_transaction(TransactionRequest::new(
                user_id.clone(),
                TransactionType::TopUp,
                balance,
                "Initial top-up",
            ))
            .expect("top-up succeeds");
    }
    user_id
}

pub(super) fn purchase(user_id: &UserId, amount: i64) -> TransactionRequest {
    TransactionRequest::new(
        user_id.clone(),
        TransactionType::Marketplace,
        -amount,
        "Marketplace order",
    )
}

/// Delegates to an in-memory store but can be told to fail every commit.
#[derive(Default)]
pub(super) struct FlakyStore {
    pub(super) inner: InMemoryLedgerStore,
    pub(super) fail_commits: AtomicBool,
}

impl FlakyStore {
    pub(super) fn fail_next_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

impl LedgerRepository for FlakyStore {
    fn create_account(&self, record: AccountRecord) -> Result<AccountRecord, RepositoryError> {
        self.inner.create_account(record)
    }

    fn account(&self, user_id: &UserId) -> Result<Option<AccountRecord>, RepositoryError> {
        self.inner.account(user_id)
    }

    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        self.inner.transaction(id)
    }

    fn transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, RepositoryError> {
        self.inner.transactions_for(user_id)
    }

    fn find_by_idempotency_key(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        self.inner.find_by_idempotency_key(user_id, key)
    }

    fn next_transaction_id(&self) -> Result<TransactionId, RepositoryError> {
        self.inner.next_transaction_id()
    }

    fn commit(&self, commit: LedgerCommit) -> Result<(), RepositoryError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.commit(commit)
    }
}

pub(super) struct BrokenNotifications;

impl NotificationPublisher for BrokenNotifications {
    fn publish(&self, _notification: LedgerNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push gateway down".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
