//! Process-local ledger storage used by the API service and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::{Transaction, TransactionId, TransactionStatus, UserId};
use super::repository::{
    AccountRecord, LedgerCommit, LedgerNotification, LedgerRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};

#[derive(Default)]
struct StoreState {
    accounts: HashMap<UserId, AccountRecord>,
    transactions: BTreeMap<TransactionId, Transaction>,
    by_user: HashMap<UserId, Vec<TransactionId>>,
    idempotency: HashMap<(UserId, String), TransactionId>,
    sequence: u64,
}

impl StoreState {
    fn validate(&self, commit: &LedgerCommit) -> Result<(), RepositoryError> {
        for record in &commit.accounts {
            if !self.accounts.contains_key(&record.user_id) {
                return Err(RepositoryError::NotFound);
            }
        }
        for transaction in &commit.appended {
            if self.transactions.contains_key(&transaction.id) {
                return Err(RepositoryError::Conflict);
            }
            if let Some(key) = &transaction.idempotency_key {
                if self
                    .idempotency
                    .contains_key(&(transaction.user_id.clone(), key.clone()))
                {
                    return Err(RepositoryError::Conflict);
                }
            }
        }
        for transaction in &commit.settled {
            match self.transactions.get(&transaction.id) {
                Some(existing) if existing.status == TransactionStatus::Pending => {}
                Some(_) => return Err(RepositoryError::Conflict),
                None => return Err(RepositoryError::NotFound),
            }
        }
        Ok(())
    }

    fn apply(&mut self, commit: LedgerCommit) {
        for record in commit.accounts {
            self.accounts.insert(record.user_id.clone(), record);
        }
        for transaction in commit.appended {
            if let Some(key) = &transaction.idempotency_key {
                self.idempotency.insert(
                    (transaction.user_id.clone(), key.clone()),
                    transaction.id.clone(),
                );
            }
            self.by_user
                .entry(transaction.user_id.clone())
                .or_default()
                .push(transaction.id.clone());
            self.transactions
                .insert(transaction.id.clone(), transaction);
        }
        for transaction in commit.settled {
            self.transactions
                .insert(transaction.id.clone(), transaction);
        }
    }
}

/// `LedgerRepository` backed by a single mutex, so every commit is validated
/// in full before any of it is applied.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryLedgerStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LedgerRepository for InMemoryLedgerStore {
    fn create_account(&self, record: AccountRecord) -> Result<AccountRecord, RepositoryError> {
        let mut state = self.state();
        if state.accounts.contains_key(&record.user_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .accounts
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    fn account(&self, user_id: &UserId) -> Result<Option<AccountRecord>, RepositoryError> {
        Ok(self.state().accounts.get(user_id).cloned())
    }

    fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.state().transactions.get(id).cloned())
    }

    fn transactions_for(&self, user_id: &UserId) -> Result<Vec<Transaction>, RepositoryError> {
        let state = self.state();
        let ids = match state.by_user.get(user_id) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.transactions.get(id).cloned())
            .collect())
    }

    fn find_by_idempotency_key(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let state = self.state();
        Ok(state
            .idempotency
            .get(&(user_id.clone(), key.to_string()))
            .and_then(|id| state.transactions.get(id).cloned()))
    }

    fn next_transaction_id(&self) -> Result<TransactionId, RepositoryError> {
        let mut state = self.state();
        state.sequence += 1;
        Ok(TransactionId(format!("trx-{:08}", state.sequence)))
    }

    fn commit(&self, commit: LedgerCommit) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.validate(&commit)?;
        state.apply(commit);
        Ok(())
    }
}

/// Collects notifications so callers can inspect what would have been shown.
#[derive(Default, Clone)]
pub struct InMemoryNotifications {
    events: Arc<Mutex<Vec<LedgerNotification>>>,
}

impl InMemoryNotifications {
    pub fn events(&self) -> Vec<LedgerNotification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationPublisher for InMemoryNotifications {
    fn publish(&self, notification: LedgerNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
