use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{
    Funding, Operator, Settlement, SettlementOutcome, Transaction, TransactionId,
    TransactionReceipt, TransactionRequest, TransactionStatus, TransactionType, UserId,
};
use super::error::LedgerError;
use super::locks::AccountLocks;
use super::paylater::PayLaterAccount;
use super::repository::{
    AccountRecord, LedgerCommit, LedgerNotification, LedgerRepository, NotificationPublisher,
};

/// Single choke point for every wallet and PayLater mutation.
///
/// Each mutating call holds the per-user lock of every wallet it touches for
/// the whole read, compute and commit cycle, and hands the repository exactly
/// one [`LedgerCommit`].
pub struct WalletService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
    locks: AccountLocks,
}

impl<R, N> WalletService<R, N>
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self::with_clock(repository, notifications, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, notifications: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifications,
            clock,
            locks: AccountLocks::default(),
        }
    }

    pub fn open_wallet(&self, user_id: UserId) -> Result<AccountRecord, LedgerError> {
        let record = self.repository.create_account(AccountRecord::open(user_id))?;
        info!(user_id = %record.user_id, "wallet opened");
        Ok(record)
    }

    pub fn wallet(&self, user_id: &UserId) -> Result<AccountRecord, LedgerError> {
        self.load(user_id)
    }

    pub fn transactions(&self, user_id: &UserId) -> Result<Vec<Transaction>, LedgerError> {
        self.load(user_id)?;
        Ok(self.repository.transactions_for(user_id)?)
    }

    pub fn transaction(&self, id: &TransactionId) -> Result<Transaction, LedgerError> {
        self.repository
            .transaction(id)?
            .ok_or_else(|| LedgerError::TransactionNotFound(id.clone()))
    }

    /// Lookup for callers that timed out and must check before retrying.
    pub fn find_by_idempotency_key(
        &self,
        user_id: &UserId,
        key: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.repository.find_by_idempotency_key(user_id, key)?)
    }

    /// Validate and record a single wallet-affecting action.
    pub fn apply_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionReceipt, LedgerError> {
        let slot = self.locks.slot(&request.user_id);
        let _guard = AccountLocks::hold(&slot);

        if let Some(receipt) = self.replay(&request.user_id, request.idempotency_key.as_deref())? {
            return Ok(receipt);
        }

        let account = self.load(&request.user_id)?;
        let disbursement_id = match request.funding {
            Funding::PayLater => Some(self.repository.next_transaction_id()?),
            Funding::Wallet => None,
        };
        let id = self.repository.next_transaction_id()?;
        let now = self.clock.now();
        let (account, transaction) = stage(account, &request, id, now).map_err(|err| {
            debug!(user_id = %request.user_id, kind = %request.kind, amount = request.amount, error = %err, "transaction rejected");
            err
        })?;

        let mut appended = Vec::with_capacity(2);
        if let Some(disbursement_id) = disbursement_id {
            appended.push(pay_later_disbursement(&transaction, disbursement_id, now)?);
        }
        appended.push(transaction.clone());

        self.repository.commit(LedgerCommit {
            accounts: vec![account.clone()],
            appended,
            settled: Vec::new(),
        })?;

        info!(
            user_id = %transaction.user_id,
            transaction_id = %transaction.id,
            kind = %transaction.kind,
            amount = transaction.amount,
            status = transaction.status.label(),
            balance = account.wallet.balance,
            "transaction recorded"
        );
        self.notify(transaction_notification(&transaction, &account));

        Ok(TransactionReceipt {
            transaction,
            balance: account.wallet.balance,
            replayed: false,
        })
    }

    /// Resolve a `Pending` transaction from an asynchronous rail.
    pub fn settle_transaction(
        &self,
        id: &TransactionId,
        outcome: SettlementOutcome,
    ) -> Result<TransactionReceipt, LedgerError> {
        let user_id = self.transaction(id)?.user_id;
        let slot = self.locks.slot(&user_id);
        let _guard = AccountLocks::hold(&slot);

        let pending = self.transaction(id)?;
        if pending.status != TransactionStatus::Pending {
            return Err(LedgerError::InvalidStateTransition {
                from: pending.status.label().to_string(),
                action: "settle",
            });
        }

        let mut account = self.load(&user_id)?;
        if pending.is_debit() {
            account.wallet.held = checked_balance(account.wallet.held, pending.amount)?;
        }

        let status = match outcome {
            SettlementOutcome::Completed => {
                account.wallet.balance = checked_balance(account.wallet.balance, pending.amount)?;
                TransactionStatus::Completed
            }
            SettlementOutcome::Failed => TransactionStatus::Failed,
        };
        let settled = Transaction { status, ..pending };

        self.repository.commit(LedgerCommit {
            accounts: vec![account.clone()],
            appended: Vec::new(),
            settled: vec![settled.clone()],
        })?;

        info!(
            user_id = %user_id,
            transaction_id = %settled.id,
            status = settled.status.label(),
            balance = account.wallet.balance,
            "pending transaction settled"
        );
        self.notify(transaction_notification(&settled, &account));

        Ok(TransactionReceipt {
            transaction: settled,
            balance: account.wallet.balance,
            replayed: false,
        })
    }

    /// Move funds between two wallets as one linked debit/credit pair.
    pub fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: i64,
        description: &str,
        idempotency_key: Option<&str>,
    ) -> Result<TransactionReceipt, LedgerError> {
        if from == to {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "cannot transfer to the same wallet".to_string(),
            });
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "transfer amount must be positive".to_string(),
            });
        }

        let slots = self.locks.ordered_slots(&[from, to]);
        let _guards: Vec<_> = slots.iter().map(|slot| AccountLocks::hold(slot)).collect();

        if let Some(receipt) = self.replay(from, idempotency_key)? {
            return Ok(receipt);
        }

        let sender = self.load(from)?;
        let recipient = self.load(to)?;
        let debit_id = self.repository.next_transaction_id()?;
        let credit_id = self.repository.next_transaction_id()?;
        let now = self.clock.now();

        let mut debit_request = TransactionRequest::new(
            from.clone(),
            TransactionType::Transfer,
            -amount,
            format!("{description} to {to}"),
        )
        .with_related(credit_id.clone());
        debit_request.idempotency_key = idempotency_key.map(str::to_string);
        let credit_request = TransactionRequest::new(
            to.clone(),
            TransactionType::Transfer,
            amount,
            format!("{description} from {from}"),
        )
        .with_related(debit_id.clone());

        let (sender, debit) = stage(sender, &debit_request, debit_id, now)?;
        let (recipient, credit) = stage(recipient, &credit_request, credit_id, now)?;

        self.repository.commit(LedgerCommit {
            accounts: vec![sender.clone(), recipient.clone()],
            appended: vec![debit.clone(), credit.clone()],
            settled: Vec::new(),
        })?;

        info!(
            from = %from,
            to = %to,
            amount,
            debit_id = %debit.id,
            credit_id = %credit.id,
            "transfer recorded"
        );
        self.notify(transaction_notification(&debit, &sender));
        self.notify(transaction_notification(&credit, &recipient));

        Ok(TransactionReceipt {
            transaction: debit,
            balance: sender.wallet.balance,
            replayed: false,
        })
    }

    /// Append a compensating `Reversal` for a completed transaction.
    pub fn reverse_transaction(
        &self,
        operator: &Operator,
        id: &TransactionId,
        reason: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        let user_id = self.transaction(id)?.user_id;
        let slot = self.locks.slot(&user_id);
        let _guard = AccountLocks::hold(&slot);

        let original = self.transaction(id)?;
        let disbursement = original.funding == Funding::PayLater && !original.is_debit();
        if original.status != TransactionStatus::Completed
            || original.kind == TransactionType::Reversal
            || disbursement
        {
            return Err(LedgerError::InvalidStateTransition {
                from: format!("{} {}", original.status.label(), original.kind),
                action: "reverse",
            });
        }
        let already_reversed = self
            .repository
            .transactions_for(&user_id)?
            .iter()
            .any(|entry| {
                entry.kind == TransactionType::Reversal && entry.related_id.as_ref() == Some(id)
            });
        if already_reversed {
            return Err(LedgerError::InvalidStateTransition {
                from: "reversed".to_string(),
                action: "reverse",
            });
        }

        let mut account = self.load(&user_id)?;
        let amount = negated(original.amount)?;
        let reversal_id = self.repository.next_transaction_id()?;
        let description = format!("Reversal of {id}: {reason} (by {operator})");
        let now = self.clock.now();

        let (account, reversal, appended) = match original.funding {
            Funding::Wallet => {
                let request = TransactionRequest::new(
                    user_id.clone(),
                    TransactionType::Reversal,
                    amount,
                    description,
                )
                .with_related(id.clone());
                let (account, reversal) = stage(account, &request, reversal_id, now)?;
                let appended = vec![reversal.clone()];
                (account, reversal, appended)
            }
            Funding::PayLater => {
                // Returns the disbursement too, so the pair still nets to zero.
                account.pay_later = account.pay_later.repay(amount)?;
                let entry = |entry_id, amount, description: String| Transaction {
                    id: entry_id,
                    user_id: user_id.clone(),
                    kind: TransactionType::Reversal,
                    amount,
                    status: TransactionStatus::Completed,
                    funding: Funding::PayLater,
                    description,
                    timestamp: now,
                    related_id: Some(id.clone()),
                    idempotency_key: None,
                };
                let reversal = entry(reversal_id, amount, description);
                let clawback = entry(
                    self.repository.next_transaction_id()?,
                    original.amount,
                    format!("PayLater disbursement returned for {id}"),
                );
                let appended = vec![reversal.clone(), clawback];
                (account, reversal, appended)
            }
        };

        self.repository.commit(LedgerCommit {
            accounts: vec![account.clone()],
            appended,
            settled: Vec::new(),
        })?;

        info!(operator = %operator, user_id = %user_id, original = %id, reversal = %reversal.id, "transaction reversed");
        self.notify(transaction_notification(&reversal, &account));

        Ok(TransactionReceipt {
            transaction: reversal,
            balance: account.wallet.balance,
            replayed: false,
        })
    }

    pub fn freeze_wallet(
        &self,
        operator: &Operator,
        user_id: &UserId,
        frozen: bool,
    ) -> Result<AccountRecord, LedgerError> {
        let record = self.mutate_account(user_id, |mut account| {
            account.wallet.is_frozen = frozen;
            Ok(account)
        })?;

        info!(operator = %operator, user_id = %user_id, frozen, "wallet freeze toggled");
        let template = if frozen { "wallet_frozen" } else { "wallet_unfrozen" };
        self.notify(LedgerNotification::new(template, user_id));
        Ok(record)
    }

    /// Administrative correction; bypasses the frozen and funds checks.
    pub fn adjust_balance(
        &self,
        operator: &Operator,
        user_id: &UserId,
        amount: i64,
        reason: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        info!(operator = %operator, user_id = %user_id, amount, reason, "balance adjustment requested");
        self.apply_transaction(TransactionRequest::new(
            user_id.clone(),
            TransactionType::Adjustment,
            amount,
            format!("{reason} (by {operator})"),
        ))
    }

    pub fn apply_pay_later(&self, user_id: &UserId) -> Result<PayLaterAccount, LedgerError> {
        let mut applied = false;
        let record = self.mutate_account(user_id, |mut account| {
            let next = account.pay_later.apply();
            applied = next != account.pay_later;
            account.pay_later = next;
            Ok(account)
        })?;
        if applied {
            self.notify(LedgerNotification::new("paylater_applied", user_id));
        }
        Ok(record.pay_later)
    }

    pub fn escalate_pay_later(
        &self,
        operator: &Operator,
        user_id: &UserId,
    ) -> Result<PayLaterAccount, LedgerError> {
        let record = self.mutate_account(user_id, |mut account| {
            account.pay_later = account.pay_later.escalate()?;
            Ok(account)
        })?;
        info!(operator = %operator, user_id = %user_id, "PayLater application escalated to finance");
        Ok(record.pay_later)
    }

    pub fn approve_pay_later(
        &self,
        operator: &Operator,
        user_id: &UserId,
        limit: i64,
    ) -> Result<PayLaterAccount, LedgerError> {
        let record = self.mutate_account(user_id, |mut account| {
            account.pay_later = account.pay_later.approve(limit)?;
            Ok(account)
        })?;
        info!(operator = %operator, user_id = %user_id, limit, "PayLater approved");
        self.notify(LedgerNotification::new("paylater_approved", user_id).with_detail("limit", limit));
        Ok(record.pay_later)
    }

    pub fn reject_pay_later(
        &self,
        operator: &Operator,
        user_id: &UserId,
    ) -> Result<PayLaterAccount, LedgerError> {
        let record = self.mutate_account(user_id, |mut account| {
            account.pay_later = account.pay_later.reject()?;
            Ok(account)
        })?;
        info!(operator = %operator, user_id = %user_id, "PayLater rejected");
        self.notify(LedgerNotification::new("paylater_rejected", user_id));
        Ok(record.pay_later)
    }

    /// Restore limit for a repayment settled outside the wallet.
    pub fn record_repayment(
        &self,
        user_id: &UserId,
        amount: i64,
    ) -> Result<PayLaterAccount, LedgerError> {
        let record = self.mutate_account(user_id, |mut account| {
            account.pay_later = account.pay_later.repay(amount)?;
            Ok(account)
        })?;
        info!(user_id = %user_id, amount, remaining = record.pay_later.remaining_limit, "PayLater repayment recorded");
        Ok(record.pay_later)
    }

    /// Pay down PayLater usage from the wallet balance. Only the outstanding
    /// amount is debited.
    pub fn repay_pay_later(
        &self,
        user_id: &UserId,
        amount: i64,
        idempotency_key: Option<&str>,
    ) -> Result<TransactionReceipt, LedgerError> {
        let slot = self.locks.slot(user_id);
        let _guard = AccountLocks::hold(&slot);

        if let Some(receipt) = self.replay(user_id, idempotency_key)? {
            return Ok(receipt);
        }

        let account = self.load(user_id)?;
        let outstanding = account.pay_later.outstanding();
        if amount <= 0 || outstanding <= 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: format!("nothing to repay (outstanding {outstanding})"),
            });
        }
        let payment = amount.min(outstanding);

        let mut request = TransactionRequest::new(
            user_id.clone(),
            TransactionType::PayLaterPayment,
            -payment,
            "PayLater repayment",
        );
        request.idempotency_key = idempotency_key.map(str::to_string);
        let id = self.repository.next_transaction_id()?;
        let (mut account, transaction) = stage(account, &request, id, self.clock.now())?;
        account.pay_later = account.pay_later.repay(payment)?;

        self.repository.commit(LedgerCommit {
            accounts: vec![account.clone()],
            appended: vec![transaction.clone()],
            settled: Vec::new(),
        })?;

        info!(user_id = %user_id, payment, remaining = account.pay_later.remaining_limit, "PayLater repaid from wallet");
        self.notify(transaction_notification(&transaction, &account));

        Ok(TransactionReceipt {
            transaction,
            balance: account.wallet.balance,
            replayed: false,
        })
    }

    /// Recompute the wallet projection from the log and compare. The balance
    /// must equal the sum of every completed entry.
    pub fn reconcile(&self, user_id: &UserId) -> Result<Reconciliation, LedgerError> {
        let slot = self.locks.slot(user_id);
        let _guard = AccountLocks::hold(&slot);

        let account = self.load(user_id)?;
        let log = self.repository.transactions_for(user_id)?;

        let mut computed_balance = 0_i64;
        let mut computed_held = 0_i64;
        for entry in &log {
            match entry.status {
                TransactionStatus::Completed => {
                    computed_balance = computed_balance.saturating_add(entry.amount)
                }
                TransactionStatus::Pending if entry.is_debit() => {
                    computed_held = computed_held.saturating_sub(entry.amount)
                }
                TransactionStatus::Pending | TransactionStatus::Failed => {}
            }
        }

        let reconciliation = Reconciliation {
            user_id: user_id.clone(),
            recorded_balance: account.wallet.balance,
            computed_balance,
            recorded_held: account.wallet.held,
            computed_held,
            entries: log.len(),
        };
        if !reconciliation.is_consistent() {
            warn!(
                user_id = %user_id,
                recorded = reconciliation.recorded_balance,
                computed = reconciliation.computed_balance,
                "wallet projection drifted from transaction log"
            );
        }
        Ok(reconciliation)
    }

    fn mutate_account<F>(&self, user_id: &UserId, change: F) -> Result<AccountRecord, LedgerError>
    where
        F: FnOnce(AccountRecord) -> Result<AccountRecord, LedgerError>,
    {
        let slot = self.locks.slot(user_id);
        let _guard = AccountLocks::hold(&slot);

        let current = self.load(user_id)?;
        let next = change(current.clone())?;
        if next != current {
            self.repository.commit(LedgerCommit::account(next.clone()))?;
        }
        Ok(next)
    }

    fn load(&self, user_id: &UserId) -> Result<AccountRecord, LedgerError> {
        self.repository
            .account(user_id)?
            .ok_or_else(|| LedgerError::WalletNotFound(user_id.clone()))
    }

    fn replay(
        &self,
        user_id: &UserId,
        key: Option<&str>,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let key = match key {
            Some(key) => key,
            None => return Ok(None),
        };
        let existing = match self.repository.find_by_idempotency_key(user_id, key)? {
            Some(existing) => existing,
            None => return Ok(None),
        };
        let account = self.load(user_id)?;
        debug!(user_id = %user_id, key, transaction_id = %existing.id, "idempotent replay");
        Ok(Some(TransactionReceipt {
            transaction: existing,
            balance: account.wallet.balance,
            replayed: true,
        }))
    }

    fn notify(&self, notification: LedgerNotification) {
        let template = notification.template.clone();
        if let Err(err) = self.notifications.publish(notification) {
            warn!(template = %template, error = %err, "notification delivery failed");
        }
    }
}

/// Outcome of comparing the cached wallet against its transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub user_id: UserId,
    pub recorded_balance: i64,
    pub computed_balance: i64,
    pub recorded_held: i64,
    pub computed_held: i64,
    pub entries: usize,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.recorded_balance == self.computed_balance && self.recorded_held == self.computed_held
    }
}

/// Validate `request` against `account` and build the post-commit state.
pub(crate) fn stage(
    mut account: AccountRecord,
    request: &TransactionRequest,
    id: TransactionId,
    now: DateTime<Utc>,
) -> Result<(AccountRecord, Transaction), LedgerError> {
    let kind = request.kind;
    let amount = request.amount;
    let magnitude = amount.checked_abs().ok_or_else(|| LedgerError::InvalidAmount {
        amount,
        reason: "amount is out of range".to_string(),
    })?;
    if !kind.accepts(amount) {
        return Err(LedgerError::InvalidAmount {
            amount,
            reason: format!("{kind} does not accept this amount"),
        });
    }

    let administrative = kind == TransactionType::Adjustment;
    if account.wallet.is_frozen && !administrative {
        return Err(LedgerError::WalletFrozen(account.user_id.clone()));
    }

    let status = match request.settlement {
        Settlement::Immediate => TransactionStatus::Completed,
        Settlement::Deferred => TransactionStatus::Pending,
    };

    match request.funding {
        Funding::PayLater => {
            if !kind.pay_later_eligible() || status != TransactionStatus::Completed {
                return Err(LedgerError::InvalidAmount {
                    amount,
                    reason: format!("{kind} cannot be charged to PayLater"),
                });
            }
            // Limit-funded: the disbursement credit recorded alongside
            // offsets this debit, so the balance does not move.
            account.pay_later = account.pay_later.consume(magnitude)?;
        }
        Funding::Wallet => {
            if amount < 0 && !administrative {
                let available = account.wallet.available();
                if magnitude > available {
                    return Err(LedgerError::InsufficientFunds {
                        requested: magnitude,
                        available,
                    });
                }
            }
            match status {
                TransactionStatus::Completed => {
                    account.wallet.balance = checked_balance(account.wallet.balance, amount)?;
                }
                TransactionStatus::Pending if amount < 0 => {
                    account.wallet.held = checked_balance(account.wallet.held, magnitude)?;
                }
                TransactionStatus::Pending | TransactionStatus::Failed => {}
            }
        }
    }

    let transaction = Transaction {
        id,
        user_id: account.user_id.clone(),
        kind,
        amount,
        status,
        funding: request.funding,
        description: request.description.clone(),
        timestamp: now,
        related_id: request.related_id.clone(),
        idempotency_key: request.idempotency_key.clone(),
    };
    Ok((account, transaction))
}

/// Credit drawn from the PayLater limit, recorded just before `purchase`.
fn pay_later_disbursement(
    purchase: &Transaction,
    id: TransactionId,
    now: DateTime<Utc>,
) -> Result<Transaction, LedgerError> {
    Ok(Transaction {
        id,
        user_id: purchase.user_id.clone(),
        kind: TransactionType::Transfer,
        amount: negated(purchase.amount)?,
        status: TransactionStatus::Completed,
        funding: Funding::PayLater,
        description: format!("PayLater disbursement for {}", purchase.id),
        timestamp: now,
        related_id: Some(purchase.id.clone()),
        idempotency_key: None,
    })
}

fn negated(amount: i64) -> Result<i64, LedgerError> {
    amount.checked_neg().ok_or_else(|| LedgerError::InvalidAmount {
        amount,
        reason: "amount is out of range".to_string(),
    })
}

fn checked_balance(balance: i64, amount: i64) -> Result<i64, LedgerError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidAmount {
            amount,
            reason: "balance overflow".to_string(),
        })
}

fn transaction_notification(transaction: &Transaction, account: &AccountRecord) -> LedgerNotification {
    let template = match (transaction.kind, transaction.status) {
        (_, TransactionStatus::Failed) => "transaction_failed",
        (_, TransactionStatus::Pending) => "transaction_pending",
        (TransactionType::TopUp, _) => "top_up_succeeded",
        (TransactionType::Transfer, _) if transaction.amount > 0 => "transfer_received",
        (TransactionType::Transfer, _) => "transfer_sent",
        (TransactionType::DanaOpex, _) => "opex_reimbursed",
        (TransactionType::InsuranceClaim, _) => "insurance_claim_paid",
        (TransactionType::PayLaterPayment, _) => "paylater_repaid",
        (_, TransactionStatus::Completed) => "transaction_completed",
    };
    LedgerNotification::new(template, &transaction.user_id)
        .with_detail("transaction_id", &transaction.id)
        .with_detail("kind", transaction.kind)
        .with_detail("amount", transaction.amount)
        .with_detail("balance", account.wallet.balance)
}
