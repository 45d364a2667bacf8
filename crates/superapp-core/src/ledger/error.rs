use super::domain::{TransactionId, UserId};
use super::repository::RepositoryError;

/// Typed failures raised by the wallet ledger. Every variant leaves wallet,
/// PayLater and transaction log exactly as they were before the call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },
    #[error("wallet for {0} is frozen")]
    WalletFrozen(UserId),
    #[error("insufficient PayLater limit: requested {requested}, remaining {remaining}")]
    InsufficientLimit { requested: i64, remaining: i64 },
    #[error("cannot {action} from state {from}")]
    InvalidStateTransition { from: String, action: &'static str },
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: i64, reason: String },
    #[error("wallet for {0} not found")]
    WalletNotFound(UserId),
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
