//! Wallet ledger: balance projection, append-only transaction log and the
//! PayLater credit facility.

pub mod clock;
pub mod domain;
pub mod error;
mod locks;
pub mod memory;
pub mod paylater;
pub mod repository;
pub mod router;
pub mod service;
pub mod statement;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    AmountDirection, Funding, Operator, OperatorRole, Settlement, SettlementOutcome, Transaction,
    TransactionId, TransactionReceipt, TransactionRequest, TransactionStatus, TransactionType,
    UnknownTransactionType, UserId, Wallet,
};
pub use error::LedgerError;
pub use memory::{InMemoryLedgerStore, InMemoryNotifications};
pub use paylater::{PayLaterAccount, PayLaterStatus};
pub use repository::{
    AccountRecord, LedgerCommit, LedgerNotification, LedgerRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};
pub use router::wallet_router;
pub use service::{Reconciliation, WalletService};
