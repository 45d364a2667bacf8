//! CSV export of a wallet's transaction history.

use std::io::Write;

use serde::Serialize;

use super::domain::{Funding, Transaction, TransactionStatus};

#[derive(Debug, Serialize)]
struct StatementRow<'a> {
    transaction_id: &'a str,
    timestamp: String,
    kind: &'static str,
    status: &'static str,
    funding: &'static str,
    amount: i64,
    running_balance: i64,
    description: &'a str,
    related_id: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("failed to write statement: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush statement: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `transactions` in log order with a running wallet balance.
///
/// The running balance moves on every completed entry, so the last row
/// matches the wallet projection.
pub fn write_csv<W: Write>(transactions: &[Transaction], writer: W) -> Result<(), StatementError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut running_balance = 0_i64;

    for transaction in transactions {
        if transaction.status == TransactionStatus::Completed {
            running_balance = running_balance.saturating_add(transaction.amount);
        }
        csv_writer.serialize(StatementRow {
            transaction_id: &transaction.id.0,
            timestamp: transaction.timestamp.to_rfc3339(),
            kind: transaction.kind.label(),
            status: transaction.status.label(),
            funding: match transaction.funding {
                Funding::Wallet => "wallet",
                Funding::PayLater => "paylater",
            },
            amount: transaction.amount,
            running_balance,
            description: &transaction.description,
            related_id: transaction
                .related_id
                .as_ref()
                .map(|id| id.0.as_str())
                .unwrap_or(""),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}
