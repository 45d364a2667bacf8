use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for wallet owners.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached projection of the sum of a user's completed transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: i64,
    /// Funds reserved by pending debits on asynchronous rails.
    pub held: i64,
    pub is_frozen: bool,
}

impl Wallet {
    pub fn available(&self) -> i64 {
        self.balance - self.held
    }
}

/// Every wallet-affecting action the super app records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    TopUp,
    Transfer,
    Marketplace,
    #[serde(alias = "PPOB")]
    Ppob,
    Teleconsultation,
    Refund,
    Reversal,
    Commission,
    Tax,
    DoctorFee,
    PayLaterPayment,
    Adjustment,
    DanaOpex,
    InsuranceClaim,
}

/// Sign an amount must carry for a given transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountDirection {
    Credit,
    Debit,
    Either,
}

impl TransactionType {
    pub const fn all() -> [Self; 14] {
        [
            Self::TopUp,
            Self::Transfer,
            Self::Marketplace,
            Self::Ppob,
            Self::Teleconsultation,
            Self::Refund,
            Self::Reversal,
            Self::Commission,
            Self::Tax,
            Self::DoctorFee,
            Self::PayLaterPayment,
            Self::Adjustment,
            Self::DanaOpex,
            Self::InsuranceClaim,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::TopUp => "TopUp",
            Self::Transfer => "Transfer",
            Self::Marketplace => "Marketplace",
            Self::Ppob => "PPOB",
            Self::Teleconsultation => "Teleconsultation",
            Self::Refund => "Refund",
            Self::Reversal => "Reversal",
            Self::Commission => "Commission",
            Self::Tax => "Tax",
            Self::DoctorFee => "DoctorFee",
            Self::PayLaterPayment => "PayLaterPayment",
            Self::Adjustment => "Adjustment",
            Self::DanaOpex => "DanaOpex",
            Self::InsuranceClaim => "InsuranceClaim",
        }
    }

    pub const fn direction(self) -> AmountDirection {
        match self {
            Self::TopUp
            | Self::Refund
            | Self::Commission
            | Self::DoctorFee
            | Self::DanaOpex
            | Self::InsuranceClaim => AmountDirection::Credit,
            Self::Marketplace
            | Self::Ppob
            | Self::Teleconsultation
            | Self::Tax
            | Self::PayLaterPayment => AmountDirection::Debit,
            Self::Transfer | Self::Reversal | Self::Adjustment => AmountDirection::Either,
        }
    }

    /// Purchases that may be charged against the PayLater limit.
    pub const fn pay_later_eligible(self) -> bool {
        matches!(self, Self::Marketplace | Self::Ppob | Self::Teleconsultation)
    }

    pub fn accepts(self, amount: i64) -> bool {
        if amount == 0 {
            return false;
        }
        match self.direction() {
            AmountDirection::Credit => amount > 0,
            AmountDirection::Debit => amount < 0,
            AmountDirection::Either => true,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction type '{0}'")]
pub struct UnknownTransactionType(pub String);

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        TransactionType::all()
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTransactionType(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// Where the money for a debit comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Funding {
    #[default]
    Wallet,
    PayLater,
}

/// Whether a transaction completes immediately or waits for an external rail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    #[default]
    Immediate,
    Deferred,
}

/// Immutable ledger entry. Only `status` moves, and only out of `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub funding: Funding,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<TransactionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount < 0
    }
}

/// Input for `WalletService::apply_transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub user_id: UserId,
    pub kind: TransactionType,
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub related_id: Option<TransactionId>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub settlement: Settlement,
    #[serde(default)]
    pub funding: Funding,
}

impl TransactionRequest {
    pub fn new(
        user_id: UserId,
        kind: TransactionType,
        amount: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            description: description.into(),
            related_id: None,
            idempotency_key: None,
            settlement: Settlement::Immediate,
            funding: Funding::Wallet,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_related(mut self, related_id: TransactionId) -> Self {
        self.related_id = Some(related_id);
        self
    }

    pub fn deferred(mut self) -> Self {
        self.settlement = Settlement::Deferred;
        self
    }

    pub fn on_pay_later(mut self) -> Self {
        self.funding = Funding::PayLater;
        self
    }
}

/// Result of a successful ledger write (or an idempotent replay of one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    pub balance: i64,
    pub replayed: bool,
}

/// Final state requested for a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

/// Caller identity for administrative operations. Authorization happens
/// upstream; the ledger only records who acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub role: OperatorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorRole {
    Admin,
    Finance,
    Hr,
    Manager,
}

impl Operator {
    pub fn new(id: impl Into<String>, role: OperatorRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.id, self.role)
    }
}
