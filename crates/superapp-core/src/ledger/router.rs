use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    Funding, Operator, Settlement, SettlementOutcome, TransactionId, TransactionReceipt,
    TransactionRequest, TransactionType, UserId,
};
use super::error::LedgerError;
use super::paylater::PayLaterAccount;
use super::repository::{AccountRecord, LedgerRepository, NotificationPublisher, RepositoryError};
use super::service::WalletService;

type SharedService<R, N> = Arc<WalletService<R, N>>;

/// Router builder exposing wallet and PayLater endpoints.
pub fn wallet_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/wallets", post(open_handler::<R, N>))
        .route("/api/v1/wallets/:user_id", get(wallet_handler::<R, N>))
        .route(
            "/api/v1/wallets/:user_id/transactions",
            get(history_handler::<R, N>).post(apply_handler::<R, N>),
        )
        .route(
            "/api/v1/wallets/:user_id/transfers",
            post(transfer_handler::<R, N>),
        )
        .route(
            "/api/v1/wallets/:user_id/freeze",
            post(freeze_handler::<R, N>),
        )
        .route(
            "/api/v1/wallets/:user_id/adjustments",
            post(adjust_handler::<R, N>),
        )
        .route(
            "/api/v1/transactions/:transaction_id/settle",
            post(settle_handler::<R, N>),
        )
        .route(
            "/api/v1/transactions/:transaction_id/reverse",
            post(reverse_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/apply",
            post(pay_later_apply_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/escalate",
            post(pay_later_escalate_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/approve",
            post(pay_later_approve_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/reject",
            post(pay_later_reject_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/repay",
            post(pay_later_repay_handler::<R, N>),
        )
        .route(
            "/api/v1/paylater/:user_id/repayments",
            post(pay_later_record_repayment_handler::<R, N>),
        )
        .with_state(service)
}

/// Sanitized wallet state returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct WalletView {
    pub user_id: UserId,
    pub balance: i64,
    pub held: i64,
    pub available: i64,
    pub is_frozen: bool,
    pub pay_later: PayLaterView,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayLaterView {
    pub status: &'static str,
    pub limit: i64,
    pub remaining_limit: i64,
}

impl From<PayLaterAccount> for PayLaterView {
    fn from(account: PayLaterAccount) -> Self {
        Self {
            status: account.status.label(),
            limit: account.limit,
            remaining_limit: account.remaining_limit,
        }
    }
}

impl From<AccountRecord> for WalletView {
    fn from(record: AccountRecord) -> Self {
        Self {
            available: record.wallet.available(),
            balance: record.wallet.balance,
            held: record.wallet.held,
            is_frozen: record.wallet.is_frozen,
            pay_later: record.pay_later.into(),
            user_id: record.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenWalletPayload {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionPayload {
    pub kind: TransactionType,
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub settlement: Settlement,
    #[serde(default)]
    pub funding: Funding,
}

#[derive(Debug, Deserialize)]
pub struct TransferPayload {
    pub to: String,
    pub amount: i64,
    pub description: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FreezePayload {
    pub operator: Operator,
    pub frozen: bool,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentPayload {
    pub operator: Operator,
    pub amount: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SettlePayload {
    pub outcome: SettlementOutcome,
}

#[derive(Debug, Deserialize)]
pub struct ApprovePayload {
    pub operator: Operator,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct OperatorPayload {
    pub operator: Operator,
}

#[derive(Debug, Deserialize)]
pub struct ReversalPayload {
    pub operator: Operator,
    pub reason: String,
}

/// Repayment settled outside the wallet (payroll deduction, bank transfer).
#[derive(Debug, Deserialize)]
pub struct ExternalRepaymentPayload {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct RepayPayload {
    pub amount: i64,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

pub(crate) async fn open_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(payload): Json<OpenWalletPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.open_wallet(UserId(payload.user_id)) {
        Ok(record) => (StatusCode::CREATED, Json(WalletView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn wallet_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.wallet(&UserId(user_id)) {
        Ok(record) => (StatusCode::OK, Json(WalletView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.transactions(&UserId(user_id)) {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn apply_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<TransactionPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let request = TransactionRequest {
        user_id: UserId(user_id),
        kind: payload.kind,
        amount: payload.amount,
        description: payload.description,
        related_id: payload.related_id.map(TransactionId),
        idempotency_key: payload.idempotency_key,
        settlement: payload.settlement,
        funding: payload.funding,
    };
    receipt_response(service.apply_transaction(request))
}

pub(crate) async fn transfer_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<TransferPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    receipt_response(service.transfer(
        &UserId(user_id),
        &UserId(payload.to),
        payload.amount,
        &payload.description,
        payload.idempotency_key.as_deref(),
    ))
}

pub(crate) async fn settle_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<SettlePayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.settle_transaction(&TransactionId(transaction_id), payload.outcome) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reverse_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<ReversalPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    receipt_response(service.reverse_transaction(
        &payload.operator,
        &TransactionId(transaction_id),
        &payload.reason,
    ))
}

pub(crate) async fn freeze_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<FreezePayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.freeze_wallet(&payload.operator, &UserId(user_id), payload.frozen) {
        Ok(record) => (StatusCode::OK, Json(WalletView::from(record))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn adjust_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<AdjustmentPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    receipt_response(service.adjust_balance(
        &payload.operator,
        &UserId(user_id),
        payload.amount,
        &payload.reason,
    ))
}

pub(crate) async fn pay_later_apply_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pay_later_response(service.apply_pay_later(&UserId(user_id)))
}

pub(crate) async fn pay_later_escalate_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<OperatorPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pay_later_response(service.escalate_pay_later(&payload.operator, &UserId(user_id)))
}

pub(crate) async fn pay_later_approve_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<ApprovePayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pay_later_response(service.approve_pay_later(
        &payload.operator,
        &UserId(user_id),
        payload.limit,
    ))
}

pub(crate) async fn pay_later_reject_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<OperatorPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pay_later_response(service.reject_pay_later(&payload.operator, &UserId(user_id)))
}

pub(crate) async fn pay_later_repay_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<RepayPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    receipt_response(service.repay_pay_later(
        &UserId(user_id),
        payload.amount,
        payload.idempotency_key.as_deref(),
    ))
}

pub(crate) async fn pay_later_record_repayment_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(user_id): Path<String>,
    Json(payload): Json<ExternalRepaymentPayload>,
) -> Response
where
    R: LedgerRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pay_later_response(service.record_repayment(&UserId(user_id), payload.amount))
}

fn receipt_response(result: Result<TransactionReceipt, LedgerError>) -> Response {
    match result {
        Ok(receipt) if receipt.replayed => (StatusCode::OK, Json(receipt)).into_response(),
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

fn pay_later_response(result: Result<PayLaterAccount, LedgerError>) -> Response {
    match result {
        Ok(account) => (StatusCode::OK, Json(PayLaterView::from(account))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: LedgerError) -> Response {
    let (status, code) = match &err {
        LedgerError::InsufficientFunds { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
        }
        LedgerError::InsufficientLimit { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_limit")
        }
        LedgerError::InvalidAmount { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_amount"),
        LedgerError::WalletFrozen(_) => (StatusCode::LOCKED, "wallet_frozen"),
        LedgerError::InvalidStateTransition { .. } => {
            (StatusCode::CONFLICT, "invalid_state_transition")
        }
        LedgerError::WalletNotFound(_) | LedgerError::TransactionNotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        LedgerError::Repository(RepositoryError::Conflict) => (StatusCode::CONFLICT, "conflict"),
        LedgerError::Repository(RepositoryError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
        LedgerError::Repository(RepositoryError::Unavailable(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository_unavailable")
        }
    };
    let payload = json!({
        "error": code,
        "message": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
