use crate::config::ConfigError;
use crate::ledger::statement::StatementError;
use crate::ledger::LedgerError;
use crate::payroll::PayrollError;
use crate::performance::PerformanceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Application-level failures surfaced by the service binary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Ledger(LedgerError),
    Performance(PerformanceError),
    Payroll(PayrollError),
    Statement(StatementError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Ledger(err) => write!(f, "ledger error: {}", err),
            AppError::Performance(err) => write!(f, "performance review error: {}", err),
            AppError::Payroll(err) => write!(f, "payroll error: {}", err),
            AppError::Statement(err) => write!(f, "statement export error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Ledger(err) => Some(err),
            AppError::Performance(err) => Some(err),
            AppError::Payroll(err) => Some(err),
            AppError::Statement(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Ledger(err) => return crate::ledger::router::error_response(err),
            AppError::Performance(err) => return crate::performance::router::error_response(err),
            other => other,
        };

        let (status, code) = match &err {
            AppError::Payroll(PayrollError::MissingSalaryData { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "missing_salary_data")
            }
            AppError::Payroll(PayrollError::AmountOutOfRange { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "amount_out_of_range")
            }
            AppError::Payroll(PayrollError::InvalidRates(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_rates")
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Statement(_)
            | AppError::Ledger(_)
            | AppError::Performance(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = Json(json!({ "error": code, "message": err.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<PerformanceError> for AppError {
    fn from(value: PerformanceError) -> Self {
        Self::Performance(value)
    }
}

impl From<PayrollError> for AppError {
    fn from(value: PayrollError) -> Self {
        Self::Payroll(value)
    }
}

impl From<StatementError> for AppError {
    fn from(value: StatementError) -> Self {
        Self::Statement(value)
    }
}
