pub mod config;
pub mod error;
pub mod ledger;
pub mod payroll;
pub mod performance;
pub mod telemetry;
