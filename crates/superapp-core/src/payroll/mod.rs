//! Deterministic payroll slip computation.

mod calculator;
pub mod domain;
pub mod rates;

pub use calculator::{compute_payslip, PayrollCalculator};
pub use domain::{
    Attendance, KontribusiPerusahaan, PayrollInput, PayrollSlip, Pendapatan, Potongan, SlipLine,
    SlipSection,
};
pub use rates::{IncentiveCurve, IncentiveTier, PayrollRates, MAX_INCENTIVE_SCORE};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PayrollError {
    #[error("employee {employee_id} has no usable base salary")]
    MissingSalaryData { employee_id: String },
    #[error("payroll amounts for employee {employee_id} are out of range")]
    AmountOutOfRange { employee_id: String },
    #[error("invalid payroll rates: {0}")]
    InvalidRates(String),
}
