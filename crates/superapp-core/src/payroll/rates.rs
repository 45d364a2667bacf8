use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::PayrollError;

/// Achievement ceiling honoured by the incentive curve, in score points.
pub const MAX_INCENTIVE_SCORE: i64 = 120;

/// Statutory and incentive configuration supplied by the settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRates {
    /// Income tax withholding rate applied to total pendapatan.
    pub pph21_rate: Decimal,
    /// Value-added tax rate for marketplace tax lines.
    pub ppn_rate: Decimal,
    /// Wage ceiling for the BPJS pension contribution base, in rupiah.
    #[serde(default)]
    pub pension_wage_cap: Option<i64>,
    pub incentive: IncentiveCurve,
}

impl PayrollRates {
    pub fn validate(&self) -> Result<(), PayrollError> {
        check_rate("pph21_rate", self.pph21_rate)?;
        check_rate("ppn_rate", self.ppn_rate)?;
        if let Some(cap) = self.pension_wage_cap {
            if cap <= 0 {
                return Err(PayrollError::InvalidRates(format!(
                    "pension_wage_cap must be positive, found {cap}"
                )));
            }
        }
        self.incentive.validate()
    }

    /// PPN owed on a marketplace amount, rounded to whole rupiah.
    pub fn ppn_for(&self, amount: i64) -> i64 {
        to_rupiah(Decimal::from(amount) * self.ppn_rate)
    }
}

/// Policy mapping a performance score to an incentive amount. Every variant is
/// monotonic non-decreasing in the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IncentiveCurve {
    /// `pool_percent` of base salary at a score of 100, proportional in
    /// between and capped at [`MAX_INCENTIVE_SCORE`].
    Linear { pool_percent: Decimal },
    /// Step function: the highest tier whose `min_score` is reached applies.
    Tiered { tiers: Vec<IncentiveTier> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveTier {
    pub min_score: Decimal,
    pub percent_of_base: Decimal,
}

impl IncentiveCurve {
    pub fn validate(&self) -> Result<(), PayrollError> {
        match self {
            IncentiveCurve::Linear { pool_percent } => {
                if pool_percent.is_sign_negative() {
                    return Err(PayrollError::InvalidRates(
                        "incentive pool_percent must not be negative".to_string(),
                    ));
                }
                Ok(())
            }
            IncentiveCurve::Tiered { tiers } => {
                for pair in tiers.windows(2) {
                    if pair[1].min_score <= pair[0].min_score
                        || pair[1].percent_of_base < pair[0].percent_of_base
                    {
                        return Err(PayrollError::InvalidRates(
                            "incentive tiers must ascend in score and never decrease in percent"
                                .to_string(),
                        ));
                    }
                }
                if tiers.iter().any(|tier| tier.percent_of_base.is_sign_negative()) {
                    return Err(PayrollError::InvalidRates(
                        "incentive tier percent must not be negative".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Unrounded incentive for `score` on `base`.
    pub fn incentive_for(&self, score: Decimal, base: Decimal) -> Decimal {
        let score = score
            .max(Decimal::ZERO)
            .min(Decimal::from(MAX_INCENTIVE_SCORE));
        match self {
            IncentiveCurve::Linear { pool_percent } => {
                base * *pool_percent * score / Decimal::ONE_HUNDRED
            }
            IncentiveCurve::Tiered { tiers } => tiers
                .iter()
                .rev()
                .find(|tier| score >= tier.min_score)
                .map(|tier| base * tier.percent_of_base)
                .unwrap_or(Decimal::ZERO),
        }
    }
}

fn check_rate(name: &str, rate: Decimal) -> Result<(), PayrollError> {
    if rate.is_sign_negative() || rate > Decimal::ONE {
        return Err(PayrollError::InvalidRates(format!(
            "{name} must lie within [0, 1], found {rate}"
        )));
    }
    Ok(())
}

pub(crate) fn to_rupiah(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;

    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}
