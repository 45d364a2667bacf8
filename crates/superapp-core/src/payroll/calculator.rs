use rust_decimal::Decimal;
use tracing::debug;

use super::domain::{KontribusiPerusahaan, Pendapatan, PayrollInput, PayrollSlip, Potongan};
use super::rates::{to_rupiah, PayrollRates};
use super::PayrollError;

const BPJS_NATURA_RATE: Decimal = Decimal::from_parts(54, 0, 0, false, 4);
const BPJS_TK_EMPLOYEE_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
const BPJS_TK_EMPLOYEE_EXTRA_RATE: Decimal = Decimal::from_parts(54, 0, 0, false, 4);
const PENSION_EMPLOYEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const PENSION_EMPLOYER_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
const BPJS_TK_EMPLOYER_RATE: Decimal = Decimal::from_parts(37, 0, 0, false, 3);

/// Stateless calculator bound to one rate configuration.
#[derive(Debug, Clone)]
pub struct PayrollCalculator {
    rates: PayrollRates,
}

impl PayrollCalculator {
    pub fn new(rates: PayrollRates) -> Result<Self, PayrollError> {
        rates.validate()?;
        Ok(Self { rates })
    }

    pub fn rates(&self) -> &PayrollRates {
        &self.rates
    }

    pub fn compute(
        &self,
        input: &PayrollInput,
        performance_score: f64,
    ) -> Result<PayrollSlip, PayrollError> {
        compute_payslip(input, performance_score, &self.rates)
    }
}

/// Builds the slip for one employee and period.
pub fn compute_payslip(
    input: &PayrollInput,
    performance_score: f64,
    rates: &PayrollRates,
) -> Result<PayrollSlip, PayrollError> {
    rates.validate()?;
    let base = match input.base_salary {
        Some(salary) if salary > 0 => salary,
        _ => {
            debug!(employee = %input.employee_id, "payroll rejected: salary data missing");
            return Err(PayrollError::MissingSalaryData {
                employee_id: input.employee_id.clone(),
            });
        }
    };
    let allowance = input.fixed_allowance.max(0);
    let out_of_range = || {
        debug!(employee = %input.employee_id, "payroll rejected: amounts out of range");
        PayrollError::AmountOutOfRange {
            employee_id: input.employee_id.clone(),
        }
    };

    let base_dec = Decimal::from(base);
    let score = if performance_score.is_finite() {
        Decimal::try_from(performance_score).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let mut incentive = rates.incentive.incentive_for(score, base_dec);
    if let Some(attendance) = input.attendance {
        incentive *= attendance_ratio(attendance.working_days, attendance.days_present);
    }

    let wage_base = Decimal::from(base.checked_add(allowance).ok_or_else(out_of_range)?);
    let pension_base = match rates.pension_wage_cap {
        Some(cap) => wage_base.min(Decimal::from(cap)),
        None => wage_base,
    };

    let pendapatan = Pendapatan {
        gaji_pokok: base,
        tunjangan_tetap: allowance,
        insentif_kinerja: to_rupiah(incentive),
        bpjs_tk_natura: to_rupiah(wage_base * BPJS_NATURA_RATE),
    };
    let total_pendapatan = pendapatan.total().ok_or_else(out_of_range)?;

    let potongan = Potongan {
        pajak_pph21: to_rupiah(Decimal::from(total_pendapatan) * rates.pph21_rate),
        bpjs_tk_karyawan_2: to_rupiah(wage_base * BPJS_TK_EMPLOYEE_RATE),
        bpjs_tk_karyawan_054: to_rupiah(wage_base * BPJS_TK_EMPLOYEE_EXTRA_RATE),
        bpjs_pensiun_karyawan: to_rupiah(pension_base * PENSION_EMPLOYEE_RATE),
    };
    let total_potongan = potongan.total().ok_or_else(out_of_range)?;

    let kontribusi_perusahaan = KontribusiPerusahaan {
        bpjs_pensiun_perusahaan: to_rupiah(pension_base * PENSION_EMPLOYER_RATE),
        bpjs_tk_perusahaan: to_rupiah(wage_base * BPJS_TK_EMPLOYER_RATE),
    };

    Ok(PayrollSlip {
        employee_id: input.employee_id.clone(),
        employee_name: input.employee_name.clone(),
        period: input.period.clone(),
        performance_score,
        pendapatan,
        potongan,
        kontribusi_perusahaan,
        total_pendapatan,
        total_potongan,
        take_home_pay: total_pendapatan
            .checked_sub(total_potongan)
            .ok_or_else(out_of_range)?,
    })
}

fn attendance_ratio(working_days: u32, days_present: u32) -> Decimal {
    if working_days == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(days_present.min(working_days)) / Decimal::from(working_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::domain::Attendance;
    use crate::payroll::rates::{IncentiveCurve, IncentiveTier};

    fn rates() -> PayrollRates {
        PayrollRates {
            pph21_rate: Decimal::new(5, 2),
            ppn_rate: Decimal::new(11, 2),
            pension_wage_cap: Some(10_042_300),
            incentive: IncentiveCurve::Linear {
                pool_percent: Decimal::new(10, 2),
            },
        }
    }

    fn input(base_salary: Option<i64>) -> PayrollInput {
        PayrollInput {
            employee_id: "emp-001".to_string(),
            employee_name: "Sari Wulandari".to_string(),
            period: "2025-03".to_string(),
            base_salary,
            fixed_allowance: 1_000_000,
            attendance: None,
        }
    }

    #[test]
    fn computes_every_line_for_a_known_salary() {
        let slip = compute_payslip(&input(Some(8_000_000)), 90.0, &rates()).expect("slip");

        assert_eq!(slip.pendapatan.gaji_pokok, 8_000_000);
        assert_eq!(slip.pendapatan.tunjangan_tetap, 1_000_000);
        assert_eq!(slip.pendapatan.insentif_kinerja, 720_000);
        assert_eq!(slip.pendapatan.bpjs_tk_natura, 48_600);
        assert_eq!(slip.total_pendapatan, 9_768_600);

        assert_eq!(slip.potongan.pajak_pph21, 488_430);
        assert_eq!(slip.potongan.bpjs_tk_karyawan_2, 180_000);
        assert_eq!(slip.potongan.bpjs_tk_karyawan_054, 48_600);
        assert_eq!(slip.potongan.bpjs_pensiun_karyawan, 90_000);
        assert_eq!(slip.total_potongan, 807_030);
        assert_eq!(slip.take_home_pay, 8_961_570);

        assert_eq!(slip.kontribusi_perusahaan.bpjs_pensiun_perusahaan, 180_000);
        assert_eq!(slip.kontribusi_perusahaan.bpjs_tk_perusahaan, 333_000);
    }

    #[test]
    fn identical_inputs_yield_identical_slips() {
        let first = compute_payslip(&input(Some(8_000_000)), 90.0, &rates()).expect("first");
        let second = compute_payslip(&input(Some(8_000_000)), 90.0, &rates()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_or_non_positive_salary_is_rejected() {
        for salary in [None, Some(0), Some(-5)] {
            match compute_payslip(&input(salary), 90.0, &rates()) {
                Err(PayrollError::MissingSalaryData { employee_id }) => {
                    assert_eq!(employee_id, "emp-001")
                }
                other => panic!("expected missing salary data, got {other:?}"),
            }
        }
    }

    #[test]
    fn incentive_never_decreases_as_score_rises() {
        let mut previous = 0;
        for score in (0..=130).step_by(5) {
            let slip = compute_payslip(&input(Some(6_500_000)), score as f64, &rates())
                .expect("slip");
            assert!(slip.pendapatan.insentif_kinerja >= previous);
            previous = slip.pendapatan.insentif_kinerja;
        }
        let capped = compute_payslip(&input(Some(6_500_000)), 500.0, &rates()).expect("slip");
        assert_eq!(capped.pendapatan.insentif_kinerja, previous);
    }

    #[test]
    fn negative_scores_earn_no_incentive() {
        let slip = compute_payslip(&input(Some(5_000_000)), -40.0, &rates()).expect("slip");
        assert_eq!(slip.pendapatan.insentif_kinerja, 0);
    }

    #[test]
    fn attendance_scales_the_incentive() {
        let mut partial = input(Some(8_000_000));
        partial.attendance = Some(Attendance {
            working_days: 20,
            days_present: 15,
        });
        let slip = compute_payslip(&partial, 100.0, &rates()).expect("slip");
        assert_eq!(slip.pendapatan.insentif_kinerja, 600_000);
    }

    #[test]
    fn pension_base_respects_the_wage_cap() {
        let slip = compute_payslip(&input(Some(20_000_000)), 0.0, &rates()).expect("slip");
        assert_eq!(slip.potongan.bpjs_pensiun_karyawan, 100_423);
        assert_eq!(slip.kontribusi_perusahaan.bpjs_pensiun_perusahaan, 200_846);
    }

    #[test]
    fn tiered_curve_applies_the_highest_reached_tier() {
        let mut tiered = rates();
        tiered.incentive = IncentiveCurve::Tiered {
            tiers: vec![
                IncentiveTier {
                    min_score: Decimal::from(60),
                    percent_of_base: Decimal::new(5, 2),
                },
                IncentiveTier {
                    min_score: Decimal::from(90),
                    percent_of_base: Decimal::new(15, 2),
                },
            ],
        };
        let low = compute_payslip(&input(Some(4_000_000)), 59.9, &tiered).expect("low");
        let mid = compute_payslip(&input(Some(4_000_000)), 75.0, &tiered).expect("mid");
        let high = compute_payslip(&input(Some(4_000_000)), 95.0, &tiered).expect("high");
        assert_eq!(low.pendapatan.insentif_kinerja, 0);
        assert_eq!(mid.pendapatan.insentif_kinerja, 200_000);
        assert_eq!(high.pendapatan.insentif_kinerja, 600_000);
    }

    #[test]
    fn out_of_range_rates_are_rejected() {
        let mut broken = rates();
        broken.pph21_rate = Decimal::new(15, 1);
        assert!(matches!(
            compute_payslip(&input(Some(8_000_000)), 90.0, &broken),
            Err(PayrollError::InvalidRates(_))
        ));
        assert!(PayrollCalculator::new(broken).is_err());
    }

    #[test]
    fn salaries_beyond_i64_are_a_typed_error() {
        let employee_id = "emp-001".to_string();
        assert_eq!(
            compute_payslip(&input(Some(i64::MAX)), 90.0, &rates()),
            Err(PayrollError::AmountOutOfRange {
                employee_id: employee_id.clone()
            })
        );

        let mut no_allowance = input(Some(i64::MAX - 10));
        no_allowance.fixed_allowance = 0;
        assert_eq!(
            compute_payslip(&no_allowance, 100.0, &rates()),
            Err(PayrollError::AmountOutOfRange { employee_id })
        );
    }

    #[test]
    fn ppn_is_rounded_to_whole_rupiah() {
        assert_eq!(rates().ppn_for(250_000), 27_500);
        assert_eq!(rates().ppn_for(15), 2);
    }

    #[test]
    fn slip_lines_follow_slip_order() {
        let slip = compute_payslip(&input(Some(8_000_000)), 90.0, &rates()).expect("slip");
        let names: Vec<_> = slip.lines().iter().map(|line| line.name).collect();
        assert_eq!(names.first(), Some(&"gaji_pokok"));
        assert_eq!(names.last(), Some(&"bpjs_tk_perusahaan"));
        assert_eq!(names.len(), 10);
    }
}
