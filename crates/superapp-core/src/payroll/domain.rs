use serde::{Deserialize, Serialize};

/// Employee data the calculator needs for one pay period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollInput {
    pub employee_id: String,
    pub employee_name: String,
    /// Period label such as `2025-03`.
    pub period: String,
    pub base_salary: Option<i64>,
    #[serde(default)]
    pub fixed_allowance: i64,
    #[serde(default)]
    pub attendance: Option<Attendance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub working_days: u32,
    pub days_present: u32,
}

/// Income side of a slip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pendapatan {
    pub gaji_pokok: i64,
    pub tunjangan_tetap: i64,
    pub insentif_kinerja: i64,
    pub bpjs_tk_natura: i64,
}

impl Pendapatan {
    /// `None` when the lines do not fit in an `i64`.
    pub fn total(&self) -> Option<i64> {
        checked_sum([
            self.gaji_pokok,
            self.tunjangan_tetap,
            self.insentif_kinerja,
            self.bpjs_tk_natura,
        ])
    }
}

/// Employee deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Potongan {
    pub pajak_pph21: i64,
    pub bpjs_tk_karyawan_2: i64,
    pub bpjs_tk_karyawan_054: i64,
    pub bpjs_pensiun_karyawan: i64,
}

impl Potongan {
    pub fn total(&self) -> Option<i64> {
        checked_sum([
            self.pajak_pph21,
            self.bpjs_tk_karyawan_2,
            self.bpjs_tk_karyawan_054,
            self.bpjs_pensiun_karyawan,
        ])
    }
}

fn checked_sum<const N: usize>(lines: [i64; N]) -> Option<i64> {
    lines
        .into_iter()
        .try_fold(0_i64, |total, line| total.checked_add(line))
}

/// Employer-paid contributions, reported on the slip but never deducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KontribusiPerusahaan {
    pub bpjs_pensiun_perusahaan: i64,
    pub bpjs_tk_perusahaan: i64,
}

/// Computed pay slip. Never stored; recomputing with the same inputs yields
/// the same slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSlip {
    pub employee_id: String,
    pub employee_name: String,
    pub period: String,
    pub performance_score: f64,
    pub pendapatan: Pendapatan,
    pub potongan: Potongan,
    pub kontribusi_perusahaan: KontribusiPerusahaan,
    pub total_pendapatan: i64,
    pub total_potongan: i64,
    pub take_home_pay: i64,
}

/// Single named amount, in slip order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlipLine {
    pub section: SlipSection,
    pub name: &'static str,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipSection {
    Pendapatan,
    Potongan,
    Perusahaan,
}

impl PayrollSlip {
    pub fn lines(&self) -> Vec<SlipLine> {
        let line = |section, name, amount| SlipLine {
            section,
            name,
            amount,
        };
        let income = &self.pendapatan;
        let deductions = &self.potongan;
        let employer = &self.kontribusi_perusahaan;
        vec![
            line(SlipSection::Pendapatan, "gaji_pokok", income.gaji_pokok),
            line(SlipSection::Pendapatan, "tunjangan_tetap", income.tunjangan_tetap),
            line(SlipSection::Pendapatan, "insentif_kinerja", income.insentif_kinerja),
            line(SlipSection::Pendapatan, "bpjs_tk_natura", income.bpjs_tk_natura),
            line(SlipSection::Potongan, "pajak_pph21", deductions.pajak_pph21),
            line(SlipSection::Potongan, "bpjs_tk_karyawan_2", deductions.bpjs_tk_karyawan_2),
            line(
                SlipSection::Potongan,
                "bpjs_tk_karyawan_054",
                deductions.bpjs_tk_karyawan_054,
            ),
            line(
                SlipSection::Potongan,
                "bpjs_pensiun_karyawan",
                deductions.bpjs_pensiun_karyawan,
            ),
            line(
                SlipSection::Perusahaan,
                "bpjs_pensiun_perusahaan",
                employer.bpjs_pensiun_perusahaan,
            ),
            line(
                SlipSection::Perusahaan,
                "bpjs_tk_perusahaan",
                employer.bpjs_tk_perusahaan,
            ),
        ]
    }
}
