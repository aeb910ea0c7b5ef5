use crate::error::{DomainError, Result};
use crate::money::Millimes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    HalfDay,
    Absent,
}

impl AttendanceStatus {
    /// Worked time in half days.
    pub const fn half_days(self) -> u64 {
        match self {
            AttendanceStatus::Present => 2,
            AttendanceStatus::HalfDay => 1,
            AttendanceStatus::Absent => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::HalfDay => "half_day",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "half_day" => Ok(AttendanceStatus::HalfDay),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(DomainError::validation(format!(
                "unknown attendance status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollInput {
    pub daily_wage: Millimes,
    pub half_days: u64,
    pub overtime_hours: f64,
    pub overtime_rate_per_hour: Millimes,
    pub advances: Millimes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollLine {
    pub worked_days: f64,
    pub overtime_hours: f64,
    pub base_pay: Millimes,
    pub overtime_pay: Millimes,
    pub gross: Millimes,
    pub advances: Millimes,
    pub net: Millimes,
}

pub fn compute_payroll(input: PayrollInput) -> Result<PayrollLine> {
    if !input.overtime_hours.is_finite() || input.overtime_hours < 0.0 {
        return Err(DomainError::validation(format!(
            "overtime hours must be zero or positive, got {}",
            input.overtime_hours
        )));
    }
    let half_days = i64::try_from(input.half_days)
        .map_err(|_| DomainError::validation("too many worked days"))?;
    // daily_wage * half_days / 2, rounded half up
    let base = (input.daily_wage.value().saturating_mul(half_days) + 1).div_euclid(2);
    let base_pay = Millimes(base);
    let overtime_pay = Millimes::from_weight_price(input.overtime_hours, input.overtime_rate_per_hour)?;
    let gross = base_pay + overtime_pay;
    Ok(PayrollLine {
        worked_days: input.half_days as f64 / 2.0,
        overtime_hours: input.overtime_hours,
        base_pay,
        overtime_pay,
        gross,
        advances: input.advances,
        net: gross - input.advances,
    })
}
