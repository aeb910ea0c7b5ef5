use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Amount of money in millimes (1 dinar = 1000 millimes).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millimes(pub i64);

impl Millimes {
    pub const ZERO: Millimes = Millimes(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub fn from_dinars(dinars: i64) -> Self {
        Self(dinars.saturating_mul(1000))
    }

    /// `kg × price_per_kg`, rounded half away from zero.
    pub fn from_weight_price(kg: f64, price_per_kg: Millimes) -> Result<Self> {
        if !kg.is_finite() || kg < 0.0 {
            return Err(DomainError::InvalidWeight(format!("{kg}")));
        }
        Ok(Self((kg * price_per_kg.0 as f64).round() as i64))
    }

    /// Positive amounts only (prices, wages, payments).
    pub fn ensure_positive(self, what: &str) -> Result<Self> {
        if self.0 <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "{what} must be greater than zero, got {self}"
            )));
        }
        Ok(self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Millimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03} DT", abs / 1000, abs % 1000)
    }
}

impl Add for Millimes {
    type Output = Millimes;

    fn add(self, rhs: Self) -> Self::Output {
        Millimes(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Millimes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Millimes {
    type Output = Millimes;

    fn sub(self, rhs: Self) -> Self::Output {
        Millimes(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Millimes {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Millimes {
    type Output = Millimes;

    fn neg(self) -> Self::Output {
        Millimes(self.0.saturating_neg())
    }
}

impl Sum for Millimes {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Millimes::ZERO, Add::add)
    }
}
