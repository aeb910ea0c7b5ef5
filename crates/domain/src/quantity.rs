use crate::error::{DomainError, Result};
use crate::money::Millimes;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

pub const GALBA_PER_CHAKRA: u64 = 5;

/// Largest quantity, in chakra, a single ledger entry may carry.
pub const MAX_CHAKRA_PER_ENTRY: u64 = 1_000_000;

/// Olives counted in chakra and galba.
///
/// `normalize` folds every full chakra worth of galba into the chakra count,
/// so a normalized value always has `galba < 5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SackCount {
    pub chakra: u64,
    pub galba: u64,
}

impl SackCount {
    /// Build a count and normalize it.
    pub fn new(chakra: u64, galba: u64) -> Self {
        Self { chakra, galba }.normalize()
    }

    /// Build a count from user input. The normalized total must stay within
    /// `MAX_CHAKRA_PER_ENTRY`.
    pub fn bounded(chakra: u64, galba: u64) -> Result<Self> {
        let count = Self::new(chakra, galba);
        if count.chakra > MAX_CHAKRA_PER_ENTRY
            || (count.chakra == MAX_CHAKRA_PER_ENTRY && count.galba > 0)
        {
            return Err(DomainError::validation(format!(
                "collected quantity exceeds {MAX_CHAKRA_PER_ENTRY} chakra"
            )));
        }
        Ok(count)
    }

    pub fn normalize(self) -> Self {
        Self {
            chakra: self.chakra.saturating_add(self.galba / GALBA_PER_CHAKRA),
            galba: self.galba % GALBA_PER_CHAKRA,
        }
    }

    pub fn in_galba(self) -> u64 {
        self.chakra
            .saturating_mul(GALBA_PER_CHAKRA)
            .saturating_add(self.galba)
    }

    pub fn as_chakra_f64(self) -> f64 {
        self.in_galba() as f64 / GALBA_PER_CHAKRA as f64
    }

    pub fn is_zero(self) -> bool {
        self.chakra == 0 && self.galba == 0
    }

    /// Value of this count at `price_per_chakra`, a galba being a fifth of
    /// the chakra price. Rounded half up to the millime.
    pub fn amount_at(self, price_per_chakra: Millimes) -> Millimes {
        let galba = i128::from(self.in_galba());
        let price = i128::from(price_per_chakra.value());
        let divisor = i128::from(GALBA_PER_CHAKRA);
        let numerator = galba * price;
        let rounded = if numerator >= 0 {
            (numerator * 2 + divisor) / (divisor * 2)
        } else {
            -((-numerator * 2 + divisor) / (divisor * 2))
        };
        Millimes(i64::try_from(rounded).unwrap_or(i64::MAX))
    }
}

impl Add for SackCount {
    type Output = SackCount;

    fn add(self, rhs: Self) -> Self::Output {
        SackCount {
            chakra: self.chakra.saturating_add(rhs.chakra),
            galba: self.galba.saturating_add(rhs.galba),
        }
        .normalize()
    }
}

impl Sum for SackCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(SackCount::default(), Add::add)
    }
}
