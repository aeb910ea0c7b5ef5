use crate::error::{DomainError, Result};
use crate::money::Millimes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pricing tier of a farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmerKind {
    Small,
    Large,
}

impl FarmerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FarmerKind::Small => "small",
            FarmerKind::Large => "large",
        }
    }
}

impl FromStr for FarmerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "small" => Ok(FarmerKind::Small),
            "large" => Ok(FarmerKind::Large),
            other => Err(DomainError::validation(format!("unknown farmer kind: {other}"))),
        }
    }
}

/// Default pressing price per kg of olives, by farmer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub small_per_kg: Millimes,
    pub large_per_kg: Millimes,
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            small_per_kg: Millimes(200),
            large_per_kg: Millimes(180),
        }
    }
}

impl PriceList {
    /// Price applied to a farmer: an explicit override wins over the tier.
    pub fn price_for(&self, kind: FarmerKind, override_price: Option<Millimes>) -> Millimes {
        override_price.unwrap_or(match kind {
            FarmerKind::Small => self.small_per_kg,
            FarmerKind::Large => self.large_per_kg,
        })
    }
}
