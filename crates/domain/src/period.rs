use crate::error::{DomainError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date range; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        Self { from, to }.validated()
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn validated(self) -> Result<Self> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(DomainError::InvalidDateRange {
                    from: from.format(DATE_FORMAT).to_string(),
                    to: to.format(DATE_FORMAT).to_string(),
                });
            }
        }
        Ok(self)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Lower bound as an ISO date string, suitable for comparing against
    /// `YYYY-MM-DD` text columns.
    pub fn lower_bound(&self) -> String {
        self.from
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "0000-01-01".to_string())
    }

    pub fn upper_bound(&self) -> String {
        self.to
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "9999-12-31".to_string())
    }

    pub fn cache_key(&self) -> String {
        format!("{}..{}", self.lower_bound(), self.upper_bound())
    }
}
