use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub u32);

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxKind {
    Normal,
    Nchira,
    Chkara,
}

impl BoxKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            BoxKind::Normal => "normal",
            BoxKind::Nchira => "nchira",
            BoxKind::Chkara => "chkara",
        }
    }
}

impl FromStr for BoxKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(BoxKind::Normal),
            "nchira" => Ok(BoxKind::Nchira),
            "chkara" => Ok(BoxKind::Chkara),
            other => Err(DomainError::validation(format!("unknown box kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoxStatus {
    Available,
    InUse,
}

impl BoxStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            BoxStatus::Available => "AVAILABLE",
            BoxStatus::InUse => "IN_USE",
        }
    }
}

impl FromStr for BoxStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AVAILABLE" => Ok(BoxStatus::Available),
            "IN_USE" => Ok(BoxStatus::InUse),
            other => Err(DomainError::validation(format!("unknown box status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub id: BoxId,
    pub kind: BoxKind,
    pub status: BoxStatus,
    pub farmer_id: Option<i64>,
    pub weight_kg: Option<f64>,
}

impl BoxRecord {
    pub fn inventory(id: u32) -> Self {
        Self::available(id, BoxKind::Normal)
    }

    pub fn chkara(id: u32) -> Self {
        Self::available(id, BoxKind::Chkara)
    }

    fn available(id: u32, kind: BoxKind) -> Self {
        Self {
            id: BoxId(id),
            kind,
            status: BoxStatus::Available,
            farmer_id: None,
            weight_kg: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == BoxStatus::Available
    }

    /// AVAILABLE -> IN_USE for `farmer_id`.
    pub fn assign(&mut self, farmer_id: i64) -> Result<()> {
        if !self.is_available() {
            return Err(DomainError::BoxNotAvailable(self.id.0));
        }
        self.status = BoxStatus::InUse;
        self.farmer_id = Some(farmer_id);
        self.weight_kg = None;
        Ok(())
    }

    pub fn record_weight(&mut self, kg: f64) -> Result<()> {
        if self.status != BoxStatus::InUse {
            return Err(DomainError::BoxNotInUse(self.id.0));
        }
        if !kg.is_finite() || kg <= 0.0 {
            return Err(DomainError::InvalidWeight(format!(
                "box {} weight must be positive, got {kg}",
                self.id
            )));
        }
        self.weight_kg = Some(kg);
        Ok(())
    }

    /// Back to AVAILABLE from any state.
    pub fn release(&mut self) {
        self.status = BoxStatus::Available;
        self.farmer_id = None;
        self.weight_kg = None;
    }
}

pub fn is_inventory_id(id: u32, box_count: u32) -> bool {
    (1..=box_count).contains(&id)
}

/// Lowest id above the inventory range that `existing` does not use yet.
pub fn next_chkara_id(existing: &BTreeSet<u32>, inventory_max: u32) -> BoxId {
    let mut candidate = inventory_max.saturating_add(1);
    for &id in existing.range(candidate..) {
        if id != candidate {
            break;
        }
        candidate = candidate.saturating_add(1);
    }
    BoxId(candidate)
}
