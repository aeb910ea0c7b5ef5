use crate::boxes::{BoxId, BoxKind, BoxRecord, BoxStatus};
use crate::error::{DomainError, Result};
use crate::money::Millimes;
use serde::{Deserialize, Serialize};

/// A box as it was when a processing session consumed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBox {
    pub box_id: BoxId,
    pub kind: BoxKind,
    pub weight_kg: f64,
}

impl SessionBox {
    /// Snapshot a box for `farmer_id`. The box must be in use by that farmer
    /// and weighed.
    pub fn snapshot(record: &BoxRecord, farmer_id: i64) -> Result<Self> {
        if record.status != BoxStatus::InUse {
            return Err(DomainError::BoxNotInUse(record.id.0));
        }
        if record.farmer_id != Some(farmer_id) {
            return Err(DomainError::validation(format!(
                "box {} does not belong to farmer {farmer_id}",
                record.id
            )));
        }
        let Some(weight_kg) = record.weight_kg else {
            return Err(DomainError::InvalidWeight(format!(
                "box {} has not been weighed",
                record.id
            )));
        };
        Ok(Self {
            box_id: record.id,
            kind: record.kind,
            weight_kg,
        })
    }
}

/// Derived numbers of a processing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFigures {
    pub olive_weight_kg: f64,
    pub oil_weight_kg: f64,
    pub price_per_kg: Millimes,
    pub total_price: Millimes,
    pub oil_yield_percent: Option<f64>,
}

impl SessionFigures {
    pub fn compute(boxes: &[SessionBox], oil_weight_kg: f64, price_per_kg: Millimes) -> Result<Self> {
        if boxes.is_empty() {
            return Err(DomainError::validation(
                "a session must consume at least one box",
            ));
        }
        let olive_weight_kg: f64 = boxes.iter().map(|b| b.weight_kg).sum();
        Self::from_weights(olive_weight_kg, oil_weight_kg, price_per_kg)
    }

    pub fn from_weights(olive_weight_kg: f64, oil_weight_kg: f64, price_per_kg: Millimes) -> Result<Self> {
        if !oil_weight_kg.is_finite() || oil_weight_kg < 0.0 {
            return Err(DomainError::InvalidWeight(format!(
                "oil weight must be zero or positive, got {oil_weight_kg}"
            )));
        }
        let price_per_kg = price_per_kg.ensure_positive("price per kg")?;
        let total_price = Millimes::from_weight_price(olive_weight_kg, price_per_kg)?;
        Ok(Self {
            olive_weight_kg,
            oil_weight_kg,
            price_per_kg,
            total_price,
            oil_yield_percent: oil_yield_percent(olive_weight_kg, oil_weight_kg),
        })
    }
}

pub fn oil_yield_percent(olive_weight_kg: f64, oil_weight_kg: f64) -> Option<f64> {
    if olive_weight_kg <= 0.0 {
        return None;
    }
    Some(oil_weight_kg / olive_weight_kg * 100.0)
}
