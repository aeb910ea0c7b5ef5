use crate::error::{DomainError, Result};
use crate::money::Millimes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn from_amounts(total: Millimes, paid: Millimes) -> Self {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid.value() <= 0 {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::Partial
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(DomainError::validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// A payment of `amount` against `total` with `already_paid` on record.
pub fn check_payment(total: Millimes, already_paid: Millimes, amount: Millimes) -> Result<()> {
    amount.ensure_positive("payment amount")?;
    let outstanding = total - already_paid;
    if amount > outstanding {
        return Err(DomainError::Overpayment {
            amount: amount.to_string(),
            outstanding: outstanding.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_amounts() {
        let total = Millimes(10_000);
        assert_eq!(PaymentStatus::from_amounts(total, Millimes::ZERO), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::from_amounts(total, Millimes(2_500)), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::from_amounts(total, total), PaymentStatus::Paid);
        // A free session counts as settled.
        assert_eq!(
            PaymentStatus::from_amounts(Millimes::ZERO, Millimes::ZERO),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn payments_cannot_exceed_outstanding() {
        let total = Millimes(10_000);
        assert!(check_payment(total, Millimes(4_000), Millimes(6_000)).is_ok());
        assert!(matches!(
            check_payment(total, Millimes(4_000), Millimes(6_001)),
            Err(DomainError::Overpayment { .. })
        ));
        assert!(check_payment(total, Millimes::ZERO, Millimes::ZERO).is_err());
    }
}
