//! # Huilerie Domain
//!
//! Pure business rules of an olive-oil pressing facility. Nothing in this
//! crate touches storage or the network; the store crate feeds records in and
//! persists whatever these functions decide.
//!
//! ## Box lifecycle
//!
//! ```text
//!            assign(farmer)             session_create
//! AVAILABLE ───────────────> IN_USE ───────────────────> AVAILABLE
//!     ^                        │  (snapshot id/kind/weight)
//!     └──────── release ───────┘
//! ```
//!
//! Inventory boxes carry ids `1..=box_count`. Chkara sacks are created on
//! demand and take the lowest free id above the inventory range.
//!
//! ## Units
//!
//! Collected olives are counted in chakra and galba, `5 galba = 1 chakra`.
//! Counts are normalized when entered and again when summed.

mod assignment;
mod boxes;
mod error;
mod farmer;
mod money;
mod payment;
mod payroll;
mod period;
mod quantity;
mod session;

pub use assignment::{
    plan_bulk_assignment, AssignmentLimits, AssignmentPlan, BoxRange, BulkAssignment,
};
pub use boxes::{is_inventory_id, next_chkara_id, BoxId, BoxKind, BoxRecord, BoxStatus};
pub use error::{DomainError, Result};
pub use farmer::{FarmerKind, PriceList};
pub use money::Millimes;
pub use payment::{check_payment, PaymentStatus};
pub use payroll::{compute_payroll, AttendanceStatus, PayrollInput, PayrollLine};
pub use period::{DateRange, DATE_FORMAT};
pub use quantity::{SackCount, GALBA_PER_CHAKRA, MAX_CHAKRA_PER_ENTRY};
pub use session::{oil_yield_percent, SessionBox, SessionFigures};
