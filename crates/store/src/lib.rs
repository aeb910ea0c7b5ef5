//! # Huilerie Store
//!
//! SQLite persistence for farmers, boxes, processing sessions, payments,
//! collector ledgers and employees.
//!
//! One [`Store`] wraps a single connection behind a mutex. Every operation
//! is synchronous; async callers run them on a blocking thread. Operations
//! that touch several rows (bulk box assignment, session creation) run in one
//! transaction, so a failure leaves nothing half-applied.
//!
//! Business decisions (lifecycle transitions, unit normalization, pricing)
//! come from `huilerie-domain`; this crate loads the records those rules need
//! and writes back the outcome.

mod boxes;
mod collectors;
mod dashboard;
mod db;
mod employees;
mod error;
mod farmers;
mod models;
mod payments;
mod schema;
mod sessions;

pub use boxes::BulkAssignmentOutcome;
pub use db::{today, Store};
pub use error::{Result, StoreError};
pub use models::*;
pub use schema::SCHEMA_VERSION;
