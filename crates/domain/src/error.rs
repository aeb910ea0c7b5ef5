use thiserror::Error;

/// Result type for domain rules
pub type Result<T> = std::result::Result<T, DomainError>;

/// Business rule violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Box {0} is not available")]
    BoxNotAvailable(u32),

    #[error("Box {0} is not in use")]
    BoxNotInUse(u32),

    #[error("Boxes not available: {}", join_ids(.ids))]
    BoxesNotAvailable { ids: Vec<u32> },

    #[error("Invalid box range: start={start}, end={end} (inventory is 1..={max})")]
    InvalidRange { start: u32, end: u32, max: u32 },

    #[error("Unknown box: {0}")]
    UnknownBox(u32),

    #[error("Box {0} is listed more than once")]
    DuplicateBox(u32),

    #[error("Assignment must target at least one box")]
    EmptyAssignment,

    #[error("Too many boxes in one assignment: {requested} (max {max})")]
    TooManyBoxes { requested: usize, max: usize },

    #[error("Invalid weight: {0}")]
    InvalidWeight(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overpayment: amount {amount} exceeds outstanding {outstanding}")]
    Overpayment { amount: String, outstanding: String },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors caused by the current state of a record rather than
    /// by malformed input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::BoxNotAvailable(_)
                | Self::BoxNotInUse(_)
                | Self::BoxesNotAvailable { .. }
                | Self::Overpayment { .. }
        )
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
