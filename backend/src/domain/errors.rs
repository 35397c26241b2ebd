//! Typed failures of the domain flows.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FundError {
    #[error("Please enter a valid amount greater than zero")]
    InvalidAmount,

    #[error("Cannot deposit: You don't have any net positive income available. Your income must exceed your expenses and budget allocations.")]
    NoAvailableFunds,

    #[error("Insufficient funds: only AED {available:.2} available")]
    InsufficientFunds { available: f64 },

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Emergency fund was modified concurrently, please retry")]
    ConcurrentModification,

    #[error("Failed to load ledger data: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("Failed to save emergency fund: {0}")]
    WriteFailure(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SalaryError {
    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Today is not a salary day")]
    NotSalaryDay,

    #[error("Salary has already been added today")]
    AlreadyPosted,

    #[error("Failed to load ledger data: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("Failed to add salary: {0}")]
    WriteFailure(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid day of month {0}: must be between 1 and 31")]
    InvalidDayOfMonth(u32),

    #[error("Invalid weekday {0}: must be between 0 (Sunday) and 6 (Saturday)")]
    InvalidWeekday(u8),

    #[error("Notification storage failed: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Notification delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),
}
