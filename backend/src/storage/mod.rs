//! # Storage Module
//!
//! Persistence for the ledger core.
//!
//! Domain services only see the traits in [`traits`]. The SQLite repositories
//! back the per-user stores (transactions, budgets, profiles) and the YAML
//! repository keeps the device-local set of scheduled reminders.

pub mod sqlite;
pub mod traits;
pub mod yaml;

pub use sqlite::{BudgetRepository, DbConnection, ProfileRepository, TransactionRepository};
pub use traits::*;
pub use yaml::NotificationRecordRepository;
