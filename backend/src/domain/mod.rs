//! # Domain Module
//!
//! Business logic of the ledger core.
//!
//! - [`aggregator`] and [`weekly_report`] are pure functions over transactions
//!   and budgets.
//! - [`emergency_fund_service`] and [`salary_service`] decide legality with the
//!   aggregator and then write through the storage traits.
//! - [`notification_scheduler`] owns recurring reminders;
//!   [`reminder_service`] adds per-user preference gating on top.

pub mod aggregator;
pub mod commands;
pub mod emergency_fund_service;
pub mod errors;
pub mod notification_scheduler;
pub mod reminder_service;
pub mod salary_service;
pub mod weekly_report;

pub use emergency_fund_service::EmergencyFundService;
pub use errors::{FundError, SalaryError, ScheduleError};
pub use notification_scheduler::NotificationScheduler;
pub use reminder_service::ReminderService;
pub use salary_service::SalaryService;
