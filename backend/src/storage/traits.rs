//! # Storage Traits
//!
//! Storage abstractions the domain layer works against. Every user-scoped call
//! takes the owning [`UserId`] explicitly so services never depend on an
//! ambient "current user".

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    Budget, FundUpdate, NewBudget, NewTransaction, Profile, ProfileUpdate,
    ScheduledNotificationRecord, Transaction, UserId,
};

/// Remote ledger of transactions
#[async_trait]
pub trait TransactionStorage: Send + Sync {
    /// All transactions of the user, newest first
    async fn list_transactions(&self, user: &UserId) -> Result<Vec<Transaction>>;

    /// Insert a transaction and return the id assigned to it
    async fn insert_transaction(&self, user: &UserId, transaction: &NewTransaction) -> Result<String>;

    /// Returns true if the transaction existed and was removed
    async fn delete_transaction(&self, user: &UserId, transaction_id: &str) -> Result<bool>;
}

#[async_trait]
pub trait BudgetStorage: Send + Sync {
    async fn list_budgets(&self, user: &UserId) -> Result<Vec<Budget>>;

    async fn insert_budget(&self, user: &UserId, budget: &NewBudget) -> Result<String>;

    async fn delete_budget(&self, user: &UserId, budget_id: &str) -> Result<bool>;
}

/// Per-user profile and emergency fund state
#[async_trait]
pub trait ProfileStorage: Send + Sync {
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>>;

    /// Apply a partial update, creating the profile if it does not exist yet
    async fn update_profile(&self, user: &UserId, update: &ProfileUpdate) -> Result<Profile>;

    async fn set_auto_invest(&self, user: &UserId, amount: Option<f64>) -> Result<()>;

    /// Compare-and-swap write of the emergency fund amount.
    ///
    /// The write only happens when the stored version equals
    /// `expected_version`; otherwise the current version is reported back and
    /// nothing changes.
    async fn update_emergency_fund(
        &self,
        user: &UserId,
        expected_version: i64,
        new_amount: f64,
    ) -> Result<FundUpdate>;
}

/// Device-local record of active recurring reminders
#[async_trait]
pub trait NotificationRecordStorage: Send + Sync {
    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotificationRecord>>;

    /// Atomically replace any record with the same type by `record`.
    /// Returns the record that was replaced, if any.
    async fn upsert_by_type(
        &self,
        record: ScheduledNotificationRecord,
    ) -> Result<Option<ScheduledNotificationRecord>>;

    /// Remove every record of the given type and return them
    async fn remove_by_type(&self, notification_type: &str) -> Result<Vec<ScheduledNotificationRecord>>;

    async fn clear(&self) -> Result<()>;

    /// Stamp the date a record last fired. Returns false if no such record.
    async fn mark_fired(&self, notification_type: &str, date: NaiveDate) -> Result<bool>;
}
