//! Shared fixtures for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use shared::{
    FundUpdate, NewTransaction, Profile, ProfileUpdate, ScheduledNotificationRecord, Transaction,
    UserId,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::delivery::{NotificationContent, NotificationDelivery, PermissionGate, StaticPermission, Trigger};
use crate::domain::notification_scheduler::DEFAULT_REMINDER_HOUR;
use crate::domain::NotificationScheduler;
use crate::storage::{
    BudgetRepository, DbConnection, NotificationRecordRepository, NotificationRecordStorage,
    ProfileRepository, ProfileStorage, TransactionRepository, TransactionStorage,
};
use crate::AppState;

/// Real repositories over an in-memory database and a temp directory.
/// The directory is removed when the environment is dropped.
pub struct TestEnvironment {
    pub transactions: Arc<TransactionRepository>,
    pub budgets: Arc<BudgetRepository>,
    pub profiles: Arc<ProfileRepository>,
    pub records: Arc<NotificationRecordRepository>,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let db = DbConnection::init_test().await.expect("Failed to init test DB");
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let records = NotificationRecordRepository::new(temp_dir.path())
            .expect("Failed to create record repository");

        Self {
            transactions: Arc::new(TransactionRepository::new(db.clone())),
            budgets: Arc::new(BudgetRepository::new(db.clone())),
            profiles: Arc::new(ProfileRepository::new(db)),
            records: Arc::new(records),
            _temp_dir: temp_dir,
        }
    }

    pub async fn with_profile(profile: Profile) -> Self {
        let env = Self::new().await;
        env.profiles
            .store_profile(&profile)
            .await
            .expect("Failed to store profile");
        env
    }
}

/// Application state over the environment's repositories, delivering through `delivery`
pub fn app_state(env: &TestEnvironment, delivery: &RecordingDelivery) -> AppState {
    let scheduler = NotificationScheduler::new(
        Arc::new(delivery.clone()),
        Arc::new(StaticPermission(true)),
        env.records.clone(),
        DEFAULT_REMINDER_HOUR,
    );
    AppState::new(
        env.transactions.clone(),
        env.budgets.clone(),
        env.profiles.clone(),
        scheduler,
        0,
    )
}

/// Like [`app_state`] with the clock frozen at `now`
pub fn app_state_at(env: &TestEnvironment, delivery: &RecordingDelivery, now: DateTime<FixedOffset>) -> AppState {
    app_state(env, delivery).with_clock(Arc::new(move || now))
}

/// Transaction store that refuses inserts whose title matches
pub struct FailingInserts {
    inner: Arc<dyn TransactionStorage>,
    failing_title: String,
}

impl FailingInserts {
    pub fn new(inner: Arc<dyn TransactionStorage>, failing_title: &str) -> Self {
        Self {
            inner,
            failing_title: failing_title.to_string(),
        }
    }
}

#[async_trait]
impl TransactionStorage for FailingInserts {
    async fn list_transactions(&self, user: &UserId) -> Result<Vec<Transaction>> {
        self.inner.list_transactions(user).await
    }

    async fn insert_transaction(&self, user: &UserId, transaction: &NewTransaction) -> Result<String> {
        if transaction.title == self.failing_title {
            return Err(anyhow!("simulated insert failure"));
        }
        self.inner.insert_transaction(user, transaction).await
    }

    async fn delete_transaction(&self, user: &UserId, transaction_id: &str) -> Result<bool> {
        self.inner.delete_transaction(user, transaction_id).await
    }
}

/// Profile store whose fund writes fail or report a version conflict
pub struct FaultyFundWrites {
    inner: Arc<dyn ProfileStorage>,
    conflict: bool,
}

impl FaultyFundWrites {
    pub fn failing(inner: Arc<dyn ProfileStorage>) -> Self {
        Self { inner, conflict: false }
    }

    pub fn conflicting(inner: Arc<dyn ProfileStorage>) -> Self {
        Self { inner, conflict: true }
    }
}

#[async_trait]
impl ProfileStorage for FaultyFundWrites {
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>> {
        self.inner.get_profile(user).await
    }

    async fn update_profile(&self, user: &UserId, update: &ProfileUpdate) -> Result<Profile> {
        self.inner.update_profile(user, update).await
    }

    async fn set_auto_invest(&self, user: &UserId, amount: Option<f64>) -> Result<()> {
        self.inner.set_auto_invest(user, amount).await
    }

    async fn update_emergency_fund(
        &self,
        _user: &UserId,
        expected_version: i64,
        _new_amount: f64,
    ) -> Result<FundUpdate> {
        if self.conflict {
            Ok(FundUpdate::Conflict { current_version: expected_version + 1 })
        } else {
            Err(anyhow!("simulated fund write failure"))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryCall {
    Schedule(Trigger, NotificationContent),
    Cancel(String),
    CancelAll,
    FireNow(NotificationContent),
}

/// Delivery fake that records every call
#[derive(Clone, Default)]
pub struct RecordingDelivery {
    calls: Arc<Mutex<Vec<DeliveryCall>>>,
    fail_schedule: Arc<AtomicBool>,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_schedules(&self) {
        self.fail_schedule.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fired(&self) -> Vec<NotificationContent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeliveryCall::FireNow(content) => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DeliveryCall::Cancel(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn scheduled_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, DeliveryCall::Schedule(..)))
            .count()
    }
}

#[async_trait]
impl NotificationDelivery for RecordingDelivery {
    async fn schedule(&self, trigger: Trigger, content: &NotificationContent) -> Result<String> {
        if self.fail_schedule.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated delivery failure"));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(DeliveryCall::Schedule(trigger, content.clone()));
        Ok(format!("delivery-{}", calls.len()))
    }

    async fn cancel(&self, delivery_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(DeliveryCall::Cancel(delivery_id.to_string()));
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        self.calls.lock().unwrap().push(DeliveryCall::CancelAll);
        Ok(())
    }

    async fn fire_now(&self, content: &NotificationContent) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(DeliveryCall::FireNow(content.clone()));
        Ok(format!("fired-{}", calls.len()))
    }
}

/// Permission gate that counts prompts
#[derive(Clone)]
pub struct CountingPermission {
    granted: bool,
    prompts: Arc<Mutex<usize>>,
}

impl CountingPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            prompts: Arc::new(Mutex::new(0)),
        }
    }

    pub fn prompts(&self) -> usize {
        *self.prompts.lock().unwrap()
    }
}

#[async_trait]
impl PermissionGate for CountingPermission {
    async fn request_notification_permission(&self) -> bool {
        *self.prompts.lock().unwrap() += 1;
        self.granted
    }
}

/// Record store whose upserts always fail
pub struct BrokenRecords;

#[async_trait]
impl NotificationRecordStorage for BrokenRecords {
    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotificationRecord>> {
        Ok(Vec::new())
    }

    async fn upsert_by_type(
        &self,
        _record: ScheduledNotificationRecord,
    ) -> Result<Option<ScheduledNotificationRecord>> {
        Err(anyhow!("simulated record store failure"))
    }

    async fn remove_by_type(&self, _notification_type: &str) -> Result<Vec<ScheduledNotificationRecord>> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn mark_fired(&self, _notification_type: &str, _date: NaiveDate) -> Result<bool> {
        Ok(false)
    }
}
