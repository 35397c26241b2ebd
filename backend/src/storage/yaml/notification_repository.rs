//! # YAML Notification Record Repository
//!
//! Persists the device-local set of scheduled reminders in
//! `{data_directory}/scheduled_notifications.yaml`.
//!
//! Every mutation is a read-modify-write of the whole file performed while
//! holding an in-process lock, and lands on disk through a temp file plus
//! rename so readers never observe a half-written set.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use shared::ScheduledNotificationRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::storage::NotificationRecordStorage;

const RECORDS_FILE: &str = "scheduled_notifications.yaml";

#[derive(Clone)]
pub struct NotificationRecordRepository {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl NotificationRecordRepository {
    /// Create a repository rooted at `data_directory`, creating it if missing
    pub fn new(data_directory: impl AsRef<Path>) -> Result<Self> {
        let dir = data_directory.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created data directory {:?}", dir);
        }

        Ok(Self {
            path: dir.join(RECORDS_FILE),
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<ScheduledNotificationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let yaml_content = fs::read_to_string(&self.path)?;
        if yaml_content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<ScheduledNotificationRecord> = serde_yaml::from_str(&yaml_content)?;
        Ok(records)
    }

    fn save(&self, records: &[ScheduledNotificationRecord]) -> Result<()> {
        let yaml_content = serde_yaml::to_string(records)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!("Saved {} notification records to {:?}", records.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl NotificationRecordStorage for NotificationRecordRepository {
    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotificationRecord>> {
        let _guard = self.lock.lock().await;
        self.load()
    }

    async fn upsert_by_type(
        &self,
        record: ScheduledNotificationRecord,
    ) -> Result<Option<ScheduledNotificationRecord>> {
        let _guard = self.lock.lock().await;

        let mut records = self.load()?;
        let mut previous = None;
        records.retain(|existing| {
            if existing.notification_type == record.notification_type {
                previous = Some(existing.clone());
                false
            } else {
                true
            }
        });
        records.push(record);
        self.save(&records)?;

        Ok(previous)
    }

    async fn remove_by_type(&self, notification_type: &str) -> Result<Vec<ScheduledNotificationRecord>> {
        let _guard = self.lock.lock().await;

        let (removed, kept): (Vec<_>, Vec<_>) = self
            .load()?
            .into_iter()
            .partition(|record| record.notification_type == notification_type);

        if !removed.is_empty() {
            self.save(&kept)?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;

        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("Removed notification records file {:?}", self.path);
        }
        Ok(())
    }

    async fn mark_fired(&self, notification_type: &str, date: NaiveDate) -> Result<bool> {
        let _guard = self.lock.lock().await;

        let mut records = self.load()?;
        let mut found = false;
        for record in records
            .iter_mut()
            .filter(|record| record.notification_type == notification_type)
        {
            record.last_fired_on = Some(date);
            found = true;
        }

        if found {
            self.save(&records)?;
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::Recurrence;
    use tempfile::TempDir;

    fn record(id: &str, notification_type: &str, day: u32) -> ScheduledNotificationRecord {
        ScheduledNotificationRecord {
            id: id.to_string(),
            notification_type: notification_type.to_string(),
            recurrence: Recurrence::Monthly { day_of_month: day },
            title: "Salary Day Reminder".to_string(),
            body: "It's your salary day!".to_string(),
            created_at: Utc::now(),
            last_fired_on: None,
        }
    }

    fn setup_test_repo() -> (NotificationRecordRepository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = NotificationRecordRepository::new(temp_dir.path()).expect("Failed to create repo");
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_type() {
        let (repo, _temp_dir) = setup_test_repo();

        assert!(repo.upsert_by_type(record("a", "salary_reminder", 25)).await.unwrap().is_none());
        repo.upsert_by_type(record("b", "weekly_report", 1)).await.unwrap();
        let previous = repo.upsert_by_type(record("c", "salary_reminder", 28)).await.unwrap();

        assert_eq!(previous.map(|r| r.id), Some("a".to_string()));
        let records = repo.list_scheduled().await.unwrap();
        assert_eq!(records.len(), 2);
        let salary: Vec<_> = records
            .iter()
            .filter(|r| r.notification_type == "salary_reminder")
            .collect();
        assert_eq!(salary.len(), 1);
        assert_eq!(salary[0].recurrence.day_of_month(), Some(28));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_one_record_per_type() {
        let (repo, _temp_dir) = setup_test_repo();

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.upsert_by_type(record(&format!("id-{}", i), "salary_reminder", 10))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.list_scheduled().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_mark_and_clear() {
        let (repo, _temp_dir) = setup_test_repo();
        repo.upsert_by_type(record("a", "salary_reminder", 25)).await.unwrap();
        repo.upsert_by_type(record("b", "weekly_report", 1)).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
        assert!(repo.mark_fired("salary_reminder", today).await.unwrap());
        assert!(!repo.mark_fired("budget_alert_food", today).await.unwrap());

        let removed = repo.remove_by_type("weekly_report").await.unwrap();
        assert_eq!(removed.len(), 1);
        let records = repo.list_scheduled().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].last_fired_on, Some(today));

        repo.clear().await.unwrap();
        assert!(!repo.path().exists());
        assert!(repo.list_scheduled().await.unwrap().is_empty());
    }
}
