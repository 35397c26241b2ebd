//! # Notification Scheduler
//!
//! Keeps at most one recurring reminder per notification type.
//!
//! A reminder lives in two places: a repeating delivery registered with the
//! [`NotificationDelivery`] primitive and a [`ScheduledNotificationRecord`] in
//! local storage. Scheduling a type that already exists replaces both.
//!
//! The delivery primitive only knows "every day at hour H" or "every week on
//! weekday W". Whether a monthly reminder is actually due is decided by
//! [`NotificationScheduler::run_due`], which the server calls periodically.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use shared::{Recurrence, ScheduledNotificationRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::ScheduleError;
use crate::delivery::{NotificationContent, NotificationDelivery, PermissionGate, Trigger};
use crate::storage::NotificationRecordStorage;

pub const DEFAULT_REMINDER_HOUR: u32 = 9;

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Day `day_of_month` clamped to the month's length (31 becomes 30 in April)
pub fn effective_day(day_of_month: u32, year: i32, month: u32) -> u32 {
    day_of_month.min(days_in_month(year, month))
}

fn monthly_date(day_of_month: u32, year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, effective_day(day_of_month, year, month))
}

/// Next date a monthly reminder fires, counting today if the reminder hour
/// has not passed yet
pub fn next_monthly_occurrence(day_of_month: u32, now: &DateTime<FixedOffset>, hour: u32) -> Option<NaiveDate> {
    let today = now.date_naive();
    let this_month = monthly_date(day_of_month, today.year(), today.month())?;

    if this_month > today || (this_month == today && now.hour() < hour) {
        return Some(this_month);
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    monthly_date(day_of_month, year, month)
}

/// Next date a weekly reminder fires (`weekday` 0 = Sunday)
pub fn next_weekly_occurrence(weekday: u8, now: &DateTime<FixedOffset>, hour: u32) -> NaiveDate {
    let today = now.date_naive();
    let current = today.weekday().num_days_from_sunday() as i64;
    let mut days_until = (weekday as i64 - current).rem_euclid(7);
    if days_until == 0 && now.hour() >= hour {
        days_until = 7;
    }
    today + Duration::days(days_until)
}

/// Whether a recurrence falls on `now`'s date at or after its hour
pub fn is_due(recurrence: &Recurrence, now: &DateTime<FixedOffset>, reminder_hour: u32) -> bool {
    let today = now.date_naive();
    match recurrence {
        Recurrence::Monthly { day_of_month } => {
            today.day() == effective_day(*day_of_month, today.year(), today.month())
                && now.hour() >= reminder_hour
        }
        Recurrence::Weekly { weekday, hour } => {
            today.weekday().num_days_from_sunday() == u32::from(*weekday) && now.hour() >= *hour
        }
    }
}

/// A reminder to register on a day of each month
#[derive(Debug, Clone)]
pub struct MonthlyReminder {
    pub day_of_month: u32,
    pub title: String,
    pub body: String,
    pub notification_type: String,
    pub fire_if_today: bool,
}

/// A reminder to register on a day of each week
#[derive(Debug, Clone)]
pub struct WeeklyReminder {
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u8,
    pub title: String,
    pub body: String,
    pub notification_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledReminder {
    pub notification_id: String,
    pub next_occurrence: Option<NaiveDate>,
    pub fired_immediately: bool,
    pub replaced: Option<String>,
}

#[derive(Clone)]
pub struct NotificationScheduler {
    delivery: Arc<dyn NotificationDelivery>,
    permission: Arc<dyn PermissionGate>,
    records: Arc<dyn NotificationRecordStorage>,
    reminder_hour: u32,
}

impl NotificationScheduler {
    pub fn new(
        delivery: Arc<dyn NotificationDelivery>,
        permission: Arc<dyn PermissionGate>,
        records: Arc<dyn NotificationRecordStorage>,
        reminder_hour: u32,
    ) -> Self {
        Self {
            delivery,
            permission,
            records,
            reminder_hour,
        }
    }

    async fn ensure_permission(&self) {
        if !self.permission.request_notification_permission().await {
            warn!("Notification permission not granted, scheduling anyway");
        }
    }

    /// Whether the current record of this type has already fired on `today`
    async fn fired_today(&self, notification_type: &str, today: NaiveDate) -> bool {
        match self.records.list_scheduled().await {
            Ok(records) => records
                .iter()
                .any(|r| r.notification_type == notification_type && r.last_fired_on == Some(today)),
            Err(e) => {
                warn!("Could not read reminder records: {}", e);
                false
            }
        }
    }

    /// Register the delivery and swap in the new record, cancelling whatever
    /// the previous record of this type had registered.
    async fn register(
        &self,
        trigger: Trigger,
        content: &NotificationContent,
        recurrence: Recurrence,
        last_fired_on: Option<NaiveDate>,
    ) -> Result<(String, Option<String>), ScheduleError> {
        let delivery_id = self
            .delivery
            .schedule(trigger, content)
            .await
            .map_err(ScheduleError::Delivery)?;

        let record = ScheduledNotificationRecord {
            id: delivery_id.clone(),
            notification_type: content.notification_type.clone(),
            recurrence,
            title: content.title.clone(),
            body: content.body.clone(),
            created_at: Utc::now(),
            last_fired_on,
        };

        let previous = match self.records.upsert_by_type(record).await {
            Ok(previous) => previous,
            Err(e) => {
                if let Err(cancel_err) = self.delivery.cancel(&delivery_id).await {
                    warn!("Failed to cancel orphaned delivery {}: {}", delivery_id, cancel_err);
                }
                return Err(ScheduleError::Storage(e));
            }
        };

        let replaced = match previous {
            Some(previous) => {
                if let Err(e) = self.delivery.cancel(&previous.id).await {
                    warn!("Failed to cancel replaced delivery {}: {}", previous.id, e);
                }
                debug!("Replaced {} reminder {}", previous.notification_type, previous.id);
                Some(previous.id)
            }
            None => None,
        };

        Ok((delivery_id, replaced))
    }

    pub async fn schedule_monthly(
        &self,
        reminder: MonthlyReminder,
        now: DateTime<FixedOffset>,
    ) -> Result<ScheduledReminder, ScheduleError> {
        if !(1..=31).contains(&reminder.day_of_month) {
            return Err(ScheduleError::InvalidDayOfMonth(reminder.day_of_month));
        }
        self.ensure_permission().await;

        let content = NotificationContent {
            title: reminder.title,
            body: reminder.body,
            notification_type: reminder.notification_type,
        };

        let today = now.date_naive();
        let already_fired = self.fired_today(&content.notification_type, today).await;
        let mut fired_immediately = false;
        if reminder.fire_if_today
            && !already_fired
            && today.day() == effective_day(reminder.day_of_month, today.year(), today.month())
        {
            match self.delivery.fire_now(&content).await {
                Ok(_) => fired_immediately = true,
                Err(e) => warn!("Failed to fire {} immediately: {}", content.notification_type, e),
            }
        }

        let next_occurrence = if fired_immediately {
            let tomorrow = now + Duration::days(1);
            next_monthly_occurrence(reminder.day_of_month, &tomorrow, 0)
        } else {
            next_monthly_occurrence(reminder.day_of_month, &now, self.reminder_hour)
        };

        // Today's slot counts as used once it has fired or its hour has passed
        let recurrence = Recurrence::Monthly { day_of_month: reminder.day_of_month };
        let today_used = fired_immediately || already_fired || is_due(&recurrence, &now, self.reminder_hour);

        let (notification_id, replaced) = self
            .register(
                Trigger::Daily { hour: self.reminder_hour },
                &content,
                recurrence,
                today_used.then_some(today),
            )
            .await?;

        info!(
            "Scheduled monthly {} on day {} (next: {:?})",
            content.notification_type, reminder.day_of_month, next_occurrence
        );

        Ok(ScheduledReminder {
            notification_id,
            next_occurrence,
            fired_immediately,
            replaced,
        })
    }

    pub async fn schedule_weekly(
        &self,
        reminder: WeeklyReminder,
        now: DateTime<FixedOffset>,
    ) -> Result<ScheduledReminder, ScheduleError> {
        if reminder.weekday > 6 {
            return Err(ScheduleError::InvalidWeekday(reminder.weekday));
        }
        self.ensure_permission().await;

        let content = NotificationContent {
            title: reminder.title,
            body: reminder.body,
            notification_type: reminder.notification_type,
        };
        let hour = self.reminder_hour;
        let next_occurrence = next_weekly_occurrence(reminder.weekday, &now, hour);
        let recurrence = Recurrence::Weekly { weekday: reminder.weekday, hour };
        let today_used = is_due(&recurrence, &now, hour).then_some(now.date_naive());

        let (notification_id, replaced) = self
            .register(
                Trigger::Weekly { weekday: reminder.weekday, hour },
                &content,
                recurrence,
                today_used,
            )
            .await?;

        info!(
            "Scheduled weekly {} on weekday {} (next: {})",
            content.notification_type, reminder.weekday, next_occurrence
        );

        Ok(ScheduledReminder {
            notification_id,
            next_occurrence: Some(next_occurrence),
            fired_immediately: false,
            replaced,
        })
    }

    /// Fire-and-forget notification; nothing is recorded
    pub async fn send_immediate(
        &self,
        title: &str,
        body: &str,
        notification_type: &str,
    ) -> Result<String, ScheduleError> {
        self.ensure_permission().await;
        let content = NotificationContent {
            title: title.to_string(),
            body: body.to_string(),
            notification_type: notification_type.to_string(),
        };
        self.delivery
            .fire_now(&content)
            .await
            .map_err(ScheduleError::Delivery)
    }

    /// Cancel every reminder of a type. Returns how many were removed.
    pub async fn cancel_by_type(&self, notification_type: &str) -> Result<usize, ScheduleError> {
        let removed = self
            .records
            .remove_by_type(notification_type)
            .await
            .map_err(ScheduleError::Storage)?;

        for record in &removed {
            if let Err(e) = self.delivery.cancel(&record.id).await {
                warn!("Failed to cancel delivery {}: {}", record.id, e);
            }
        }

        info!("Cancelled {} {} reminder(s)", removed.len(), notification_type);
        Ok(removed.len())
    }

    pub async fn clear_all(&self) -> Result<(), ScheduleError> {
        self.delivery.cancel_all().await.map_err(ScheduleError::Delivery)?;
        self.records.clear().await.map_err(ScheduleError::Storage)?;
        info!("Cleared all scheduled reminders");
        Ok(())
    }

    pub async fn list_scheduled(&self) -> Result<Vec<ScheduledNotificationRecord>, ScheduleError> {
        self.records.list_scheduled().await.map_err(ScheduleError::Storage)
    }

    /// Fire every reminder due at `now` that has not fired today yet.
    /// Returns the types that fired.
    pub async fn run_due(&self, now: DateTime<FixedOffset>) -> Result<Vec<String>, ScheduleError> {
        let today = now.date_naive();
        let records = self.list_scheduled().await?;
        let mut fired = Vec::new();

        for record in records {
            if record.last_fired_on == Some(today) || !is_due(&record.recurrence, &now, self.reminder_hour) {
                continue;
            }

            let content = NotificationContent {
                title: record.title.clone(),
                body: record.body.clone(),
                notification_type: record.notification_type.clone(),
            };
            if let Err(e) = self.delivery.fire_now(&content).await {
                warn!("Failed to fire due reminder {}: {}", record.notification_type, e);
                continue;
            }
            self.records
                .mark_fired(&record.notification_type, today)
                .await
                .map_err(ScheduleError::Storage)?;
            fired.push(record.notification_type);
        }

        if !fired.is_empty() {
            info!("Fired {} due reminder(s): {:?}", fired.len(), fired);
        }
        Ok(fired)
    }
}
