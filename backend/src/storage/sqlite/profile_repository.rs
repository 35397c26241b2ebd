use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{FundUpdate, NotificationPreferences, Profile, ProfileUpdate, UserId};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::{debug, info};

use super::connection::DbConnection;
use crate::storage::ProfileStorage;

#[derive(Clone)]
pub struct ProfileRepository {
    db: DbConnection,
}

impl ProfileRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Write every user-editable column of `profile`.
    ///
    /// The fund amount and version are only written when the row is first
    /// created; afterwards they change exclusively through
    /// [`ProfileStorage::update_emergency_fund`].
    pub async fn store_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, display_name, monthly_income, monthly_income_day, monthly_saving_goal,
                emergency_fund_amount, emergency_fund_auto_invest,
                notify_salary, notify_budget, notify_report, version
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                monthly_income = excluded.monthly_income,
                monthly_income_day = excluded.monthly_income_day,
                monthly_saving_goal = excluded.monthly_saving_goal,
                emergency_fund_auto_invest = excluded.emergency_fund_auto_invest,
                notify_salary = excluded.notify_salary,
                notify_budget = excluded.notify_budget,
                notify_report = excluded.notify_report,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.display_name)
        .bind(profile.monthly_income)
        .bind(profile.monthly_income_day.map(i64::from))
        .bind(profile.monthly_saving_goal)
        .bind(profile.emergency_fund_amount)
        .bind(profile.emergency_fund_auto_invest)
        .bind(profile.notification_preferences.salary)
        .bind(profile.notification_preferences.budget)
        .bind(profile.notification_preferences.report)
        .bind(profile.version)
        .execute(self.db.pool())
        .await?;

        debug!("Stored profile {}", profile.id);
        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> Profile {
        let income_day: Option<i64> = row.get("monthly_income_day");
        Profile {
            id: row.get("id"),
            display_name: row.get("display_name"),
            monthly_income: row.get("monthly_income"),
            monthly_income_day: income_day.and_then(|day| u32::try_from(day).ok()),
            monthly_saving_goal: row.get("monthly_saving_goal"),
            emergency_fund_amount: row.get("emergency_fund_amount"),
            emergency_fund_auto_invest: row.get("emergency_fund_auto_invest"),
            notification_preferences: NotificationPreferences {
                salary: row.get("notify_salary"),
                budget: row.get("notify_budget"),
                report: row.get("notify_report"),
            },
            version: row.get("version"),
        }
    }

    async fn current_version(&self, user: &UserId) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT version FROM profiles WHERE id = ?")
            .bind(user.as_str())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| r.get("version")))
    }
}

#[async_trait]
impl ProfileStorage for ProfileRepository {
    async fn get_profile(&self, user: &UserId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, display_name, monthly_income, monthly_income_day, monthly_saving_goal,
                   emergency_fund_amount, emergency_fund_auto_invest,
                   notify_salary, notify_budget, notify_report, version
            FROM profiles
            WHERE id = ?
            "#,
        )
        .bind(user.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(Self::row_to_profile))
    }

    async fn update_profile(&self, user: &UserId, update: &ProfileUpdate) -> Result<Profile> {
        let mut profile = self
            .get_profile(user)
            .await?
            .unwrap_or_else(|| Profile::new(user.as_str()));

        if let Some(name) = &update.display_name {
            profile.display_name = name.clone();
        }
        if let Some(income) = update.monthly_income {
            profile.monthly_income = income;
        }
        if let Some(day) = update.monthly_income_day {
            profile.monthly_income_day = day;
        }
        if let Some(goal) = update.monthly_saving_goal {
            profile.monthly_saving_goal = goal;
        }
        if let Some(preferences) = update.notification_preferences {
            profile.notification_preferences = preferences;
        }

        self.store_profile(&profile).await?;
        info!("Updated profile for user {}", user);
        Ok(profile)
    }

    async fn set_auto_invest(&self, user: &UserId, amount: Option<f64>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE profiles SET emergency_fund_auto_invest = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(amount)
        .bind(user.as_str())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("Profile for user '{}' not found", user));
        }
        Ok(())
    }

    async fn update_emergency_fund(
        &self,
        user: &UserId,
        expected_version: i64,
        new_amount: f64,
    ) -> Result<FundUpdate> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET emergency_fund_amount = ?, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(new_amount)
        .bind(user.as_str())
        .bind(expected_version)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 1 {
            return Ok(FundUpdate::Applied { new_version: expected_version + 1 });
        }

        match self.current_version(user).await? {
            Some(current_version) => Ok(FundUpdate::Conflict { current_version }),
            None => Err(anyhow!("Profile for user '{}' not found", user)),
        }
    }
}
