//! # Reminder Service
//!
//! User-facing reminders built on the [`NotificationScheduler`]. Each one is
//! gated on the matching notification preference of the user's profile and
//! reports a [`ScheduleOutcome`] instead of failing, so callers can tell a
//! scheduled reminder from one skipped by preference or one that failed.

use chrono::{DateTime, FixedOffset};
use shared::{
    BudgetStatusLevel, Category, NotificationPreferences, Profile, ScheduleOutcome, UserId,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::aggregator::compute_budget_statuses;
use super::commands::reminders::{
    BudgetExceededCommand, BudgetThresholdCommand, SalaryReminderCommand, SavingsCheckInCommand,
};
use super::errors::ScheduleError;
use super::notification_scheduler::{MonthlyReminder, NotificationScheduler, ScheduledReminder, WeeklyReminder};
use crate::storage::{BudgetStorage, ProfileStorage, TransactionStorage};

pub const SALARY_REMINDER_TYPE: &str = "salary_reminder";
pub const WEEKLY_REPORT_TYPE: &str = "weekly_report";
pub const SAVINGS_CHECK_IN_TYPE: &str = "savings_checkin";

pub fn budget_alert_type(category: Category) -> String {
    format!("budget_alert_{}", category)
}

pub fn budget_exceeded_type(category: Category) -> String {
    format!("budget_exceeded_{}", category)
}

fn salary_body(amount: Option<f64>) -> String {
    match amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => {
            format!("You're expecting AED {:.2} today", amount)
        }
        _ => "It's your salary day! Don't forget to log your income.".to_string(),
    }
}

fn scheduled(reminder: ScheduledReminder, message: String) -> ScheduleOutcome {
    ScheduleOutcome::Scheduled {
        notification_id: reminder.notification_id,
        next_occurrence: reminder.next_occurrence,
        fired_immediately: reminder.fired_immediately,
        message,
    }
}

fn failed(error: ScheduleError) -> ScheduleOutcome {
    warn!("Reminder operation failed: {}", error);
    ScheduleOutcome::Failed {
        message: error.to_string(),
    }
}

fn skipped(reason: &str) -> ScheduleOutcome {
    info!("Reminder skipped: {}", reason);
    ScheduleOutcome::Skipped {
        reason: reason.to_string(),
    }
}

#[derive(Clone)]
pub struct ReminderService {
    scheduler: NotificationScheduler,
    profiles: Arc<dyn ProfileStorage>,
    transactions: Arc<dyn TransactionStorage>,
    budgets: Arc<dyn BudgetStorage>,
    weekly_report_weekday: u8,
}

impl ReminderService {
    pub fn new(
        scheduler: NotificationScheduler,
        profiles: Arc<dyn ProfileStorage>,
        transactions: Arc<dyn TransactionStorage>,
        budgets: Arc<dyn BudgetStorage>,
        weekly_report_weekday: u8,
    ) -> Self {
        Self {
            scheduler,
            profiles,
            transactions,
            budgets,
            weekly_report_weekday,
        }
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    /// The user's profile, or the outcome to return when it cannot be used
    async fn profile(&self, user: &UserId) -> Result<Profile, ScheduleOutcome> {
        match self.profiles.get_profile(user).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(skipped("profile not found")),
            Err(e) => Err(failed(ScheduleError::Storage(e))),
        }
    }

    async fn preferences(&self, user: &UserId) -> Result<NotificationPreferences, ScheduleOutcome> {
        self.profile(user).await.map(|profile| profile.notification_preferences)
    }

    pub async fn schedule_salary_reminder(
        &self,
        command: SalaryReminderCommand,
        now: DateTime<FixedOffset>,
    ) -> ScheduleOutcome {
        match self.preferences(&command.user).await {
            Ok(preferences) if preferences.salary => {}
            Ok(_) => return skipped("salary reminders are turned off"),
            Err(outcome) => return outcome,
        }

        let reminder = MonthlyReminder {
            day_of_month: command.day_of_month,
            title: "Salary Day Reminder 💰".to_string(),
            body: salary_body(command.amount),
            notification_type: SALARY_REMINDER_TYPE.to_string(),
            fire_if_today: true,
        };

        match self.scheduler.schedule_monthly(reminder, now).await {
            Ok(reminder) => scheduled(
                reminder,
                format!("Salary reminder set for day {} of each month", command.day_of_month),
            ),
            Err(e) => failed(e),
        }
    }

    pub async fn schedule_weekly_report(&self, user: &UserId, now: DateTime<FixedOffset>) -> ScheduleOutcome {
        match self.preferences(user).await {
            Ok(preferences) if preferences.report => {}
            Ok(_) => return skipped("weekly reports are turned off"),
            Err(outcome) => return outcome,
        }

        let reminder = WeeklyReminder {
            weekday: self.weekly_report_weekday,
            title: "Weekly Spending Report 📊".to_string(),
            body: "Your weekly spending summary is ready. See where your money went this week.".to_string(),
            notification_type: WEEKLY_REPORT_TYPE.to_string(),
        };

        match self.scheduler.schedule_weekly(reminder, now).await {
            Ok(reminder) => scheduled(reminder, "Weekly report scheduled".to_string()),
            Err(e) => failed(e),
        }
    }

    pub async fn send_budget_exceeded_alert(&self, command: BudgetExceededCommand) -> ScheduleOutcome {
        match self.preferences(&command.user).await {
            Ok(preferences) if preferences.budget => {}
            Ok(_) => return skipped("budget alerts are turned off"),
            Err(outcome) => return outcome,
        }

        let body = format!(
            "You've spent AED {:.2} of your AED {:.2} {} budget",
            command.spent,
            command.budget_amount,
            command.category.label()
        );
        match self
            .scheduler
            .send_immediate("Budget Exceeded ⚠️", &body, &budget_exceeded_type(command.category))
            .await
        {
            Ok(_) => ScheduleOutcome::Sent { message: body },
            Err(e) => failed(e),
        }
    }

    /// Send an exceeded alert for every category at or over its budget this month
    pub async fn check_budget_alerts(&self, user: &UserId, now: DateTime<FixedOffset>) -> Vec<ScheduleOutcome> {
        match self.preferences(user).await {
            Ok(preferences) if preferences.budget => {}
            Ok(_) => return vec![skipped("budget alerts are turned off")],
            Err(outcome) => return vec![outcome],
        }

        let transactions = match self.transactions.list_transactions(user).await {
            Ok(transactions) => transactions,
            Err(e) => return vec![failed(ScheduleError::Storage(e))],
        };
        let budgets = match self.budgets.list_budgets(user).await {
            Ok(budgets) => budgets,
            Err(e) => return vec![failed(ScheduleError::Storage(e))],
        };

        let mut outcomes = Vec::new();
        for status in compute_budget_statuses(&budgets, &transactions, &now) {
            if status.status != BudgetStatusLevel::Danger {
                continue;
            }
            let command = BudgetExceededCommand {
                user: user.clone(),
                category: status.category,
                budget_amount: status.budget_amount,
                spent: status.spent,
            };
            outcomes.push(self.send_budget_exceeded_alert(command).await);
        }
        outcomes
    }

    /// Monthly reminder about a category budget threshold
    pub async fn schedule_budget_alert(
        &self,
        command: BudgetThresholdCommand,
        now: DateTime<FixedOffset>,
    ) -> ScheduleOutcome {
        match self.preferences(&command.user).await {
            Ok(preferences) if preferences.budget => {}
            Ok(_) => return skipped("budget alerts are turned off"),
            Err(outcome) => return outcome,
        }

        let reminder = MonthlyReminder {
            day_of_month: 1,
            title: "Budget Alert 📊".to_string(),
            body: format!(
                "You've reached {}% of your {} budget",
                command.threshold_percent,
                command.category.label()
            ),
            notification_type: budget_alert_type(command.category),
            fire_if_today: false,
        };

        match self.scheduler.schedule_monthly(reminder, now).await {
            Ok(reminder) => scheduled(reminder, format!("{} budget alert scheduled", command.category.label())),
            Err(e) => failed(e),
        }
    }

    pub async fn schedule_savings_check_in(
        &self,
        command: SavingsCheckInCommand,
        now: DateTime<FixedOffset>,
    ) -> ScheduleOutcome {
        if let Err(outcome) = self.profile(&command.user).await {
            return outcome;
        }

        let body = match command.goal {
            Some(goal) if goal.is_finite() && goal > 0.0 => {
                format!("Check your progress towards your AED {:.2} savings goal", goal)
            }
            _ => "Time to check in on your savings goal!".to_string(),
        };
        let reminder = MonthlyReminder {
            day_of_month: command.day_of_month,
            title: "Savings Check-in 🎯".to_string(),
            body,
            notification_type: SAVINGS_CHECK_IN_TYPE.to_string(),
            fire_if_today: false,
        };

        match self.scheduler.schedule_monthly(reminder, now).await {
            Ok(reminder) => scheduled(reminder, "Savings check-in scheduled".to_string()),
            Err(e) => failed(e),
        }
    }

    pub async fn cancel_notification_by_type(&self, notification_type: &str) -> Result<usize, ScheduleError> {
        self.scheduler.cancel_by_type(notification_type).await
    }

    async fn cancel_as_outcome(&self, notification_type: &str, reason: &str) -> ScheduleOutcome {
        match self.cancel_notification_by_type(notification_type).await {
            Ok(count) => skipped(&format!("{}, {} reminder(s) cancelled", reason, count)),
            Err(e) => failed(e),
        }
    }

    /// Bring scheduled reminders in line with the saved preferences: the
    /// weekly report and the salary reminder are scheduled when enabled and
    /// cancelled when not.
    pub async fn apply_preferences(&self, user: &UserId, now: DateTime<FixedOffset>) -> Vec<ScheduleOutcome> {
        let profile = match self.profile(user).await {
            Ok(profile) => profile,
            Err(outcome) => return vec![outcome],
        };
        let preferences = profile.notification_preferences;

        let report = if preferences.report {
            self.schedule_weekly_report(user, now).await
        } else {
            self.cancel_as_outcome(WEEKLY_REPORT_TYPE, "weekly reports are turned off").await
        };

        let salary = match (preferences.salary, profile.monthly_income_day) {
            (true, Some(day)) => {
                let command = SalaryReminderCommand {
                    user: user.clone(),
                    day_of_month: day,
                    amount: profile.monthly_income,
                };
                self.schedule_salary_reminder(command, now).await
            }
            (true, None) => {
                self.cancel_as_outcome(SALARY_REMINDER_TYPE, "no salary day set").await
            }
            (false, _) => {
                self.cancel_as_outcome(SALARY_REMINDER_TYPE, "salary reminders are turned off")
                    .await
            }
        };

        vec![report, salary]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::Trigger;
    use crate::domain::notification_scheduler::DEFAULT_REMINDER_HOUR;
    use crate::test_utils::{CountingPermission, DeliveryCall, RecordingDelivery, TestEnvironment};
    use chrono::{TimeZone, Utc};
    use shared::{NewBudget, NewTransaction};

    const USER: &str = "user-1";

    fn user() -> UserId {
        UserId::from(USER)
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 20, 10, 0, 0)
            .unwrap()
    }

    fn profile(preferences: NotificationPreferences) -> Profile {
        Profile {
            monthly_income: Some(5000.0),
            monthly_income_day: Some(25),
            notification_preferences: preferences,
            ..Profile::new(USER)
        }
    }

    fn all_on() -> NotificationPreferences {
        NotificationPreferences { salary: true, budget: true, report: true }
    }

    fn service(env: &TestEnvironment, delivery: &RecordingDelivery) -> ReminderService {
        let scheduler = NotificationScheduler::new(
            Arc::new(delivery.clone()),
            Arc::new(CountingPermission::new(true)),
            env.records.clone(),
            DEFAULT_REMINDER_HOUR,
        );
        ReminderService::new(
            scheduler,
            env.profiles.clone(),
            env.transactions.clone(),
            env.budgets.clone(),
            0,
        )
    }

    fn salary_command(day: u32) -> SalaryReminderCommand {
        SalaryReminderCommand {
            user: user(),
            day_of_month: day,
            amount: Some(5000.0),
        }
    }

    #[tokio::test]
    async fn test_salary_reminder_gated_by_preference() {
        let env = TestEnvironment::with_profile(profile(NotificationPreferences::default())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let outcome = service.schedule_salary_reminder(salary_command(25), now()).await;
        assert!(matches!(outcome, ScheduleOutcome::Skipped { .. }));
        assert!(delivery.calls().is_empty());
    }

    #[tokio::test]
    async fn test_salary_reminder_scheduled() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let outcome = service.schedule_salary_reminder(salary_command(25), now()).await;
        match outcome {
            ScheduleOutcome::Scheduled { next_occurrence, fired_immediately, .. } => {
                assert_eq!(next_occurrence, chrono::NaiveDate::from_ymd_opt(2024, 3, 25));
                assert!(!fired_immediately);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let records = service.scheduler().list_scheduled().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body, "You're expecting AED 5000.00 today");
    }

    #[tokio::test]
    async fn test_invalid_day_reports_failure() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let outcome = service.schedule_salary_reminder(salary_command(40), now()).await;
        assert!(matches!(outcome, ScheduleOutcome::Failed { .. }));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_delivery_failure_reports_failure() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        delivery.fail_schedules();
        let service = service(&env, &delivery);

        let outcome = service.schedule_weekly_report(&user(), now()).await;
        assert!(matches!(outcome, ScheduleOutcome::Failed { .. }));
        assert!(service.scheduler().list_scheduled().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_profile_is_skipped() {
        let env = TestEnvironment::new().await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let outcome = service.schedule_weekly_report(&user(), now()).await;
        assert!(matches!(outcome, ScheduleOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_check_budget_alerts_sends_for_exceeded_categories() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let march = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        env.budgets
            .insert_budget(&user(), &NewBudget { category: Category::Food, amount: 100.0 })
            .await
            .unwrap();
        env.budgets
            .insert_budget(&user(), &NewBudget { category: Category::Transport, amount: 100.0 })
            .await
            .unwrap();
        env.transactions
            .insert_transaction(&user(), &NewTransaction::expense("Groceries run", 120.0, Category::Food, march))
            .await
            .unwrap();
        env.transactions
            .insert_transaction(&user(), &NewTransaction::expense("Taxi", 20.0, Category::Transport, march))
            .await
            .unwrap();

        let outcomes = service.check_budget_alerts(&user(), now()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], ScheduleOutcome::Sent { .. }));

        let fired = delivery.fired();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].notification_type, "budget_exceeded_food");
        assert_eq!(fired[0].body, "You've spent AED 120.00 of your AED 100.00 Food budget");
    }

    #[tokio::test]
    async fn test_budget_alert_and_savings_check_in() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let alert = service
            .schedule_budget_alert(
                BudgetThresholdCommand { user: user(), category: Category::Food, threshold_percent: 80 },
                now(),
            )
            .await;
        assert!(alert.is_success());

        let check_in = service
            .schedule_savings_check_in(
                SavingsCheckInCommand { user: user(), day_of_month: 15, goal: Some(1000.0) },
                now(),
            )
            .await;
        assert!(check_in.is_success());

        let records = service.scheduler().list_scheduled().await.unwrap();
        let types: Vec<_> = records.iter().map(|r| r.notification_type.as_str()).collect();
        assert!(types.contains(&"budget_alert_food"));
        assert!(types.contains(&SAVINGS_CHECK_IN_TYPE));
        let alert_record = records
            .iter()
            .find(|r| r.notification_type == "budget_alert_food")
            .unwrap();
        assert_eq!(alert_record.body, "You've reached 80% of your Food budget");
    }

    #[tokio::test]
    async fn test_apply_preferences_schedules_and_cancels() {
        let env = TestEnvironment::with_profile(profile(all_on())).await;
        let delivery = RecordingDelivery::new();
        let service = service(&env, &delivery);

        let outcomes = service.apply_preferences(&user(), now()).await;
        assert!(outcomes.iter().all(|o| o.is_success()));
        assert_eq!(service.scheduler().list_scheduled().await.unwrap().len(), 2);
        assert!(delivery
            .calls()
            .iter()
            .any(|c| matches!(c, DeliveryCall::Schedule(Trigger::Weekly { weekday: 0, .. }, _))));

        let off = shared::ProfileUpdate {
            notification_preferences: Some(NotificationPreferences {
                salary: true,
                budget: true,
                report: false,
            }),
            ..Default::default()
        };
        env.profiles.update_profile(&user(), &off).await.unwrap();

        let outcomes = service.apply_preferences(&user(), now()).await;
        assert!(matches!(outcomes[0], ScheduleOutcome::Skipped { .. }));
        let records = service.scheduler().list_scheduled().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notification_type, SALARY_REMINDER_TYPE);
    }
}
