//! # Salary Service
//!
//! Detects salary day and posts the salary together with the optional
//! emergency fund auto-invest.
//!
//! Posting runs as a small saga over independent store writes:
//!
//! 1. Salary income transaction. This is the commit point; if it fails
//!    nothing else happens.
//! 2. Auto-invest expense transaction (only with auto-invest configured).
//! 3. Compare-and-swap of the emergency fund amount.
//!
//! Steps 2 and 3 never undo step 1. Every step's outcome is recorded in the
//! returned [`SalaryPostingReport`].

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use shared::{
    Category, FundUpdate, NewTransaction, Profile, SalaryDayCheck, SalaryDayReason,
    SalaryPostingReport, SalaryStep, StepStatus, Transaction, TransactionType, UserId,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::errors::SalaryError;
use crate::storage::{ProfileStorage, TransactionStorage};

pub const SALARY_TITLE: &str = "Salary";
pub const AUTO_INVEST_TITLE: &str = "Emergency Fund Auto-Invest";

/// True if a salary income was already recorded on `today`'s local date
pub fn salary_posted_on<Tz: TimeZone>(transactions: &[Transaction], today: &DateTime<Tz>) -> bool {
    let date = today.date_naive();
    transactions.iter().any(|tx| {
        tx.transaction_type == TransactionType::Income
            && tx.category == Category::Salary
            && tx.transaction_date.with_timezone(&today.timezone()).date_naive() == date
    })
}

/// Decide whether the "add salary" prompt should be shown today.
/// Rules apply in order; the first that fails hides the prompt.
pub fn check_salary_day<Tz: TimeZone>(
    profile: &Profile,
    transactions: &[Transaction],
    today: &DateTime<Tz>,
) -> SalaryDayCheck {
    let hidden = |reason| SalaryDayCheck {
        should_show: false,
        amount: None,
        reason,
    };

    let amount = match profile.monthly_income {
        Some(amount) if amount.is_finite() && amount > 0.0 => amount,
        _ => return hidden(SalaryDayReason::NoMonthlyIncome),
    };
    let day = match profile.monthly_income_day {
        Some(day) => day,
        None => return hidden(SalaryDayReason::NoIncomeDay),
    };
    if today.day() != day {
        return hidden(SalaryDayReason::NotSalaryDay);
    }
    if salary_posted_on(transactions, today) {
        return hidden(SalaryDayReason::AlreadyPosted);
    }

    SalaryDayCheck {
        should_show: true,
        amount: Some(amount),
        reason: SalaryDayReason::Due,
    }
}

#[derive(Clone)]
pub struct SalaryService {
    transactions: Arc<dyn TransactionStorage>,
    profiles: Arc<dyn ProfileStorage>,
}

impl SalaryService {
    pub fn new(transactions: Arc<dyn TransactionStorage>, profiles: Arc<dyn ProfileStorage>) -> Self {
        Self { transactions, profiles }
    }

    async fn load(&self, user: &UserId) -> Result<(Profile, Vec<Transaction>), SalaryError> {
        let profile = self
            .profiles
            .get_profile(user)
            .await
            .map_err(SalaryError::StoreUnavailable)?
            .ok_or(SalaryError::ProfileNotFound)?;
        let transactions = self
            .transactions
            .list_transactions(user)
            .await
            .map_err(SalaryError::StoreUnavailable)?;
        Ok((profile, transactions))
    }

    /// Salary-day check against freshly loaded data
    pub async fn evaluate(&self, user: &UserId, now: DateTime<FixedOffset>) -> Result<SalaryDayCheck, SalaryError> {
        let (profile, transactions) = self.load(user).await?;
        Ok(check_salary_day(&profile, &transactions, &now))
    }

    /// Post today's salary and run the auto-invest cascade.
    ///
    /// Refuses with [`SalaryError::AlreadyPosted`] if a salary income already
    /// exists for today and with [`SalaryError::NotSalaryDay`] for any other
    /// reason the prompt would be hidden. The duplicate check is read-then-act:
    /// two posts racing each other can both pass it.
    pub async fn post_salary(
        &self,
        user: &UserId,
        now: DateTime<FixedOffset>,
    ) -> Result<SalaryPostingReport, SalaryError> {
        let (profile, transactions) = self.load(user).await?;
        let check = check_salary_day(&profile, &transactions, &now);

        let salary_amount = match (check.should_show, check.amount) {
            (true, Some(amount)) => amount,
            _ if check.reason == SalaryDayReason::AlreadyPosted => {
                info!("Salary already posted today for user {}", user);
                return Err(SalaryError::AlreadyPosted);
            }
            _ => return Err(SalaryError::NotSalaryDay),
        };

        let auto_invest = profile.auto_invest_amount();
        let mut report = SalaryPostingReport::new(salary_amount, auto_invest);
        let posted_at = now.with_timezone(&Utc);

        let salary = NewTransaction::income(SALARY_TITLE, salary_amount, Category::Salary, posted_at);
        match self.transactions.insert_transaction(user, &salary).await {
            Ok(id) => {
                info!("Posted salary of {:.2} for user {} as {}", salary_amount, user, id);
                report.salary_transaction_id = Some(id);
                report.record(SalaryStep::SalaryTransaction, StepStatus::Completed);
            }
            Err(e) => {
                error!("Failed to post salary for user {}: {}", user, e);
                return Err(SalaryError::WriteFailure(e));
            }
        }

        let Some(auto_invest) = auto_invest else {
            report.record(SalaryStep::AutoInvestTransaction, StepStatus::Skipped);
            report.record(SalaryStep::EmergencyFundUpdate, StepStatus::Skipped);
            return Ok(report);
        };

        let transfer = NewTransaction::expense(AUTO_INVEST_TITLE, auto_invest, Category::EmergencyFund, posted_at)
            .with_notes("Auto-invested on salary day");
        if let Err(e) = self.transactions.insert_transaction(user, &transfer).await {
            warn!("Salary posted but auto-invest transfer failed for user {}: {}", user, e);
            report.record(
                SalaryStep::AutoInvestTransaction,
                StepStatus::Failed { message: e.to_string() },
            );
            report.record(SalaryStep::EmergencyFundUpdate, StepStatus::Skipped);
            return Ok(report);
        }
        report.record(SalaryStep::AutoInvestTransaction, StepStatus::Completed);

        let new_fund = profile.emergency_fund_amount + auto_invest;
        let fund_status = match self
            .profiles
            .update_emergency_fund(user, profile.version, new_fund)
            .await
        {
            Ok(FundUpdate::Applied { .. }) => {
                report.emergency_fund_amount = Some(new_fund);
                info!("Emergency fund for user {} increased to {:.2}", user, new_fund);
                StepStatus::Completed
            }
            Ok(FundUpdate::Conflict { current_version }) => {
                warn!(
                    "Emergency fund for user {} modified concurrently (version {}), auto-invest not applied",
                    user, current_version
                );
                StepStatus::Failed {
                    message: "emergency fund was modified concurrently".to_string(),
                }
            }
            Err(e) => {
                warn!("Salary posted but emergency fund update failed for user {}: {}", user, e);
                StepStatus::Failed { message: e.to_string() }
            }
        };
        report.record(SalaryStep::EmergencyFundUpdate, fund_status);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingInserts, FaultyFundWrites, TestEnvironment};

    const USER: &str = "user-1";

    fn user() -> UserId {
        UserId::from(USER)
    }

    fn dubai() -> FixedOffset {
        FixedOffset::east_opt(4 * 3600).unwrap()
    }

    fn salary_day() -> DateTime<FixedOffset> {
        dubai().with_ymd_and_hms(2024, 3, 25, 10, 0, 0).unwrap()
    }

    fn salaried_profile(auto_invest: Option<f64>) -> Profile {
        Profile {
            monthly_income: Some(5000.0),
            monthly_income_day: Some(25),
            emergency_fund_amount: 1000.0,
            emergency_fund_auto_invest: auto_invest,
            ..Profile::new(USER)
        }
    }

    #[test]
    fn test_check_rules_in_order() {
        let today = salary_day();

        let no_income = Profile::new(USER);
        assert_eq!(check_salary_day(&no_income, &[], &today).reason, SalaryDayReason::NoMonthlyIncome);

        let no_day = Profile {
            monthly_income: Some(5000.0),
            ..Profile::new(USER)
        };
        assert_eq!(check_salary_day(&no_day, &[], &today).reason, SalaryDayReason::NoIncomeDay);

        let other_day = dubai().with_ymd_and_hms(2024, 3, 24, 10, 0, 0).unwrap();
        let profile = salaried_profile(None);
        assert_eq!(check_salary_day(&profile, &[], &other_day).reason, SalaryDayReason::NotSalaryDay);

        let check = check_salary_day(&profile, &[], &today);
        assert!(check.should_show);
        assert_eq!(check.amount, Some(5000.0));
    }

    #[test]
    fn test_already_posted_uses_local_date() {
        // 21:30 UTC on the 24th is 01:30 on the 25th in UTC+4
        let posted = Transaction {
            id: "s".to_string(),
            title: SALARY_TITLE.to_string(),
            amount: 5000.0,
            category: Category::Salary,
            transaction_type: TransactionType::Income,
            transaction_date: Utc.with_ymd_and_hms(2024, 3, 24, 21, 30, 0).unwrap(),
            notes: None,
            receipt_ref: None,
        };
        let check = check_salary_day(&salaried_profile(None), &[posted], &salary_day());
        assert!(!check.should_show);
        assert_eq!(check.reason, SalaryDayReason::AlreadyPosted);
    }

    #[tokio::test]
    async fn test_post_salary_is_idempotent() {
        let env = TestEnvironment::with_profile(salaried_profile(None)).await;
        let service = SalaryService::new(env.transactions.clone(), env.profiles.clone());

        let report = service.post_salary(&user(), salary_day()).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.status_of(SalaryStep::AutoInvestTransaction), Some(&StepStatus::Skipped));

        let check = service.evaluate(&user(), salary_day()).await.unwrap();
        assert!(!check.should_show);

        assert!(matches!(
            service.post_salary(&user(), salary_day()).await,
            Err(SalaryError::AlreadyPosted)
        ));
        assert_eq!(env.transactions.list_transactions(&user()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_post_salary_with_auto_invest() {
        let env = TestEnvironment::with_profile(salaried_profile(Some(500.0))).await;
        let service = SalaryService::new(env.transactions.clone(), env.profiles.clone());

        let report = service.post_salary(&user(), salary_day()).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.emergency_fund_amount, Some(1500.0));
        assert!(report
            .messages()
            .contains(&"Emergency fund increased by AED 500.00".to_string()));

        let transactions = env.transactions.list_transactions(&user()).await.unwrap();
        assert_eq!(transactions.len(), 2);
        assert!(transactions.iter().any(|tx| tx.title == AUTO_INVEST_TITLE
            && tx.transaction_type == TransactionType::Expense));
        let stored = env.profiles.get_profile(&user()).await.unwrap().unwrap();
        assert_eq!(stored.emergency_fund_amount, 1500.0);
    }

    #[tokio::test]
    async fn test_fund_update_failure_keeps_salary() {
        let env = TestEnvironment::with_profile(salaried_profile(Some(500.0))).await;
        let profiles = Arc::new(FaultyFundWrites::failing(env.profiles.clone()));
        let service = SalaryService::new(env.transactions.clone(), profiles);

        let report = service.post_salary(&user(), salary_day()).await.unwrap();
        assert!(report.is_committed_but_incomplete());
        assert_eq!(report.failed_steps(), vec![SalaryStep::EmergencyFundUpdate]);
        assert_eq!(env.transactions.list_transactions(&user()).await.unwrap().len(), 2);

        let stored = env.profiles.get_profile(&user()).await.unwrap().unwrap();
        assert_eq!(stored.emergency_fund_amount, 1000.0);
    }

    #[tokio::test]
    async fn test_fund_conflict_keeps_salary_and_transfer() {
        let env = TestEnvironment::with_profile(salaried_profile(Some(500.0))).await;
        let profiles = Arc::new(FaultyFundWrites::conflicting(env.profiles.clone()));
        let service = SalaryService::new(env.transactions.clone(), profiles);

        let report = service.post_salary(&user(), salary_day()).await.unwrap();
        assert!(report.is_committed_but_incomplete());
        assert_eq!(report.status_of(SalaryStep::SalaryTransaction), Some(&StepStatus::Completed));
        assert_eq!(report.status_of(SalaryStep::AutoInvestTransaction), Some(&StepStatus::Completed));
        assert!(matches!(
            report.status_of(SalaryStep::EmergencyFundUpdate),
            Some(StepStatus::Failed { message }) if message.contains("concurrently")
        ));
        assert_eq!(report.emergency_fund_amount, None);
        assert_eq!(env.transactions.list_transactions(&user()).await.unwrap().len(), 2);

        let stored = env.profiles.get_profile(&user()).await.unwrap().unwrap();
        assert_eq!(stored.emergency_fund_amount, 1000.0);
    }

    #[tokio::test]
    async fn test_transfer_failure_skips_fund_update() {
        let env = TestEnvironment::with_profile(salaried_profile(Some(500.0))).await;
        let transactions = Arc::new(FailingInserts::new(env.transactions.clone(), AUTO_INVEST_TITLE));
        let service = SalaryService::new(transactions, env.profiles.clone());

        let report = service.post_salary(&user(), salary_day()).await.unwrap();
        assert!(report.is_committed_but_incomplete());
        assert_eq!(report.status_of(SalaryStep::EmergencyFundUpdate), Some(&StepStatus::Skipped));
        assert!(report
            .messages()
            .contains(&"Salary added, but emergency fund transfer failed".to_string()));
    }

    #[tokio::test]
    async fn test_salary_insert_failure_aborts() {
        let env = TestEnvironment::with_profile(salaried_profile(Some(500.0))).await;
        let transactions = Arc::new(FailingInserts::new(env.transactions.clone(), SALARY_TITLE));
        let service = SalaryService::new(transactions, env.profiles.clone());

        assert!(matches!(
            service.post_salary(&user(), salary_day()).await,
            Err(SalaryError::WriteFailure(_))
        ));
        assert!(env.transactions.list_transactions(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_salary_day_refused() {
        let env = TestEnvironment::with_profile(salaried_profile(None)).await;
        let service = SalaryService::new(env.transactions.clone(), env.profiles.clone());
        let other_day = dubai().with_ymd_and_hms(2024, 3, 20, 10, 0, 0).unwrap();

        assert!(matches!(
            service.post_salary(&user(), other_day).await,
            Err(SalaryError::NotSalaryDay)
        ));
    }
}
