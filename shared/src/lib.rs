use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user that owns a ledger.
///
/// Every store call takes one explicitly; nothing reads the current user from
/// ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Direction of a transaction.
///
/// Parsed case-insensitively. Anything that is neither income nor expense is
/// kept as `Unknown` and excluded from every sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Unknown,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Unknown => "unknown",
        }
    }
}

impl From<&str> for TransactionType {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "income" => TransactionType::Income,
            "expense" => TransactionType::Expense,
            _ => TransactionType::Unknown,
        }
    }
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        TransactionType::from(value.as_str())
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.as_str().to_string()
    }
}

/// Spending / income category.
///
/// Closed set: strings that do not name a known category parse to `Other`, so
/// icon and colour lookups are exhaustive matches rather than map lookups with
/// a runtime fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Transport,
    Entertainment,
    Groceries,
    Food,
    Shopping,
    Bills,
    Health,
    Education,
    Stock,
    Salary,
    EmergencyFund,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Transport,
        Category::Entertainment,
        Category::Groceries,
        Category::Food,
        Category::Shopping,
        Category::Bills,
        Category::Health,
        Category::Education,
        Category::Stock,
        Category::Salary,
        Category::EmergencyFund,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Transport => "transport",
            Category::Entertainment => "entertainment",
            Category::Groceries => "groceries",
            Category::Food => "food",
            Category::Shopping => "shopping",
            Category::Bills => "bills",
            Category::Health => "health",
            Category::Education => "education",
            Category::Stock => "stock",
            Category::Salary => "salary",
            Category::EmergencyFund => "emergency_fund",
            Category::Other => "other",
        }
    }

    /// Human readable label used in notification bodies
    pub fn label(&self) -> &'static str {
        match self {
            Category::Transport => "Transport",
            Category::Entertainment => "Entertainment",
            Category::Groceries => "Groceries",
            Category::Food => "Food",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Stock => "Stock",
            Category::Salary => "Salary",
            Category::EmergencyFund => "Emergency Fund",
            Category::Other => "Other",
        }
    }

    /// Feather icon name for the category
    pub fn icon(&self) -> &'static str {
        match self {
            Category::Transport => "truck",
            Category::Entertainment => "film",
            Category::Groceries => "shopping-cart",
            Category::Food => "coffee",
            Category::Shopping => "shopping-bag",
            Category::Bills => "file-text",
            Category::Health => "heart",
            Category::Education => "book",
            Category::Stock => "trending-up",
            Category::Salary => "dollar-sign",
            Category::EmergencyFund => "shield",
            Category::Other => "tag",
        }
    }

    /// Chart colour for the category (hex)
    pub fn color(&self) -> &'static str {
        match self {
            Category::Transport => "#3B82F6",
            Category::Entertainment => "#EC4899",
            Category::Groceries => "#10B981",
            Category::Food => "#F59E0B",
            Category::Shopping => "#8B5CF6",
            Category::Bills => "#EF4444",
            Category::Health => "#06B6D4",
            Category::Education => "#6366F1",
            Category::Stock => "#14B8A6",
            Category::Salary => "#22C55E",
            Category::EmergencyFund => "#0EA5E9",
            Category::Other => "#6B7280",
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .unwrap_or(Category::Other)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::from(value.as_str())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ledger entry. Immutable once created except for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub title: String,
    /// Always positive; direction comes from `transaction_type`
    pub amount: f64,
    pub category: Category,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub receipt_ref: Option<String>,
}

/// Input for inserting a transaction; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub title: String,
    pub amount: f64,
    pub category: Category,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub receipt_ref: Option<String>,
}

impl NewTransaction {
    pub fn income(title: &str, amount: f64, category: Category, date: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            amount,
            category,
            transaction_type: TransactionType::Income,
            transaction_date: date,
            notes: None,
            receipt_ref: None,
        }
    }

    pub fn expense(title: &str, amount: f64, category: Category, date: DateTime<Utc>) -> Self {
        Self {
            transaction_type: TransactionType::Expense,
            ..Self::income(title, amount, category, date)
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn into_transaction(self, id: String) -> Transaction {
        Transaction {
            id,
            title: self.title,
            amount: self.amount,
            category: self.category,
            transaction_type: self.transaction_type,
            transaction_date: self.transaction_date,
            notes: self.notes,
            receipt_ref: self.receipt_ref,
        }
    }
}

/// Monthly spending allocation for a category.
///
/// Several rows may exist for the same category; they are always summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub category: Category,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: Category,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub salary: bool,
    pub budget: bool,
    pub report: bool,
}

/// Per-user settings and emergency fund state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    pub monthly_income: Option<f64>,
    /// Day of month (1..=31) on which salary is expected
    pub monthly_income_day: Option<u32>,
    pub monthly_saving_goal: Option<f64>,
    pub emergency_fund_amount: f64,
    pub emergency_fund_auto_invest: Option<f64>,
    pub notification_preferences: NotificationPreferences,
    /// Optimistic concurrency token, bumped on every fund amount write
    pub version: i64,
}

impl Profile {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            monthly_income: None,
            monthly_income_day: None,
            monthly_saving_goal: None,
            emergency_fund_amount: 0.0,
            emergency_fund_auto_invest: None,
            notification_preferences: NotificationPreferences::default(),
            version: 0,
        }
    }

    /// Positive auto-invest amount, if one is configured
    pub fn auto_invest_amount(&self) -> Option<f64> {
        self.emergency_fund_auto_invest
            .filter(|amount| amount.is_finite() && *amount > 0.0)
    }
}

/// Partial profile update. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "present")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub monthly_income: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub monthly_income_day: Option<Option<u32>>,
    #[serde(default, deserialize_with = "present")]
    pub monthly_saving_goal: Option<Option<f64>>,
    #[serde(default)]
    pub notification_preferences: Option<NotificationPreferences>,
}

impl ProfileUpdate {
    /// Whether the update changes anything scheduled reminders depend on
    pub fn affects_reminders(&self) -> bool {
        self.notification_preferences.is_some()
            || self.monthly_income_day.is_some()
            || self.monthly_income.is_some()
    }
}

// A field that is present in the payload, so an explicit `null` becomes `Some(None)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Outcome of a compare-and-swap on the emergency fund amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FundUpdate {
    Applied { new_version: i64 },
    Conflict { current_version: i64 },
}

/// How often a scheduled reminder recurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    Monthly { day_of_month: u32 },
    /// `weekday` is 0 = Sunday .. 6 = Saturday
    Weekly { weekday: u8, hour: u32 },
}

impl Recurrence {
    pub fn day_of_month(&self) -> Option<u32> {
        match self {
            Recurrence::Monthly { day_of_month } => Some(*day_of_month),
            Recurrence::Weekly { .. } => None,
        }
    }
}

/// Local bookkeeping entry for one active recurring reminder.
/// At most one record exists per `notification_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotificationRecord {
    /// Delivery id returned by the notification primitive
    pub id: String,
    pub notification_type: String,
    pub recurrence: Recurrence,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_fired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceData {
    pub balance: f64,
    pub income: f64,
    pub expenses: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceAfterBudget {
    /// May be negative when budgets are over-allocated
    pub balance_after_budget: f64,
    pub total_income: f64,
    pub total_expense: f64,
    pub total_budgets: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatusLevel {
    Safe,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudgetStatus {
    pub category: Category,
    pub budget_amount: f64,
    pub spent: f64,
    pub percent_used: f64,
    pub remaining: f64,
    pub status: BudgetStatusLevel,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub percent_used: f64,
    pub total_budget: f64,
    pub spent: f64,
    pub categories: Vec<CategoryBudgetStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsProgress {
    pub current_savings: f64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub amount: f64,
    pub percentage: f64,
    pub transaction_count: usize,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpending {
    pub date: NaiveDate,
    pub day_name: String,
    pub amount: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub total_spending: f64,
    pub total_income: f64,
    pub net_cashflow: f64,
    pub categories: Vec<CategoryBreakdown>,
    pub daily_breakdown: Vec<DailySpending>,
    pub top_category: Option<CategoryBreakdown>,
    pub transaction_count: usize,
    pub average_daily_spending: f64,
    pub week_over_week_change: f64,
}

/// Why the salary card is hidden (or that it is shown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryDayReason {
    NoMonthlyIncome,
    NoIncomeDay,
    NotSalaryDay,
    AlreadyPosted,
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryDayCheck {
    pub should_show: bool,
    pub amount: Option<f64>,
    pub reason: SalaryDayReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryStep {
    SalaryTransaction,
    AutoInvestTransaction,
    EmergencyFundUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed { message: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryStepRecord {
    pub step: SalaryStep,
    pub status: StepStatus,
}

/// Per-step record of one salary posting.
///
/// The salary transaction is the commit point: once it is `Completed` the
/// posting stands even if the auto-invest cascade fails afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPostingReport {
    pub salary_amount: f64,
    pub salary_transaction_id: Option<String>,
    pub auto_invest_amount: Option<f64>,
    pub emergency_fund_amount: Option<f64>,
    pub steps: Vec<SalaryStepRecord>,
}

impl SalaryPostingReport {
    pub fn new(salary_amount: f64, auto_invest_amount: Option<f64>) -> Self {
        Self {
            salary_amount,
            salary_transaction_id: None,
            auto_invest_amount,
            emergency_fund_amount: None,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, step: SalaryStep, status: StepStatus) {
        self.steps.push(SalaryStepRecord { step, status });
    }

    pub fn status_of(&self, step: SalaryStep) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.status)
    }

    pub fn is_committed(&self) -> bool {
        matches!(
            self.status_of(SalaryStep::SalaryTransaction),
            Some(StepStatus::Completed)
        )
    }

    pub fn is_complete(&self) -> bool {
        self.is_committed()
            && self
                .steps
                .iter()
                .all(|record| !matches!(record.status, StepStatus::Failed { .. }))
    }

    /// Salary recorded but some cascade step failed
    pub fn is_committed_but_incomplete(&self) -> bool {
        self.is_committed() && !self.is_complete()
    }

    pub fn failed_steps(&self) -> Vec<SalaryStep> {
        self.steps
            .iter()
            .filter(|record| matches!(record.status, StepStatus::Failed { .. }))
            .map(|record| record.step)
            .collect()
    }

    /// User-facing messages: a confirmation for the salary plus one
    /// message per cascade step outcome.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if self.is_committed() {
            messages.push("Salary added successfully!".to_string());
        }
        for record in &self.steps {
            match (&record.step, &record.status) {
                (SalaryStep::AutoInvestTransaction, StepStatus::Failed { .. }) => {
                    messages.push("Salary added, but emergency fund transfer failed".to_string())
                }
                (SalaryStep::EmergencyFundUpdate, StepStatus::Failed { .. }) => messages
                    .push("Salary added, but emergency fund amount not updated".to_string()),
                (SalaryStep::EmergencyFundUpdate, StepStatus::Completed) => {
                    if let Some(amount) = self.auto_invest_amount {
                        messages.push(format!("Emergency fund increased by AED {:.2}", amount));
                    }
                }
                _ => {}
            }
        }
        messages
    }
}

/// Result of a scheduling call, so callers can tell a scheduled reminder from
/// one skipped by preference or one that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Scheduled {
        notification_id: String,
        next_occurrence: Option<NaiveDate>,
        fired_immediately: bool,
        message: String,
    },
    Sent {
        message: String,
    },
    Skipped {
        reason: String,
    },
    Failed {
        message: String,
    },
}

impl ScheduleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScheduleOutcome::Scheduled { .. } | ScheduleOutcome::Sent { .. })
    }
}

// ---------------------------------------------------------------------------
// REST request / response types
// ---------------------------------------------------------------------------

/// Ledger entry as submitted by a client. A missing date means "now".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub title: String,
    pub amount: f64,
    pub category: Category,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRequest {
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundResponse {
    pub emergency_fund_amount: f64,
    pub transaction_recorded: bool,
    pub success_message: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoInvestRequest {
    /// `None` turns auto-invest off
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoInvestResponse {
    pub emergency_fund_auto_invest: Option<f64>,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFundsResponse {
    pub emergency_fund_amount: f64,
    pub available_to_deposit: f64,
    pub available_to_withdraw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPostResponse {
    pub report: SalaryPostingReport,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryReminderRequest {
    pub day_of_month: u32,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetExceededRequest {
    pub category: Category,
    pub budget_amount: f64,
    pub spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelNotificationResponse {
    pub notification_type: String,
    pub cancelled: usize,
}

/// Saved profile plus what happened to the reminders it drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<ScheduleOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotificationsResponse {
    pub notifications: Vec<ScheduledNotificationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
