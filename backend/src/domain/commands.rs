//! Domain-level command and result types.
//!
//! Services consume and return these; the REST layer maps the public DTOs from
//! the `shared` crate onto them.

pub mod emergency_fund {
    use shared::UserId;

    #[derive(Debug, Clone)]
    pub struct FundMovementCommand {
        pub user: UserId,
        pub amount: f64,
    }

    #[derive(Debug, Clone)]
    pub struct SetAutoInvestCommand {
        pub user: UserId,
        /// `None` turns auto-invest off; any other amount must be positive
        pub amount: Option<f64>,
    }

    /// Result of a deposit or withdrawal.
    ///
    /// The fund amount is authoritative; `mirror_transaction_id` is `None` when
    /// the best-effort ledger entry could not be written, in which case
    /// `warnings` says so.
    #[derive(Debug, Clone)]
    pub struct FundMovementResult {
        pub emergency_fund_amount: f64,
        pub mirror_transaction_id: Option<String>,
        pub success_message: String,
        pub warnings: Vec<String>,
    }

    #[derive(Debug, Clone)]
    pub struct AutoInvestResult {
        pub emergency_fund_auto_invest: Option<f64>,
        pub success_message: String,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct AvailableFunds {
        pub emergency_fund_amount: f64,
        pub available_to_deposit: f64,
        pub available_to_withdraw: f64,
    }
}

pub mod reminders {
    use shared::{Category, UserId};

    #[derive(Debug, Clone)]
    pub struct SalaryReminderCommand {
        pub user: UserId,
        pub day_of_month: u32,
        pub amount: Option<f64>,
    }

    #[derive(Debug, Clone)]
    pub struct BudgetExceededCommand {
        pub user: UserId,
        pub category: Category,
        pub budget_amount: f64,
        pub spent: f64,
    }

    #[derive(Debug, Clone)]
    pub struct BudgetThresholdCommand {
        pub user: UserId,
        pub category: Category,
        pub threshold_percent: u32,
    }

    #[derive(Debug, Clone)]
    pub struct SavingsCheckInCommand {
        pub user: UserId,
        pub day_of_month: u32,
        pub goal: Option<f64>,
    }
}
