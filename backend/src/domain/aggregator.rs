//! # Ledger Aggregator
//!
//! Pure functions that turn an unordered set of transactions and budgets into
//! derived figures: balances, budget usage, per-category budget statuses and
//! savings progress.
//!
//! Nothing here performs I/O, fails or panics. Transactions whose type is
//! neither income nor expense are excluded from every sum, and non-finite
//! amounts count as zero.
//!
//! Month filtering happens in the calendar of the reference datetime's
//! timezone: a transaction at 23:50 local time on the last day of the month
//! belongs to that month even if UTC has already rolled over. Callers pass
//! the local "now" as the reference.

use chrono::{DateTime, Datelike, TimeZone};
use shared::{
    BalanceAfterBudget, BalanceData, Budget, BudgetStatusLevel, BudgetUsage, Category,
    CategoryBudgetStatus, SavingsProgress, Transaction, TransactionType,
};
use std::collections::BTreeMap;

/// Savings goal used when the profile has none (or a non-positive one)
pub const DEFAULT_SAVINGS_GOAL: f64 = 5000.0;

/// Percent of a category budget at which its status turns to warning
pub const WARNING_THRESHOLD_PERCENT: f64 = 85.0;
/// Percent of a category budget at which its status turns to danger
pub const DANGER_THRESHOLD_PERCENT: f64 = 100.0;

pub(crate) fn finite(amount: f64) -> f64 {
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

pub fn calculate_balance<'a, I>(transactions: I) -> BalanceData
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut income = 0.0;
    let mut expenses = 0.0;

    for tx in transactions {
        match tx.transaction_type {
            TransactionType::Income => income += finite(tx.amount),
            TransactionType::Expense => expenses += finite(tx.amount),
            TransactionType::Unknown => {}
        }
    }

    BalanceData {
        balance: income - expenses,
        income,
        expenses,
    }
}

/// True when the transaction falls in the reference's calendar month,
/// evaluated in the reference's timezone.
pub fn is_in_month<Tz: TimeZone>(tx: &Transaction, reference: &DateTime<Tz>) -> bool {
    let local = tx.transaction_date.with_timezone(&reference.timezone());
    local.year() == reference.year() && local.month() == reference.month()
}

pub fn month_transactions<'a, Tz: TimeZone>(
    transactions: &'a [Transaction],
    reference: &DateTime<Tz>,
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|tx| is_in_month(tx, reference))
        .collect()
}

pub fn calculate_month_balance<Tz: TimeZone>(
    transactions: &[Transaction],
    reference: &DateTime<Tz>,
) -> BalanceData {
    calculate_balance(month_transactions(transactions, reference))
}

/// Sum of every budget allocation; several rows for one category all count
pub fn total_budgets(budgets: &[Budget]) -> f64 {
    budgets.iter().map(|budget| finite(budget.amount)).sum()
}

fn after_budget(balance: BalanceData, budgets: &[Budget]) -> BalanceAfterBudget {
    let total = total_budgets(budgets);
    BalanceAfterBudget {
        balance_after_budget: balance.balance - total,
        total_income: balance.income,
        total_expense: balance.expenses,
        total_budgets: total,
    }
}

/// All-time balance minus every budget allocation. May be negative.
pub fn calculate_balance_after_budget(
    transactions: &[Transaction],
    budgets: &[Budget],
) -> BalanceAfterBudget {
    after_budget(calculate_balance(transactions), budgets)
}

pub fn calculate_month_balance_after_budget<Tz: TimeZone>(
    transactions: &[Transaction],
    budgets: &[Budget],
    reference: &DateTime<Tz>,
) -> BalanceAfterBudget {
    after_budget(calculate_month_balance(transactions, reference), budgets)
}

fn status_level(percent_used: f64) -> BudgetStatusLevel {
    if percent_used >= DANGER_THRESHOLD_PERCENT {
        BudgetStatusLevel::Danger
    } else if percent_used >= WARNING_THRESHOLD_PERCENT {
        BudgetStatusLevel::Warning
    } else {
        BudgetStatusLevel::Safe
    }
}

/// Per-category status of this month's spending against the allocations,
/// most used first.
pub fn compute_budget_statuses<Tz: TimeZone>(
    budgets: &[Budget],
    transactions: &[Transaction],
    reference: &DateTime<Tz>,
) -> Vec<CategoryBudgetStatus> {
    let mut allocated: BTreeMap<Category, f64> = BTreeMap::new();
    for budget in budgets {
        *allocated.entry(budget.category).or_insert(0.0) += finite(budget.amount);
    }

    let mut spent: BTreeMap<Category, f64> = BTreeMap::new();
    for tx in month_transactions(transactions, reference) {
        if tx.transaction_type == TransactionType::Expense {
            *spent.entry(tx.category).or_insert(0.0) += finite(tx.amount);
        }
    }

    let mut statuses: Vec<CategoryBudgetStatus> = allocated
        .into_iter()
        .map(|(category, budget_amount)| {
            let spent = spent.get(&category).copied().unwrap_or(0.0);
            let percent_used = if budget_amount > 0.0 {
                spent / budget_amount * 100.0
            } else {
                0.0
            };
            CategoryBudgetStatus {
                category,
                budget_amount,
                spent,
                percent_used,
                remaining: (budget_amount - spent).max(0.0),
                status: status_level(percent_used),
                icon: category.icon().to_string(),
            }
        })
        .collect();

    statuses.sort_by(|a, b| b.percent_used.total_cmp(&a.percent_used));
    statuses
}

/// Overall budget usage for the reference month.
///
/// `spent` is every expense of the month, whether or not its category has an
/// allocation. The percentage is clamped to `[0, 100]` and is `0` when no
/// budget is allocated.
pub fn compute_budget_usage<Tz: TimeZone>(
    budgets: &[Budget],
    transactions: &[Transaction],
    reference: &DateTime<Tz>,
) -> BudgetUsage {
    let total_budget = total_budgets(budgets);
    let spent = calculate_month_balance(transactions, reference).expenses;

    let percent_used = if total_budget > 0.0 {
        (spent / total_budget * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    BudgetUsage {
        percent_used,
        total_budget,
        spent,
        categories: compute_budget_statuses(budgets, transactions, reference),
    }
}

/// Resolve the goal used for savings progress
pub fn effective_savings_goal(goal: Option<f64>) -> f64 {
    match goal {
        Some(goal) if goal.is_finite() && goal > 0.0 => goal,
        _ => DEFAULT_SAVINGS_GOAL,
    }
}

/// Progress of this month's balance after budget towards the saving goal
pub fn compute_savings_progress<Tz: TimeZone>(
    transactions: &[Transaction],
    budgets: &[Budget],
    goal: Option<f64>,
    reference: &DateTime<Tz>,
) -> SavingsProgress {
    let goal = effective_savings_goal(goal);
    let current_savings =
        calculate_month_balance_after_budget(transactions, budgets, reference).balance_after_budget;

    SavingsProgress {
        current_savings,
        progress_percent: (current_savings / goal * 100.0).clamp(0.0, 100.0),
    }
}

/// Newest `limit` transactions
pub fn recent_transactions(transactions: &[Transaction], limit: usize) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
    sorted.truncate(limit);
    sorted
}
