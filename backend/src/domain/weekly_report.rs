//! Weekly spending report.
//!
//! The report covers `[start_of_day(now - 7d), now]` and compares it with the
//! preceding window `[start_of_day(now - 14d), end_of_day(now - 7d)]`. Both
//! windows are evaluated in the timezone of `now`.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use shared::{
    Category, CategoryBreakdown, DailySpending, Transaction, TransactionType, WeeklyStats,
};
use std::collections::BTreeMap;

use super::aggregator::finite;

const REPORT_DAYS: i64 = 7;

fn at_time<Tz: TimeZone>(dt: &DateTime<Tz>, time: NaiveTime) -> DateTime<Tz> {
    let naive = dt.date_naive().and_time(time);
    dt.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| dt.clone())
}

pub fn start_of_day<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<Tz> {
    at_time(dt, NaiveTime::MIN)
}

pub fn end_of_day<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<Tz> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    at_time(dt, last)
}

fn in_window<Tz: TimeZone>(tx: &Transaction, start: &DateTime<Tz>, end: &DateTime<Tz>) -> bool {
    let date = tx.transaction_date.with_timezone(&start.timezone());
    &date >= start && &date <= end
}

fn expense_total<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> f64 {
    transactions
        .filter(|tx| tx.transaction_type == TransactionType::Expense)
        .map(|tx| finite(tx.amount))
        .sum()
}

fn category_breakdown(expenses: &[&Transaction], total_spending: f64) -> Vec<CategoryBreakdown> {
    let mut by_category: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
    for tx in expenses {
        let entry = by_category.entry(tx.category).or_insert((0.0, 0));
        entry.0 += finite(tx.amount);
        entry.1 += 1;
    }

    let mut breakdown: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, (amount, count))| CategoryBreakdown {
            category,
            amount,
            percentage: if total_spending > 0.0 {
                amount / total_spending * 100.0
            } else {
                0.0
            },
            transaction_count: count,
            icon: category.icon().to_string(),
            color: category.color().to_string(),
        })
        .collect();

    breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    breakdown
}

fn daily_breakdown<Tz: TimeZone>(expenses: &[&Transaction], now: &DateTime<Tz>) -> Vec<DailySpending> {
    let tz = now.timezone();
    (0..REPORT_DAYS)
        .rev()
        .map(|days_ago| {
            let date: NaiveDate = (now.clone() - Duration::days(days_ago)).date_naive();
            let on_day: Vec<_> = expenses
                .iter()
                .filter(|tx| tx.transaction_date.with_timezone(&tz).date_naive() == date)
                .collect();
            DailySpending {
                date,
                day_name: date.format("%a").to_string(),
                amount: on_day.iter().map(|tx| finite(tx.amount)).sum(),
                transaction_count: on_day.len(),
            }
        })
        .collect()
}

/// Spending analytics for the week ending at `now`
pub fn compute_weekly_stats<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> WeeklyStats {
    let week_ago = now.clone() - Duration::days(REPORT_DAYS);
    let current_start = start_of_day(&week_ago);
    let previous_start = start_of_day(&(now.clone() - Duration::days(2 * REPORT_DAYS)));
    let previous_end = end_of_day(&week_ago);

    let current: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| in_window(tx, &current_start, now))
        .collect();
    let expenses: Vec<&Transaction> = current
        .iter()
        .copied()
        .filter(|tx| tx.transaction_type == TransactionType::Expense)
        .collect();

    let total_spending = expense_total(expenses.iter().copied());
    let total_income: f64 = current
        .iter()
        .filter(|tx| tx.transaction_type == TransactionType::Income)
        .map(|tx| finite(tx.amount))
        .sum();

    let previous_spending = expense_total(
        transactions
            .iter()
            .filter(|tx| in_window(tx, &previous_start, &previous_end)),
    );
    let week_over_week_change = if previous_spending > 0.0 {
        (total_spending - previous_spending) / previous_spending * 100.0
    } else {
        0.0
    };

    let categories = category_breakdown(&expenses, total_spending);

    WeeklyStats {
        total_spending,
        total_income,
        net_cashflow: total_income - total_spending,
        top_category: categories.first().cloned(),
        categories,
        daily_breakdown: daily_breakdown(&expenses, now),
        transaction_count: current.len(),
        average_daily_spending: total_spending / REPORT_DAYS as f64,
        week_over_week_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregator::tests::tx;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 17, 18, 0, 0).unwrap()
    }

    fn days_ago(days: i64, hour: u32) -> DateTime<Utc> {
        (now() - Duration::days(days))
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_week_over_week_is_zero_without_previous_spend() {
        let transactions = vec![
            tx("a", TransactionType::Expense, 70.0, Category::Food, days_ago(1, 12)),
            tx("b", TransactionType::Income, 500.0, Category::Salary, days_ago(2, 9)),
        ];

        let stats = compute_weekly_stats(&transactions, &now());
        assert_eq!(stats.total_spending, 70.0);
        assert_eq!(stats.total_income, 500.0);
        assert_eq!(stats.net_cashflow, 430.0);
        assert_eq!(stats.week_over_week_change, 0.0);
        assert_eq!(stats.average_daily_spending, 10.0);
        assert_eq!(stats.transaction_count, 2);
    }

    #[test]
    fn test_category_and_daily_breakdown() {
        let transactions = vec![
            tx("a", TransactionType::Expense, 30.0, Category::Food, days_ago(0, 8)),
            tx("b", TransactionType::Expense, 60.0, Category::Transport, days_ago(3, 8)),
            tx("c", TransactionType::Expense, 10.0, Category::Food, days_ago(3, 20)),
            // Previous week
            tx("d", TransactionType::Expense, 50.0, Category::Bills, days_ago(10, 8)),
            // Too old for either window
            tx("e", TransactionType::Expense, 999.0, Category::Bills, days_ago(15, 8)),
        ];

        let stats = compute_weekly_stats(&transactions, &now());
        assert_eq!(stats.total_spending, 100.0);
        assert_eq!(stats.week_over_week_change, 100.0);

        assert_eq!(stats.categories.len(), 2);
        assert_eq!(stats.categories[0].category, Category::Transport);
        assert_eq!(stats.categories[0].percentage, 60.0);
        assert_eq!(stats.categories[0].color, "#3B82F6");
        assert_eq!(stats.categories[1].transaction_count, 2);
        assert_eq!(stats.top_category.map(|c| c.category), Some(Category::Transport));

        assert_eq!(stats.daily_breakdown.len(), 7);
        let last = &stats.daily_breakdown[6];
        assert_eq!(last.date, now().date_naive());
        assert_eq!(last.day_name, "Sun");
        assert_eq!(last.amount, 30.0);
        let three_days_ago = &stats.daily_breakdown[3];
        assert_eq!(three_days_ago.amount, 70.0);
        assert_eq!(three_days_ago.transaction_count, 2);
    }

    #[test]
    fn test_empty_week() {
        let stats = compute_weekly_stats(&[], &now());
        assert_eq!(stats.total_spending, 0.0);
        assert!(stats.categories.is_empty());
        assert!(stats.top_category.is_none());
        assert!(stats.daily_breakdown.iter().all(|d| d.amount == 0.0));
    }
}
