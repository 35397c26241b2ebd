use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Budget, Category, NewBudget, UserId};
use sqlx::Row;

use super::connection::DbConnection;
use crate::storage::BudgetStorage;

#[derive(Clone)]
pub struct BudgetRepository {
    db: DbConnection,
}

impl BudgetRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BudgetStorage for BudgetRepository {
    async fn list_budgets(&self, user: &UserId) -> Result<Vec<Budget>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category, amount, created_at
            FROM budgets
            WHERE user_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(self.db.pool())
        .await?;

        let mut budgets = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_created: String = row.get("created_at");
            budgets.push(Budget {
                id: row.get("id"),
                category: Category::from(row.get::<String, _>("category")),
                amount: row.get("amount"),
                created_at: DateTime::parse_from_rfc3339(&raw_created)?.with_timezone(&Utc),
            });
        }
        Ok(budgets)
    }

    async fn insert_budget(&self, user: &UserId, budget: &NewBudget) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO budgets (id, user_id, category, amount, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user.as_str())
        .bind(budget.category.as_str())
        .bind(budget.amount)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        Ok(id)
    }

    async fn delete_budget(&self, user: &UserId, budget_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE user_id = ? AND id = ?")
            .bind(user.as_str())
            .bind(budget_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
