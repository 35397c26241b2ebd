use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Category, NewTransaction, Transaction, TransactionType, UserId};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;

use super::connection::DbConnection;
use crate::storage::TransactionStorage;

/// SQLite-backed transaction ledger
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let raw_date: String = row.get("transaction_date");
        let transaction_date = DateTime::parse_from_rfc3339(&raw_date)?.with_timezone(&Utc);

        Ok(Transaction {
            id: row.get("id"),
            title: row.get("title"),
            amount: row.get("amount"),
            category: Category::from(row.get::<String, _>("category")),
            transaction_type: TransactionType::from(row.get::<String, _>("type")),
            transaction_date,
            notes: row.get("notes"),
            receipt_ref: row.get("receipt_ref"),
        })
    }
}

#[async_trait]
impl TransactionStorage for TransactionRepository {
    async fn list_transactions(&self, user: &UserId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, amount, category, type, transaction_date, notes, receipt_ref
            FROM transactions
            WHERE user_id = ?
            ORDER BY transaction_date DESC, ROWID DESC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(self.db.pool())
        .await?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} transactions for user {}", transactions.len(), user);
        Ok(transactions)
    }

    async fn insert_transaction(&self, user: &UserId, transaction: &NewTransaction) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, user_id, title, amount, category, type, transaction_date, notes, receipt_ref)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user.as_str())
        .bind(&transaction.title)
        .bind(transaction.amount)
        .bind(transaction.category.as_str())
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.transaction_date.to_rfc3339())
        .bind(&transaction.notes)
        .bind(&transaction.receipt_ref)
        .execute(self.db.pool())
        .await?;

        debug!("Inserted transaction {} ({}) for user {}", id, transaction.title, user);
        Ok(id)
    }

    async fn delete_transaction(&self, user: &UserId, transaction_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE user_id = ? AND id = ?")
            .bind(user.as_str())
            .bind(transaction_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
