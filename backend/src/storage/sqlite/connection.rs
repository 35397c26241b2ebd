use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;

/// DbConnection owns the SQLite pool shared by every repository
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url` and set up the schema
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database {}", url);
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Fresh in-memory database, unique per call
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                type TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                notes TEXT,
                receipt_ref TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_user_date
            ON transactions(user_id, transaction_date DESC);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS budgets (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                amount REAL NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_budgets_user_id
            ON budgets(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                display_name TEXT,
                monthly_income REAL,
                monthly_income_day INTEGER,
                monthly_saving_goal REAL,
                emergency_fund_amount REAL NOT NULL DEFAULT 0,
                emergency_fund_auto_invest REAL,
                notify_salary INTEGER NOT NULL DEFAULT 0,
                notify_budget INTEGER NOT NULL DEFAULT 0,
                notify_report INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 0,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
