//! # Pocket Pilot Backend
//!
//! Ledger aggregation, emergency fund transfers, salary-day automation and
//! periodic reminders, served over a JSON REST API.

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod delivery;
pub mod domain;
pub mod io;
pub mod storage;

#[cfg(test)]
mod test_utils;

use config::Settings;
use delivery::{LogDelivery, StaticPermission};
use domain::{EmergencyFundService, NotificationScheduler, ReminderService, SalaryService};
use storage::{
    BudgetRepository, BudgetStorage, DbConnection, NotificationRecordRepository, ProfileRepository,
    ProfileStorage, TransactionRepository, TransactionStorage,
};

/// Source of the local "now" handlers compute against
pub type Clock = Arc<dyn Fn() -> DateTime<FixedOffset> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<dyn TransactionStorage>,
    pub budgets: Arc<dyn BudgetStorage>,
    pub profiles: Arc<dyn ProfileStorage>,
    pub emergency_fund_service: EmergencyFundService,
    pub salary_service: SalaryService,
    pub reminder_service: ReminderService,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        transactions: Arc<dyn TransactionStorage>,
        budgets: Arc<dyn BudgetStorage>,
        profiles: Arc<dyn ProfileStorage>,
        scheduler: NotificationScheduler,
        weekly_report_weekday: u8,
    ) -> Self {
        let emergency_fund_service =
            EmergencyFundService::new(transactions.clone(), budgets.clone(), profiles.clone());
        let salary_service = SalaryService::new(transactions.clone(), profiles.clone());
        let reminder_service = ReminderService::new(
            scheduler,
            profiles.clone(),
            transactions.clone(),
            budgets.clone(),
            weekly_report_weekday,
        );

        Self {
            transactions,
            budgets,
            profiles,
            emergency_fund_service,
            salary_service,
            reminder_service,
            clock: Arc::new(io::rest::local_now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        (self.clock)()
    }
}

/// Open storage and build every service from the loaded settings
pub async fn initialize_backend(settings: &Settings) -> Result<AppState> {
    let data_directory = &settings.storage.data_directory;
    std::fs::create_dir_all(data_directory)
        .with_context(|| format!("Failed to create data directory {}", data_directory.display()))?;
    info!("Using data directory {}", data_directory.display());

    let database_url = settings.storage.database_url();
    let db = DbConnection::new(&database_url)
        .await
        .with_context(|| format!("Failed to open database {}", database_url))?;
    let records = NotificationRecordRepository::new(data_directory)?;
    debug!("Scheduled reminders stored at {}", records.path().display());

    let scheduler = NotificationScheduler::new(
        Arc::new(LogDelivery::new()),
        Arc::new(StaticPermission(true)),
        Arc::new(records),
        settings.notifications.reminder_hour,
    );

    Ok(AppState::new(
        Arc::new(TransactionRepository::new(db.clone())),
        Arc::new(BudgetRepository::new(db.clone())),
        Arc::new(ProfileRepository::new(db)),
        scheduler,
        settings.notifications.weekly_report_weekday,
    ))
}

pub fn create_router(app_state: AppState, allowed_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);
    let cors = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("Invalid allowed origin '{}', allowing any origin", allowed_origin);
            cors.allow_origin(Any)
        }
    };

    let api_routes = Router::new()
        .merge(io::rest::balance_apis::router())
        .merge(io::rest::transaction_apis::router())
        .merge(io::rest::budget_apis::router())
        .merge(io::rest::emergency_fund_apis::router())
        .merge(io::rest::salary_apis::router())
        .merge(io::rest::notification_apis::router())
        .merge(io::rest::profile_apis::router());

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}

/// Periodically fire monthly and weekly reminders that fall due
pub fn spawn_due_check(reminder_service: ReminderService, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match reminder_service.scheduler().run_due(io::rest::local_now()).await {
                Ok(fired) if !fired.is_empty() => info!("Fired due reminders: {:?}", fired),
                Ok(_) => debug!("No reminders due"),
                Err(e) => error!("Due reminder check failed: {}", e),
            }
        }
    })
}
