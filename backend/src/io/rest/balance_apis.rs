//! # REST API for Balances and Reports
//!
//! Read-only views computed by the aggregator from the user's ledger.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use shared::{Budget, Transaction, UserId};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::domain::{aggregator, weekly_report};
use crate::storage::{BudgetStorage, ProfileStorage, TransactionStorage};
use crate::AppState;

const DEFAULT_RECENT_LIMIT: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/balance/month", get(get_month_balance))
        .route("/balance/after-budget", get(get_balance_after_budget))
        .route("/balance/month/after-budget", get(get_month_balance_after_budget))
        .route("/budgets/usage", get(get_budget_usage))
        .route("/budgets/status", get(get_budget_statuses))
        .route("/savings/progress", get(get_savings_progress))
        .route("/reports/weekly", get(get_weekly_report))
        .route("/transactions/recent", get(get_recent_transactions))
}

async fn load_transactions(state: &AppState, user: &UserId) -> Result<Vec<Transaction>, Response> {
    state.transactions.list_transactions(user).await.map_err(|e| {
        error!("Failed to load transactions for user {}: {}", user, e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving transactions")
    })
}

async fn load_ledger(state: &AppState, user: &UserId) -> Result<(Vec<Transaction>, Vec<Budget>), Response> {
    let transactions = load_transactions(state, user).await?;
    let budgets = state.budgets.list_budgets(user).await.map_err(|e| {
        error!("Failed to load budgets for user {}: {}", user, e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving budgets")
    })?;
    Ok((transactions, budgets))
}

pub async fn get_balance(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/balance for user {}", user);
    match load_transactions(&state, &user).await {
        Ok(transactions) => Json(aggregator::calculate_balance(&transactions)).into_response(),
        Err(response) => response,
    }
}

pub async fn get_month_balance(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/balance/month for user {}", user);
    match load_transactions(&state, &user).await {
        Ok(transactions) => {
            Json(aggregator::calculate_month_balance(&transactions, &state.now())).into_response()
        }
        Err(response) => response,
    }
}

pub async fn get_balance_after_budget(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/balance/after-budget for user {}", user);
    match load_ledger(&state, &user).await {
        Ok((transactions, budgets)) => {
            Json(aggregator::calculate_balance_after_budget(&transactions, &budgets)).into_response()
        }
        Err(response) => response,
    }
}

pub async fn get_month_balance_after_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    info!("GET /api/balance/month/after-budget for user {}", user);
    match load_ledger(&state, &user).await {
        Ok((transactions, budgets)) => Json(aggregator::calculate_month_balance_after_budget(
            &transactions,
            &budgets,
            &state.now(),
        ))
        .into_response(),
        Err(response) => response,
    }
}

pub async fn get_budget_usage(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/budgets/usage for user {}", user);
    match load_ledger(&state, &user).await {
        Ok((transactions, budgets)) => {
            Json(aggregator::compute_budget_usage(&budgets, &transactions, &state.now())).into_response()
        }
        Err(response) => response,
    }
}

pub async fn get_budget_statuses(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/budgets/status for user {}", user);
    match load_ledger(&state, &user).await {
        Ok((transactions, budgets)) => {
            Json(aggregator::compute_budget_statuses(&budgets, &transactions, &state.now())).into_response()
        }
        Err(response) => response,
    }
}

pub async fn get_savings_progress(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/savings/progress for user {}", user);
    let (transactions, budgets) = match load_ledger(&state, &user).await {
        Ok(ledger) => ledger,
        Err(response) => return response,
    };
    let goal = match state.profiles.get_profile(&user).await {
        Ok(profile) => profile.and_then(|p| p.monthly_saving_goal),
        Err(e) => {
            error!("Failed to load profile for user {}: {}", user, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving profile");
        }
    };

    Json(aggregator::compute_savings_progress(&transactions, &budgets, goal, &state.now())).into_response()
}

pub async fn get_weekly_report(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/reports/weekly for user {}", user);
    match load_transactions(&state, &user).await {
        Ok(transactions) => Json(weekly_report::compute_weekly_stats(&transactions, &state.now())).into_response(),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn get_recent_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RecentQuery>,
) -> Response {
    info!("GET /api/transactions/recent for user {}", user);
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match load_transactions(&state, &user).await {
        Ok(transactions) => Json(aggregator::recent_transactions(&transactions, limit)).into_response(),
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::io::rest::USER_HEADER;
    use crate::storage::{BudgetStorage, TransactionStorage};
    use crate::test_utils::{app_state, RecordingDelivery, TestEnvironment};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use shared::{BalanceAfterBudget, BalanceData, Category, NewBudget, NewTransaction, Transaction, UserId};
    use tower::ServiceExt;

    async fn get(env: &TestEnvironment, uri: &str, user: Option<&str>) -> (StatusCode, Vec<u8>) {
        let app = create_router(app_state(env, &RecordingDelivery::new()), "http://localhost:8080");
        let mut request = Request::builder().uri(uri);
        if let Some(user) = user {
            request = request.header(USER_HEADER, user);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn seed(env: &TestEnvironment) {
        let user = UserId::from("user-1");
        let earlier = Utc::now() - Duration::days(40);
        env.transactions
            .insert_transaction(&user, &NewTransaction::income("Salary", 1000.0, Category::Salary, earlier))
            .await
            .unwrap();
        env.transactions
            .insert_transaction(&user, &NewTransaction::expense("Dinner", 300.0, Category::Food, Utc::now()))
            .await
            .unwrap();
        env.budgets
            .insert_budget(&user, &NewBudget { category: Category::Food, amount: 400.0 })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_user_header_rejected() {
        let env = TestEnvironment::new().await;
        let (status, _) = get(&env, "/api/balance", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_balance_endpoints() {
        let env = TestEnvironment::new().await;
        seed(&env).await;

        let (status, body) = get(&env, "/api/balance", Some("user-1")).await;
        assert_eq!(status, StatusCode::OK);
        let balance: BalanceData = serde_json::from_slice(&body).unwrap();
        assert_eq!(balance.balance, 700.0);

        let (_, body) = get(&env, "/api/balance/after-budget", Some("user-1")).await;
        let after: BalanceAfterBudget = serde_json::from_slice(&body).unwrap();
        assert_eq!(after.balance_after_budget, 300.0);
        assert_eq!(after.total_budgets, 400.0);

        // Another user sees an empty ledger
        let (_, body) = get(&env, "/api/balance", Some("someone-else")).await;
        let balance: BalanceData = serde_json::from_slice(&body).unwrap();
        assert_eq!(balance, BalanceData::default());
    }

    #[tokio::test]
    async fn test_recent_transactions_limit() {
        let env = TestEnvironment::new().await;
        seed(&env).await;

        let (status, body) = get(&env, "/api/transactions/recent?limit=1", Some("user-1")).await;
        assert_eq!(status, StatusCode::OK);
        let recent: Vec<Transaction> = serde_json::from_slice(&body).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "Dinner");
    }
}
