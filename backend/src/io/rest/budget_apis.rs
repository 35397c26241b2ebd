//! # REST API for Budgets

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use shared::{CreatedResponse, NewBudget};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::storage::BudgetStorage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route("/budgets/:budget_id", delete(delete_budget))
}

pub async fn list_budgets(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/budgets - user {}", user);

    match state.budgets.list_budgets(&user).await {
        Ok(budgets) => (StatusCode::OK, Json(budgets)).into_response(),
        Err(e) => {
            error!("Failed to list budgets for user {}: {}", user, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error listing budgets")
        }
    }
}

pub async fn create_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(budget): Json<NewBudget>,
) -> Response {
    info!("POST /api/budgets - user {} category {}", user, budget.category);

    if !(budget.amount.is_finite() && budget.amount > 0.0) {
        return error_response(StatusCode::BAD_REQUEST, "Please enter a valid amount greater than 0.");
    }

    match state.budgets.insert_budget(&user, &budget).await {
        Ok(id) => (StatusCode::CREATED, Json(CreatedResponse { id })).into_response(),
        Err(e) => {
            error!("Failed to create budget for user {}: {}", user, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating budget")
        }
    }
}

pub async fn delete_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(budget_id): Path<String>,
) -> Response {
    info!("DELETE /api/budgets/{} - user {}", budget_id, user);

    match state.budgets.delete_budget(&user, &budget_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Budget not found"),
        Err(e) => {
            error!("Failed to delete budget {}: {}", budget_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error deleting budget")
        }
    }
}
