//! # REST API for Transactions
//!
//! Endpoints for listing, creating and deleting ledger entries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use shared::{CreateTransactionRequest, NewTransaction, TransactionType};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::storage::TransactionStorage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/:transaction_id", delete(delete_transaction))
}

fn validate(request: CreateTransactionRequest) -> Result<NewTransaction, String> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err("Title is required".to_string());
    }
    if !(request.amount.is_finite() && request.amount > 0.0) {
        return Err("Please enter a valid amount greater than 0.".to_string());
    }
    if request.transaction_type == TransactionType::Unknown {
        return Err("Type must be income or expense".to_string());
    }

    Ok(NewTransaction {
        title: title.to_string(),
        amount: request.amount,
        category: request.category,
        transaction_type: request.transaction_type,
        transaction_date: request.transaction_date.unwrap_or_else(Utc::now),
        notes: request.notes,
        receipt_ref: request.receipt_ref,
    })
}

/// All transactions of the user, newest first
pub async fn list_transactions(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/transactions - user {}", user);

    match state.transactions.list_transactions(&user).await {
        Ok(transactions) => (StatusCode::OK, Json(transactions)).into_response(),
        Err(e) => {
            error!("Failed to list transactions for user {}: {}", user, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error listing transactions")
        }
    }
}

pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateTransactionRequest>,
) -> Response {
    info!("POST /api/transactions - user {} title {:?}", user, request.title);

    let transaction = match validate(request) {
        Ok(transaction) => transaction,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match state.transactions.insert_transaction(&user, &transaction).await {
        Ok(id) => (StatusCode::CREATED, Json(transaction.into_transaction(id))).into_response(),
        Err(e) => {
            error!("Failed to create transaction for user {}: {}", user, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating transaction")
        }
    }
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(transaction_id): Path<String>,
) -> Response {
    info!("DELETE /api/transactions/{} - user {}", transaction_id, user);

    match state.transactions.delete_transaction(&user, &transaction_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(StatusCode::NOT_FOUND, "Transaction not found"),
        Err(e) => {
            error!("Failed to delete transaction {}: {}", transaction_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error deleting transaction")
        }
    }
}
