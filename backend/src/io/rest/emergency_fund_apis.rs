//! # REST API for the Emergency Fund

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use shared::{AutoInvestRequest, AutoInvestResponse, AvailableFundsResponse, FundRequest, FundResponse};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::domain::commands::emergency_fund::{FundMovementCommand, FundMovementResult, SetAutoInvestCommand};
use crate::domain::FundError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/emergency-fund/deposit", post(deposit))
        .route("/emergency-fund/withdraw", post(withdraw))
        .route("/emergency-fund/auto-invest", post(set_auto_invest))
        .route("/emergency-fund/available", get(get_available_funds))
}

fn fund_error_response(err: FundError) -> Response {
    let status = match &err {
        FundError::InvalidAmount | FundError::NoAvailableFunds | FundError::InsufficientFunds { .. } => {
            StatusCode::BAD_REQUEST
        }
        FundError::ConcurrentModification => StatusCode::CONFLICT,
        FundError::ProfileNotFound => StatusCode::NOT_FOUND,
        FundError::StoreUnavailable(_) | FundError::WriteFailure(_) => {
            error!("Emergency fund operation failed: {}", err);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error updating emergency fund");
        }
    };
    error_response(status, err.to_string())
}

fn movement_response(result: FundMovementResult) -> Response {
    let response = FundResponse {
        emergency_fund_amount: result.emergency_fund_amount,
        transaction_recorded: result.mirror_transaction_id.is_some(),
        success_message: result.success_message,
        warnings: result.warnings,
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn deposit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<FundRequest>,
) -> Response {
    info!("POST /api/emergency-fund/deposit - user {} amount {}", user, request.amount);
    let command = FundMovementCommand { user, amount: request.amount };

    match state.emergency_fund_service.deposit(command).await {
        Ok(result) => movement_response(result),
        Err(e) => fund_error_response(e),
    }
}

pub async fn withdraw(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<FundRequest>,
) -> Response {
    info!("POST /api/emergency-fund/withdraw - user {} amount {}", user, request.amount);
    let command = FundMovementCommand { user, amount: request.amount };

    match state.emergency_fund_service.withdraw(command).await {
        Ok(result) => movement_response(result),
        Err(e) => fund_error_response(e),
    }
}

pub async fn set_auto_invest(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<AutoInvestRequest>,
) -> Response {
    info!("POST /api/emergency-fund/auto-invest - user {} amount {:?}", user, request.amount);
    let command = SetAutoInvestCommand { user, amount: request.amount };

    match state.emergency_fund_service.set_auto_invest(command).await {
        Ok(result) => {
            let response = AutoInvestResponse {
                emergency_fund_auto_invest: result.emergency_fund_auto_invest,
                success_message: result.success_message,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => fund_error_response(e),
    }
}

pub async fn get_available_funds(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/emergency-fund/available - user {}", user);

    match state.emergency_fund_service.available_funds(&user).await {
        Ok(funds) => {
            let response = AvailableFundsResponse {
                emergency_fund_amount: funds.emergency_fund_amount,
                available_to_deposit: funds.available_to_deposit,
                available_to_withdraw: funds.available_to_withdraw,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => fund_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::io::rest::USER_HEADER;
    use crate::test_utils::{app_state, RecordingDelivery, TestEnvironment};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use shared::{ErrorResponse, FundResponse, Profile};
    use tower::ServiceExt;

    async fn post(env: &TestEnvironment, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let app = create_router(app_state(env, &RecordingDelivery::new()), "http://localhost:8080");
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(USER_HEADER, "user-1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn profile_with_fund(amount: f64) -> Profile {
        Profile {
            emergency_fund_amount: amount,
            ..Profile::new("user-1")
        }
    }

    #[tokio::test]
    async fn test_withdraw_endpoint() {
        let env = TestEnvironment::with_profile(profile_with_fund(200.0)).await;

        let (status, body) = post(&env, "/api/emergency-fund/withdraw", r#"{"amount": 50}"#).await;
        assert_eq!(status, StatusCode::OK);
        let response: FundResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.emergency_fund_amount, 150.0);
        assert!(response.transaction_recorded);
    }

    #[tokio::test]
    async fn test_deposit_without_funds_is_bad_request() {
        let env = TestEnvironment::with_profile(profile_with_fund(0.0)).await;

        let (status, body) = post(&env, "/api/emergency-fund/deposit", r#"{"amount": 50}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.starts_with("Cannot deposit"));
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let env = TestEnvironment::new().await;

        let (status, _) = post(&env, "/api/emergency-fund/withdraw", r#"{"amount": 50}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
