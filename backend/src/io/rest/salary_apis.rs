//! # REST API for Salary Day

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use shared::SalaryPostResponse;
use tracing::{error, info, warn};

use super::{error_response, CurrentUser};
use crate::domain::SalaryError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/salary/check", get(check_salary_day))
        .route("/salary/post", post(post_salary))
}

fn salary_error_response(err: SalaryError) -> Response {
    match err {
        SalaryError::ProfileNotFound => error_response(StatusCode::NOT_FOUND, err.to_string()),
        SalaryError::NotSalaryDay => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        SalaryError::AlreadyPosted => error_response(StatusCode::CONFLICT, err.to_string()),
        SalaryError::StoreUnavailable(_) | SalaryError::WriteFailure(_) => {
            error!("Salary operation failed: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to add salary. Please try again.")
        }
    }
}

pub async fn check_salary_day(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/salary/check - user {}", user);

    match state.salary_service.evaluate(&user, state.now()).await {
        Ok(check) => (StatusCode::OK, Json(check)).into_response(),
        Err(e) => salary_error_response(e),
    }
}

pub async fn post_salary(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("POST /api/salary/post - user {}", user);

    match state.salary_service.post_salary(&user, state.now()).await {
        Ok(report) => {
            if report.is_committed_but_incomplete() {
                warn!(
                    "Salary for user {} posted with failed steps: {:?}",
                    user,
                    report.failed_steps()
                );
            }
            let messages = report.messages();
            (StatusCode::OK, Json(SalaryPostResponse { report, messages })).into_response()
        }
        Err(e) => salary_error_response(e),
    }
}
