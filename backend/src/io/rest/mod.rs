//! # REST API Interface Layer
//!
//! HTTP endpoints over the ledger core. Handlers translate DTOs from the
//! `shared` crate into domain commands, call the services and map domain
//! errors to status codes. No business logic lives here.
//!
//! Every request is scoped to the user named in the `x-user-id` header.

pub mod balance_apis;
pub mod budget_apis;
pub mod emergency_fund_apis;
pub mod notification_apis;
pub mod profile_apis;
pub mod salary_apis;
pub mod transaction_apis;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, FixedOffset, Local};
use shared::{ErrorResponse, UserId};

pub const USER_HEADER: &str = "x-user-id";

/// The user a request acts for
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match user {
            Some(user) => Ok(CurrentUser(UserId::from(user))),
            None => Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Missing {} header", USER_HEADER),
            )),
        }
    }
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Current local time with its UTC offset fixed
pub fn local_now() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(now.offset())
}
