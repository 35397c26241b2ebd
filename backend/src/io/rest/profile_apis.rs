//! # REST API for the User Profile

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use shared::{ProfileResponse, ProfileUpdate};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::storage::ProfileStorage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

pub async fn get_profile(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("GET /api/profile - user {}", user);

    match state.profiles.get_profile(&user).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Profile not found"),
        Err(e) => {
            error!("Failed to load profile for user {}: {}", user, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving profile")
        }
    }
}

/// Patch settings. The emergency fund amount is only changed through the
/// emergency fund endpoints. When preferences, pay day or income change, the
/// salary reminder and weekly report are brought in line before responding.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Response {
    info!("PUT /api/profile - user {}", user);

    if let Some(Some(day)) = update.monthly_income_day {
        if !(1..=31).contains(&day) {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid salary day {}: must be between 1 and 31", day),
            );
        }
    }

    let profile = match state.profiles.update_profile(&user, &update).await {
        Ok(profile) => profile,
        Err(e) => {
            error!("Failed to update profile for user {}: {}", user, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error updating profile");
        }
    };

    let reminders = if update.affects_reminders() {
        state.reminder_service.apply_preferences(&user, state.now()).await
    } else {
        Vec::new()
    };

    (StatusCode::OK, Json(ProfileResponse { profile, reminders })).into_response()
}
