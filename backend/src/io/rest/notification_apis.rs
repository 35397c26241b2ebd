//! # REST API for Reminders and Alerts
//!
//! Scheduling calls always answer 200 with a [`ScheduleOutcome`]; a reminder
//! skipped by preference is a normal result, not an error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use shared::{
    BudgetExceededRequest, CancelNotificationResponse, Category, SalaryReminderRequest,
    ScheduleOutcome, ScheduledNotificationsResponse,
};
use tracing::{error, info};

use super::{error_response, CurrentUser};
use crate::domain::commands::reminders::{
    BudgetExceededCommand, BudgetThresholdCommand, SalaryReminderCommand, SavingsCheckInCommand,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_scheduled).delete(clear_all))
        .route("/notifications/:notification_type", delete(cancel_notification))
        .route("/notifications/salary-reminder", post(schedule_salary_reminder))
        .route("/notifications/weekly-report", post(schedule_weekly_report))
        .route("/notifications/budget-exceeded", post(send_budget_exceeded))
        .route("/notifications/budget-check", post(check_budget_alerts))
        .route("/notifications/budget-alert", post(schedule_budget_alert))
        .route("/notifications/savings-check-in", post(schedule_savings_check_in))
        .route("/notifications/preferences/apply", post(apply_preferences))
}

fn outcome_response(outcome: ScheduleOutcome) -> Response {
    (StatusCode::OK, Json(outcome)).into_response()
}

pub async fn schedule_salary_reminder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SalaryReminderRequest>,
) -> Response {
    info!(
        "POST /api/notifications/salary-reminder - user {} day {}",
        user, request.day_of_month
    );
    let command = SalaryReminderCommand {
        user,
        day_of_month: request.day_of_month,
        amount: request.amount,
    };
    outcome_response(state.reminder_service.schedule_salary_reminder(command, state.now()).await)
}

pub async fn schedule_weekly_report(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("POST /api/notifications/weekly-report - user {}", user);
    outcome_response(state.reminder_service.schedule_weekly_report(&user, state.now()).await)
}

pub async fn send_budget_exceeded(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<BudgetExceededRequest>,
) -> Response {
    info!(
        "POST /api/notifications/budget-exceeded - user {} category {}",
        user,
        request.category.as_str()
    );
    let command = BudgetExceededCommand {
        user,
        category: request.category,
        budget_amount: request.budget_amount,
        spent: request.spent,
    };
    outcome_response(state.reminder_service.send_budget_exceeded_alert(command).await)
}

pub async fn check_budget_alerts(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("POST /api/notifications/budget-check - user {}", user);
    let outcomes = state.reminder_service.check_budget_alerts(&user, state.now()).await;
    (StatusCode::OK, Json(outcomes)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct BudgetAlertRequest {
    pub category: Category,
    pub threshold_percent: u32,
}

pub async fn schedule_budget_alert(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<BudgetAlertRequest>,
) -> Response {
    info!(
        "POST /api/notifications/budget-alert - user {} category {} at {}%",
        user,
        request.category.as_str(),
        request.threshold_percent
    );
    let command = BudgetThresholdCommand {
        user,
        category: request.category,
        threshold_percent: request.threshold_percent,
    };
    outcome_response(state.reminder_service.schedule_budget_alert(command, state.now()).await)
}

#[derive(Debug, Deserialize)]
pub struct SavingsCheckInRequest {
    pub day_of_month: u32,
    pub goal: Option<f64>,
}

pub async fn schedule_savings_check_in(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SavingsCheckInRequest>,
) -> Response {
    info!(
        "POST /api/notifications/savings-check-in - user {} day {}",
        user, request.day_of_month
    );
    let command = SavingsCheckInCommand {
        user,
        day_of_month: request.day_of_month,
        goal: request.goal,
    };
    outcome_response(state.reminder_service.schedule_savings_check_in(command, state.now()).await)
}

pub async fn apply_preferences(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Response {
    info!("POST /api/notifications/preferences/apply - user {}", user);
    let outcomes = state.reminder_service.apply_preferences(&user, state.now()).await;
    (StatusCode::OK, Json(outcomes)).into_response()
}

pub async fn cancel_notification(
    State(state): State<AppState>,
    Path(notification_type): Path<String>,
) -> Response {
    info!("DELETE /api/notifications/{}", notification_type);

    match state
        .reminder_service
        .cancel_notification_by_type(&notification_type)
        .await
    {
        Ok(cancelled) => {
            let response = CancelNotificationResponse {
                notification_type,
                cancelled,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to cancel {} reminders: {}", notification_type, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error cancelling notification")
        }
    }
}

pub async fn clear_all(State(state): State<AppState>) -> Response {
    info!("DELETE /api/notifications");

    match state.reminder_service.scheduler().clear_all().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("Failed to clear reminders: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error clearing notifications")
        }
    }
}

pub async fn list_scheduled(State(state): State<AppState>) -> Response {
    info!("GET /api/notifications");

    match state.reminder_service.scheduler().list_scheduled().await {
        Ok(notifications) => {
            (StatusCode::OK, Json(ScheduledNotificationsResponse { notifications })).into_response()
        }
        Err(e) => {
            error!("Failed to list reminders: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving notifications")
        }
    }
}
