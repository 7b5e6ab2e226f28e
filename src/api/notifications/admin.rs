use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::NotificationsState;
use crate::api::{bad_request, internal_error, ApiError, ErrorResponse};
use crate::notify::{self, Audience, Severity};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNotificationRequest {
    pub title: Option<String>,
    pub message: String,
    /// Defaults to `all`
    pub audience: Option<Audience>,
    /// Required when audience is `user`, ignored otherwise
    pub target_user_id: Option<i64>,
    /// Defaults to `info`
    pub severity: Option<Severity>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Notification {
    pub notification_id: i64,
    pub title: Option<String>,
    pub message: String,
    pub audience: String,
    pub target_user_id: Option<i64>,
    pub severity: String,
    pub created_at: String,
}

/// Publish a notification to an audience or a single user
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification stored", body = CreatedResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<NotificationsState>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    if request.message.trim().is_empty() {
        return Err(bad_request("message is required"));
    }

    let id = notify::post(
        &state.pool,
        request.audience.unwrap_or(Audience::All),
        request.target_user_id,
        request.title.as_deref(),
        &request.message,
        request.severity.unwrap_or(Severity::Info),
    )
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// List every stored notification
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "All notifications, newest first", body = [Notification]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn list_all_notifications(
    State(state): State<NotificationsState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT notification_id, title, message, audience, target_user_id, severity, created_at \
         FROM notifications ORDER BY created_at DESC, notification_id DESC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(notifications))
}
