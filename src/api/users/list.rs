use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::UsersState;
use crate::api::{internal_error, ApiError, ErrorResponse};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct UserSummary {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

/// List every account, students first, each group by name
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<UsersState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT user_id, name, email, role, type AS user_type \
         FROM users ORDER BY role DESC, name ASC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(users))
}
