use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::UsersState;
use crate::api::{bad_request, conflict, internal_error, not_found, ApiError, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    /// `day_scholar` or `hostel` (`hosteller` is accepted as an alias)
    #[serde(rename = "type")]
    pub user_type: String,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Profile {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub contact_no: String,
    pub address: String,
    pub emergency_name: String,
    pub emergency_phone: String,
    pub hostel_block: String,
    pub room_no: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub contact_no: Option<String>,
    pub address: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_phone: Option<String>,
    pub hostel_block: Option<String>,
    pub room_no: Option<String>,
}

const PROFILE_SQL: &str = "SELECT user_id, name, email, role, type AS user_type, \
        COALESCE(contact_no, '') AS contact_no, \
        COALESCE(address, '') AS address, \
        COALESCE(emergency_name, '') AS emergency_name, \
        COALESCE(emergency_phone, '') AS emergency_phone, \
        COALESCE(hostel_block, '') AS hostel_block, \
        COALESCE(room_no, '') AS room_no \
 FROM users WHERE user_id = ?";

/// Loose structural check: one `@`, a non-empty local part and a dotted
/// domain, no whitespace anywhere.
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && !tld.is_empty()
        && !domain.chars().any(char::is_whitespace)
}

/// Register a student account
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = Profile),
        (status = 400, description = "Invalid email or student type", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<UsersState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }
    if !is_valid_email(&request.email) {
        return Err(bad_request("Invalid email format"));
    }
    let user_type = match request.user_type.as_str() {
        "day_scholar" => "day_scholar",
        "hostel" | "hosteller" => "hostel",
        _ => return Err(bad_request("Invalid type")),
    };

    let existing = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users WHERE email = ?")
        .bind(&request.email)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;
    if existing.is_some() {
        return Err(conflict("Email already registered"));
    }

    let user_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, role, type) VALUES (?, ?, 'student', ?)
         RETURNING user_id",
    )
    .bind(request.name.trim())
    .bind(&request.email)
    .bind(user_type)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let profile = fetch_profile(&state, user_id).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Get a user's profile
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User to fetch")),
    responses(
        (status = 200, description = "Profile", body = Profile),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_profile(
    State(state): State<UsersState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Profile>, ApiError> {
    let profile = fetch_profile(&state, user_id).await?;
    Ok(Json(profile))
}

/// Update profile contact fields
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id" = i64, Path, description = "User to update")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "No valid fields to update", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_profile(
    State(state): State<UsersState>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;
    if exists.is_none() {
        return Err(not_found("User not found"));
    }

    let fields: [(&str, &Option<String>); 7] = [
        ("name", &request.name),
        ("contact_no", &request.contact_no),
        ("address", &request.address),
        ("emergency_name", &request.emergency_name),
        ("emergency_phone", &request.emergency_phone),
        ("hostel_block", &request.hostel_block),
        ("room_no", &request.room_no),
    ];
    let present: Vec<(&str, &String)> = fields
        .iter()
        .filter_map(|(column, value)| value.as_ref().map(|v| (*column, v)))
        .collect();
    if present.is_empty() {
        return Err(bad_request("No valid fields to update"));
    }

    let assignments = present
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE users SET {assignments} WHERE user_id = ?");

    let mut query = sqlx::query(&sql);
    for (_, value) in &present {
        query = query.bind(*value);
    }
    query
        .bind(user_id)
        .execute(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

    let profile = fetch_profile(&state, user_id).await?;
    Ok(Json(profile))
}

async fn fetch_profile(state: &UsersState, user_id: i64) -> Result<Profile, ApiError> {
    sqlx::query_as::<_, Profile>(PROFILE_SQL)
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?
        .ok_or_else(|| not_found("User not found"))
}
