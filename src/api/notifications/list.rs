use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::NotificationsState;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};
use crate::notify;

/// A notification as seen by one user, with their read state.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserNotification {
    pub id: i64,
    pub title: Option<String>,
    pub text: String,
    pub audience: String,
    pub severity: String,
    pub time: String,
    pub unread: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReaderBody {
    pub user_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatedResponse {
    /// Notifications newly marked read by this call
    pub updated: u64,
}

#[derive(Debug, FromRow)]
struct UserKind {
    role: String,
    user_type: Option<String>,
}

#[derive(Debug, FromRow)]
struct FeedRow {
    notification_id: i64,
    title: Option<String>,
    message: String,
    audience: String,
    severity: String,
    created_at: String,
    unread: i64,
}

/// List the notifications visible to a user, unread first-class
#[utoipa::path(
    get,
    path = "/api/notifications/user/{user_id}",
    params(("user_id" = i64, Path, description = "User whose feed to build")),
    responses(
        (status = 200, description = "Visible notifications, newest first", body = [UserNotification]),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn list_for_user(
    State(state): State<NotificationsState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<UserNotification>>, ApiError> {
    let user = sqlx::query_as::<_, UserKind>(
        "SELECT role, type AS user_type FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .ok_or_else(|| not_found("User not found"))?;

    let audiences = notify::audiences_for(&user.role, user.user_type.as_deref());
    let placeholders = vec!["?"; audiences.len()].join(", ");
    let sql = format!(
        "SELECT n.notification_id, n.title, n.message, n.audience, n.severity, n.created_at, \
                CASE WHEN nr.user_id IS NULL THEN 1 ELSE 0 END AS unread \
         FROM notifications n \
         LEFT JOIN notification_reads nr \
                ON nr.notification_id = n.notification_id AND nr.user_id = ? \
         WHERE n.audience IN ({placeholders}) \
            OR (n.audience = 'user' AND n.target_user_id = ?) \
         ORDER BY n.created_at DESC, n.notification_id DESC"
    );

    let mut query = sqlx::query_as::<_, FeedRow>(&sql).bind(user_id);
    for audience in &audiences {
        query = query.bind(audience.as_str());
    }
    let rows = query
        .bind(user_id)
        .fetch_all(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

    let feed = rows
        .into_iter()
        .map(|row| UserNotification {
            id: row.notification_id,
            title: row.title,
            text: row.message,
            audience: row.audience,
            severity: row.severity,
            time: row.created_at,
            unread: row.unread != 0,
        })
        .collect();

    Ok(Json(feed))
}

/// Mark one notification read for a user
#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = i64, Path, description = "Notification to mark")),
    request_body = ReaderBody,
    responses(
        (status = 200, description = "Marked read (idempotent)", body = OkResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_one_read(
    State(state): State<NotificationsState>,
    Path(notification_id): Path<i64>,
    Json(body): Json<ReaderBody>,
) -> Result<Json<OkResponse>, ApiError> {
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT notification_id FROM notifications WHERE notification_id = ?",
    )
    .bind(notification_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;
    if exists.is_none() {
        return Err(not_found("Notification not found"));
    }

    sqlx::query(
        "INSERT OR IGNORE INTO notification_reads (notification_id, user_id) VALUES (?, ?)",
    )
    .bind(notification_id)
    .bind(body.user_id)
    .execute(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(OkResponse { ok: true }))
}

/// Mark every visible notification read for a user
#[utoipa::path(
    post,
    path = "/api/notifications/user/{user_id}/read-all",
    params(("user_id" = i64, Path, description = "User whose feed to mark")),
    responses(
        (status = 200, description = "Count of notifications newly marked", body = UpdatedResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<NotificationsState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let user = sqlx::query_as::<_, UserKind>(
        "SELECT role, type AS user_type FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .ok_or_else(|| not_found("User not found"))?;

    let audiences = notify::audiences_for(&user.role, user.user_type.as_deref());
    let placeholders = vec!["?"; audiences.len()].join(", ");
    let sql = format!(
        "INSERT OR IGNORE INTO notification_reads (notification_id, user_id) \
         SELECT n.notification_id, ? FROM notifications n \
         WHERE n.audience IN ({placeholders}) \
            OR (n.audience = 'user' AND n.target_user_id = ?)"
    );

    let mut query = sqlx::query(&sql).bind(user_id);
    for audience in &audiences {
        query = query.bind(audience.as_str());
    }
    let result = query
        .bind(user_id)
        .execute(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(UpdatedResponse {
        updated: result.rows_affected(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::notify::{Audience, Severity};
    use crate::testutil;

    fn state(pool: sqlx::SqlitePool) -> NotificationsState {
        NotificationsState {
            pool,
            debug_errors: false,
        }
    }

    #[tokio::test]
    async fn test_feed_is_filtered_by_audience() {
        let pool = testutil::test_pool().await;
        let hosteller = testutil::insert_student(&pool, "Hina", "hostel").await;
        let scholar = testutil::insert_student(&pool, "Dev", "day_scholar").await;

        notify::post(&pool, Audience::All, None, None, "campus wide", Severity::Info)
            .await
            .unwrap();
        notify::post(&pool, Audience::Hostel, None, None, "hostel only", Severity::Info)
            .await
            .unwrap();
        notify::post(&pool, Audience::Admins, None, None, "admin only", Severity::Info)
            .await
            .unwrap();
        notify::to_user(&pool, scholar, "just for dev", Severity::Success)
            .await
            .unwrap();

        let Json(feed) = list_for_user(State(state(pool.clone())), Path(hosteller))
            .await
            .unwrap();
        let texts: Vec<&str> = feed.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["hostel only", "campus wide"]);
        assert!(feed.iter().all(|n| n.unread));

        let Json(feed) = list_for_user(State(state(pool)), Path(scholar))
            .await
            .unwrap();
        let texts: Vec<&str> = feed.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["just for dev", "campus wide"]);
    }

    #[tokio::test]
    async fn test_marking_read_flips_the_unread_flag() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Hina", "hostel").await;
        let id = notify::post(&pool, Audience::All, None, None, "hello", Severity::Info)
            .await
            .unwrap();

        mark_one_read(
            State(state(pool.clone())),
            Path(id),
            Json(ReaderBody { user_id: student }),
        )
        .await
        .unwrap();
        // Repeat marking stays idempotent.
        mark_one_read(
            State(state(pool.clone())),
            Path(id),
            Json(ReaderBody { user_id: student }),
        )
        .await
        .unwrap();

        let Json(feed) = list_for_user(State(state(pool)), Path(student)).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert!(!feed[0].unread);
    }

    #[tokio::test]
    async fn test_mark_all_counts_only_new_rows() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Hina", "hostel").await;
        notify::post(&pool, Audience::All, None, None, "one", Severity::Info)
            .await
            .unwrap();
        notify::post(&pool, Audience::Students, None, None, "two", Severity::Info)
            .await
            .unwrap();
        // Not visible to a student, must not be marked.
        notify::post(&pool, Audience::Admins, None, None, "three", Severity::Info)
            .await
            .unwrap();

        let Json(first) = mark_all_read(State(state(pool.clone())), Path(student))
            .await
            .unwrap();
        assert_eq!(first.updated, 2);

        let Json(second) = mark_all_read(State(state(pool.clone())), Path(student))
            .await
            .unwrap();
        assert_eq!(second.updated, 0);

        let Json(feed) = list_for_user(State(state(pool)), Path(student)).await.unwrap();
        assert!(feed.iter().all(|n| !n.unread));
    }

    #[tokio::test]
    async fn test_unknown_reader_or_notification_is_not_found() {
        let pool = testutil::test_pool().await;
        let err = list_for_user(State(state(pool.clone())), Path(50))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        let err = mark_all_read(State(state(pool.clone())), Path(50))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        let err = mark_one_read(State(state(pool)), Path(50), Json(ReaderBody { user_id: 1 }))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
