//! Persistent notification feed, addressed to a broadcast audience or a
//! single user. Read state is tracked per (notification, user) pair.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

/// Who a notification is for. `User` entries carry a target user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Students,
    Admins,
    DayScholar,
    Hostel,
    User,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Students => "students",
            Audience::Admins => "admins",
            Audience::DayScholar => "day_scholar",
            Audience::Hostel => "hostel",
            Audience::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Broadcast audiences a user belongs to, derived from role and student type.
pub fn audiences_for(role: &str, user_type: Option<&str>) -> Vec<Audience> {
    let mut audiences = vec![Audience::All];
    match role {
        "admin" => audiences.push(Audience::Admins),
        "student" => audiences.push(Audience::Students),
        _ => {}
    }
    match user_type {
        Some("day_scholar") => audiences.push(Audience::DayScholar),
        Some("hostel") => audiences.push(Audience::Hostel),
        _ => {}
    }
    audiences
}

/// Insert a notification row and return its id. The target user id is only
/// kept when the audience is `User`.
pub async fn post(
    pool: &SqlitePool,
    audience: Audience,
    target_user_id: Option<i64>,
    title: Option<&str>,
    message: &str,
    severity: Severity,
) -> Result<i64, sqlx::Error> {
    let target = if audience == Audience::User {
        target_user_id
    } else {
        None
    };
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO notifications (title, message, audience, target_user_id, severity)
         VALUES (?, ?, ?, ?, ?)
         RETURNING notification_id",
    )
    .bind(title)
    .bind(message)
    .bind(audience.as_str())
    .bind(target)
    .bind(severity.as_str())
    .fetch_one(pool)
    .await
}

/// Queue a notification for one user. Callers treat failure as non-fatal.
pub async fn to_user(
    pool: &SqlitePool,
    user_id: i64,
    message: &str,
    severity: Severity,
) -> Result<(), sqlx::Error> {
    post(pool, Audience::User, Some(user_id), None, message, severity).await?;
    Ok(())
}

/// Queue a notification for the admin audience.
pub async fn to_admins(pool: &SqlitePool, message: &str) -> Result<(), sqlx::Error> {
    post(pool, Audience::Admins, None, None, message, Severity::Info).await?;
    Ok(())
}
