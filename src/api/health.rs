use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct HealthState {
    pub pool: SqlitePool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service can reach its database
    pub healthy: bool,
    /// Number of buses in the fleet
    pub bus_count: i64,
    /// Number of bookings currently awaiting a decision
    pub pending_bookings: i64,
    /// Number of buses with a live location row
    pub tracked_buses: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct HealthCounts {
    bus_count: i64,
    pending_bookings: i64,
    tracked_buses: i64,
}

/// Liveness check with a few fleet counters
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Liveness and fleet counters", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let counts: Result<HealthCounts, sqlx::Error> = sqlx::query_as(
        "SELECT
             (SELECT COUNT(*) FROM buses) AS bus_count,
             (SELECT COUNT(*) FROM bookings WHERE status = 'pending') AS pending_bookings,
             (SELECT COUNT(*) FROM locations) AS tracked_buses",
    )
    .fetch_one(&state.pool)
    .await;

    match counts {
        Ok(c) => Json(HealthResponse {
            healthy: true,
            bus_count: c.bus_count,
            pending_bookings: c.pending_bookings,
            tracked_buses: c.tracked_buses,
        }),
        Err(e) => {
            tracing::error!(error = %e, "Health check query failed");
            Json(HealthResponse {
                healthy: false,
                bus_count: 0,
                pending_bookings: 0,
                tracked_buses: 0,
            })
        }
    }
}

pub fn router(pool: SqlitePool) -> Router {
    let state = HealthState { pool };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_counts_reflect_current_rows() {
        let pool = testutil::test_pool().await;
        let bus = testutil::insert_bus(&pool, "BUS-1", Some(10)).await;
        testutil::insert_location(&pool, bus, Some("Mansarovar"), Some("Gopalpura")).await;
        let student = testutil::insert_student(&pool, "Meera", "hostel").await;
        sqlx::query("INSERT INTO bookings (student_id, bus_id, status) VALUES (?, ?, 'pending')")
            .bind(student)
            .bind(bus)
            .execute(&pool)
            .await
            .unwrap();

        let response = health_check(State(HealthState { pool })).await;
        assert!(response.0.healthy);
        assert_eq!(response.0.bus_count, 1);
        assert_eq!(response.0.pending_bookings, 1);
        assert_eq!(response.0.tracked_buses, 1);
    }
}
