use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::BusesState;
use crate::allocation;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct BusStatusResponse {
    pub bus_no: String,
    pub route: Option<String>,
    pub driver_name: Option<String>,
    pub bus_status: String,
    pub current_stop: String,
    pub next_stop: String,
    pub eta: String,
    pub status: String,
    pub last_updated: Option<String>,
}

#[derive(Debug, FromRow)]
struct BusRow {
    bus_no: String,
    route_name: Option<String>,
    driver_name: Option<String>,
    status: String,
}

#[derive(Debug, FromRow)]
struct LocationRow {
    current_stop: Option<String>,
    next_stop: Option<String>,
    eta: Option<String>,
    status: Option<String>,
    updated_at: String,
}

/// Current stop, next stop and ETA for one bus
#[utoipa::path(
    get,
    path = "/api/buses/{bus_id}/status",
    params(("bus_id" = i64, Path, description = "Bus id")),
    responses(
        (status = 200, description = "Bus route state", body = BusStatusResponse),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn get_bus_status(
    State(state): State<BusesState>,
    Path(bus_id): Path<i64>,
) -> Result<Json<BusStatusResponse>, ApiError> {
    let bus: Option<BusRow> = sqlx::query_as(
        "SELECT bus_no, route_name, driver_name, status FROM buses WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;
    let bus = bus.ok_or_else(|| not_found("Bus not found"))?;

    let loc: Option<LocationRow> = sqlx::query_as(
        "SELECT current_stop, next_stop, eta, status, updated_at
         FROM locations WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    // Untracked buses report N/A rather than an error.
    let na = || "N/A".to_string();
    let (current_stop, next_stop, eta, status, last_updated) = match loc {
        Some(l) => (
            l.current_stop.unwrap_or_else(na),
            l.next_stop.unwrap_or_else(na),
            l.eta.unwrap_or_else(na),
            l.status.unwrap_or_else(na),
            Some(l.updated_at),
        ),
        None => (na(), na(), na(), na(), None),
    };

    Ok(Json(BusStatusResponse {
        bus_no: bus.bus_no,
        route: bus.route_name,
        driver_name: bus.driver_name,
        bus_status: bus.status,
        current_stop,
        next_stop,
        eta,
        status,
        last_updated,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub status: String,
    /// Advertised boarding time for this bus
    pub available_time: Option<String>,
    pub seats_left: i64,
}

#[derive(Debug, FromRow)]
struct CapacityRow {
    capacity: Option<i64>,
    status: String,
    start_time: Option<String>,
}

/// Seats left on one bus
#[utoipa::path(
    get,
    path = "/api/buses/{bus_id}/availability",
    params(("bus_id" = i64, Path, description = "Bus id")),
    responses(
        (status = 200, description = "Seat availability", body = AvailabilityResponse),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn check_availability(
    State(state): State<BusesState>,
    Path(bus_id): Path<i64>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let bus: Option<CapacityRow> = sqlx::query_as(
        "SELECT capacity, status, start_time FROM buses WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;
    let bus = bus.ok_or_else(|| not_found("Bus not found"))?;

    let occupied: i64 = sqlx::query_scalar(
        "SELECT COALESCE((SELECT COUNT(*) FROM allocations WHERE bus_id = ?), 0)
              + COALESCE((SELECT COUNT(*) FROM bookings WHERE bus_id = ? AND status = 'approved'), 0)",
    )
    .bind(bus_id)
    .bind(bus_id)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let seats_left = (allocation::effective_capacity(bus.capacity) - occupied).max(0);

    Ok(Json(AvailabilityResponse {
        status: bus.status,
        available_time: bus.start_time,
        seats_left,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_untracked_bus_reports_na_fields() {
        let pool = testutil::test_pool().await;
        let bus = testutil::insert_bus(&pool, "A-1", Some(10)).await;

        let state = BusesState {
            pool,
            debug_errors: false,
        };
        let Json(status) = get_bus_status(State(state), Path(bus)).await.unwrap();
        assert_eq!(status.bus_no, "A-1");
        assert_eq!(status.current_stop, "N/A");
        assert_eq!(status.eta, "N/A");
        assert_eq!(status.last_updated, None);
    }

    #[tokio::test]
    async fn test_missing_bus_is_not_found() {
        let pool = testutil::test_pool().await;
        let state = BusesState {
            pool,
            debug_errors: false,
        };
        let err = get_bus_status(State(state.clone()), Path(99)).await.unwrap_err();
        assert_eq!(err.0, axum::http::StatusCode::NOT_FOUND);
        let err = check_availability(State(state), Path(99)).await.unwrap_err();
        assert_eq!(err.0, axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_seats_left_counts_both_sources() {
        let pool = testutil::test_pool().await;
        let bus = testutil::insert_bus(&pool, "A-1", Some(5)).await;
        let allocated = testutil::insert_student(&pool, "Allocated", "hostel").await;
        testutil::insert_allocation(&pool, allocated, bus).await;
        let approved = testutil::insert_student(&pool, "Approved", "hostel").await;
        sqlx::query("INSERT INTO bookings (student_id, bus_id, status) VALUES (?, ?, 'approved')")
            .bind(approved)
            .bind(bus)
            .execute(&pool)
            .await
            .unwrap();

        let state = BusesState {
            pool,
            debug_errors: false,
        };
        let Json(availability) = check_availability(State(state), Path(bus)).await.unwrap();
        assert_eq!(availability.seats_left, 3);
        assert_eq!(availability.status, "active");
    }
}
