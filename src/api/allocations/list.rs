use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::AllocationsState;
use crate::allocation;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct AllocationDetail {
    pub allocation_id: i64,
    pub student_name: String,
    pub email: String,
    /// Student category, `day_scholar` or `hostel`
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub bus_no: String,
    pub route: Option<String>,
    pub created_at: String,
}

/// Current bus details shown to an allocated student.
#[derive(Debug, Serialize, ToSchema)]
pub struct AllocatedBus {
    pub bus_id: i64,
    pub bus_no: String,
    pub route: Option<String>,
    pub driver_name: Option<String>,
    pub bus_status: String,
    /// Advertised boarding time (the bus's scheduled start)
    pub available_time: Option<String>,
    pub current_stop: String,
    pub next_stop: String,
    pub eta: String,
    pub location_status: String,
    pub last_updated: Option<String>,
}

/// Allocation lookup result. `status` is one of `allocated`, `pending`,
/// `rejected` or `none`; `allocation` is set only when allocated.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAllocationResponse {
    pub status: String,
    pub allocation: Option<AllocatedBus>,
}

/// List every seat allocation with student and bus details
#[utoipa::path(
    get,
    path = "/api/allocations",
    responses(
        (status = 200, description = "All allocations, newest first", body = [AllocationDetail]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "allocations"
)]
pub async fn list_allocations(
    State(state): State<AllocationsState>,
) -> Result<Json<Vec<AllocationDetail>>, ApiError> {
    let allocations = sqlx::query_as::<_, AllocationDetail>(
        "SELECT a.allocation_id, u.name AS student_name, u.email, u.type AS user_type, \
                b.bus_no, b.route_name AS route, a.created_at \
         FROM allocations a \
         JOIN users u ON a.student_id = u.user_id \
         JOIN buses b ON a.bus_id = b.bus_id \
         ORDER BY a.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(allocations))
}

#[derive(Debug, FromRow)]
struct UserKind {
    user_type: Option<String>,
}

#[derive(Debug, FromRow)]
struct BusRow {
    bus_id: i64,
    bus_no: String,
    route_name: Option<String>,
    driver_name: Option<String>,
    status: String,
    start_time: Option<String>,
}

#[derive(Debug, FromRow)]
struct LocationRow {
    current_stop: Option<String>,
    next_stop: Option<String>,
    eta: Option<String>,
    status: Option<String>,
    updated_at: Option<String>,
}

/// Look up a student's allocation, assigning day scholars a default bus on
/// first contact
#[utoipa::path(
    get,
    path = "/api/allocations/student/{student_id}",
    params(("student_id" = i64, Path, description = "Student to look up")),
    responses(
        (status = 200, description = "Allocation state for the student", body = StudentAllocationResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "allocations"
)]
pub async fn student_allocation(
    State(state): State<AllocationsState>,
    Path(student_id): Path<i64>,
) -> Result<Json<StudentAllocationResponse>, ApiError> {
    let user =
        sqlx::query_as::<_, UserKind>("SELECT type AS user_type FROM users WHERE user_id = ?")
            .bind(student_id)
            .fetch_optional(&state.pool)
            .await
            .map_err(|e| internal_error(state.debug_errors, e))?
            .ok_or_else(|| not_found("Student not found"))?;

    let mut bus_id =
        sqlx::query_scalar::<_, i64>("SELECT bus_id FROM allocations WHERE student_id = ?")
            .bind(student_id)
            .fetch_optional(&state.pool)
            .await
            .map_err(|e| internal_error(state.debug_errors, e))?;

    if bus_id.is_none() && user.user_type.as_deref() == Some("day_scholar") {
        bus_id = allocation::ensure_day_scholar_allocation(&state.pool, student_id)
            .await
            .map_err(|e| internal_error(state.debug_errors, e))?;
    }

    let Some(bus_id) = bus_id else {
        // No allocation yet: report where the latest booking stands instead.
        let latest = sqlx::query_scalar::<_, String>(
            "SELECT status FROM bookings WHERE student_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

        let status = match latest.as_deref() {
            Some("pending") => "pending",
            Some("rejected") => "rejected",
            _ => "none",
        };
        return Ok(Json(StudentAllocationResponse {
            status: status.to_string(),
            allocation: None,
        }));
    };

    let bus = sqlx::query_as::<_, BusRow>(
        "SELECT bus_id, bus_no, route_name, driver_name, status, start_time \
         FROM buses WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let Some(bus) = bus else {
        // Allocation points at a bus that has since been removed.
        return Ok(Json(StudentAllocationResponse {
            status: "none".to_string(),
            allocation: None,
        }));
    };

    let location = sqlx::query_as::<_, LocationRow>(
        "SELECT current_stop, next_stop, eta, status, updated_at \
         FROM locations WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let na = || "N/A".to_string();
    let location = location.unwrap_or(LocationRow {
        current_stop: None,
        next_stop: None,
        eta: None,
        status: None,
        updated_at: None,
    });

    Ok(Json(StudentAllocationResponse {
        status: "allocated".to_string(),
        allocation: Some(AllocatedBus {
            bus_id: bus.bus_id,
            bus_no: bus.bus_no,
            route: bus.route_name,
            driver_name: bus.driver_name,
            bus_status: bus.status,
            available_time: bus.start_time,
            current_stop: location.current_stop.unwrap_or_else(na),
            next_stop: location.next_stop.unwrap_or_else(na),
            eta: location.eta.unwrap_or_else(na),
            location_status: location.status.unwrap_or_else(na),
            last_updated: location.updated_at,
        }),
    }))
}
