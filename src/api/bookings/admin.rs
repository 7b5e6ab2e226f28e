use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::BookingsState;
use crate::allocation::{self, Assignment, Booking};
use crate::api::{allocation_error, internal_error, ApiError, ErrorResponse};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct PendingBooking {
    pub booking_id: i64,
    /// Student's display name
    pub name: String,
    pub student_id: i64,
    /// Bus the request was filed against, if any
    pub bus_id: Option<i64>,
    pub status: String,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct BookingDetail {
    pub booking_id: i64,
    pub student_name: String,
    pub email: String,
    pub bus_id: Option<i64>,
    /// Registration number of the assigned bus, once approved
    pub bus_no: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// List bookings awaiting an admin decision
#[utoipa::path(
    get,
    path = "/api/bookings/pending",
    responses(
        (status = 200, description = "Pending bookings, oldest first", body = [PendingBooking]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn list_pending_bookings(
    State(state): State<BookingsState>,
) -> Result<Json<Vec<PendingBooking>>, ApiError> {
    let pending = sqlx::query_as::<_, PendingBooking>(
        "SELECT b.booking_id, u.name, u.user_id AS student_id, b.bus_id, b.status \
         FROM bookings b \
         JOIN users u ON b.student_id = u.user_id \
         WHERE b.status = 'pending' \
         ORDER BY b.created_at ASC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(pending))
}

/// List every booking with student and bus details
#[utoipa::path(
    get,
    path = "/api/bookings",
    responses(
        (status = 200, description = "All bookings, newest first", body = [BookingDetail]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn list_all_bookings(
    State(state): State<BookingsState>,
) -> Result<Json<Vec<BookingDetail>>, ApiError> {
    let bookings = sqlx::query_as::<_, BookingDetail>(
        "SELECT b.booking_id, u.name AS student_name, u.email, b.bus_id, \
                bu.bus_no, b.status, b.created_at \
         FROM bookings b \
         JOIN users u ON b.student_id = u.user_id \
         LEFT JOIN buses bu ON b.bus_id = bu.bus_id \
         ORDER BY b.created_at DESC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(bookings))
}

/// Approve a pending booking and seat the student on a bus
#[utoipa::path(
    post,
    path = "/api/bookings/{booking_id}/approve",
    params(("booking_id" = i64, Path, description = "Booking to approve")),
    responses(
        (status = 200, description = "Booking approved and seat allocated", body = Assignment),
        (status = 400, description = "Every bus is full", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn approve_booking(
    State(state): State<BookingsState>,
    Path(booking_id): Path<i64>,
) -> Result<Json<Assignment>, ApiError> {
    let assignment = allocation::approve(&state.pool, booking_id)
        .await
        .map_err(|e| allocation_error(state.debug_errors, e))?;

    Ok(Json(assignment))
}

/// Reject a pending booking
#[utoipa::path(
    post,
    path = "/api/bookings/{booking_id}/reject",
    params(("booking_id" = i64, Path, description = "Booking to reject")),
    responses(
        (status = 200, description = "Booking marked rejected", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn reject_booking(
    State(state): State<BookingsState>,
    Path(booking_id): Path<i64>,
) -> Result<Json<Booking>, ApiError> {
    let booking = allocation::reject(&state.pool, booking_id)
        .await
        .map_err(|e| allocation_error(state.debug_errors, e))?;

    Ok(Json(booking))
}
