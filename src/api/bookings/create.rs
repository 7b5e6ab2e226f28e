use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::BookingsState;
use crate::allocation::{self, Booking};
use crate::api::{allocation_error, ApiError, ErrorResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub student_id: i64,
    /// Requested bus. Treated as a preference during approval, not a claim.
    pub bus_id: Option<i64>,
    /// Free-text departure time, matched against each bus's advertised time
    pub preferred_time: Option<String>,
}

/// Submit a bus request for a student
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Pending booking created", body = Booking),
        (status = 400, description = "No bus available", body = ErrorResponse),
        (status = 404, description = "Student or bus not found", body = ErrorResponse),
        (status = 409, description = "A pending booking already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<BookingsState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = allocation::create_request(
        &state.pool,
        request.student_id,
        request.bus_id,
        request.preferred_time.as_deref(),
    )
    .await
    .map_err(|e| allocation_error(state.debug_errors, e))?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_created_booking_targets_requested_bus() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Sana", "hostel").await;
        testutil::insert_bus(&pool, "A-1", Some(10)).await;
        let wanted = testutil::insert_bus(&pool, "B-2", Some(10)).await;

        let state = BookingsState {
            pool,
            debug_errors: false,
        };
        let (status, Json(booking)) = create_booking(
            State(state),
            Json(CreateBookingRequest {
                student_id: student,
                bus_id: Some(wanted),
                preferred_time: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booking.bus_id, Some(wanted));
        assert_eq!(booking.status, "pending");
    }

    #[tokio::test]
    async fn test_duplicate_pending_is_a_conflict() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Zoya", "hostel").await;
        testutil::insert_bus(&pool, "A-1", Some(10)).await;

        let state = BookingsState {
            pool,
            debug_errors: false,
        };
        let request = || {
            Json(CreateBookingRequest {
                student_id: student,
                bus_id: None,
                preferred_time: None,
            })
        };
        create_booking(State(state.clone()), request()).await.unwrap();
        let err = create_booking(State(state), request()).await.unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }
}
