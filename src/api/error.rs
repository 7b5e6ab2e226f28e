use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::allocation::AllocationError;

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn reply(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    reply(StatusCode::NOT_FOUND, message)
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    reply(StatusCode::BAD_REQUEST, message)
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    reply(StatusCode::CONFLICT, message)
}

/// 500 with the detail withheld unless debug responses are enabled.
pub fn internal_error<E: std::fmt::Display>(debug_errors: bool, e: E) -> ApiError {
    tracing::error!(error = %e, "Request failed");
    if debug_errors {
        reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    } else {
        reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

/// Map a matcher failure onto the HTTP error taxonomy.
pub fn allocation_error(debug_errors: bool, e: AllocationError) -> ApiError {
    match e {
        AllocationError::BookingNotFound(_)
        | AllocationError::StudentNotFound(_)
        | AllocationError::BusNotFound(_) => not_found(e.to_string()),
        AllocationError::DuplicatePending(_) => conflict(e.to_string()),
        AllocationError::NoBusAvailable | AllocationError::NoCapacity => bad_request(e.to_string()),
        AllocationError::Database(err) => internal_error(debug_errors, err),
    }
}
