use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::TrackingState;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};
use crate::tracker::{self, BusLocation};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TrackingPosition {
    pub bus_id: i64,
    pub current_stop: Option<String>,
    pub next_stop: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Minutes to the next stop, as display text
    pub eta: Option<String>,
    pub status: Option<String>,
}

/// Live positions for the whole fleet
#[utoipa::path(
    get,
    path = "/api/tracking/live",
    responses(
        (status = 200, description = "Every tracked bus with its position", body = [BusLocation]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn live_positions(
    State(state): State<TrackingState>,
) -> Result<Json<Vec<BusLocation>>, ApiError> {
    let feed = tracker::live_feed(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(feed))
}

/// Live position for one bus
#[utoipa::path(
    get,
    path = "/api/tracking/live/{bus_id}",
    params(("bus_id" = i64, Path, description = "Bus to locate")),
    responses(
        (status = 200, description = "Current position of the bus", body = TrackingPosition),
        (status = 404, description = "Bus location not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn bus_position(
    State(state): State<TrackingState>,
    Path(bus_id): Path<i64>,
) -> Result<Json<TrackingPosition>, ApiError> {
    let position = sqlx::query_as::<_, TrackingPosition>(
        "SELECT bus_id, current_stop, next_stop, latitude, longitude, eta, status \
         FROM locations WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .ok_or_else(|| not_found("Bus location not found"))?;

    Ok(Json(position))
}
