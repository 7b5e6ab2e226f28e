use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::list::StopInfo;
use super::RoutesState;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TimelineRoute {
    pub id: i64,
    pub name: String,
}

/// Stop-by-stop timeline for a bus, matched to the route catalogue by the
/// bus's route name or code. All fields are empty when no catalogue route
/// matches.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineResponse {
    pub route: Option<TimelineRoute>,
    pub stops: Vec<StopInfo>,
    /// Stop the bus is currently at, from live tracking
    pub current_stop: Option<String>,
}

#[derive(Debug, FromRow)]
struct RouteMatch {
    id: i64,
    name: String,
}

/// Get the timeline of catalogue stops for a bus
#[utoipa::path(
    get,
    path = "/api/routes/bus/{bus_id}/timeline",
    params(("bus_id" = i64, Path, description = "Bus to build a timeline for")),
    responses(
        (status = 200, description = "Catalogue stops with the bus's live position", body = TimelineResponse),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn bus_timeline(
    State(state): State<RoutesState>,
    Path(bus_id): Path<i64>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let route_name = sqlx::query_scalar::<_, Option<String>>(
        "SELECT route_name FROM buses WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .ok_or_else(|| not_found("Bus not found"))?;

    let route = match route_name {
        Some(name) => sqlx::query_as::<_, RouteMatch>(
            "SELECT id, name FROM routes WHERE name = ? OR code = ?",
        )
        .bind(&name)
        .bind(&name)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?,
        None => None,
    };

    let Some(route) = route else {
        // Bus exists but its route is not in the catalogue.
        return Ok(Json(TimelineResponse {
            route: None,
            stops: Vec::new(),
            current_stop: None,
        }));
    };

    let stops = sqlx::query_as::<_, StopInfo>(
        "SELECT ord, name, eta, lat, lng FROM stops WHERE route_id = ? ORDER BY ord ASC",
    )
    .bind(route.id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let current_stop = sqlx::query_scalar::<_, Option<String>>(
        "SELECT current_stop FROM locations WHERE bus_id = ?",
    )
    .bind(bus_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .flatten();

    Ok(Json(TimelineResponse {
        route: Some(TimelineRoute {
            id: route.id,
            name: route.name,
        }),
        stops,
        current_stop,
    }))
}
