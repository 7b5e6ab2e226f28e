use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::RoutesState;
use crate::api::{internal_error, not_found, ApiError, ErrorResponse};
use crate::seed;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct RouteInfo {
    pub id: i64,
    /// Short route code, e.g. `R1`
    pub code: String,
    pub name: String,
    pub start_point: String,
    pub end_point: String,
    pub dep_time: Option<String>,
    pub arr_time: Option<String>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct RouteHeader {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub dep_time: Option<String>,
    pub arr_time: Option<String>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct StopInfo {
    /// Position along the route, starting at 1
    pub ord: i64,
    pub name: String,
    /// Scheduled clock time at this stop
    pub eta: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteStopsResponse {
    pub route: RouteHeader,
    pub stops: Vec<StopInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeedResponse {
    pub ok: bool,
    /// Routes inserted by this call; zero when everything already existed
    pub routes_created: u32,
}

/// List the published routes
#[utoipa::path(
    get,
    path = "/api/routes",
    responses(
        (status = 200, description = "All routes ordered by code", body = [RouteInfo]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes(
    State(state): State<RoutesState>,
) -> Result<Json<Vec<RouteInfo>>, ApiError> {
    let routes = sqlx::query_as::<_, RouteInfo>(
        "SELECT id, code, name, start_point, end_point, dep_time, arr_time \
         FROM routes ORDER BY code ASC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(routes))
}

/// Load the built-in route catalogue. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/api/routes/seed",
    responses(
        (status = 200, description = "Catalogue loaded", body = SeedResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn seed_routes(State(state): State<RoutesState>) -> Result<Json<SeedResponse>, ApiError> {
    let routes_created = seed::seed_routes(&state.pool)
        .await
        .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(SeedResponse {
        ok: true,
        routes_created,
    }))
}

/// Get one route with its ordered stop list
#[utoipa::path(
    get,
    path = "/api/routes/{route_id}/stops",
    params(("route_id" = i64, Path, description = "Route to fetch")),
    responses(
        (status = 200, description = "Route header plus stops in order", body = RouteStopsResponse),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_stops(
    State(state): State<RoutesState>,
    Path(route_id): Path<i64>,
) -> Result<Json<RouteStopsResponse>, ApiError> {
    let route = sqlx::query_as::<_, RouteHeader>(
        "SELECT id, code, name, dep_time, arr_time FROM routes WHERE id = ?",
    )
    .bind(route_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?
    .ok_or_else(|| not_found("Route not found"))?;

    let stops = sqlx::query_as::<_, StopInfo>(
        "SELECT ord, name, eta, lat, lng FROM stops WHERE route_id = ? ORDER BY ord ASC",
    )
    .bind(route_id)
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    Ok(Json(RouteStopsResponse { route, stops }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::testutil;

    fn state(pool: sqlx::SqlitePool) -> RoutesState {
        RoutesState {
            pool,
            debug_errors: false,
        }
    }

    #[tokio::test]
    async fn test_seed_then_list_returns_catalogue_in_code_order() {
        let pool = testutil::test_pool().await;

        let Json(seeded) = seed_routes(State(state(pool.clone()))).await.unwrap();
        assert!(seeded.ok);
        assert_eq!(seeded.routes_created, 6);

        let Json(routes) = list_routes(State(state(pool.clone()))).await.unwrap();
        assert_eq!(routes.len(), 6);
        assert_eq!(routes[0].code, "R1");
        assert_eq!(routes[5].code, "R6");

        // Seeding again adds nothing.
        let Json(seeded) = seed_routes(State(state(pool))).await.unwrap();
        assert_eq!(seeded.routes_created, 0);
    }

    #[tokio::test]
    async fn test_route_stops_come_back_in_order() {
        let pool = testutil::test_pool().await;
        seed_routes(State(state(pool.clone()))).await.unwrap();

        let Json(routes) = list_routes(State(state(pool.clone()))).await.unwrap();
        let r1 = routes.iter().find(|r| r.code == "R1").unwrap();

        let Json(detail) = get_route_stops(State(state(pool)), Path(r1.id))
            .await
            .unwrap();
        assert_eq!(detail.route.code, "R1");
        assert_eq!(detail.stops.len(), 5);
        let ords: Vec<i64> = detail.stops.iter().map(|s| s.ord).collect();
        assert_eq!(ords, vec![1, 2, 3, 4, 5]);
        assert_eq!(detail.stops[0].name, "Mansarovar Metro Station");
    }

    #[tokio::test]
    async fn test_missing_route_is_not_found() {
        let pool = testutil::test_pool().await;
        let err = get_route_stops(State(state(pool)), Path(99)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
