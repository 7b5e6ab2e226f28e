pub mod list;
pub mod timeline;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct RoutesState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = RoutesState { pool, debug_errors };
    Router::new()
        .route("/", get(list::list_routes))
        .route("/seed", post(list::seed_routes))
        .route("/{route_id}/stops", get(list::get_route_stops))
        .route("/bus/{bus_id}/timeline", get(timeline::bus_timeline))
        .with_state(state)
}
