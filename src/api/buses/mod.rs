pub mod list;
pub mod status;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct BusesState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = BusesState { pool, debug_errors };
    Router::new()
        .route("/", get(list::list_buses))
        .route("/{bus_id}/status", get(status::get_bus_status))
        .route("/{bus_id}/availability", get(status::check_availability))
        .with_state(state)
}
