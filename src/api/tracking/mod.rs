pub mod live;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct TrackingState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = TrackingState { pool, debug_errors };
    Router::new()
        .route("/live", get(live::live_positions))
        .route("/live/{bus_id}", get(live::bus_position))
        .with_state(state)
}
