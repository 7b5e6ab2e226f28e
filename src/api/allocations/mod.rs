pub mod list;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AllocationsState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = AllocationsState { pool, debug_errors };
    Router::new()
        .route("/", get(list::list_allocations))
        .route("/student/{student_id}", get(list::student_allocation))
        .with_state(state)
}
