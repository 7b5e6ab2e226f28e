pub mod admin;
pub mod create;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct BookingsState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = BookingsState { pool, debug_errors };
    Router::new()
        .route("/", post(create::create_booking).get(admin::list_all_bookings))
        .route("/pending", get(admin::list_pending_bookings))
        .route("/{booking_id}/approve", post(admin::approve_booking))
        .route("/{booking_id}/reject", post(admin::reject_booking))
        .with_state(state)
}
