pub mod allocations;
pub mod bookings;
pub mod buses;
pub mod error;
pub mod health;
pub mod notifications;
pub mod routes;
pub mod tracking;
pub mod users;
pub mod ws;

pub use error::{
    allocation_error, bad_request, conflict, internal_error, not_found, ApiError, ErrorResponse,
};

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::tracker::LocationUpdateSender;

pub fn router(pool: SqlitePool, debug_errors: bool, updates_tx: LocationUpdateSender) -> Router {
    let ws_state = ws::LiveWsState {
        pool: pool.clone(),
        updates_tx,
    };

    Router::new()
        .nest("/buses", buses::router(pool.clone(), debug_errors))
        .nest("/bookings", bookings::router(pool.clone(), debug_errors))
        .nest("/allocations", allocations::router(pool.clone(), debug_errors))
        .nest("/routes", routes::router(pool.clone(), debug_errors))
        .nest("/tracking", tracking::router(pool.clone(), debug_errors))
        .nest("/notifications", notifications::router(pool.clone(), debug_errors))
        .nest("/users", users::router(pool.clone(), debug_errors))
        .nest("/health", health::router(pool))
        .route("/ws/live", get(ws::ws_live).with_state(ws_state))
}
