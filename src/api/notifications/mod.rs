pub mod admin;
pub mod list;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct NotificationsState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = NotificationsState { pool, debug_errors };
    Router::new()
        .route(
            "/",
            post(admin::create_notification).get(admin::list_all_notifications),
        )
        .route("/user/{user_id}", get(list::list_for_user))
        .route("/user/{user_id}/read-all", post(list::mark_all_read))
        .route("/{notification_id}/read", post(list::mark_one_read))
        .with_state(state)
}
