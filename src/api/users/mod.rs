pub mod list;
pub mod profile;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct UsersState {
    pub pool: SqlitePool,
    pub debug_errors: bool,
}

pub fn router(pool: SqlitePool, debug_errors: bool) -> Router {
    let state = UsersState { pool, debug_errors };
    Router::new()
        .route("/", post(profile::register_user).get(list::list_users))
        .route(
            "/{user_id}",
            get(profile::get_profile).put(profile::update_profile),
        )
        .with_state(state)
}
