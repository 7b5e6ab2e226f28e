//! Shared fixtures for database-backed tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// In-memory database with migrations applied and demo seed rows removed.
/// A single connection keeps every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    crate::MIGRATOR.run(&pool).await.expect("run migrations");

    for table in [
        "notification_reads",
        "notifications",
        "bus_assignments",
        "allocations",
        "bookings",
        "locations",
        "driver_info",
        "stops",
        "routes",
        "buses",
        "users",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&pool)
            .await
            .expect("clear seeded table");
    }

    pool
}

pub async fn insert_student(pool: &SqlitePool, name: &str, user_type: &str) -> i64 {
    let email = format!("{}@example.edu", name.to_lowercase().replace(' ', "."));
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, role, type) VALUES (?, ?, 'student', ?)
         RETURNING user_id",
    )
    .bind(name)
    .bind(email)
    .bind(user_type)
    .fetch_one(pool)
    .await
    .expect("insert student")
}

pub async fn insert_admin(pool: &SqlitePool, name: &str) -> i64 {
    let email = format!("{}@example.edu", name.to_lowercase().replace(' ', "."));
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, role) VALUES (?, ?, 'admin') RETURNING user_id",
    )
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await
    .expect("insert admin")
}

pub async fn insert_bus(pool: &SqlitePool, bus_no: &str, capacity: Option<i64>) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO buses (bus_no, capacity, status) VALUES (?, ?, 'active')
         RETURNING bus_id",
    )
    .bind(bus_no)
    .bind(capacity)
    .fetch_one(pool)
    .await
    .expect("insert bus")
}

pub async fn insert_bus_on_route(pool: &SqlitePool, bus_no: &str, route_name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO buses (bus_no, driver_name, route_name, capacity, status)
         VALUES (?, 'Test Driver', ?, 40, 'active')
         RETURNING bus_id",
    )
    .bind(bus_no)
    .bind(route_name)
    .fetch_one(pool)
    .await
    .expect("insert bus with route")
}

pub async fn insert_allocation(pool: &SqlitePool, student_id: i64, bus_id: i64) {
    sqlx::query("INSERT INTO allocations (student_id, bus_id) VALUES (?, ?)")
        .bind(student_id)
        .bind(bus_id)
        .execute(pool)
        .await
        .expect("insert allocation");
}

pub async fn insert_location(
    pool: &SqlitePool,
    bus_id: i64,
    current_stop: Option<&str>,
    next_stop: Option<&str>,
) {
    sqlx::query(
        "INSERT INTO locations (bus_id, current_stop, next_stop, status)
         VALUES (?, ?, ?, 'On Route')",
    )
    .bind(bus_id)
    .bind(current_stop)
    .bind(next_stop)
    .execute(pool)
    .await
    .expect("insert location");
}
