use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::BusesState;
use crate::allocation;
use crate::api::{internal_error, ApiError, ErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct BusSummary {
    pub bus_id: i64,
    pub bus_no: String,
    pub driver_name: Option<String>,
    pub route_name: Option<String>,
    pub capacity: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: String,
    /// Allocation rows plus approved bookings for this bus
    pub occupied: i64,
    /// Seats remaining under the effective capacity, floored at zero
    pub seats_left: i64,
    /// "available" or "full"
    pub availability: String,
}

#[derive(Debug, FromRow)]
struct BusRow {
    bus_id: i64,
    bus_no: String,
    driver_name: Option<String>,
    route_name: Option<String>,
    capacity: Option<i64>,
    start_time: Option<String>,
    end_time: Option<String>,
    status: String,
    occupied: i64,
}

/// List assignable buses with occupancy and seat availability
#[utoipa::path(
    get,
    path = "/api/buses",
    responses(
        (status = 200, description = "Buses that are not inactive, with seat availability", body = [BusSummary]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn list_buses(
    State(state): State<BusesState>,
) -> Result<Json<Vec<BusSummary>>, ApiError> {
    let rows: Vec<BusRow> = sqlx::query_as(
        "SELECT
             b.bus_id, b.bus_no, b.driver_name, b.route_name, b.capacity,
             b.start_time, b.end_time, b.status,
             COALESCE(a.cnt, 0) + COALESCE(ap.cnt, 0) AS occupied
         FROM buses b
         LEFT JOIN (
             SELECT bus_id, COUNT(*) AS cnt FROM allocations GROUP BY bus_id
         ) a ON a.bus_id = b.bus_id
         LEFT JOIN (
             SELECT bus_id, COUNT(*) AS cnt FROM bookings WHERE status = 'approved' GROUP BY bus_id
         ) ap ON ap.bus_id = b.bus_id
         WHERE b.status != 'inactive'
         ORDER BY b.bus_no ASC",
    )
    .fetch_all(&state.pool)
    .await
    .map_err(|e| internal_error(state.debug_errors, e))?;

    let buses = rows
        .into_iter()
        .map(|r| {
            let seats_left = (allocation::effective_capacity(r.capacity) - r.occupied).max(0);
            let availability = if seats_left <= 0 { "full" } else { "available" };
            BusSummary {
                bus_id: r.bus_id,
                bus_no: r.bus_no,
                driver_name: r.driver_name,
                route_name: r.route_name,
                capacity: r.capacity,
                start_time: r.start_time,
                end_time: r.end_time,
                status: r.status,
                occupied: r.occupied,
                seats_left,
                availability: availability.to_string(),
            }
        })
        .collect();

    Ok(Json(buses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn test_occupancy_and_availability_are_computed() {
        let pool = testutil::test_pool().await;
        let small = testutil::insert_bus(&pool, "A-1", Some(1)).await;
        let large = testutil::insert_bus(&pool, "B-2", Some(10)).await;
        let unbounded = testutil::insert_bus(&pool, "C-3", None).await;
        let rider = testutil::insert_student(&pool, "Rider", "hostel").await;
        testutil::insert_allocation(&pool, rider, small).await;

        let state = BusesState {
            pool,
            debug_errors: false,
        };
        let Json(buses) = list_buses(State(state)).await.unwrap();
        assert_eq!(buses.len(), 3);

        let by_id = |id: i64| buses.iter().find(|b| b.bus_id == id).unwrap();
        assert_eq!(by_id(small).occupied, 1);
        assert_eq!(by_id(small).seats_left, 0);
        assert_eq!(by_id(small).availability, "full");
        assert_eq!(by_id(large).seats_left, 10);
        assert_eq!(by_id(large).availability, "available");
        // Missing capacity counts as effectively unbounded.
        assert!(by_id(unbounded).seats_left > 9000);
    }

    #[tokio::test]
    async fn test_inactive_buses_are_hidden() {
        let pool = testutil::test_pool().await;
        testutil::insert_bus(&pool, "A-1", Some(10)).await;
        sqlx::query("INSERT INTO buses (bus_no, status) VALUES ('Z-9', 'inactive')")
            .execute(&pool)
            .await
            .unwrap();

        let state = BusesState {
            pool,
            debug_errors: false,
        };
        let Json(buses) = list_buses(State(state)).await.unwrap();
        assert_eq!(buses.len(), 1);
        assert_eq!(buses[0].bus_no, "A-1");
    }
}
