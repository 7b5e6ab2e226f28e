//! Booking lifecycle and the capacity-aware bus matcher.

use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::notify::{self, Severity};

/// Capacity applied when a bus has no usable capacity value.
pub const UNBOUNDED_CAPACITY: i64 = 9999;

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Booking {0} not found")]
    BookingNotFound(i64),
    #[error("Student {0} not found")]
    StudentNotFound(i64),
    #[error("Bus {0} not found")]
    BusNotFound(i64),
    #[error("Student already has a pending booking (booking {0})")]
    DuplicatePending(i64),
    #[error("No active bus available")]
    NoBusAvailable,
    #[error("No bus with free capacity")]
    NoCapacity,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A bus with its current occupancy. Occupancy sums allocation rows and
/// approved bookings; a student holding both counts twice.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusLoad {
    pub bus_id: i64,
    pub capacity: Option<i64>,
    pub occupied: i64,
}

const BUS_LOADS_SQL: &str = r#"
SELECT
    b.bus_id,
    b.capacity,
    COALESCE(a.cnt, 0) + COALESCE(ap.cnt, 0) AS occupied
FROM buses b
LEFT JOIN (
    SELECT bus_id, COUNT(*) AS cnt FROM allocations GROUP BY bus_id
) a ON a.bus_id = b.bus_id
LEFT JOIN (
    SELECT bus_id, COUNT(*) AS cnt FROM bookings WHERE status = 'approved' GROUP BY bus_id
) ap ON ap.bus_id = b.bus_id
WHERE b.status != 'inactive'
ORDER BY occupied ASC, b.bus_id ASC
"#;

/// Load every assignable bus with its occupancy, least loaded first.
pub async fn bus_loads(
    db: impl sqlx::Executor<'_, Database = sqlx::Sqlite>,
) -> Result<Vec<BusLoad>, sqlx::Error> {
    sqlx::query_as::<_, BusLoad>(BUS_LOADS_SQL).fetch_all(db).await
}

/// Effective seat count: missing or non-positive capacity means unbounded.
pub fn effective_capacity(capacity: Option<i64>) -> i64 {
    match capacity {
        Some(c) if c > 0 => c,
        _ => UNBOUNDED_CAPACITY,
    }
}

fn has_room(load: &BusLoad) -> bool {
    load.occupied < effective_capacity(load.capacity)
}

/// Pick a bus for assignment. An available preferred bus wins regardless of
/// rank; otherwise the first candidate with room (candidates arrive least
/// loaded first, ties broken by bus id).
pub fn pick_bus(candidates: &[BusLoad], preferred: Option<i64>) -> Option<i64> {
    if let Some(want) = preferred {
        if candidates.iter().any(|c| c.bus_id == want && has_room(c)) {
            return Some(want);
        }
    }
    candidates.iter().find(|c| has_room(c)).map(|c| c.bus_id)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Booking {
    pub booking_id: i64,
    pub student_id: i64,
    pub bus_id: Option<i64>,
    pub status: String,
    pub created_at: String,
}

/// Outcome of a successful approval.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Assignment {
    pub booking_id: i64,
    pub student_id: i64,
    pub bus_id: i64,
}

/// Create a pending booking for a student. At most one pending booking per
/// student is allowed. When no bus id is given, the request targets a bus
/// matched by preferred departure time, falling back to any active bus.
pub async fn create_request(
    pool: &SqlitePool,
    student_id: i64,
    bus_id: Option<i64>,
    preferred_time: Option<&str>,
) -> Result<Booking, AllocationError> {
    let student = sqlx::query_scalar::<_, i64>("SELECT user_id FROM users WHERE user_id = ?")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
    if student.is_none() {
        return Err(AllocationError::StudentNotFound(student_id));
    }

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT booking_id FROM bookings WHERE student_id = ? AND status = 'pending' LIMIT 1",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;
    if let Some(existing) = pending {
        return Err(AllocationError::DuplicatePending(existing));
    }

    let target_bus = resolve_target_bus(pool, bus_id, preferred_time).await?;

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (student_id, bus_id, status) VALUES (?, ?, 'pending')
         RETURNING booking_id, student_id, bus_id, status, created_at",
    )
    .bind(student_id)
    .bind(target_bus)
    .fetch_one(pool)
    .await?;

    let message = format!("New bus request from student {student_id}");
    if let Err(e) = notify::to_admins(pool, &message).await {
        tracing::warn!(error = %e, student_id, "Failed to queue admin notification");
    }

    Ok(booking)
}

async fn resolve_target_bus(
    pool: &SqlitePool,
    bus_id: Option<i64>,
    preferred_time: Option<&str>,
) -> Result<i64, AllocationError> {
    if let Some(id) = bus_id {
        let exists = sqlx::query_scalar::<_, i64>("SELECT bus_id FROM buses WHERE bus_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        return exists.ok_or(AllocationError::BusNotFound(id));
    }

    if let Some(time) = preferred_time {
        let by_time = sqlx::query_scalar::<_, i64>(
            "SELECT bus_id FROM buses
             WHERE status = 'active' AND available_time IS NOT NULL
               AND instr(available_time, ?) > 0
             ORDER BY bus_id LIMIT 1",
        )
        .bind(time)
        .fetch_optional(pool)
        .await?;
        if let Some(id) = by_time {
            return Ok(id);
        }
    }

    sqlx::query_scalar::<_, i64>(
        "SELECT bus_id FROM buses WHERE status = 'active' ORDER BY bus_id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or(AllocationError::NoBusAvailable)
}

/// Approve a booking: pick a bus with room, mark the booking approved and
/// upsert the student's allocation. Occupancy is recomputed inside the same
/// transaction that writes the assignment. The audit row and the student
/// notification are written afterwards and never fail the approval.
pub async fn approve(pool: &SqlitePool, booking_id: i64) -> Result<Assignment, AllocationError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>(
        "SELECT booking_id, student_id, bus_id, status, created_at
         FROM bookings WHERE booking_id = ?",
    )
    .bind(booking_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AllocationError::BookingNotFound(booking_id))?;

    let candidates = bus_loads(&mut *tx).await?;
    let bus_id = pick_bus(&candidates, booking.bus_id).ok_or(AllocationError::NoCapacity)?;

    sqlx::query("UPDATE bookings SET status = 'approved', bus_id = ? WHERE booking_id = ?")
        .bind(bus_id)
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO allocations (student_id, bus_id) VALUES (?, ?)
         ON CONFLICT(student_id) DO UPDATE SET
             bus_id = excluded.bus_id,
             updated_at = datetime('now')",
    )
    .bind(booking.student_id)
    .bind(bus_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if let Err(e) = record_assignment(pool, booking.student_id, bus_id, booking_id).await {
        tracing::warn!(error = %e, booking_id, "Failed to record assignment audit row");
    }
    let message = format!("Your request is approved. Assigned bus {bus_id}.");
    if let Err(e) = notify::to_user(pool, booking.student_id, &message, Severity::Success).await {
        tracing::warn!(
            error = %e,
            student_id = booking.student_id,
            "Failed to queue student notification"
        );
    }

    Ok(Assignment {
        booking_id,
        student_id: booking.student_id,
        bus_id,
    })
}

/// Reject a booking. No capacity check and no allocation change; the student
/// is notified on a best-effort basis.
pub async fn reject(pool: &SqlitePool, booking_id: i64) -> Result<Booking, AllocationError> {
    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = 'rejected' WHERE booking_id = ?
         RETURNING booking_id, student_id, bus_id, status, created_at",
    )
    .bind(booking_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AllocationError::BookingNotFound(booking_id))?;

    if let Err(e) = notify::to_user(
        pool,
        booking.student_id,
        "Your bus request has been rejected",
        Severity::Error,
    )
    .await
    {
        tracing::warn!(
            error = %e,
            student_id = booking.student_id,
            "Failed to queue student notification"
        );
    }

    Ok(booking)
}

/// Day scholars get a default allocation on first lookup: the first bus by
/// id, with no capacity check. Returns the assigned bus id, or None when the
/// fleet is empty.
pub async fn ensure_day_scholar_allocation(
    pool: &SqlitePool,
    student_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let bus = sqlx::query_scalar::<_, i64>("SELECT bus_id FROM buses ORDER BY bus_id ASC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    let Some(bus_id) = bus else {
        return Ok(None);
    };
    sqlx::query("INSERT INTO allocations (student_id, bus_id) VALUES (?, ?)")
        .bind(student_id)
        .bind(bus_id)
        .execute(pool)
        .await?;
    Ok(Some(bus_id))
}

async fn record_assignment(
    pool: &SqlitePool,
    student_id: i64,
    bus_id: i64,
    booking_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO bus_assignments (student_id, bus_id, booking_id) VALUES (?, ?, ?)")
        .bind(student_id)
        .bind(bus_id)
        .bind(booking_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn load(bus_id: i64, capacity: Option<i64>, occupied: i64) -> BusLoad {
        BusLoad {
            bus_id,
            capacity,
            occupied,
        }
    }

    #[test]
    fn test_missing_or_invalid_capacity_is_unbounded() {
        assert_eq!(effective_capacity(None), UNBOUNDED_CAPACITY);
        assert_eq!(effective_capacity(Some(0)), UNBOUNDED_CAPACITY);
        assert_eq!(effective_capacity(Some(-3)), UNBOUNDED_CAPACITY);
        assert_eq!(effective_capacity(Some(40)), 40);
    }

    #[test]
    fn test_least_loaded_bus_wins_without_preference() {
        let candidates = vec![load(2, Some(5), 0), load(1, Some(5), 2)];
        assert_eq!(pick_bus(&candidates, None), Some(2));
    }

    #[test]
    fn test_available_preferred_bus_wins_over_rank() {
        let candidates = vec![load(2, Some(5), 0), load(1, Some(5), 2)];
        assert_eq!(pick_bus(&candidates, Some(1)), Some(1));
    }

    #[test]
    fn test_full_preferred_bus_falls_back_to_alternate() {
        let candidates = vec![load(2, Some(5), 1), load(1, Some(2), 2)];
        assert_eq!(pick_bus(&candidates, Some(1)), Some(2));
    }

    #[test]
    fn test_no_bus_when_everything_is_full() {
        let candidates = vec![load(1, Some(1), 1), load(2, Some(2), 2)];
        assert_eq!(pick_bus(&candidates, Some(1)), None);
        assert_eq!(pick_bus(&candidates, None), None);
    }

    #[tokio::test]
    async fn test_pending_booking_blocks_a_second_request() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Asha", "hostel").await;
        testutil::insert_bus(&pool, "BUS-1", Some(10)).await;

        let first = create_request(&pool, student, None, None).await.unwrap();
        assert_eq!(first.status, "pending");

        let err = create_request(&pool, student, None, None).await.unwrap_err();
        match err {
            AllocationError::DuplicatePending(id) => assert_eq!(id, first.booking_id),
            other => panic!("unexpected error: {other:?}"),
        }

        // Once decided, a new request is allowed again.
        reject(&pool, first.booking_id).await.unwrap();
        create_request(&pool, student, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_resolves_bus_by_preferred_time() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Meera", "hostel").await;
        let early = testutil::insert_bus(&pool, "BUS-1", Some(10)).await;
        let late = testutil::insert_bus(&pool, "BUS-2", Some(10)).await;
        sqlx::query("UPDATE buses SET available_time = '07:30 AM' WHERE bus_id = ?")
            .bind(early)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE buses SET available_time = '08:15 AM' WHERE bus_id = ?")
            .bind(late)
            .execute(&pool)
            .await
            .unwrap();

        let booking = create_request(&pool, student, None, Some("08:15"))
            .await
            .unwrap();
        assert_eq!(booking.bus_id, Some(late));
    }

    #[tokio::test]
    async fn test_missing_student_and_missing_bus_are_reported() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Kiran", "hostel").await;

        let err = create_request(&pool, 999, None, None).await.unwrap_err();
        assert!(matches!(err, AllocationError::StudentNotFound(999)));

        let err = create_request(&pool, student, Some(42), None).await.unwrap_err();
        assert!(matches!(err, AllocationError::BusNotFound(42)));

        // No buses at all: nothing to target.
        let err = create_request(&pool, student, None, None).await.unwrap_err();
        assert!(matches!(err, AllocationError::NoBusAvailable));
    }

    #[tokio::test]
    async fn test_approval_assigns_least_loaded_bus() {
        let pool = testutil::test_pool().await;
        let busy = testutil::insert_bus(&pool, "BUS-1", Some(5)).await;
        let idle = testutil::insert_bus(&pool, "BUS-2", Some(5)).await;
        for i in 0..2 {
            let rider = testutil::insert_student(&pool, &format!("Rider{i}"), "hostel").await;
            testutil::insert_allocation(&pool, rider, busy).await;
        }

        let student = testutil::insert_student(&pool, "Nikhil", "hostel").await;
        let booking = sqlx::query_scalar::<_, i64>(
            "INSERT INTO bookings (student_id, status) VALUES (?, 'pending') RETURNING booking_id",
        )
        .bind(student)
        .fetch_one(&pool)
        .await
        .unwrap();

        let assignment = approve(&pool, booking).await.unwrap();
        assert_eq!(assignment.bus_id, idle);

        let (status, bus_id): (String, i64) =
            sqlx::query_as("SELECT status, bus_id FROM bookings WHERE booking_id = ?")
                .bind(booking)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "approved");
        assert_eq!(bus_id, idle);

        let allocated: i64 =
            sqlx::query_scalar("SELECT bus_id FROM allocations WHERE student_id = ?")
                .bind(student)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(allocated, idle);
    }

    #[tokio::test]
    async fn test_full_preferred_bus_is_never_assigned() {
        let pool = testutil::test_pool().await;
        let full = testutil::insert_bus(&pool, "BUS-1", Some(1)).await;
        let open = testutil::insert_bus(&pool, "BUS-2", Some(5)).await;
        let occupant = testutil::insert_student(&pool, "Occupant", "hostel").await;
        testutil::insert_allocation(&pool, occupant, full).await;

        let student = testutil::insert_student(&pool, "Pooja", "hostel").await;
        let booking = sqlx::query_scalar::<_, i64>(
            "INSERT INTO bookings (student_id, bus_id, status) VALUES (?, ?, 'pending')
             RETURNING booking_id",
        )
        .bind(student)
        .bind(full)
        .fetch_one(&pool)
        .await
        .unwrap();

        let assignment = approve(&pool, booking).await.unwrap();
        assert_eq!(assignment.bus_id, open);
    }

    #[tokio::test]
    async fn test_approval_fails_when_no_seat_is_left() {
        let pool = testutil::test_pool().await;
        let only = testutil::insert_bus(&pool, "BUS-1", Some(1)).await;
        let occupant = testutil::insert_student(&pool, "Occupant", "hostel").await;
        testutil::insert_allocation(&pool, occupant, only).await;

        let student = testutil::insert_student(&pool, "Tara", "hostel").await;
        let booking = create_request(&pool, student, None, None).await.unwrap();

        let err = approve(&pool, booking.booking_id).await.unwrap_err();
        assert!(matches!(err, AllocationError::NoCapacity));

        // Booking must stay pending, nothing allocated.
        let status: String = sqlx::query_scalar("SELECT status FROM bookings WHERE booking_id = ?")
            .bind(booking.booking_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "pending");
        let allocations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM allocations WHERE student_id = ?")
                .bind(student)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(allocations, 0);
    }

    #[tokio::test]
    async fn test_approving_missing_booking_is_not_found() {
        let pool = testutil::test_pool().await;
        let err = approve(&pool, 123).await.unwrap_err();
        assert!(matches!(err, AllocationError::BookingNotFound(123)));
        let err = reject(&pool, 123).await.unwrap_err();
        assert!(matches!(err, AllocationError::BookingNotFound(123)));
    }

    #[tokio::test]
    async fn test_rejection_never_touches_allocations() {
        let pool = testutil::test_pool().await;
        testutil::insert_bus(&pool, "BUS-1", Some(5)).await;
        let student = testutil::insert_student(&pool, "Vikram", "hostel").await;
        let booking = create_request(&pool, student, None, None).await.unwrap();

        let rejected = reject(&pool, booking.booking_id).await.unwrap();
        assert_eq!(rejected.status, "rejected");

        let allocations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM allocations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(allocations, 0);
    }

    #[tokio::test]
    async fn test_reapproval_overwrites_the_allocation_row() {
        let pool = testutil::test_pool().await;
        let first = testutil::insert_bus(&pool, "BUS-1", Some(5)).await;
        let second = testutil::insert_bus(&pool, "BUS-2", Some(5)).await;
        let student = testutil::insert_student(&pool, "Ritu", "hostel").await;

        let booking = create_request(&pool, student, Some(first), None).await.unwrap();
        approve(&pool, booking.booking_id).await.unwrap();

        // A later booking explicitly for the other bus reassigns the student.
        let rebooking = sqlx::query_scalar::<_, i64>(
            "INSERT INTO bookings (student_id, bus_id, status) VALUES (?, ?, 'pending')
             RETURNING booking_id",
        )
        .bind(student)
        .bind(second)
        .fetch_one(&pool)
        .await
        .unwrap();
        approve(&pool, rebooking).await.unwrap();

        let rows: Vec<(i64,)> = sqlx::query_as("SELECT bus_id FROM allocations WHERE student_id = ?")
            .bind(student)
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows, vec![(second,)]);
    }

    #[tokio::test]
    async fn test_day_scholar_default_assignment_takes_first_bus() {
        let pool = testutil::test_pool().await;
        let student = testutil::insert_student(&pool, "Dev", "day_scholar").await;

        assert_eq!(
            ensure_day_scholar_allocation(&pool, student).await.unwrap(),
            None
        );

        let first = testutil::insert_bus(&pool, "BUS-1", Some(5)).await;
        testutil::insert_bus(&pool, "BUS-2", Some(5)).await;
        assert_eq!(
            ensure_day_scholar_allocation(&pool, student).await.unwrap(),
            Some(first)
        );
    }
}
