//! Periodic location simulation: advances each bus along its route on a
//! fixed interval and broadcasts the fresh snapshot to connected clients.

pub mod stops;

use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, watch};
use utoipa::ToSchema;

use crate::config::TrackerConfig;

/// One bus's live position joined with its fleet record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct BusLocation {
    pub bus_id: i64,
    pub bus_no: String,
    pub driver_name: Option<String>,
    pub route_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub current_stop: Option<String>,
    pub next_stop: Option<String>,
    pub eta: Option<String>,
    pub status: Option<String>,
    pub updated_at: String,
}

pub type LocationUpdateSender = broadcast::Sender<Vec<BusLocation>>;

/// Current snapshot of every tracked bus, ordered by bus id.
pub async fn live_feed(pool: &SqlitePool) -> Result<Vec<BusLocation>, sqlx::Error> {
    sqlx::query_as::<_, BusLocation>(
        "SELECT l.bus_id, b.bus_no, b.driver_name, b.route_name,
                l.latitude, l.longitude, l.current_stop, l.next_stop,
                l.eta, l.status, l.updated_at
         FROM locations l
         JOIN buses b ON l.bus_id = b.bus_id
         ORDER BY l.bus_id",
    )
    .fetch_all(pool)
    .await
}

/// The next persisted state for one bus.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancePlan {
    pub current_stop: String,
    pub next_stop: Option<String>,
    pub eta_text: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: &'static str,
}

/// Compute one advancement step for a bus between two named stops.
///
/// Returns None when either stop has no known coordinates. With the ETA at
/// the two-minute threshold the bus is treated as arrived at its next stop
/// and the route sequence supplies the stop after it; past the final stop the
/// next stop clears and the status flips to `Arrived`. The ETA text always
/// reflects the pre-advancement leg.
pub fn plan_advance(
    current_stop: &str,
    next_stop: &str,
    route_name: Option<&str>,
    speed_kmh: f64,
) -> Option<AdvancePlan> {
    let (lat1, lon1) = stops::stop_coordinates(current_stop)?;
    let (lat2, lon2) = stops::stop_coordinates(next_stop)?;

    let distance = stops::haversine_km(lat1, lon1, lat2, lon2);
    let eta = stops::eta_minutes(distance, speed_kmh);

    let mut new_current = current_stop;
    let mut new_next = Some(next_stop);
    let mut status = "On Route";

    if eta <= 2 {
        new_current = next_stop;
        let successor = route_name.and_then(stops::route_sequence).and_then(|seq| {
            let idx = seq.iter().position(|s| *s == new_current)?;
            seq.get(idx + 1).copied()
        });
        match successor {
            Some(stop) => new_next = Some(stop),
            None => {
                new_next = None;
                status = "Arrived";
            }
        }
    }

    let (latitude, longitude) = stops::stop_coordinates(new_current).unwrap_or((lat1, lon1));

    Some(AdvancePlan {
        current_stop: new_current.to_string(),
        next_stop: new_next.map(str::to_string),
        eta_text: new_next.map(|_| format!("{eta} min")),
        latitude,
        longitude,
        status,
    })
}

#[derive(Debug, sqlx::FromRow)]
struct TrackedBus {
    bus_id: i64,
    current_stop: Option<String>,
    next_stop: Option<String>,
    route_name: Option<String>,
}

/// Advance every tracked bus one step. A bus without a current/next stop
/// pair is skipped, and one bus's failure never aborts the rest. Returns the
/// number of buses whose location row was rewritten.
pub async fn advance_all(pool: &SqlitePool, speed_kmh: f64) -> Result<u32, sqlx::Error> {
    let rows = sqlx::query_as::<_, TrackedBus>(
        "SELECT l.bus_id, l.current_stop, l.next_stop, b.route_name
         FROM locations l
         JOIN buses b ON b.bus_id = l.bus_id",
    )
    .fetch_all(pool)
    .await?;

    let mut updated = 0;
    for row in rows {
        let (Some(current), Some(next)) = (row.current_stop.as_deref(), row.next_stop.as_deref())
        else {
            continue;
        };

        let Some(plan) = plan_advance(current, next, row.route_name.as_deref(), speed_kmh) else {
            tracing::warn!(
                bus_id = row.bus_id,
                current_stop = current,
                next_stop = next,
                "Stop coordinates not found, skipping bus"
            );
            continue;
        };

        if let Err(e) = apply_advance(pool, row.bus_id, &plan).await {
            tracing::warn!(error = %e, bus_id = row.bus_id, "Failed to persist location update");
            continue;
        }
        updated += 1;
    }
    Ok(updated)
}

async fn apply_advance(pool: &SqlitePool, bus_id: i64, plan: &AdvancePlan) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE locations
         SET current_stop = ?, next_stop = ?, eta = ?, latitude = ?, longitude = ?,
             status = ?, updated_at = datetime('now')
         WHERE bus_id = ?",
    )
    .bind(&plan.current_stop)
    .bind(&plan.next_stop)
    .bind(&plan.eta_text)
    .bind(plan.latitude)
    .bind(plan.longitude)
    .bind(plan.status)
    .bind(bus_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Owns the advancement loop and the snapshot broadcast channel.
pub struct TrackerManager {
    pool: SqlitePool,
    config: TrackerConfig,
    updates_tx: LocationUpdateSender,
}

impl TrackerManager {
    pub fn new(pool: SqlitePool, config: TrackerConfig) -> Self {
        let (updates_tx, _) = broadcast::channel(16);
        Self {
            pool,
            config,
            updates_tx,
        }
    }

    pub fn updates_sender(&self) -> LocationUpdateSender {
        self.updates_tx.clone()
    }

    /// Tick until the shutdown flag flips. The first tick fires immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            speed_kmh = self.config.speed_kmh,
            "Starting location tracker"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Location tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Location tracker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One advancement pass followed by a snapshot broadcast.
    pub async fn tick(&self) -> Result<(), sqlx::Error> {
        let updated = advance_all(&self.pool, self.config.speed_kmh).await?;
        if updated > 0 {
            tracing::debug!(buses = updated, "Advanced bus locations");
        }
        let snapshot = live_feed(&self.pool).await?;
        // Send only fails when no client is subscribed.
        let _ = self.updates_tx.send(snapshot);
        Ok(())
    }
}
