pub mod api;
mod allocation;
mod config;
mod notify;
mod seed;
#[cfg(test)]
mod testutil;
mod tracker;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "dev-tools")]
use axum_sql_viewer::SqlViewerLayer;
#[cfg(feature = "dev-tools")]
use tracing_web_console::TracingLayer;

use config::Config;
use tracker::TrackerManager;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(OpenApi)]
#[openapi(
    info(title = "Campus Bus API", version = "0.1.0"),
    paths(
        api::buses::list::list_buses,
        api::buses::status::get_bus_status,
        api::buses::status::check_availability,
        api::bookings::create::create_booking,
        api::bookings::admin::list_pending_bookings,
        api::bookings::admin::list_all_bookings,
        api::bookings::admin::approve_booking,
        api::bookings::admin::reject_booking,
        api::allocations::list::list_allocations,
        api::allocations::list::student_allocation,
        api::routes::list::list_routes,
        api::routes::list::seed_routes,
        api::routes::list::get_route_stops,
        api::routes::timeline::bus_timeline,
        api::tracking::live::live_positions,
        api::tracking::live::bus_position,
        api::notifications::admin::create_notification,
        api::notifications::admin::list_all_notifications,
        api::notifications::list::list_for_user,
        api::notifications::list::mark_one_read,
        api::notifications::list::mark_all_read,
        api::users::profile::register_user,
        api::users::profile::get_profile,
        api::users::profile::update_profile,
        api::users::list::list_users,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::buses::list::BusSummary,
        api::buses::status::BusStatusResponse,
        api::buses::status::AvailabilityResponse,
        api::bookings::create::CreateBookingRequest,
        api::bookings::admin::PendingBooking,
        api::bookings::admin::BookingDetail,
        allocation::Booking,
        allocation::Assignment,
        api::allocations::list::AllocationDetail,
        api::allocations::list::AllocatedBus,
        api::allocations::list::StudentAllocationResponse,
        api::routes::list::RouteInfo,
        api::routes::list::RouteHeader,
        api::routes::list::StopInfo,
        api::routes::list::RouteStopsResponse,
        api::routes::list::SeedResponse,
        api::routes::timeline::TimelineRoute,
        api::routes::timeline::TimelineResponse,
        api::tracking::live::TrackingPosition,
        tracker::BusLocation,
        notify::Audience,
        notify::Severity,
        api::notifications::admin::CreateNotificationRequest,
        api::notifications::admin::CreatedResponse,
        api::notifications::admin::Notification,
        api::notifications::list::UserNotification,
        api::notifications::list::ReaderBody,
        api::notifications::list::OkResponse,
        api::notifications::list::UpdatedResponse,
        api::users::profile::RegisterRequest,
        api::users::profile::Profile,
        api::users::profile::UpdateProfileRequest,
        api::users::list::UserSummary,
        api::health::HealthResponse,
    )),
    tags(
        (name = "buses", description = "Fleet listing and per-bus status"),
        (name = "bookings", description = "Bus requests and admin decisions"),
        (name = "allocations", description = "Seat allocations"),
        (name = "routes", description = "Route catalogue and stop timelines"),
        (name = "tracking", description = "Live bus positions"),
        (name = "notifications", description = "Notification feed"),
        (name = "users", description = "Accounts and profiles"),
        (name = "health", description = "Liveness check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Config
    let config = Config::load("config.yaml").expect("Failed to load config.yaml");
    config.tracker.validate();
    tracing::info!(bind_addr = %config.bind_addr, "Loaded configuration");

    // CORS policy comes from config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: permissive mode enabled, every origin is allowed - development only");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: allowlist mode");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS is not configured: set 'cors_origins' to an allowlist, or 'cors_permissive: true' for local development");
    };

    // The data directory may not exist on a fresh checkout
    if let Err(e) = std::fs::create_dir_all("database") {
        tracing::warn!(error = %e, "Could not create database directory");
    }
    let pool = SqlitePool::connect(&config.database_url)
        .await
        .expect("Failed to open SQLite pool");

    tracing::info!(migrations = MIGRATOR.migrations.len(), "Found migrations");
    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Schema is up to date");

    // Start the location tracker in the background
    let tracker = TrackerManager::new(pool.clone(), config.tracker.clone());
    let updates_tx = tracker.updates_sender();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tracker_handle = tokio::spawn(async move {
        tracker.run(shutdown_rx).await;
    });

    // Assemble the router
    #[allow(unused_mut)] // reassigned only when dev-tools is enabled
    let mut app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(pool.clone(), config.debug_errors, updates_tx))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Feature-gated dev tools
    #[cfg(feature = "dev-tools")]
    {
        let console = TracingLayer::new("/tracing");
        app = app
            .merge(SqlViewerLayer::sqlite("/sql-viewer", pool.clone()).into_router())
            .merge(console.into_router());
        tracing::warn!("Dev tools mounted at /sql-viewer and /tracing");
    }

    // Serve until ctrl-c
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!("Server running on http://{}", config.bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui", config.bind_addr);
    #[cfg(feature = "dev-tools")]
    {
        tracing::info!("SQL Viewer: http://{}/sql-viewer", config.bind_addr);
        tracing::info!("Tracing Console: http://{}/tracing", config.bind_addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Received shutdown signal");
        })
        .await
        .expect("Failed to start server");

    // Stop the tracker and give it time to finish the current tick.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(std::time::Duration::from_secs(5), tracker_handle)
        .await
        .is_err()
    {
        tracing::warn!("Location tracker did not shut down in time");
    }
    tracing::info!("Shutdown complete");
}

async fn root() -> &'static str {
    "Campus Bus API"
}
