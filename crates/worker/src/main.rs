//! Maintenance worker: runs the session sweeper against PostgreSQL.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vega_auth::background::session_sweeper;
use vega_auth::config::{AuthConfig, SweeperConfig};
use vega_auth::session::SessionManager;
use vega_core::clock::SystemClock;
use vega_db::store::PgSessionStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vega_worker=debug,vega_auth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AuthConfig::from_env();
    let sweeper_config = SweeperConfig::from_env();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vega_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vega_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    vega_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Session sweeper ---
    let sessions = Arc::new(SessionManager::new(
        Arc::new(PgSessionStore::new(pool)),
        Arc::new(SystemClock),
        config.max_sessions_per_user,
        config.session_retention_days,
    ));

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(session_sweeper::run(
        sessions,
        sweeper_config,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = sweeper.await;
}
