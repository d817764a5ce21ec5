//! Periodic deletion of expired and stale-revoked sessions.
//!
//! Spawns a loop that calls [`SessionManager::sweep_expired`] on a fixed
//! interval using `tokio::time::interval`. Sweep failures are logged and
//! retried on the next tick; they are never fatal. Request handling does
//! not depend on this task -- expired sessions are also revoked lazily on
//! lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::SweeperConfig;
use crate::session::SessionManager;

/// Run the session sweep loop.
///
/// Returns immediately when the sweeper is disabled (test mode). Runs
/// until `cancel` is triggered otherwise.
pub async fn run(sessions: Arc<SessionManager>, config: SweeperConfig, cancel: CancellationToken) {
    if !config.enabled {
        tracing::info!("Session sweeper disabled");
        return;
    }

    tracing::info!(
        interval_secs = config.interval_secs,
        "Session sweeper started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                match sessions.sweep_expired().await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Session sweep: purged dead sessions");
                        } else {
                            tracing::debug!("Session sweep: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Session sweep failed; will retry next tick");
                    }
                }
            }
        }
    }
}
