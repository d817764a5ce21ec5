//! Auth configuration structs.
//!
//! Everything is loaded once (typically via `from_env` in a binary, after
//! `dotenvy`) and injected by value. Nothing in this crate reads the
//! environment after construction.

use crate::jwt::JwtConfig;

/// Default cap on concurrent sessions per user.
const DEFAULT_MAX_SESSIONS: usize = 5;

/// Default retention for revoked sessions before the sweep deletes them.
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Configuration for the auth service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token signing configuration.
    pub jwt: JwtConfig,
    /// Maximum concurrent sessions per user (default: 5). Oldest-created
    /// sessions are evicted beyond this cap.
    pub max_sessions_per_user: usize,
    /// Days a revoked session is retained before the sweep removes it
    /// (default: 30).
    pub session_retention_days: i64,
    /// Whether issued cookies should carry the `Secure` attribute
    /// (true in production).
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Load auth configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `MAX_SESSIONS_PER_USER`  | no       | `5`     |
    /// | `SESSION_RETENTION_DAYS` | no       | `30`    |
    /// | `APP_ENV`                | no       | `development` |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics if a set variable fails to parse, or if `JWT_SECRET` is
    /// missing (see [`JwtConfig::from_env`]).
    pub fn from_env() -> Self {
        let max_sessions_per_user: usize = std::env::var("MAX_SESSIONS_PER_USER")
            .unwrap_or_else(|_| DEFAULT_MAX_SESSIONS.to_string())
            .parse()
            .expect("MAX_SESSIONS_PER_USER must be a valid usize");

        let session_retention_days: i64 = std::env::var("SESSION_RETENTION_DAYS")
            .unwrap_or_else(|_| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .expect("SESSION_RETENTION_DAYS must be a valid i64");

        let secure_cookies =
            std::env::var("APP_ENV").map(|e| e == "production").unwrap_or(false);

        Self {
            jwt: JwtConfig::from_env(),
            max_sessions_per_user,
            session_retention_days,
            secure_cookies,
        }
    }
}

/// Configuration for the background session sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Whether the sweeper runs at all. Disabled in test mode so test
    /// runs stay deterministic.
    pub enabled: bool,
    /// Seconds between sweeps (default: 3600).
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
        }
    }
}

impl SweeperConfig {
    /// Load sweeper configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default |
    /// |-------------------------|----------|---------|
    /// | `SESSION_SWEEP_ENABLED` | no       | `true`  |
    /// | `SESSION_SWEEP_SECS`    | no       | `3600`  |
    pub fn from_env() -> Self {
        let enabled = std::env::var("SESSION_SWEEP_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs: u64 = std::env::var("SESSION_SWEEP_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("SESSION_SWEEP_SECS must be a valid u64");

        Self {
            enabled,
            interval_secs,
        }
    }
}
