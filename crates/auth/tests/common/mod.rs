//! Shared test harness: the auth service wired to in-memory stores and a
//! mock clock, so expiry logic runs deterministically with no database
//! and no real delays.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use vega_auth::config::AuthConfig;
use vega_auth::jwt::JwtConfig;
use vega_auth::service::AuthService;
use vega_auth::session::ClientContext;
use vega_core::clock::MockClock;
use vega_core::types::Timestamp;
use vega_db::memory::{MemorySessionStore, MemoryUserStore};

/// Access-token lifetime used across the suites: 7 days.
pub const ACCESS_EXPIRY_SECS: i64 = 7 * 24 * 3600;

/// The instant every test clock starts at.
pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret-long-enough-for-hmac".to_string(),
        access_token_expiry_secs: ACCESS_EXPIRY_SECS,
        issuer: "vega-auth".to_string(),
        audience: "vega-clients".to_string(),
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        jwt: test_jwt_config(),
        max_sessions_per_user: 5,
        session_retention_days: 30,
        secure_cookies: false,
    }
}

pub struct TestHarness {
    pub service: AuthService,
    pub clock: Arc<MockClock>,
    pub users: Arc<MemoryUserStore>,
    pub session_store: Arc<MemorySessionStore>,
}

/// Build a fresh service over empty in-memory stores, clock frozen at
/// [`t0`].
pub fn harness() -> TestHarness {
    let clock = Arc::new(MockClock::new(t0()));
    let users = Arc::new(MemoryUserStore::new());
    let session_store = Arc::new(MemorySessionStore::new());
    let service = AuthService::new(
        users.clone(),
        session_store.clone(),
        clock.clone(),
        test_config(),
    );
    TestHarness {
        service,
        clock,
        users,
        session_store,
    }
}

/// A client context with recognizable values.
pub fn client() -> ClientContext {
    ClientContext {
        ip: Some("203.0.113.7".to_string()),
        user_agent: Some("integration-tests/1.0".to_string()),
        device: None,
        location: None,
    }
}

/// The password used by the registration helpers.
pub const PASSWORD: &str = "Passw0rd!";

/// Register a user and return their id.
pub async fn register_user(h: &TestHarness, username: &str) -> vega_core::types::DbId {
    let out = h
        .service
        .register(username, &format!("{username}@example.com"), PASSWORD)
        .await
        .expect("registration should succeed");
    out.user.id
}
