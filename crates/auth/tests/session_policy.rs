//! Session lifecycle rules: token-derived expiry, lazy expiry on lookup,
//! FIFO eviction over the concurrent cap, first-wins revocation, and the
//! sweep predicate.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{client, harness, register_user, PASSWORD};
use vega_auth::jwt;
use vega_auth::session::{ClientContext, SessionManager};
use vega_core::clock::{Clock, MockClock};
use vega_core::error::AuthError;
use vega_core::types::{RevocationReason, Role};
use vega_db::memory::MemorySessionStore;
use vega_db::store::SessionStore;

/// A manager over a bare in-memory store, for tests that drive sessions
/// directly rather than through the service.
struct ManagerHarness {
    manager: SessionManager,
    store: Arc<MemorySessionStore>,
    clock: Arc<MockClock>,
}

fn manager_harness() -> ManagerHarness {
    let clock = Arc::new(MockClock::new(common::t0()));
    let store = Arc::new(MemorySessionStore::new());
    let manager = SessionManager::new(store.clone(), clock.clone(), 5, 30);
    ManagerHarness {
        manager,
        store,
        clock,
    }
}

/// Issue an access token whose expiry lands `secs` after the harness
/// clock's current time.
fn token_expiring_in(h: &ManagerHarness, user_id: i64, secs: i64) -> String {
    let mut config = common::test_jwt_config();
    config.access_token_expiry_secs = secs;
    jwt::generate_access_token(user_id, "user@example.com", Role::User, &config, h.clock.now())
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// The load-bearing invariant: session lifetime always equals token
/// lifetime.
#[tokio::test]
async fn session_expiry_mirrors_the_token_exp_claim() {
    let h = manager_harness();
    let token = token_expiring_in(&h, 1, 3600);

    let session = h
        .manager
        .create(1, &token, ClientContext::default())
        .await
        .expect("creation should succeed");

    let claims = jwt::decode_unverified(&token).expect("token must decode");
    assert_eq!(session.expires_at.timestamp(), claims.exp);
    assert!(session.is_active);
    assert_eq!(session.created_at, common::t0());
}

#[tokio::test]
async fn create_rejects_bad_inputs() {
    let h = manager_harness();

    assert_matches!(
        h.manager.create(0, "some-token", ClientContext::default()).await,
        Err(AuthError::Validation(_))
    );
    assert_matches!(
        h.manager.create(1, "", ClientContext::default()).await,
        Err(AuthError::Validation(_))
    );
    assert_matches!(
        h.manager.create(1, "not-a-jwt", ClientContext::default()).await,
        Err(AuthError::TokenMalformed)
    );

    // A token that is already expired cannot back a session: expires_at
    // must be strictly in the future at creation time.
    let token = token_expiring_in(&h, 1, 60);
    h.clock.advance(Duration::seconds(61));
    assert_matches!(
        h.manager.create(1, &token, ClientContext::default()).await,
        Err(AuthError::TokenExpired)
    );
}

// ---------------------------------------------------------------------------
// Lookup and lazy expiry
// ---------------------------------------------------------------------------

/// Looking up an expired session returns `None` AND revokes the row with
/// reason `expired` -- a deliberately mutating read.
#[tokio::test]
async fn lookup_lazily_revokes_expired_sessions() {
    let h = manager_harness();
    let token = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &token, ClientContext::default())
        .await
        .expect("creation should succeed");

    h.clock.advance(Duration::seconds(3601));
    let found = h.manager.get_by_token(&token).await.unwrap();
    assert!(found.is_none(), "expired session must not be returned");

    // The side effect is visible in the raw store.
    let row = h
        .store
        .find_by_token(&token)
        .await
        .unwrap()
        .expect("row must still exist until swept");
    assert!(!row.is_active);
    assert_eq!(row.revocation_reason(), Some(RevocationReason::Expired));
    assert_eq!(row.revoked_at, Some(h.clock.now()));
}

#[tokio::test]
async fn lookup_misses_absent_and_revoked_sessions() {
    let h = manager_harness();
    assert!(h.manager.get_by_token("nope").await.unwrap().is_none());

    let token = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &token, ClientContext::default())
        .await
        .expect("creation should succeed");
    h.manager
        .revoke(&token, RevocationReason::Manual)
        .await
        .expect("revocation should succeed");

    assert!(h.manager.get_by_token(&token).await.unwrap().is_none());
}

/// Touch updates activity and reorders the active listing; touching a
/// missing session is a NotFound.
#[tokio::test]
async fn touch_updates_last_activity() {
    let h = manager_harness();
    let first = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &first, ClientContext::default())
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(10));
    let second = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &second, ClientContext::default())
        .await
        .unwrap();

    // Most recent activity first: `second` leads.
    let active = h.manager.get_active_by_user(1).await.unwrap();
    assert_eq!(active[0].token, second);

    // Touching `first` moves it to the front.
    h.clock.advance(Duration::seconds(10));
    h.manager.touch(&first).await.expect("touch should succeed");
    let active = h.manager.get_active_by_user(1).await.unwrap();
    assert_eq!(active[0].token, first);

    assert_matches!(
        h.manager.touch("missing-token").await,
        Err(AuthError::NotFound { entity: "session" })
    );
}

// ---------------------------------------------------------------------------
// Revocation
// ---------------------------------------------------------------------------

/// Revoking twice succeeds both times but the first revocation's
/// timestamp and reason stick.
#[tokio::test]
async fn revoke_is_first_wins_idempotent() {
    let h = manager_harness();
    let token = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &token, ClientContext::default())
        .await
        .unwrap();

    let first = h
        .manager
        .revoke(&token, RevocationReason::Logout)
        .await
        .expect("first revocation should succeed");

    h.clock.advance(Duration::minutes(5));
    let second = h
        .manager
        .revoke(&token, RevocationReason::Manual)
        .await
        .expect("second revocation must not error");

    assert_eq!(second.revoked_at, first.revoked_at);
    assert_eq!(second.revocation_reason(), Some(RevocationReason::Logout));
}

/// Terminate removes the row outright; nothing is left for the sweep.
#[tokio::test]
async fn terminate_eagerly_deletes() {
    let h = manager_harness();
    let token = token_expiring_in(&h, 1, 3600);
    h.manager
        .create(1, &token, ClientContext::default())
        .await
        .unwrap();

    let deleted = h
        .manager
        .terminate(&token, RevocationReason::Logout)
        .await
        .expect("terminate should succeed");
    assert!(deleted);
    assert!(h.store.find_by_token(&token).await.unwrap().is_none());

    // Terminating a token with no session reports false, not an error.
    let deleted = h
        .manager
        .terminate(&token, RevocationReason::Logout)
        .await
        .expect("terminating a missing session is not an error");
    assert!(!deleted);
}

// ---------------------------------------------------------------------------
// Concurrent-session cap
// ---------------------------------------------------------------------------

/// Six sessions against a cap of five: exactly one eviction, the
/// earliest-created session (FIFO, not LRU).
#[tokio::test]
async fn limit_concurrent_evicts_oldest_created_first() {
    let h = manager_harness();

    let mut tokens = Vec::new();
    for _ in 0..6 {
        let token = token_expiring_in(&h, 1, 24 * 3600);
        h.manager
            .create(1, &token, ClientContext::default())
            .await
            .expect("creation should succeed");
        tokens.push(token);
        h.clock.advance(Duration::seconds(1));
    }

    // Touch the oldest so LRU would spare it; FIFO must not.
    h.manager.touch(&tokens[0]).await.unwrap();

    let evicted = h.manager.limit_concurrent(1).await.unwrap();
    assert_eq!(evicted, 1, "exactly one session over the cap");

    assert!(
        h.store.find_by_token(&tokens[0]).await.unwrap().is_none(),
        "the earliest-created session must be the one evicted"
    );
    for token in &tokens[1..] {
        assert!(h.store.find_by_token(token).await.unwrap().is_some());
    }
    assert_eq!(h.manager.count_active(1).await.unwrap(), 5);
}

/// The cap holds through the service's login path too.
#[tokio::test]
async fn repeated_logins_never_exceed_the_cap() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    for _ in 0..8 {
        h.service
            .login("alice@example.com", PASSWORD, client())
            .await
            .expect("login should succeed");
        h.clock.advance(Duration::seconds(1));
    }

    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 5);
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// The sweep deletes expired rows and revoked rows past retention, and
/// leaves everything else alone.
#[tokio::test]
async fn sweep_removes_expired_and_stale_revoked_sessions() {
    let h = manager_harness();

    // Revoked now; retention keeps it for 30 days.
    let revoked = token_expiring_in(&h, 1, 60 * 24 * 3600);
    h.manager
        .create(1, &revoked, ClientContext::default())
        .await
        .unwrap();
    h.manager
        .revoke(&revoked, RevocationReason::Manual)
        .await
        .unwrap();

    // Expires in a day.
    let short_lived = token_expiring_in(&h, 1, 24 * 3600);
    h.manager
        .create(1, &short_lived, ClientContext::default())
        .await
        .unwrap();

    // Stays live well past the advance below.
    let long_lived = token_expiring_in(&h, 1, 90 * 24 * 3600);
    h.manager
        .create(1, &long_lived, ClientContext::default())
        .await
        .unwrap();

    // A freshly revoked row survives the sweep inside retention.
    assert_eq!(h.manager.sweep_expired().await.unwrap(), 0);

    h.clock.advance(Duration::days(31));
    let deleted = h.manager.sweep_expired().await.unwrap();
    assert_eq!(deleted, 2, "the expired and the stale-revoked rows");

    assert!(h.store.find_by_token(&revoked).await.unwrap().is_none());
    assert!(h.store.find_by_token(&short_lived).await.unwrap().is_none());
    assert!(h.store.find_by_token(&long_lived).await.unwrap().is_some());
}
