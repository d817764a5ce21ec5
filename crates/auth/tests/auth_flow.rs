//! End-to-end flows through the auth orchestrator: registration, login,
//! logout, verification, password change, and token refresh.

mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{client, harness, register_user, ACCESS_EXPIRY_SECS, PASSWORD};
use vega_auth::cookie::SameSite;
use vega_auth::jwt;
use vega_core::error::{AuthError, ConflictKind};
use vega_core::types::Role;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Registration returns a hash-free profile and a verifiable token.
#[tokio::test]
async fn register_issues_a_token_and_a_profile() {
    let h = harness();

    let out = h
        .service
        .register("alice", "Alice@Example.com", PASSWORD)
        .await
        .expect("registration should succeed");

    assert_eq!(out.user.username, "alice");
    // Email is normalized to lowercase for storage and lookup.
    assert_eq!(out.user.email, "alice@example.com");
    assert_eq!(out.user.role, Role::User);

    let claims = jwt::verify_token(&out.access_token, &common::test_jwt_config(), common::t0())
        .expect("registration token must verify");
    assert_eq!(claims.sub, out.user.id);
}

/// Registration issues a token but no session: a session-checked call is
/// rejected until an explicit login.
#[tokio::test]
async fn register_token_has_no_session_until_login() {
    let h = harness();

    let out = h
        .service
        .register("alice", "alice@example.com", PASSWORD)
        .await
        .expect("registration should succeed");

    assert_matches!(
        h.service.verify_auth(&out.access_token).await,
        Err(AuthError::SessionInvalid)
    );
    assert_eq!(h.service.sessions().count_active(out.user.id).await.unwrap(), 0);

    // After login the (new) token is fully usable.
    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");
    let profile = h
        .service
        .verify_auth(&login.access_token)
        .await
        .expect("post-login verification should succeed");
    assert_eq!(profile.id, out.user.id);
}

/// Duplicate email and duplicate username are distinguishable conflicts.
#[tokio::test]
async fn register_distinguishes_email_and_username_conflicts() {
    let h = harness();
    register_user(&h, "alice").await;

    let err = h
        .service
        .register("alice2", "ALICE@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_matches!(err, AuthError::Conflict(ConflictKind::EmailTaken));

    let err = h
        .service
        .register("alice", "fresh@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_matches!(err, AuthError::Conflict(ConflictKind::UsernameTaken));
}

/// Every violated strength rule is reported, not just the first.
#[tokio::test]
async fn register_aggregates_password_strength_errors() {
    let h = harness();

    let err = h
        .service
        .register("alice", "alice@example.com", "short")
        .await
        .unwrap_err();

    let AuthError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    // "short" violates length, uppercase, digit, and special at once.
    assert_eq!(errors.len(), 4, "all violations must be listed: {errors:?}");
}

#[tokio::test]
async fn register_rejects_bad_shapes() {
    let h = harness();

    assert_matches!(
        h.service.register("ab", "ok@example.com", PASSWORD).await,
        Err(AuthError::Validation(_))
    );
    assert_matches!(
        h.service.register("alice", "not-an-email", PASSWORD).await,
        Err(AuthError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

/// The register -> login -> bad login -> logout walk from the design
/// notes, with session counts checked at every step.
#[tokio::test]
async fn full_login_logout_scenario() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");
    assert!(login.refresh_token.is_some());
    assert_eq!(login.expires_in, ACCESS_EXPIRY_SECS);
    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 1);

    // Wrong password: uniform error, session count unchanged.
    assert_matches!(
        h.service
            .login("alice@example.com", "Wr0ng-Pass!", client())
            .await,
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 1);

    h.service
        .logout(&login.access_token)
        .await
        .expect("logout should succeed");
    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 0);
    assert_matches!(
        h.service.verify_auth(&login.access_token).await,
        Err(AuthError::SessionInvalid)
    );
}

/// Unknown email and wrong password produce the identical error kind AND
/// message -- the caller must not be able to tell which check failed.
#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let h = harness();
    register_user(&h, "alice").await;

    let unknown = h
        .service
        .login("ghost@example.com", PASSWORD, client())
        .await
        .unwrap_err();
    let wrong = h
        .service
        .login("alice@example.com", "Wr0ng-Pass!", client())
        .await
        .unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_matches!(unknown, AuthError::InvalidCredentials);
    assert_matches!(wrong, AuthError::InvalidCredentials);
}

/// Logout is immediate: the session is gone even though the token's
/// signature stays valid for days.
#[tokio::test]
async fn logout_frees_the_token_before_its_signature_expires() {
    let h = harness();
    register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");
    h.service
        .logout(&login.access_token)
        .await
        .expect("logout should succeed");

    // Signature-only verification still passes...
    assert!(jwt::verify_token(
        &login.access_token,
        &common::test_jwt_config(),
        common::t0()
    )
    .is_ok());
    // ...but the full check fails because the session lookup misses.
    assert_matches!(
        h.service.verify_auth(&login.access_token).await,
        Err(AuthError::SessionInvalid)
    );

    // A second logout with the same token has no session left to free.
    assert_matches!(
        h.service.logout(&login.access_token).await,
        Err(AuthError::SessionInvalid)
    );
}

/// An expired access token fails fast with the token's own error kind,
/// before any session lookup.
#[tokio::test]
async fn expired_token_is_reported_as_expired() {
    let h = harness();
    register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");

    h.clock.advance(Duration::seconds(ACCESS_EXPIRY_SECS + 1));
    assert_matches!(
        h.service.verify_auth(&login.access_token).await,
        Err(AuthError::TokenExpired)
    );
}

/// Garbage tokens are malformed, not expired or session-invalid.
#[tokio::test]
async fn malformed_token_is_reported_as_malformed() {
    let h = harness();
    assert_matches!(
        h.service.verify_auth("not.a.jwt").await,
        Err(AuthError::TokenMalformed)
    );
}

/// The Authorization header wins over a cookie when both carry tokens.
#[tokio::test]
async fn header_token_beats_cookie_token() {
    let h = harness();
    register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");

    // Header carries the live token, cookie carries garbage: succeeds.
    let header = format!("Bearer {}", login.access_token);
    let profile = h
        .service
        .verify_from_parts(Some(&header), Some("stale-cookie-token"))
        .await
        .expect("header token should win");
    assert_eq!(profile.username, "alice");

    // Cookie alone works too.
    let profile = h
        .service
        .verify_from_parts(None, Some(&login.access_token))
        .await
        .expect("cookie token should be accepted");
    assert_eq!(profile.username, "alice");

    // No token at all is rejected before any verification.
    assert_matches!(
        h.service.verify_from_parts(None, None).await,
        Err(AuthError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

/// A successful password change deletes every session for the user,
/// including the one that authenticated the change.
#[tokio::test]
async fn change_password_invalidates_every_session() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    let first = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");
    h.clock.advance(Duration::seconds(1));
    h.service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("second login should succeed");
    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 2);

    h.service
        .change_password(user_id, PASSWORD, "N3w-Passw0rd!")
        .await
        .expect("password change should succeed");

    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 0);
    assert_matches!(
        h.service.verify_auth(&first.access_token).await,
        Err(AuthError::SessionInvalid)
    );

    // Old password is dead, new one works.
    assert_matches!(
        h.service.login("alice@example.com", PASSWORD, client()).await,
        Err(AuthError::InvalidCredentials)
    );
    h.service
        .login("alice@example.com", "N3w-Passw0rd!", client())
        .await
        .expect("login with the new password should succeed");
}

#[tokio::test]
async fn change_password_rejections() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    // Wrong current password.
    assert_matches!(
        h.service
            .change_password(user_id, "Wr0ng-Pass!", "N3w-Passw0rd!")
            .await,
        Err(AuthError::InvalidCredentials)
    );

    // No-op change forbidden.
    assert_matches!(
        h.service.change_password(user_id, PASSWORD, PASSWORD).await,
        Err(AuthError::Validation(_))
    );

    // Weak replacement rejected with the full rule list.
    let err = h
        .service
        .change_password(user_id, PASSWORD, "weak")
        .await
        .unwrap_err();
    assert_matches!(err, AuthError::Validation(errors) if errors.len() > 1);

    // Unknown user.
    assert_matches!(
        h.service.change_password(9999, PASSWORD, "N3w-Passw0rd!").await,
        Err(AuthError::NotFound { entity: "user" })
    );
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

/// A refresh token yields a new, session-backed access token; the refresh
/// token itself is reusable (not rotated).
#[tokio::test]
async fn refresh_issues_a_usable_access_token() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");
    let refresh = login.refresh_token.expect("login must return a refresh token");

    h.clock.advance(Duration::seconds(1));
    let refreshed = h
        .service
        .refresh_token(&refresh, client())
        .await
        .expect("refresh should succeed");

    assert!(refreshed.refresh_token.is_none(), "refresh must not rotate");
    assert_ne!(refreshed.access_token, login.access_token);
    h.service
        .verify_auth(&refreshed.access_token)
        .await
        .expect("refreshed token must be session-backed");
    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 2);

    // The same refresh token keeps working.
    h.clock.advance(Duration::seconds(1));
    h.service
        .refresh_token(&refresh, client())
        .await
        .expect("refresh token must be reusable");
}

/// Access tokens are never accepted where a refresh token is expected.
#[tokio::test]
async fn refresh_rejects_non_refresh_tokens() {
    let h = harness();
    register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");

    assert_matches!(
        h.service.refresh_token(&login.access_token, client()).await,
        Err(AuthError::TokenMalformed)
    );
    assert_matches!(
        h.service.refresh_token("garbage", client()).await,
        Err(AuthError::TokenMalformed)
    );
}

// ---------------------------------------------------------------------------
// Profile and account lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn profile_read_and_update() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;
    register_user(&h, "bob").await;

    let profile = h.service.get_profile(user_id).await.unwrap();
    assert_eq!(profile.username, "alice");

    // Taking bob's username is a distinguishable conflict.
    let err = h
        .service
        .update_profile(
            user_id,
            vega_auth::service::ProfileUpdate {
                username: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, AuthError::Conflict(ConflictKind::UsernameTaken));

    // A clean update applies and normalizes.
    let updated = h
        .service
        .update_profile(
            user_id,
            vega_auth::service::ProfileUpdate {
                email: Some("Alice2@Example.com".into()),
                preferences: Some(serde_json::json!({"theme": "dark"})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.email, "alice2@example.com");
    assert_eq!(updated.preferences["theme"], "dark");

    assert_matches!(
        h.service.get_profile(9999).await,
        Err(AuthError::NotFound { entity: "user" })
    );
}

/// Deactivating a user revokes everything and blocks further logins.
#[tokio::test]
async fn deactivation_cascades_to_sessions() {
    let h = harness();
    let user_id = register_user(&h, "alice").await;

    let login = h
        .service
        .login("alice@example.com", PASSWORD, client())
        .await
        .expect("login should succeed");

    h.service
        .deactivate_user(user_id)
        .await
        .expect("deactivation should succeed");

    assert_eq!(h.service.sessions().count_active(user_id).await.unwrap(), 0);
    assert_matches!(
        h.service.verify_auth(&login.access_token).await,
        Err(AuthError::SessionInvalid)
    );
    assert_matches!(
        h.service.login("alice@example.com", PASSWORD, client()).await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn cookie_options_mirror_the_configured_expiry() {
    let h = harness();
    let options = h.service.cookie_options();

    assert_eq!(options.max_age_secs, ACCESS_EXPIRY_SECS);
    assert!(options.http_only);
    assert!(!options.secure, "test config is not production");
    assert_eq!(options.same_site, SameSite::Strict);
}
