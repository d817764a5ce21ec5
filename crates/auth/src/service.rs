//! The auth orchestrator.
//!
//! [`AuthService`] composes the password hasher, token issuer, and session
//! policy engine into the flows other subsystems call. Every method
//! returns a plain value or an [`AuthError`] kind -- no HTTP concerns.
//!
//! A presented token walks the states
//! `NO_TOKEN -> MALFORMED -> EXPIRED -> REVOKED -> VALID`: signature
//! problems fail fast regardless of session state, and a missing or
//! revoked session rejects a token whose signature is still perfectly
//! valid. That double-check is the core security property.

use std::sync::Arc;

use serde::Serialize;
use vega_core::clock::Clock;
use vega_core::error::{AuthError, ConflictKind};
use vega_core::types::{DbId, RevocationReason, Role};
use vega_core::validation::{normalize_email, validate_email, validate_username};
use vega_db::models::user::{CreateUser, UpdateUser, UserProfile};
use vega_db::store::{SessionStore, UserStore};

use crate::config::AuthConfig;
use crate::cookie::{CookieOptions, SameSite};
use crate::jwt;
use crate::password;
use crate::session::{ClientContext, SessionManager};

/// Result of a successful registration.
///
/// Registration issues a token but creates NO session: the first session
/// is created by an explicit login, and a session-checked call made with
/// this token is rejected until then.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutput {
    pub user: UserProfile,
    pub access_token: String,
}

/// Result of a successful login or token refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutput {
    pub user: UserProfile,
    pub access_token: String,
    /// Absent on refresh: the presented refresh token stays valid and is
    /// not rotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Changes applied by [`AuthService::update_profile`]. All optional.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub preferences: Option<serde_json::Value>,
}

/// The auth/session orchestrator.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        session_store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        let sessions = SessionManager::new(
            session_store,
            Arc::clone(&clock),
            config.max_sessions_per_user,
            config.session_retention_days,
        );
        Self {
            users,
            sessions,
            clock,
            config,
        }
    }

    /// The session policy engine, for maintenance callers (the sweeper).
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // -----------------------------------------------------------------------
    // Flows
    // -----------------------------------------------------------------------

    /// Register a new user.
    ///
    /// Duplicate email and duplicate username surface as distinguishable
    /// conflict kinds; password-strength violations are aggregated into a
    /// single validation error listing every failed rule.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutput, AuthError> {
        validate_username(username)?;
        validate_email(email)?;
        let email = normalize_email(email);

        let strength = password::validate_password_strength(password);
        if !strength.is_valid {
            return Err(AuthError::Validation(strength.errors));
        }

        // Pre-checks; the storage unique indexes are the backstop.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict(ConflictKind::EmailTaken));
        }
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict(ConflictKind::UsernameTaken));
        }

        let password_hash = password::hash_password(password)?;
        let now = self.clock.now();
        let user = self
            .users
            .insert(
                CreateUser {
                    username: username.to_string(),
                    email: email.clone(),
                    password_hash,
                    role: Role::User,
                    preferences: serde_json::json!({}),
                },
                now,
            )
            .await?;

        let access_token =
            jwt::generate_access_token(user.id, &user.email, user.role(), &self.config.jwt, now)?;

        tracing::info!(user_id = user.id, "Registered new user");
        Ok(RegisterOutput {
            user: UserProfile::from(&user),
            access_token,
        })
    }

    /// Authenticate with email + password and open a session.
    ///
    /// Unknown email, wrong password, and deactivated account all fail
    /// with the identical [`AuthError::InvalidCredentials`] -- never
    /// reveal which check failed.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientContext,
    ) -> Result<AuthOutput, AuthError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }
        if !password::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        self.users.record_login(user.id, now).await?;

        let access_token =
            jwt::generate_access_token(user.id, &user.email, user.role(), &self.config.jwt, now)?;
        let refresh_token = jwt::generate_refresh_token(user.id, &self.config.jwt, now)?;

        self.sessions.create(user.id, &access_token, client).await?;
        self.sessions.limit_concurrent(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(AuthOutput {
            user: UserProfile::from(&user),
            access_token,
            refresh_token: Some(refresh_token),
            expires_in: self.config.jwt.access_token_expiry_secs,
        })
    }

    /// Revoke and eagerly delete the session bound to `token`.
    ///
    /// There is no token denylist: a still signature-valid token
    /// presented after logout is rejected because the session lookup
    /// misses.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::validation("a token is required to log out"));
        }
        jwt::verify_token(token, &self.config.jwt, self.clock.now())?;

        if !self
            .sessions
            .terminate(token, RevocationReason::Logout)
            .await?
        {
            return Err(AuthError::SessionInvalid);
        }
        Ok(())
    }

    /// Full authentication check: signature AND live session.
    ///
    /// Fails with the token's own error kind on signature problems, and
    /// with [`AuthError::SessionInvalid`] when the signature is fine but
    /// no usable session backs the token. Yields the user loaded fresh
    /// from the store, hash excluded.
    pub async fn verify_auth(&self, token: &str) -> Result<UserProfile, AuthError> {
        let claims = jwt::verify_token(token, &self.config.jwt, self.clock.now())?;

        let session = self
            .sessions
            .get_by_token(token)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        self.sessions.touch(&session.token).await?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        if !user.is_active {
            return Err(AuthError::SessionInvalid);
        }

        Ok(UserProfile::from(&user))
    }

    /// [`verify_auth`](Self::verify_auth) over raw header/cookie values.
    ///
    /// The `Authorization` header wins when both carry a token.
    pub async fn verify_from_parts(
        &self,
        header: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<UserProfile, AuthError> {
        let token = jwt::extract_token(header, cookie)
            .ok_or_else(|| AuthError::validation("authentication token is missing"))?;
        self.verify_auth(token).await
    }

    /// Change a user's password and invalidate every session.
    ///
    /// The session that authenticated this call is removed too; the
    /// caller must log in again.
    pub async fn change_password(
        &self,
        user_id: DbId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound { entity: "user" })?;

        if !password::verify_password(current, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if current == new {
            return Err(AuthError::validation(
                "new password must differ from the current password",
            ));
        }
        let strength = password::validate_password_strength(new);
        if !strength.is_valid {
            return Err(AuthError::Validation(strength.errors));
        }

        let password_hash = password::hash_password(new)?;
        self.users
            .update_password(user_id, &password_hash, self.clock.now())
            .await?;

        let removed = self.sessions.delete_all_for_user(user_id).await?;
        tracing::info!(
            user_id,
            sessions_removed = removed,
            "Password changed; all sessions invalidated"
        );
        Ok(())
    }

    /// Exchange a refresh token for a new access token (and its session).
    ///
    /// The refresh token itself is NOT rotated: one long-lived refresh
    /// token is reused across renewals. Known limitation, kept as
    /// designed.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        client: ClientContext,
    ) -> Result<AuthOutput, AuthError> {
        let now = self.clock.now();
        let claims = jwt::verify_token(refresh_token, &self.config.jwt, now)?;
        if !claims.is_refresh() {
            return Err(AuthError::TokenMalformed);
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token =
            jwt::generate_access_token(user.id, &user.email, user.role(), &self.config.jwt, now)?;
        self.sessions.create(user.id, &access_token, client).await?;
        self.sessions.limit_concurrent(user.id).await?;

        tracing::debug!(user_id = user.id, "Access token refreshed");
        Ok(AuthOutput {
            user: UserProfile::from(&user),
            access_token,
            refresh_token: None,
            expires_in: self.config.jwt.access_token_expiry_secs,
        })
    }

    /// Load a user's hash-free profile.
    pub async fn get_profile(&self, user_id: DbId) -> Result<UserProfile, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound { entity: "user" })?;
        Ok(UserProfile::from(&user))
    }

    /// Patch a user's profile through the same shape and uniqueness
    /// checks as registration.
    pub async fn update_profile(
        &self,
        user_id: DbId,
        changes: ProfileUpdate,
    ) -> Result<UserProfile, AuthError> {
        let mut update = UpdateUser::default();

        if let Some(username) = changes.username {
            validate_username(&username)?;
            if let Some(existing) = self.users.find_by_username(&username).await? {
                if existing.id != user_id {
                    return Err(AuthError::Conflict(ConflictKind::UsernameTaken));
                }
            }
            update.username = Some(username);
        }
        if let Some(email) = changes.email {
            validate_email(&email)?;
            let email = normalize_email(&email);
            if let Some(existing) = self.users.find_by_email(&email).await? {
                if existing.id != user_id {
                    return Err(AuthError::Conflict(ConflictKind::EmailTaken));
                }
            }
            update.email = Some(email);
        }
        update.preferences = changes.preferences;

        let user = self
            .users
            .update(user_id, update, self.clock.now())
            .await?
            .ok_or(AuthError::NotFound { entity: "user" })?;
        Ok(UserProfile::from(&user))
    }

    /// Disable a user account and remove all of its sessions.
    pub async fn deactivate_user(&self, user_id: DbId) -> Result<(), AuthError> {
        if !self.users.deactivate(user_id, self.clock.now()).await? {
            return Err(AuthError::NotFound { entity: "user" });
        }
        let removed = self.sessions.delete_all_for_user(user_id).await?;
        tracing::info!(
            user_id,
            sessions_removed = removed,
            "User deactivated; all sessions invalidated"
        );
        Ok(())
    }

    /// Cookie attributes for the boundary layer that sets the actual
    /// HTTP cookie.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            max_age_secs: self.config.jwt.access_token_expiry_secs,
            http_only: true,
            secure: self.config.secure_cookies,
            same_site: SameSite::Strict,
        }
    }
}
