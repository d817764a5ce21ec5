//! Session policy engine.
//!
//! [`SessionManager`] layers the lifecycle rules over a raw
//! [`SessionStore`]: token-derived expiry on create, lazy revocation of
//! expired rows on lookup, first-wins revocation, FIFO eviction over the
//! concurrent-session cap, and the periodic sweep predicate.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use vega_core::clock::Clock;
use vega_core::error::AuthError;
use vega_core::types::{DbId, RevocationReason};
use vega_db::models::session::{CreateSession, Session};
use vega_db::store::SessionStore;

/// Client metadata captured when a session is created. All fields are
/// informational.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub device: Option<String>,
    pub location: Option<String>,
}

/// A short stable reference to a token, safe to log.
///
/// Full tokens never appear in log output; this is the first 8 hex chars
/// of the SHA-256 digest.
pub fn token_fingerprint(token: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
    digest[..8].to_string()
}

/// Enforces the session lifecycle rules over a [`SessionStore`].
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    max_sessions_per_user: usize,
    retention: chrono::Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        max_sessions_per_user: usize,
        retention_days: i64,
    ) -> Self {
        Self {
            store,
            clock,
            max_sessions_per_user,
            retention: chrono::Duration::days(retention_days),
        }
    }

    /// Create a session bound to `token`.
    ///
    /// `expires_at` is derived from the token's own `exp` claim, never
    /// chosen independently -- session lifetime must always equal token
    /// lifetime. A token that is already expired (or carries no parseable
    /// expiry) is rejected.
    pub async fn create(
        &self,
        user_id: DbId,
        token: &str,
        client: ClientContext,
    ) -> Result<Session, AuthError> {
        if user_id <= 0 {
            return Err(AuthError::validation("session user is required"));
        }
        if token.is_empty() {
            return Err(AuthError::validation("session token is required"));
        }

        let claims = crate::jwt::decode_unverified(token)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
            .ok_or(AuthError::TokenMalformed)?;

        let now = self.clock.now();
        if expires_at <= now {
            return Err(AuthError::TokenExpired);
        }

        let session = self
            .store
            .insert(
                CreateSession {
                    user_id,
                    token: token.to_string(),
                    ip: client.ip,
                    user_agent: client.user_agent,
                    device: client.device,
                    location: client.location,
                    expires_at,
                },
                now,
            )
            .await?;

        tracing::debug!(
            user_id,
            session_id = session.id,
            token_fp = %token_fingerprint(token),
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// Look up a usable session by token.
    ///
    /// Returns `None` when the session is absent, revoked, or expired.
    /// This is deliberately a mutating read: discovering an expired row
    /// revokes it with reason `expired` before returning `None`. Expiry
    /// is otherwise only enforced by the periodic sweep.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.store.find_by_token(token).await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        if session.is_valid(now) {
            return Ok(Some(session));
        }

        if session.revoked_at.is_none() && now >= session.expires_at {
            self.store
                .revoke(token, RevocationReason::Expired, now)
                .await?;
            tracing::debug!(
                session_id = session.id,
                token_fp = %token_fingerprint(token),
                "Expired session revoked on lookup"
            );
        }
        Ok(None)
    }

    /// A user's valid sessions, most recent activity first.
    pub async fn get_active_by_user(&self, user_id: DbId) -> Result<Vec<Session>, AuthError> {
        Ok(self
            .store
            .find_active_by_user(user_id, self.clock.now())
            .await?)
    }

    /// Count of a user's valid sessions.
    pub async fn count_active(&self, user_id: DbId) -> Result<i64, AuthError> {
        Ok(self.store.count_active(user_id, self.clock.now()).await?)
    }

    /// Record activity on a session.
    pub async fn touch(&self, token: &str) -> Result<Session, AuthError> {
        self.store
            .touch(token, self.clock.now())
            .await?
            .ok_or(AuthError::NotFound { entity: "session" })
    }

    /// Revoke a session. Idempotent, first-wins: an earlier revocation's
    /// timestamp and reason are preserved.
    pub async fn revoke(&self, token: &str, reason: RevocationReason) -> Result<Session, AuthError> {
        let session = self
            .store
            .revoke(token, reason, self.clock.now())
            .await?
            .ok_or(AuthError::NotFound { entity: "session" })?;
        tracing::info!(
            session_id = session.id,
            user_id = session.user_id,
            reason = %reason,
            token_fp = %token_fingerprint(token),
            "Session revoked"
        );
        Ok(session)
    }

    /// Revoke and eagerly delete a session (the logout path).
    ///
    /// Deletion does not wait for the sweep: a stolen token must be
    /// unusable immediately, even within its signature lifetime. Returns
    /// `false` when no session matched the token.
    pub async fn terminate(
        &self,
        token: &str,
        reason: RevocationReason,
    ) -> Result<bool, AuthError> {
        let revoked = self
            .store
            .revoke(token, reason, self.clock.now())
            .await?
            .is_some();
        if !revoked {
            return Ok(false);
        }
        let deleted = self.store.delete_by_token(token).await?;
        tracing::info!(
            reason = %reason,
            token_fp = %token_fingerprint(token),
            "Session terminated"
        );
        Ok(deleted)
    }

    /// Enforce the concurrent-session cap for a user.
    ///
    /// Evicts oldest-created sessions first (FIFO, not LRU) until the cap
    /// holds. Returns the number evicted. Called after every successful
    /// login.
    pub async fn limit_concurrent(&self, user_id: DbId) -> Result<u64, AuthError> {
        let mut active = self
            .store
            .find_active_by_user(user_id, self.clock.now())
            .await?;
        if active.len() <= self.max_sessions_per_user {
            return Ok(0);
        }

        active.sort_by_key(|s| s.created_at);
        let excess = active.len() - self.max_sessions_per_user;
        let ids: Vec<DbId> = active.iter().take(excess).map(|s| s.id).collect();
        let evicted = self.store.delete_by_ids(&ids).await?;

        tracing::info!(
            user_id,
            evicted,
            cap = self.max_sessions_per_user,
            "Evicted oldest sessions over the concurrent cap"
        );
        Ok(evicted)
    }

    /// Delete every session belonging to a user (password change,
    /// deactivation). Returns the count deleted.
    pub async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, AuthError> {
        let deleted = self.store.delete_all_for_user(user_id).await?;
        if deleted > 0 {
            tracing::info!(user_id, deleted, "All sessions removed for user");
        }
        Ok(deleted)
    }

    /// Delete sessions that are past expiry, or revoked and past the
    /// retention window. Returns the count deleted.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        let cutoff = now - self.retention;
        let deleted = self.store.delete_swept(now, cutoff).await?;
        Ok(deleted)
    }
}
