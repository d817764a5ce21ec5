//! The store seams: what the auth layer requires from storage.
//!
//! [`UserStore`] and [`SessionStore`] are object-safe async traits so the
//! backing store is swappable — PostgreSQL in production ([`PgUserStore`],
//! [`PgSessionStore`]), the in-memory maps of [`crate::memory`] in tests.
//! Every time-sensitive operation takes an explicit `now`; the stores
//! themselves never consult a clock.

use async_trait::async_trait;
use sqlx::PgPool;
use vega_core::error::ConflictKind;
use vega_core::types::{DbId, RevocationReason, Timestamp};

use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::repositories::{SessionRepo, UserRepo};

/// Storage-level error. The auth layer maps this into its own taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("unique constraint violated: {0:?}")]
    Conflict(ConflictKind),

    /// Any other backend failure, with a sanitized description.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for vega_core::error::AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(kind) => vega_core::error::AuthError::Conflict(kind),
            StoreError::Backend(msg) => vega_core::error::AuthError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    /// Classify a sqlx error.
    ///
    /// PostgreSQL unique violations (code 23505) on the `uq_users_*`
    /// indexes become [`StoreError::Conflict`]; everything else is an
    /// opaque backend failure.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some("uq_users_email") => {
                        return StoreError::Conflict(ConflictKind::EmailTaken);
                    }
                    Some("uq_users_username") => {
                        return StoreError::Conflict(ConflictKind::UsernameTaken);
                    }
                    _ => {}
                }
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// Storage operations on user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Conflict`] when the
    /// email or username is already taken.
    async fn insert(&self, input: CreateUser, now: Timestamp) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Apply the non-`None` fields of `input`. Returns `None` when the
    /// user does not exist.
    async fn update(
        &self,
        id: DbId,
        input: UpdateUser,
        now: Timestamp,
    ) -> Result<Option<User>, StoreError>;

    /// Replace the password hash. Returns `false` when the user does not
    /// exist.
    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Set `is_active = false`. Returns `false` when the user does not
    /// exist or was already inactive.
    async fn deactivate(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError>;

    /// Stamp `last_login_at`.
    async fn record_login(&self, id: DbId, now: Timestamp) -> Result<(), StoreError>;
}

/// Storage operations on session records.
///
/// These are storage-dumb: no expiry policy, no lazy revocation, no
/// eviction. That behavior lives in the policy layer, which needs raw
/// rows (including expired ones) to implement it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, input: CreateSession, now: Timestamp) -> Result<Session, StoreError>;

    /// Raw lookup by token: returns expired and revoked rows too.
    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Valid sessions for a user, most recent activity first.
    async fn find_active_by_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError>;

    async fn count_active(&self, user_id: DbId, now: Timestamp) -> Result<i64, StoreError>;

    /// Update `last_activity`. Returns `None` when no session matches.
    async fn touch(&self, token: &str, now: Timestamp) -> Result<Option<Session>, StoreError>;

    /// Revoke a session, first-wins: an already-revoked row keeps its
    /// original `revoked_at` and `revoked_reason`. Returns `None` when no
    /// session matches.
    async fn revoke(
        &self,
        token: &str,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError>;

    async fn delete_by_ids(&self, ids: &[DbId]) -> Result<u64, StoreError>;

    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError>;

    /// Sweep predicate: expired before `now`, or revoked before
    /// `revoked_cutoff`. Returns the count of deleted rows.
    async fn delete_swept(
        &self,
        now: Timestamp,
        revoked_cutoff: Timestamp,
    ) -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementations
// ---------------------------------------------------------------------------

/// [`UserStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, input: CreateUser, now: Timestamp) -> Result<User, StoreError> {
        Ok(UserRepo::create(&self.pool, &input, now).await?)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_username(&self.pool, username).await?)
    }

    async fn update(
        &self,
        id: DbId,
        input: UpdateUser,
        now: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::update(&self.pool, id, &input, now).await?)
    }

    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        Ok(UserRepo::update_password(&self.pool, id, password_hash, now).await?)
    }

    async fn deactivate(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        Ok(UserRepo::deactivate(&self.pool, id, now).await?)
    }

    async fn record_login(&self, id: DbId, now: Timestamp) -> Result<(), StoreError> {
        Ok(UserRepo::record_login(&self.pool, id, now).await?)
    }
}

/// [`SessionStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, input: CreateSession, now: Timestamp) -> Result<Session, StoreError> {
        Ok(SessionRepo::create(&self.pool, &input, now).await?)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_by_token(&self.pool, token).await?)
    }

    async fn find_active_by_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError> {
        Ok(SessionRepo::find_active_by_user(&self.pool, user_id, now).await?)
    }

    async fn count_active(&self, user_id: DbId, now: Timestamp) -> Result<i64, StoreError> {
        Ok(SessionRepo::count_active(&self.pool, user_id, now).await?)
    }

    async fn touch(&self, token: &str, now: Timestamp) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::touch(&self.pool, token, now).await?)
    }

    async fn revoke(
        &self,
        token: &str,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::revoke(&self.pool, token, reason, now).await?)
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        Ok(SessionRepo::delete_by_token(&self.pool, token).await?)
    }

    async fn delete_by_ids(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_by_ids(&self.pool, ids).await?)
    }

    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_all_for_user(&self.pool, user_id).await?)
    }

    async fn delete_swept(
        &self,
        now: Timestamp,
        revoked_cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_swept(&self.pool, now, revoked_cutoff).await?)
    }
}
