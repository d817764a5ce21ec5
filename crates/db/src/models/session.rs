//! User session model and DTOs.

use sqlx::FromRow;
use vega_core::types::{DbId, RevocationReason, Timestamp};

/// A user session row from the `user_sessions` table.
///
/// One row binds one issued access token to one user and one client
/// context. The token column is unique; `expires_at` always mirrors the
/// token's own expiry claim.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub token: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// Coarse device description, informational only.
    pub device: Option<String>,
    /// Coarse location description, informational only.
    pub location: Option<String>,
    pub is_active: bool,
    pub last_activity: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    /// Reason name string; see [`RevocationReason`] for the closed set.
    pub revoked_reason: Option<String>,
    pub created_at: Timestamp,
}

impl Session {
    /// Whether this session is usable at `now`.
    ///
    /// A session is valid iff it is active, unrevoked, and its expiry is
    /// still in the future.
    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.is_active && self.revoked_at.is_none() && now < self.expires_at
    }

    /// The parsed revocation reason, if any.
    pub fn revocation_reason(&self) -> Option<RevocationReason> {
        self.revoked_reason
            .as_deref()
            .and_then(RevocationReason::parse)
    }
}

/// DTO for creating a new user session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub token: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub device: Option<String>,
    pub location: Option<String>,
    /// Mirrors the bound token's `exp` claim.
    pub expires_at: Timestamp,
}
