//! Repository for the `user_sessions` table.

use sqlx::PgPool;
use vega_core::types::{DbId, RevocationReason, Timestamp};

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token, ip, user_agent, device, location, \
                        is_active, last_activity, expires_at, revoked_at, \
                        revoked_reason, created_at";

/// Provides CRUD operations for user sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSession,
        now: Timestamp,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions
                 (user_id, token, ip, user_agent, device, location,
                  last_activity, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.token)
            .bind(&input.ip)
            .bind(&input.user_agent)
            .bind(&input.device)
            .bind(&input.location)
            .bind(now)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by its token, regardless of validity.
    ///
    /// Expiry and revocation filtering is the policy layer's job: it needs
    /// to see expired rows to revoke them lazily.
    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE token = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// List a user's valid sessions, most recent activity first.
    pub async fn find_active_by_user(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE user_id = $1
               AND is_active = true
               AND revoked_at IS NULL
               AND expires_at > $2
             ORDER BY last_activity DESC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Count a user's valid sessions.
    pub async fn count_active(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_sessions
             WHERE user_id = $1
               AND is_active = true
               AND revoked_at IS NULL
               AND expires_at > $2",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Update `last_activity`, returning the updated row.
    ///
    /// Returns `None` if no session matches the token.
    pub async fn touch(
        pool: &PgPool,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET last_activity = $2
             WHERE token = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Revoke a session. First revocation wins: an already-revoked row
    /// keeps its original `revoked_at` and `revoked_reason`.
    ///
    /// Returns the (possibly previously) revoked row, or `None` if no
    /// session matches the token.
    pub async fn revoke(
        pool: &PgPool,
        token: &str,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE user_sessions SET
                is_active = false,
                revoked_at = COALESCE(revoked_at, $2),
                revoked_reason = COALESCE(revoked_reason, $3)
             WHERE token = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(token)
            .bind(now)
            .bind(reason.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Delete a session by token. Returns `true` if a row was deleted.
    pub async fn delete_by_token(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete sessions by ID. Returns the count of deleted rows.
    pub async fn delete_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all sessions for a user. Returns the count of deleted rows.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that are past expiry, or revoked and past the
    /// retention cutoff. Returns the count of deleted rows.
    pub async fn delete_swept(
        pool: &PgPool,
        now: Timestamp,
        revoked_cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_sessions
             WHERE expires_at < $1
                OR (is_active = false AND revoked_at < $2)",
        )
        .bind(now)
        .bind(revoked_cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
