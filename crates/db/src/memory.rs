//! In-memory store implementations.
//!
//! Back the same [`UserStore`]/[`SessionStore`] seams as PostgreSQL with
//! `tokio::sync::RwLock`-guarded maps. Used by the test suites (expiry
//! logic needs a mock clock, which rules out SQL `NOW()`) and usable as a
//! lightweight embedded backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use vega_core::error::ConflictKind;
use vega_core::types::{DbId, RevocationReason, Timestamp};

use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::store::{SessionStore, StoreError, UserStore};

/// [`UserStore`] backed by a guarded map.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<DbId, User>>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, input: CreateUser, now: Timestamp) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        // Same backstop the unique indexes provide in PostgreSQL.
        let email_lower = input.email.to_ascii_lowercase();
        for user in users.values() {
            if user.email.to_ascii_lowercase() == email_lower {
                return Err(StoreError::Conflict(ConflictKind::EmailTaken));
            }
            if user.username == input.username {
                return Err(StoreError::Conflict(ConflictKind::UsernameTaken));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            username: input.username,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role.as_str().to_string(),
            preferences: input.preferences,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email_lower = email.to_ascii_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_ascii_lowercase() == email_lower)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update(
        &self,
        id: DbId,
        input: UpdateUser,
        now: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(username) = &input.username {
            if users.values().any(|u| u.id != id && &u.username == username) {
                return Err(StoreError::Conflict(ConflictKind::UsernameTaken));
            }
        }
        if let Some(email) = &input.email {
            let email_lower = email.to_ascii_lowercase();
            if users
                .values()
                .any(|u| u.id != id && u.email.to_ascii_lowercase() == email_lower)
            {
                return Err(StoreError::Conflict(ConflictKind::EmailTaken));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = input.username {
            user.username = username;
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(preferences) = input.preferences {
            user.preferences = preferences;
        }
        user.updated_at = now;
        Ok(Some(user.clone()))
    }

    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = now;
        Ok(true)
    }

    async fn deactivate(&self, id: DbId, now: Timestamp) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        if !user.is_active {
            return Ok(false);
        }
        user.is_active = false;
        user.updated_at = now;
        Ok(true)
    }

    async fn record_login(&self, id: DbId, now: Timestamp) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login_at = Some(now);
        }
        Ok(())
    }
}

/// [`SessionStore`] backed by a guarded map keyed by session ID.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<DbId, Session>>,
    next_id: AtomicI64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, input: CreateSession, now: Timestamp) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.values().any(|s| s.token == input.token) {
            return Err(StoreError::Backend("duplicate session token".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Session {
            id,
            user_id: input.user_id,
            token: input.token,
            ip: input.ip,
            user_agent: input.user_agent,
            device: input.device,
            location: input.location,
            is_active: true,
            last_activity: now,
            expires_at: input.expires_at,
            revoked_at: None,
            revoked_reason: None,
            created_at: now,
        };
        sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn find_active_by_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut active: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_valid(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(active)
    }

    async fn count_active(&self, user_id: DbId, now: Timestamp) -> Result<i64, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.user_id == user_id && s.is_valid(now))
            .count() as i64)
    }

    async fn touch(&self, token: &str, now: Timestamp) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.values_mut().find(|s| s.token == token) else {
            return Ok(None);
        };
        session.last_activity = now;
        Ok(Some(session.clone()))
    }

    async fn revoke(
        &self,
        token: &str,
        reason: RevocationReason,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.values_mut().find(|s| s.token == token) else {
            return Ok(None);
        };
        session.is_active = false;
        // First revocation wins.
        if session.revoked_at.is_none() {
            session.revoked_at = Some(now);
            session.revoked_reason = Some(reason.as_str().to_string());
        }
        Ok(Some(session.clone()))
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let id = sessions
            .values()
            .find(|s| s.token == token)
            .map(|s| s.id);
        Ok(id.and_then(|id| sessions.remove(&id)).is_some())
    }

    async fn delete_by_ids(&self, ids: &[DbId]) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let mut deleted = 0;
        for id in ids {
            if sessions.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_all_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_swept(
        &self,
        now: Timestamp,
        revoked_cutoff: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| {
            let expired = s.expires_at < now;
            let stale_revoked =
                !s.is_active && s.revoked_at.map(|at| at < revoked_cutoff).unwrap_or(false);
            !(expired || stale_revoked)
        });
        Ok((before - sessions.len()) as u64)
    }
}
