//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vega_core::types::{DbId, Role, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to external output.
/// Use [`UserProfile`] for anything that leaves the auth boundary.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    /// Stored lowercased; uniqueness is case-insensitive.
    pub email: String,
    pub password_hash: String,
    /// Role name string; see [`Role`] for the closed set.
    pub role: String,
    pub preferences: serde_json::Value,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The parsed role, defaulting to [`Role::User`] on an unknown name.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or_default()
    }
}

/// Hash-free user view returned to callers outside the auth boundary.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub preferences: serde_json::Value,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role(),
            preferences: user.preferences.clone(),
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub preferences: serde_json::Value,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub preferences: Option<serde_json::Value>,
}
