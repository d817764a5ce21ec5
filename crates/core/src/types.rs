//! Shared type aliases and closed domain enums.

use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// User role. Stored in the database as its string representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
}

impl Role {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
        }
    }

    /// Parse the database string representation.
    ///
    /// Returns `None` for unknown role names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "moderator" => Some(Role::Moderator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session revocation reasons
// ---------------------------------------------------------------------------

/// Why a session was revoked. Stored as its string representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationReason {
    /// The user logged out explicitly.
    Logout,
    /// The session outlived its token and was discovered expired.
    Expired,
    /// A security event (password change, account deactivation).
    Security,
    /// Revoked by an operator.
    Manual,
}

impl RevocationReason {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::Expired => "expired",
            RevocationReason::Security => "security",
            RevocationReason::Manual => "manual",
        }
    }

    /// Parse the database string representation.
    ///
    /// Returns `None` for unknown reason names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "logout" => Some(RevocationReason::Logout),
            "expired" => Some(RevocationReason::Expired),
            "security" => Some(RevocationReason::Security),
            "manual" => Some(RevocationReason::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
