//! The closed error taxonomy shared by every auth component.
//!
//! Callers branch on the variant, never on message text. Display output is
//! safe to surface upward: no variant ever carries a secret, a plaintext
//! password, or a full token.

/// Which unique constraint a registration or profile update collided with.
///
/// Duplicate email and duplicate username are deliberately distinguishable
/// so the caller can point at the offending field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    EmailTaken,
    UsernameTaken,
}

impl ConflictKind {
    /// Human-readable field description used in the error message.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::EmailTaken => "email is already registered",
            ConflictKind::UsernameTaken => "username is already taken",
        }
    }
}

/// Domain error for the auth/session/token core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad input shape, length, or format. Carries every violated rule,
    /// not just the first, so the caller can report them all at once.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Authentication failure. Deliberately uninformative: unknown email
    /// and wrong password both surface as this exact variant and message.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The token's expiry claim is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The token's signature, structure, issuer, or audience is invalid.
    #[error("Token is malformed")]
    TokenMalformed,

    /// The token carries a not-before claim that is still in the future.
    #[error("Token is not yet valid")]
    TokenNotYetValid,

    /// The token signature verified but no usable session backs it.
    #[error("Session is invalid or has been revoked")]
    SessionInvalid,

    /// A uniqueness constraint was violated.
    #[error("Conflict: {}", .0.as_str())]
    Conflict(ConflictKind),

    /// The referenced entity does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Storage or backend failure, not attributable to caller input.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Shorthand for a single-rule validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthError::Validation(vec![msg.into()])
    }
}
