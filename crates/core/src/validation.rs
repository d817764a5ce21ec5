//! Input-shape validators for registration and profile updates.
//!
//! These check shape only (length, character set, format). Password
//! strength rules live with the hasher in `vega-auth`.

use std::sync::OnceLock;

use regex::Regex;
use validator::ValidateEmail;

use crate::error::AuthError;

/// Minimum username length.
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 30;

/// Maximum email length accepted before format checking.
pub const MAX_EMAIL_LEN: usize = 254;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex must compile"))
}

/// Validate a username: 3-30 characters, alphanumeric or underscore.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
        return Err(AuthError::validation(format!(
            "username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username_regex().is_match(username) {
        return Err(AuthError::validation(
            "username may only contain letters, digits, and underscores",
        ));
    }
    Ok(())
}

/// Validate an email address format.
///
/// Comparison and storage are case-insensitive; use [`normalize_email`]
/// before persisting or looking up.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.len() > MAX_EMAIL_LEN || !email.validate_email() {
        return Err(AuthError::validation("email address is not valid"));
    }
    Ok(())
}

/// Lowercase an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
