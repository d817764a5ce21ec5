//! Argon2id password hashing, verification, strength validation, and
//! random password generation.
//!
//! All password hashes use the Argon2id variant with a cryptographically
//! random salt generated via [`OsRng`]. The PHC string format is used for
//! storage so that algorithm parameters and salt are embedded in the hash
//! itself.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::seq::{IndexedRandom, SliceRandom};

use vega_core::error::AuthError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted password length.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Default length for generated passwords.
pub const DEFAULT_GENERATED_LEN: usize = 16;

/// Special characters counted by the strength rules and used by the
/// generator.
const SPECIAL_CHARS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Passwords rejected outright, compared case-insensitively.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "qwerty123",
    "letmein123",
    "welcome1",
    "admin123",
    "iloveyou1",
];

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params,
/// salt, and hash). Inputs shorter than [`MIN_PASSWORD_LEN`] are rejected
/// before any work is done.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default(); // Argon2id with default params
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does
/// not. A stored hash that fails to parse is an internal error, never a
/// mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AuthError::Internal(format!("stored password hash is invalid: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Strength validation
// ---------------------------------------------------------------------------

/// Outcome of a strength check. `errors` lists EVERY violated rule.
#[derive(Debug, Clone)]
pub struct StrengthReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Check a password against the strength rules.
///
/// Accumulates all violations instead of stopping at the first, so a
/// caller can report the complete list in one round trip.
pub fn validate_password_strength(password: &str) -> StrengthReport {
    let mut errors = Vec::new();

    if password.len() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        errors.push(format!("must be at most {MAX_PASSWORD_LEN} characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("must contain a digit".to_string());
    }
    if !password
        .bytes()
        .any(|b| SPECIAL_CHARS.contains(&b))
    {
        errors.push("must contain a special character".to_string());
    }
    if COMMON_PASSWORDS
        .iter()
        .any(|common| common.eq_ignore_ascii_case(password))
    {
        errors.push("is too common".to_string());
    }

    StrengthReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Generate a random password of `length` characters that satisfies every
/// strength rule by construction.
///
/// One character from each required class is guaranteed, the remainder is
/// filled from the combined alphabet, and the result is shuffled so the
/// class characters are not positionally predictable. Lengths below
/// [`MIN_PASSWORD_LEN`] are clamped up to it.
pub fn generate_random_password(length: usize) -> String {
    let length = length.max(MIN_PASSWORD_LEN);
    let mut rng = rand::rng();

    let mut chars: Vec<u8> = vec![
        *LOWERCASE.choose(&mut rng).expect("non-empty class"),
        *UPPERCASE.choose(&mut rng).expect("non-empty class"),
        *DIGITS.choose(&mut rng).expect("non-empty class"),
        *SPECIAL_CHARS.choose(&mut rng).expect("non-empty class"),
    ];

    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SPECIAL_CHARS].concat();
    while chars.len() < length {
        chars.push(*alphabet.choose(&mut rng).expect("non-empty alphabet"));
    }
    chars.shuffle(&mut rng);

    String::from_utf8(chars).expect("alphabet is ASCII")
}
