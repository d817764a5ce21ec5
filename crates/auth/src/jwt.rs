//! JWT access/refresh token generation and validation.
//!
//! Both token kinds are HS256-signed JWTs sharing one [`Claims`] shape;
//! refresh tokens are tagged `type = "refresh"` and must never be accepted
//! where an access token is expected. Expiry and not-before are checked
//! against the caller's clock (passed as `now`), not wall time, so token
//! lifecycles are fully testable.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vega_core::error::AuthError;
use vega_core::types::{DbId, Role, Timestamp};

/// The `type` claim value marking a refresh token.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Refresh token lifetime in days. Fixed and independent of the
/// configured access-token expiry.
pub const REFRESH_EXPIRY_DAYS: i64 = 30;

/// Default access token expiry: 7 days.
const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 7 * 24 * 3600;

/// JWT claims embedded in every issued token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// The user's email. Access tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// The user's role name. Access tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Token kind tag; `"refresh"` on refresh tokens, absent on access
    /// tokens.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub token_type: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Not-before time (UTC Unix timestamp), if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nbf: Option<i64>,
    /// Issuer; must match the configured issuer exactly.
    pub iss: String,
    /// Audience; must match the configured audience exactly.
    pub aud: String,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

impl Claims {
    /// Whether this token carries the refresh tag.
    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some(TOKEN_TYPE_REFRESH)
    }
}

/// Configuration for JWT token generation and validation.
///
/// Fixed at construction; there is no runtime mutation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in seconds (default: 7 days).
    pub access_token_expiry_secs: i64,
    /// Fixed issuer claim.
    pub issuer: String,
    /// Fixed audience claim.
    pub audience: String,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default        |
    /// |--------------------------|----------|----------------|
    /// | `JWT_SECRET`             | **yes**  | --             |
    /// | `JWT_ACCESS_EXPIRY_SECS` | no       | `604800` (7d)  |
    /// | `JWT_ISSUER`             | no       | `vega-auth`    |
    /// | `JWT_AUDIENCE`           | no       | `vega-clients` |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_secs: i64 = std::env::var("JWT_ACCESS_EXPIRY_SECS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_SECS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_SECS must be a valid i64");

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "vega-auth".into());
        let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "vega-clients".into());

        Self {
            secret,
            access_token_expiry_secs,
            issuer,
            audience,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate an HS256 access token for the given user.
///
/// Embeds the user id, email, role, issue time, expiration, issuer,
/// audience, and a unique `jti` claim.
pub fn generate_access_token(
    user_id: DbId,
    email: &str,
    role: Role,
    config: &JwtConfig,
    now: Timestamp,
) -> Result<String, AuthError> {
    if user_id <= 0 {
        return Err(AuthError::validation("token subject is required"));
    }

    let iat = now.timestamp();
    let claims = Claims {
        sub: user_id,
        email: Some(email.to_string()),
        role: Some(role.as_str().to_string()),
        token_type: None,
        exp: iat + config.access_token_expiry_secs,
        iat,
        nbf: None,
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        jti: Uuid::new_v4().to_string(),
    };

    sign(&claims, config)
}

/// Generate an HS256 refresh token for the given user.
///
/// Same signer as access tokens, but the payload is tagged
/// `type = "refresh"` and carries the fixed [`REFRESH_EXPIRY_DAYS`]
/// lifetime, independent of the access-token expiry setting.
pub fn generate_refresh_token(
    user_id: DbId,
    config: &JwtConfig,
    now: Timestamp,
) -> Result<String, AuthError> {
    if user_id <= 0 {
        return Err(AuthError::validation("token subject is required"));
    }

    let iat = now.timestamp();
    let claims = Claims {
        sub: user_id,
        email: None,
        role: None,
        token_type: Some(TOKEN_TYPE_REFRESH.to_string()),
        exp: iat + REFRESH_EXPIRY_DAYS * 24 * 3600,
        iat,
        nbf: None,
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
        jti: Uuid::new_v4().to_string(),
    };

    sign(&claims, config)
}

fn sign(claims: &Claims, config: &JwtConfig) -> Result<String, AuthError> {
    encode(
        &Header::default(), // HS256
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Validate a token and return the embedded [`Claims`].
///
/// Signature, structure, and exact issuer/audience match are checked by
/// the JWT library; any failure there is [`AuthError::TokenMalformed`].
/// Expiry and not-before are then checked against `now` with zero leeway:
/// a past `exp` is [`AuthError::TokenExpired`], a future `nbf` is
/// [`AuthError::TokenNotYetValid`].
pub fn verify_token(token: &str, config: &JwtConfig, now: Timestamp) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    // Time claims are checked below against the injected clock.
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::TokenMalformed,
    })?;
    let claims = token_data.claims;

    if now.timestamp() >= claims.exp {
        return Err(AuthError::TokenExpired);
    }
    if let Some(nbf) = claims.nbf {
        if now.timestamp() < nbf {
            return Err(AuthError::TokenNotYetValid);
        }
    }

    Ok(claims)
}

/// Decode a token WITHOUT verifying its signature.
///
/// Used only to mirror the `exp` claim into the session record. Never use
/// this for authorization decisions.
pub fn decode_unverified(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims::<&str>(&[]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| AuthError::TokenMalformed)?;
    Ok(token_data.claims)
}

/// Whether the token verifies AND carries the refresh tag.
pub fn is_refresh_token(token: &str, config: &JwtConfig, now: Timestamp) -> bool {
    verify_token(token, config, now)
        .map(|claims| claims.is_refresh())
        .unwrap_or(false)
}

/// Seconds until the token's expiry claim, floored at zero.
///
/// Returns 0 for malformed tokens. Informational only (unverified decode).
pub fn remaining_seconds(token: &str, now: Timestamp) -> i64 {
    decode_unverified(token)
        .map(|claims| (claims.exp - now.timestamp()).max(0))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the token from an `Authorization` header value.
///
/// Accepts only the exact `"Bearer "` scheme prefix: case-sensitive, one
/// space, non-empty remainder. Any other shape is `None`, never an error.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?;
    if token.is_empty() || token.starts_with(' ') {
        return None;
    }
    Some(token)
}

/// Pick the presented token from an `Authorization` header and/or a
/// cookie value. The header wins when both are present.
pub fn extract_token<'a>(
    header: Option<&'a str>,
    cookie: Option<&'a str>,
) -> Option<&'a str> {
    header
        .and_then(extract_bearer)
        .or_else(|| cookie.filter(|c| !c.is_empty()))
}
