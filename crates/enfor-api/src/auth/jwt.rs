//! JWT token issuance and validation
//!
//! Tokens are HMAC-signed (HS256 on issue; HS384/HS512 accepted on validation)
//! and carry the user's id, email and role. Validation is purely cryptographic
//! and temporal: nothing is looked up in storage.

use std::time::Duration;

use chrono::{DateTime, Utc};
use enfor_core::{ConfigError, JwtSettings, UserRole};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// HMAC family; anything else in a token header is refused before decoding.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// JWT Claims structure containing user information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID as a string
    pub sub: String,
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Not before (Unix seconds)
    pub nbf: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    pub iss: String,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed token")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Unexpected signing method: {0}")]
    DisallowedAlgorithm(String),
}

/// JWT Configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime
    pub ttl: Duration,
    /// Written into `iss` and required on validation
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            secret: settings.secret.clone(),
            ttl: settings.ttl()?,
            issuer: settings.issuer.clone(),
        })
    }

    fn ttl_secs(&self) -> i64 {
        i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        let settings = JwtSettings::default();
        Self {
            secret: settings.secret,
            ttl: Duration::from_secs(24 * 60 * 60),
            issuer: settings.issuer,
        }
    }
}

/// Issue a token for a user, valid from now for the configured lifetime.
///
/// # Example
///
/// ```no_run
/// use enfor_api::auth::jwt::{issue_token, JwtConfig};
/// use enfor_core::UserRole;
/// use uuid::Uuid;
///
/// let config = JwtConfig::default();
/// let token = issue_token(&config, Uuid::new_v4(), "jane@example.com", UserRole::Broker)
///     .expect("Failed to issue token");
/// ```
pub fn issue_token(
    config: &JwtConfig,
    user_id: Uuid,
    email: &str,
    role: UserRole,
) -> Result<String, JwtError> {
    issue_token_at(config, user_id, email, role, Utc::now())
}

/// Issue a token as if it had been issued at `issued_at`.
pub fn issue_token_at(
    config: &JwtConfig,
    user_id: Uuid,
    email: &str,
    role: UserRole,
    issued_at: DateTime<Utc>,
) -> Result<String, JwtError> {
    let iat = issued_at.timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        user_id,
        email: email.to_string(),
        role,
        iat,
        nbf: iat,
        exp: iat.saturating_add(config.ttl_secs()),
        iss: config.issuer.clone(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a token and return its claims.
///
/// Rejects non-HMAC algorithms, bad signatures, a wrong issuer, tokens used
/// before `nbf` and tokens at or past `exp`.
pub fn validate_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let header = decode_header(token).map_err(|_| JwtError::Malformed)?;
    if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
        return Err(JwtError::DisallowedAlgorithm(format!("{:?}", header.alg)));
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    validation.leeway = 0;
    validation.validate_nbf = true;
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::ImmatureSignature => JwtError::NotYetValid,
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        ErrorKind::InvalidAlgorithm => JwtError::DisallowedAlgorithm(format!("{:?}", header.alg)),
        _ => JwtError::Malformed,
    })?;

    // The library accepts a token whose exp equals the current second.
    let claims = token_data.claims;
    if claims.exp <= Utc::now().timestamp() {
        return Err(JwtError::Expired);
    }
    if claims.sub != claims.user_id.to_string() {
        return Err(JwtError::Malformed);
    }

    Ok(claims)
}
