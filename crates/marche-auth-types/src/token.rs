//! JWT session-token issuing and validation.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marche_domain::account::AccountRole;

use crate::cookie::SESSION_TOKEN_EXP;

/// Account identity extracted from a validated session token.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub account_id: Uuid,
    pub role: AccountRole,
    pub exp: u64,
}

/// A freshly signed session token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub exp: u64,
}

/// Errors returned by [`issue_session_token`] and [`validate_session_token`].
#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// JWT claims payload.
///
/// | Field | JWT claim | Rust type | Meaning |
/// |-------|-----------|-----------|---------|
/// | `sub` | `sub` | UUID string | account ID |
/// | `role` | custom | [`AccountRole`] | role at issue time |
/// | `exp` | `exp` | seconds since epoch | token expiration |
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: AccountRole,
    pub exp: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Sign an HS256 session token bound to `account_id`.
pub fn issue_session_token(
    account_id: Uuid,
    role: AccountRole,
    secret: &str,
) -> Result<IssuedToken, SessionTokenError> {
    let exp = now_secs() + SESSION_TOKEN_EXP;
    let claims = SessionClaims {
        sub: account_id.to_string(),
        role,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(SessionTokenError::Signing)?;
    Ok(IssuedToken { token, exp })
}

/// Validate a session token, returning the bound identity.
///
/// Validation: HS256, exp checked, required claims: `exp` + `sub`.
/// Default leeway = 60s.
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionInfo, SessionTokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionTokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => SessionTokenError::InvalidSignature,
        _ => SessionTokenError::Malformed,
    })?;

    let account_id = data
        .claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| SessionTokenError::Malformed)?;
    Ok(SessionInfo {
        account_id,
        role: data.claims.role,
        exp: data.claims.exp,
    })
}
