//! Room-access token issuer.
//!
//! Signs and verifies the compact HS256 tokens the meeting service
//! accepts at room entry, and rebuilds the identity context carried
//! inside a token while honoring the site privacy flags. All operations
//! are pure functions of their inputs.

use crate::platform::{SiteConfig, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum accepted token size in bytes. Oversized tokens are rejected
/// before any parsing or cryptographic work.
const MAX_TOKEN_SIZE_BYTES: usize = 4096;

/// Token failures with distinguishable causes.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token is expired")]
    Expired,
}

/// Requester identity carried inside the token for in-room display.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub avatar: String,
    pub name: String,
    pub email: String,
    pub id: String,
}

/// `context` claim: redacted identity plus an opaque group tag the
/// meeting service may have attached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomContext {
    pub user: UserContext,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
}

/// Signed room-access claims.
///
/// `aud` always contains `iss`; `sub` is the host domain of the routing
/// target; `room` names the meeting the token admits entry to.
#[derive(Clone, Serialize, Deserialize)]
pub struct RoomClaims {
    pub iss: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub sub: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,

    pub context: RoomContext,
}

/// Debug output redacts the identity fields.
impl fmt::Debug for RoomClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomClaims")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("sub", &self.sub)
            .field("room", &self.room)
            .field("context.user", &"[REDACTED]")
            .field("context.group", &self.context.group)
            .finish()
    }
}

/// Signs claims with the route's HMAC secret (HS256).
pub fn sign(claims: &RoomClaims, secret: &SecretString) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Verifies a token and returns its claims.
///
/// Invalid signature, malformed structure and expiry are reported as
/// distinguishable [`TokenError`] causes.
pub fn verify(token: &str, secret: &SecretString) -> Result<RoomClaims, TokenError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        return Err(TokenError::Malformed(format!(
            "token exceeds {} bytes",
            MAX_TOKEN_SIZE_BYTES
        )));
    }

    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    // The audience mirrors the issuer app id; route selection already
    // fixed which secret applies, so no audience check here.
    validation.validate_aud = false;

    let data = decode::<RoomClaims>(token, &key, &validation).map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed(e.to_string()),
        }
    })?;

    Ok(data.claims)
}

/// Builds the redacted identity context for a user.
///
/// Email and full name are blanked whenever the corresponding site
/// privacy flag is disabled; the avatar URL is derived from the site
/// base URL with a cache-busting timestamp.
pub fn identity_context(user: &User, site: &SiteConfig) -> UserContext {
    let mut redacted = user.clone();
    if !site.show_full_name {
        redacted.first_name = String::new();
        redacted.last_name = String::new();
    }
    if !site.show_email {
        redacted.email = String::new();
    }

    UserContext {
        avatar: format!(
            "{}/api/v4/users/{}/image?_={}",
            site.site_url.trim_end_matches('/'),
            redacted.id,
            redacted.last_picture_update
        ),
        name: redacted.display_name(),
        email: redacted.email,
        id: redacted.id,
    }
}

/// Verifies a token, replaces its identity context with one derived from
/// the given user (privacy redaction applied), and re-signs it.
///
/// `room`, `exp` and `context.group` are preserved unchanged.
pub fn refresh_identity_context(
    token: &str,
    secret: &SecretString,
    user: &User,
    site: &SiteConfig,
) -> Result<String, TokenError> {
    let mut claims = verify(token, secret)?;
    claims.context = RoomContext {
        user: identity_context(user, site),
        group: claims.context.group,
    };
    sign(&claims, secret)
}
