//! URL shortener client.
//!
//! Talks to a YOURLS-style shortening API. Each request carries a unix
//! timestamp and an HMAC-SHA-256 signature of that timestamp keyed by
//! the shared secret. Failures are typed and recoverable; the
//! orchestrator falls back to the unshortened URL.

use crate::config::ShortenerConfig;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Connect timeout for the underlying HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Bounded retry budget for one shortening request.
const SHORTEN_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("failed to build shortener HTTP client: {0}")]
    BuildClient(String),

    #[error("shortener request failed: {0}")]
    Request(String),

    #[error("shortener request timed out")]
    Timeout,

    #[error("shortener returned status {0}")]
    Status(u16),

    #[error("malformed shortener response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Deserialize)]
struct ShortUrlResponse {
    #[serde(default)]
    shorturl: String,
}

/// HTTP client for the shortening service. Cheap to clone.
#[derive(Clone)]
pub struct ShortenerClient {
    http: reqwest::Client,
}

impl ShortenerClient {
    pub fn new() -> Result<Self, ShortenerError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ShortenerError::BuildClient(e.to_string()))?;
        Ok(ShortenerClient { http })
    }

    /// Requests a shortened form of `long_url`, retrying once on failure.
    ///
    /// The per-request deadline comes from the configuration snapshot.
    #[instrument(skip_all)]
    pub async fn shorten(
        &self,
        config: &ShortenerConfig,
        long_url: &str,
    ) -> Result<String, ShortenerError> {
        let mut last_error = ShortenerError::Request("no attempt made".to_string());

        for attempt in 1..=SHORTEN_ATTEMPTS {
            match self.shorten_once(config, long_url).await {
                Ok(short) => return Ok(short),
                Err(e) => {
                    debug!(
                        target: "bridge.services.shortener",
                        attempt,
                        error = %e,
                        "Shortening attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn shorten_once(
        &self,
        config: &ShortenerConfig,
        long_url: &str,
    ) -> Result<String, ShortenerError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_timestamp(&timestamp, config.secret.expose_secret())?;

        let response = self
            .http
            .get(&config.api_url)
            .timeout(config.timeout)
            .query(&[
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
                ("action", "shorturl"),
                ("format", "json"),
                ("url", long_url),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ShortenerError::Timeout
                } else {
                    ShortenerError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ShortenerError::Status(status.as_u16()));
        }

        let parsed: ShortUrlResponse = response
            .json()
            .await
            .map_err(|e| ShortenerError::MalformedResponse(e.to_string()))?;

        if parsed.shorturl.is_empty() {
            return Err(ShortenerError::MalformedResponse(
                "response is missing the shortened URL".to_string(),
            ));
        }
        Ok(parsed.shorturl)
    }
}

/// Hex HMAC-SHA-256 of the timestamp keyed by the shared secret.
fn sign_timestamp(timestamp: &str, secret: &str) -> Result<String, ShortenerError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShortenerError::Request(format!("invalid shortener secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
