//! Bridge error taxonomy.
//!
//! Every failure is an explicit return value. User-facing text is
//! deliberately generic for anything operational; validation failures
//! carry the accepted value set verbatim.

use crate::config::ConfigError;
use crate::platform::PlatformError;
use crate::services::shortener::ShortenerError;
use crate::settings::SettingsError;
use crate::token::TokenError;
use thiserror::Error;

/// Generic ephemeral message for failures the user cannot act on.
pub const GENERIC_START_ERROR: &str = "We could not start a meeting at this time.";

#[derive(Debug, Error)]
pub enum BridgeError {
    /// User/channel/team lookup failed (not found or transport).
    #[error("lookup failed: {0}")]
    Lookup(#[source] PlatformError),

    /// Notification or ephemeral delivery failed.
    #[error("post delivery failed: {0}")]
    Publish(#[source] PlatformError),

    /// An outbound call exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// Bad user input; message is safe to show verbatim.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Shortener failure. Request failures are recovered inline by the
    /// orchestrator (long-URL fallback); this surfaces only when the
    /// shortener HTTP client cannot be constructed.
    #[error(transparent)]
    Shortener(#[from] ShortenerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BridgeError {
    /// Text safe to show the requesting user. Operational detail stays
    /// in the logs.
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::Validation(msg) => msg.clone(),
            BridgeError::Settings(e) => match e {
                SettingsError::UnknownField(_)
                | SettingsError::InvalidEmbedded(_)
                | SettingsError::InvalidScheme(_) => e.to_string(),
                _ => "Unable to update user settings.".to_string(),
            },
            _ => GENERIC_START_ERROR.to_string(),
        }
    }
}
