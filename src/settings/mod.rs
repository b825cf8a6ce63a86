//! Per-user settings store.
//!
//! A thin read-modify-write state machine over the host key/value store.
//! Records are created lazily from the configured defaults, mutated only
//! through validated writes, and never deleted. A successful write also
//! broadcasts a change event scoped to the owning user, so connected
//! clients can pick up the new preferences.

use crate::config::Config;
use crate::models::{NamingScheme, StoredPreference, UserPreference};
use crate::platform::{Platform, PlatformError};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Key prefix for per-user preference records.
const KV_KEY_PREFIX: &str = "config_";

/// Event broadcast to the owning user after a successful write.
pub const CONFIG_CHANGE_EVENT: &str = "config_update";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid config field `{0}`, use `embedded` or `naming_scheme`.")]
    UnknownField(String),

    #[error("Invalid `embedded` value `{0}`, use `true` or `false`.")]
    InvalidEmbedded(String),

    #[error("Invalid `naming_scheme` value `{0}`, use `words`, `uuid`, `mattermost` or `ask`.")]
    InvalidScheme(String),

    #[error("stored preference record for {user_id} is corrupt: {detail}")]
    CorruptRecord { user_id: String, detail: String },

    #[error("settings storage error: {0}")]
    Storage(#[from] PlatformError),

    #[error("settings {operation} timed out")]
    Timeout { operation: &'static str },
}

/// Runs a platform storage call under the configured deadline.
async fn bounded<T>(
    config: &Config,
    operation: &'static str,
    fut: impl Future<Output = Result<T, PlatformError>>,
) -> Result<T, SettingsError> {
    tokio::time::timeout(config.lookup_timeout, fut)
        .await
        .map_err(|_| SettingsError::Timeout { operation })?
        .map_err(SettingsError::Storage)
}

/// The two user-settable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    Embedded,
    NamingScheme,
}

impl SettingField {
    pub fn parse(field: &str) -> Result<Self, SettingsError> {
        match field {
            "embedded" => Ok(SettingField::Embedded),
            "naming_scheme" => Ok(SettingField::NamingScheme),
            other => Err(SettingsError::UnknownField(other.to_string())),
        }
    }
}

/// KV-backed preference store.
pub struct SettingsStore {
    platform: Arc<dyn Platform>,
}

impl SettingsStore {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        SettingsStore { platform }
    }

    fn key(user_id: &str) -> String {
        format!("{}{}", KV_KEY_PREFIX, user_id)
    }

    /// Reads a user's preferences, falling back to the configured
    /// defaults when no record exists.
    ///
    /// A record that no longer parses is reported as corruption rather
    /// than silently replaced by a default.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get(&self, config: &Config, user_id: &str) -> Result<UserPreference, SettingsError> {
        let raw = bounded(config, "kv_get", self.platform.kv_get(&Self::key(user_id))).await?;

        let Some(raw) = raw else {
            return Ok(UserPreference {
                user_id: user_id.to_string(),
                embedded: config.defaults.embedded,
                naming_scheme: config.defaults.naming_scheme,
            });
        };

        let stored: StoredPreference =
            serde_json::from_slice(&raw).map_err(|e| SettingsError::CorruptRecord {
                user_id: user_id.to_string(),
                detail: e.to_string(),
            })?;

        Ok(UserPreference {
            user_id: user_id.to_string(),
            embedded: stored.embedded,
            naming_scheme: stored.naming_scheme,
        })
    }

    /// Validates and applies one field update.
    ///
    /// On validation failure nothing is written and the rejected value is
    /// reported back. On success the record is persisted and a change
    /// event is published to the owning user.
    #[instrument(skip_all, fields(user_id = %user_id, field = %field))]
    pub async fn set(
        &self,
        config: &Config,
        user_id: &str,
        field: &str,
        value: &str,
    ) -> Result<UserPreference, SettingsError> {
        let mut preference = self.get(config, user_id).await?;

        match SettingField::parse(field)? {
            SettingField::Embedded => {
                preference.embedded = match value {
                    "true" => true,
                    "false" => false,
                    other => return Err(SettingsError::InvalidEmbedded(other.to_string())),
                };
            }
            SettingField::NamingScheme => {
                preference.naming_scheme = NamingScheme::from_tag(value)
                    .ok_or_else(|| SettingsError::InvalidScheme(value.to_string()))?;
            }
        }

        let stored = StoredPreference {
            embedded: preference.embedded,
            naming_scheme: preference.naming_scheme,
        };
        let raw = serde_json::to_vec(&stored).map_err(|e| SettingsError::CorruptRecord {
            user_id: user_id.to_string(),
            detail: e.to_string(),
        })?;

        bounded(
            config,
            "kv_set",
            self.platform.kv_set(&Self::key(user_id), raw),
        )
        .await?;
        bounded(
            config,
            "publish_event",
            self.platform
                .publish_event(CONFIG_CHANGE_EVENT, serde_json::Value::Null, user_id),
        )
        .await?;

        debug!(
            target: "bridge.settings",
            user_id = %user_id,
            field = %field,
            "User setting updated"
        );
        Ok(preference)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;
    use std::collections::HashMap;

    fn test_config() -> Config {
        let vars = HashMap::from([
            ("JITSI_URL".to_string(), "https://meet.example.com".to_string()),
            ("JITSI2_URL".to_string(), "https://meet2.example.com".to_string()),
            (
                "SHORTENER_API_URL".to_string(),
                "https://short.example.com/api".to_string(),
            ),
            ("SHORTENER_SECRET".to_string(), "hush".to_string()),
            ("DEFAULT_NAMING_SCHEME".to_string(), "words".to_string()),
        ]);
        Config::from_vars(&vars).expect("test config should load")
    }

    fn store() -> (Arc<MockPlatform>, SettingsStore) {
        let platform = Arc::new(MockPlatform::new());
        let store = SettingsStore::new(platform.clone());
        (platform, store)
    }

    #[tokio::test]
    async fn test_get_defaults_when_absent() {
        let (_, store) = store();
        let pref = store.get(&test_config(), "u1").await.unwrap();

        assert!(!pref.embedded);
        assert_eq!(pref.naming_scheme, NamingScheme::Words);
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let (platform, store) = store();
        let config = test_config();

        store.set(&config, "u1", "embedded", "true").await.unwrap();
        let pref = store.get(&config, "u1").await.unwrap();
        assert!(pref.embedded);

        store
            .set(&config, "u1", "naming_scheme", "mattermost")
            .await
            .unwrap();
        let pref = store.get(&config, "u1").await.unwrap();
        assert!(pref.embedded, "embedded must survive a scheme update");
        assert_eq!(pref.naming_scheme, NamingScheme::Mattermost);

        // Persisted record has the documented JSON shape.
        let raw = platform.kv_value("config_u1").expect("record persisted");
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["embedded"], true);
        assert_eq!(json["naming_scheme"], "mattermost");
    }

    #[tokio::test]
    async fn test_set_publishes_change_event() {
        let (platform, store) = store();
        store
            .set(&test_config(), "u1", "embedded", "false")
            .await
            .unwrap();

        let events = platform.events();
        assert_eq!(events.len(), 1);
        assert!(events
            .first()
            .is_some_and(|e| e.event == CONFIG_CHANGE_EVENT && e.user_id == "u1"));
    }

    #[tokio::test]
    async fn test_invalid_embedded_value_leaves_record_untouched() {
        let (platform, store) = store();
        let config = test_config();
        store.set(&config, "u1", "embedded", "true").await.unwrap();

        let result = store.set(&config, "u1", "embedded", "maybe").await;
        assert!(matches!(result, Err(SettingsError::InvalidEmbedded(v)) if v == "maybe"));

        let pref = store.get(&config, "u1").await.unwrap();
        assert!(pref.embedded, "failed write must not mutate state");
        assert_eq!(platform.events().len(), 1, "no event for the failed write");
    }

    #[tokio::test]
    async fn test_invalid_scheme_rejected_at_write_boundary() {
        let (_, store) = store();
        let result = store
            .set(&test_config(), "u1", "naming_scheme", "english-titlecase")
            .await;
        assert!(
            matches!(result, Err(SettingsError::InvalidScheme(v)) if v == "english-titlecase")
        );
    }

    #[tokio::test]
    async fn test_unknown_field_rejected() {
        let (_, store) = store();
        let result = store.set(&test_config(), "u1", "colour", "blue").await;
        assert!(matches!(result, Err(SettingsError::UnknownField(f)) if f == "colour"));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported_not_masked() {
        let (platform, store) = store();
        platform.seed_kv("config_u1", b"{not json".to_vec());

        let result = store.get(&test_config(), "u1").await;
        assert!(matches!(
            result,
            Err(SettingsError::CorruptRecord { user_id, .. }) if user_id == "u1"
        ));
    }
}
