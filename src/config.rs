//! Bridge configuration.
//!
//! Configuration is an immutable snapshot ([`Config`]) handed by `Arc` to
//! every orchestrator, resolver and issuer call. Reloads go through
//! [`ConfigStore`], which atomically swaps the snapshot via a watch
//! channel; readers never hold a lock across a request.

use crate::models::NamingScheme;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Default deadline for outbound platform lookups and post delivery.
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 3_000;

/// Default deadline for one shortener request.
const DEFAULT_SHORTENER_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(String),
}

/// One fully-configured meeting-service backend.
///
/// Two routes exist; the requesting team's membership in the primary
/// team set selects between them.
#[derive(Clone)]
pub struct RouteConfig {
    /// Base URL of the meeting service, e.g. `https://meet.example.com`.
    pub base_url: String,

    /// Whether joins on this route require a signed access token.
    pub token_enabled: bool,

    /// Access-token validity window in minutes.
    pub token_valid_minutes: i64,

    /// Token issuer/audience identifier registered with the meeting service.
    pub app_id: String,

    /// HMAC signing secret shared with the meeting service.
    pub app_secret: SecretString,
}

impl RouteConfig {
    /// Host domain of the base URL; used as the token subject.
    pub fn host_domain(&self) -> Result<String, ConfigError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidRoute(format!("{}: {}", self.base_url, e)))?;
        url.host_str()
            .map(|h| h.to_string())
            .ok_or_else(|| ConfigError::InvalidRoute(format!("{} has no host", self.base_url)))
    }

    fn validate(&self, label: &str) -> Result<(), ConfigError> {
        self.host_domain()
            .map_err(|e| ConfigError::InvalidRoute(format!("{} route: {}", label, e)))?;
        if self.token_enabled {
            if self.app_id.is_empty() {
                return Err(ConfigError::InvalidRoute(format!(
                    "{} route: token issuance enabled but app id is empty",
                    label
                )));
            }
            if self.app_secret.expose_secret().is_empty() {
                return Err(ConfigError::InvalidRoute(format!(
                    "{} route: token issuance enabled but app secret is empty",
                    label
                )));
            }
            if self.token_valid_minutes <= 0 {
                return Err(ConfigError::InvalidRoute(format!(
                    "{} route: token validity must be positive, got {}",
                    label, self.token_valid_minutes
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("base_url", &self.base_url)
            .field("token_enabled", &self.token_enabled)
            .field("token_valid_minutes", &self.token_valid_minutes)
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

/// Configuration of the external URL-shortening service.
#[derive(Clone)]
pub struct ShortenerConfig {
    /// Shortener API endpoint.
    pub api_url: String,

    /// Shared secret used to sign shortening requests.
    pub secret: SecretString,

    /// Per-request deadline.
    pub timeout: Duration,
}

impl fmt::Debug for ShortenerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortenerConfig")
            .field("api_url", &self.api_url)
            .field("secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Process-wide defaults applied to users who never changed a setting.
#[derive(Debug, Clone)]
pub struct PreferenceDefaults {
    pub embedded: bool,
    pub naming_scheme: NamingScheme,
}

/// Immutable bridge configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Team ids routed to the primary meeting service.
    pub primary_team_ids: HashSet<String>,

    pub primary: RouteConfig,
    pub secondary: RouteConfig,

    pub defaults: PreferenceDefaults,
    pub shortener: ShortenerConfig,

    /// Deadline applied to every outbound platform call.
    pub lookup_timeout: Duration,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from an env-style map (testable).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let primary = Self::route_from_vars(vars, "JITSI", "primary")?;
        let secondary = Self::route_from_vars(vars, "JITSI2", "secondary")?;

        let primary_team_ids = vars
            .get("PRIMARY_TEAM_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let embedded = parse_bool(vars, "DEFAULT_EMBEDDED", false)?;
        let naming_scheme = match vars.get("DEFAULT_NAMING_SCHEME") {
            Some(tag) => {
                NamingScheme::from_tag(tag).ok_or_else(|| ConfigError::InvalidValue {
                    var: "DEFAULT_NAMING_SCHEME".to_string(),
                    value: tag.clone(),
                })?
            }
            None => NamingScheme::Words,
        };

        let shortener = ShortenerConfig {
            api_url: vars
                .get("SHORTENER_API_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("SHORTENER_API_URL".to_string()))?
                .clone(),
            secret: SecretString::from(
                vars.get("SHORTENER_SECRET")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SHORTENER_SECRET".to_string()))?
                    .clone(),
            ),
            timeout: Duration::from_millis(parse_u64(
                vars,
                "SHORTENER_TIMEOUT_MS",
                DEFAULT_SHORTENER_TIMEOUT_MS,
            )?),
        };

        let lookup_timeout = Duration::from_millis(parse_u64(
            vars,
            "LOOKUP_TIMEOUT_MS",
            DEFAULT_LOOKUP_TIMEOUT_MS,
        )?);

        let config = Config {
            primary_team_ids,
            primary,
            secondary,
            defaults: PreferenceDefaults {
                embedded,
                naming_scheme,
            },
            shortener,
            lookup_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    fn route_from_vars(
        vars: &HashMap<String, String>,
        prefix: &str,
        label: &str,
    ) -> Result<RouteConfig, ConfigError> {
        let var = |suffix: &str| format!("{}_{}", prefix, suffix);
        let base_url = vars
            .get(&var("URL"))
            .ok_or_else(|| ConfigError::MissingEnvVar(var("URL")))?
            .clone();

        let route = RouteConfig {
            base_url,
            token_enabled: parse_bool(vars, &var("JWT_ENABLED"), false)?,
            token_valid_minutes: parse_u64(vars, &var("LINK_VALID_MINUTES"), 30)? as i64,
            app_id: vars.get(&var("APP_ID")).cloned().unwrap_or_default(),
            app_secret: SecretString::from(
                vars.get(&var("APP_SECRET")).cloned().unwrap_or_default(),
            ),
        };
        route.validate(label)?;
        Ok(route)
    }

    /// Self-consistency check; also run on every load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary.validate("primary")?;
        self.secondary.validate("secondary")?;
        Ok(())
    }

    /// Selects the route for a request originating in the given team.
    pub fn route_for_team(&self, team_id: &str) -> &RouteConfig {
        if self.primary_team_ids.contains(team_id) {
            &self.primary
        } else {
            &self.secondary
        }
    }
}

/// Reloadable holder of the active [`Config`] snapshot.
///
/// Reads clone an `Arc` out of a watch channel; a reload replaces the
/// snapshot atomically without blocking readers.
pub struct ConfigStore {
    tx: watch::Sender<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        let (tx, _) = watch::channel(Arc::new(config));
        ConfigStore { tx }
    }

    /// The current snapshot. Cheap; safe to call per request.
    pub fn snapshot(&self) -> Arc<Config> {
        self.tx.borrow().clone()
    }

    /// Validates and atomically installs a new snapshot.
    pub fn reload(&self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;
        self.tx.send_replace(Arc::new(config));
        Ok(())
    }

    /// A receiver that observes future reloads.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(var) {
        None => Ok(default),
        Some(raw) => match raw.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw.clone(),
            }),
        },
    }
}

fn parse_u64(vars: &HashMap<String, String>, var: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.clone(),
        }),
    }
}
