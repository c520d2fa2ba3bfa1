//! Bridge configuration loading.
//!
//! Supports multiple configuration sources with priority:
//! 1. Environment variables (highest priority)
//! 2. TOML file (`--config <path>`, or `lumibridge.toml` when present)
//! 3. Built-in defaults
//!
//! The result is validated once and is immutable for the process lifetime.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Default values.
pub mod defaults {
    pub const API_URL: &str = "https://aiot-rpc-usa.aqara.com";
    pub const MQTT_URL: &str = "mqtt://localhost:1883";
    pub const POLL_INTERVAL_SECS: u64 = 1;
    pub const LOG_LEVEL: &str = "info";
    pub const DISCOVERY_PREFIX: &str = "homeassistant";
    pub const CAMERA_MODEL_PREFIX: &str = "lumi.camera";
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Config file picked up from the working directory when no path is given.
    pub const CONFIG_FILE: &str = "lumibridge.toml";
}

/// Environment variable names.
pub mod env_vars {
    pub const API_URL: &str = "AQUARA_URL";
    pub const APP_ID: &str = "APPID";
    pub const TOKEN: &str = "TOKEN";
    pub const SUBJECT_ID: &str = "SUBJECT_ID";
    pub const MQTT_URL: &str = "MQTT_URL";
    pub const MQTT_USER: &str = "MQTT_USER";
    pub const MQTT_PASS: &str = "MQTT_PASS";
    pub const POLL_INTERVAL: &str = "POLL_INTERVAL";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const DISCOVERY_PREFIX: &str = "DISCOVERY_PREFIX";
    pub const CAMERA_MODEL_PREFIX: &str = "CAMERA_MODEL_PREFIX";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
}

const MIN_APP_ID_LEN: usize = 8;
const MIN_TOKEN_LEN: usize = 16;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Log verbosity accepted by `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [&'static str; 4] = ["debug", "info", "warn", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "expected one of {}, got '{}'",
                LogLevel::ALL.join(", "),
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broker address derived from `MQTT_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    fn from_url(url: &Url) -> ConfigResult<Self> {
        let tls = match url.scheme() {
            "mqtt" | "tcp" => false,
            "mqtts" | "ssl" => true,
            other => {
                return Err(ConfigError::Invalid {
                    key: env_vars::MQTT_URL,
                    reason: format!("unsupported scheme '{}'", other),
                })
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::Invalid {
                key: env_vars::MQTT_URL,
                reason: "missing host".to_string(),
            })?
            .to_string();

        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

        Ok(Self { host, port, tls })
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Raw, optional-everything view of one configuration source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PartialConfig {
    api_url: Option<String>,
    app_id: Option<String>,
    token: Option<String>,
    subject_id: Option<String>,
    mqtt_url: Option<String>,
    mqtt_user: Option<String>,
    mqtt_pass: Option<String>,
    poll_interval: Option<u64>,
    log_level: Option<String>,
    discovery_prefix: Option<String>,
    camera_model_prefix: Option<String>,
    request_timeout: Option<u64>,
}

impl PartialConfig {
    fn from_env(env: &HashMap<String, String>) -> ConfigResult<Self> {
        let get = |key: &str| {
            env.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_secs = |key: &'static str| -> ConfigResult<Option<u64>> {
            get(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                        key,
                        reason: format!("'{}' is not a whole number of seconds: {}", v, e),
                    })
                })
                .transpose()
        };

        Ok(Self {
            api_url: get(env_vars::API_URL),
            app_id: get(env_vars::APP_ID),
            token: get(env_vars::TOKEN),
            subject_id: get(env_vars::SUBJECT_ID),
            mqtt_url: get(env_vars::MQTT_URL),
            mqtt_user: get(env_vars::MQTT_USER),
            mqtt_pass: get(env_vars::MQTT_PASS),
            poll_interval: get_secs(env_vars::POLL_INTERVAL)?,
            log_level: get(env_vars::LOG_LEVEL),
            discovery_prefix: get(env_vars::DISCOVERY_PREFIX),
            camera_model_prefix: get(env_vars::CAMERA_MODEL_PREFIX),
            request_timeout: get_secs(env_vars::REQUEST_TIMEOUT)?,
        })
    }

    /// Fields set in `other` win.
    fn overlay(self, other: PartialConfig) -> Self {
        Self {
            api_url: other.api_url.or(self.api_url),
            app_id: other.app_id.or(self.app_id),
            token: other.token.or(self.token),
            subject_id: other.subject_id.or(self.subject_id),
            mqtt_url: other.mqtt_url.or(self.mqtt_url),
            mqtt_user: other.mqtt_user.or(self.mqtt_user),
            mqtt_pass: other.mqtt_pass.or(self.mqtt_pass),
            poll_interval: other.poll_interval.or(self.poll_interval),
            log_level: other.log_level.or(self.log_level),
            discovery_prefix: other.discovery_prefix.or(self.discovery_prefix),
            camera_model_prefix: other.camera_model_prefix.or(self.camera_model_prefix),
            request_timeout: other.request_timeout.or(self.request_timeout),
        }
    }
}

/// Validated bridge configuration.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Aqara open API base URL
    pub api_url: Url,
    /// Aqara application id (`Appid` header)
    pub app_id: String,
    /// Aqara session token (`Token` header)
    pub token: String,
    /// Restrict bridging to a single device id
    pub subject_id: Option<String>,
    /// Broker URL as configured
    pub mqtt_url: Url,
    /// Broker address derived from `mqtt_url`
    pub broker: BrokerEndpoint,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    /// Full poll period
    pub poll_interval: Duration,
    pub log_level: LogLevel,
    /// Topic root for discovery, state and command topics
    pub discovery_prefix: String,
    /// Device-list filter selecting cameras
    pub camera_model_prefix: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_url", &self.api_url.as_str())
            .field("app_id", &self.app_id)
            .field("token", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .field("mqtt_url", &self.mqtt_url.as_str())
            .field("mqtt_user", &self.mqtt_user)
            .field("mqtt_pass", &"<redacted>")
            .field("poll_interval", &self.poll_interval)
            .field("log_level", &self.log_level)
            .field("discovery_prefix", &self.discovery_prefix)
            .field("camera_model_prefix", &self.camera_model_prefix)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl BridgeConfig {
    /// Load configuration from the optional TOML file and the process environment.
    ///
    /// An explicit `path` must exist. Without one, `lumibridge.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let toml_content = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(category = "config", "Loading config from: {}", path.display());
                Some(content)
            }
            None => match std::fs::read_to_string(defaults::CONFIG_FILE) {
                Ok(content) => {
                    info!(category = "config", "Loading config from: {}", defaults::CONFIG_FILE);
                    Some(content)
                }
                Err(_) => {
                    info!(category = "config", "Loading config from environment variables");
                    None
                }
            },
        };

        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(toml_content.as_deref(), &env)
    }

    /// Merge a TOML document and an environment map over the defaults.
    pub fn from_sources(toml: Option<&str>, env: &HashMap<String, String>) -> ConfigResult<Self> {
        let file = match toml {
            Some(content) => toml::from_str::<PartialConfig>(content)?,
            None => PartialConfig::default(),
        };
        let merged = file.overlay(PartialConfig::from_env(env)?);
        Self::resolve(merged)
    }

    fn resolve(raw: PartialConfig) -> ConfigResult<Self> {
        let api_url = parse_url(
            env_vars::API_URL,
            raw.api_url.as_deref().unwrap_or(defaults::API_URL),
        )?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: env_vars::API_URL,
                reason: format!("unsupported scheme '{}'", api_url.scheme()),
            });
        }

        let app_id = raw.app_id.ok_or(ConfigError::Missing(env_vars::APP_ID))?;
        require_len(env_vars::APP_ID, &app_id, MIN_APP_ID_LEN)?;

        let token = raw.token.ok_or(ConfigError::Missing(env_vars::TOKEN))?;
        require_len(env_vars::TOKEN, &token, MIN_TOKEN_LEN)?;

        let mqtt_url = parse_url(
            env_vars::MQTT_URL,
            raw.mqtt_url.as_deref().unwrap_or(defaults::MQTT_URL),
        )?;
        let broker = BrokerEndpoint::from_url(&mqtt_url)?;

        let poll_secs = raw.poll_interval.unwrap_or(defaults::POLL_INTERVAL_SECS);
        if poll_secs < 1 {
            return Err(ConfigError::Invalid {
                key: env_vars::POLL_INTERVAL,
                reason: "must be at least 1 second".to_string(),
            });
        }

        let timeout_secs = raw.request_timeout.unwrap_or(defaults::REQUEST_TIMEOUT_SECS);
        if timeout_secs < 1 {
            return Err(ConfigError::Invalid {
                key: env_vars::REQUEST_TIMEOUT,
                reason: "must be at least 1 second".to_string(),
            });
        }

        let log_level = raw
            .log_level
            .as_deref()
            .unwrap_or(defaults::LOG_LEVEL)
            .parse::<LogLevel>()
            .map_err(|reason| ConfigError::Invalid {
                key: env_vars::LOG_LEVEL,
                reason,
            })?;

        let discovery_prefix = raw
            .discovery_prefix
            .unwrap_or_else(|| defaults::DISCOVERY_PREFIX.to_string())
            .trim_matches('/')
            .to_string();
        if discovery_prefix.is_empty() || discovery_prefix.contains(['+', '#']) {
            return Err(ConfigError::Invalid {
                key: env_vars::DISCOVERY_PREFIX,
                reason: "must be a non-empty topic without wildcards".to_string(),
            });
        }

        Ok(Self {
            api_url,
            app_id,
            token,
            subject_id: raw.subject_id,
            mqtt_url,
            broker,
            mqtt_user: raw.mqtt_user.unwrap_or_default(),
            mqtt_pass: raw.mqtt_pass.unwrap_or_default(),
            poll_interval: Duration::from_secs(poll_secs),
            log_level,
            discovery_prefix,
            camera_model_prefix: raw
                .camera_model_prefix
                .unwrap_or_else(|| defaults::CAMERA_MODEL_PREFIX.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Broker credentials, only when a user name is configured.
    pub fn mqtt_credentials(&self) -> Option<(&str, &str)> {
        if self.mqtt_user.is_empty() {
            None
        } else {
            Some((self.mqtt_user.as_str(), self.mqtt_pass.as_str()))
        }
    }
}

fn parse_url(key: &'static str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{}' is not a valid URL: {}", value, e),
    })
}

fn require_len(key: &'static str, value: &str, min: usize) -> ConfigResult<()> {
    if value.chars().count() < min {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be at least {} characters", min),
        });
    }
    Ok(())
}
