//! `.env.example` generation from the environment variable schema.

use std::path::Path;

use tracing::info;

use crate::config::{defaults, env_vars, ConfigError, ConfigResult, LogLevel};

/// One documented environment variable.
#[derive(Debug, Clone, Copy)]
pub struct EnvVarSpec {
    pub name: &'static str,
    /// `None` marks the variable as required.
    pub default: Option<&'static str>,
    pub choices: Option<&'static [&'static str]>,
    pub description: &'static str,
}

/// Every variable the bridge reads, in rendering order.
pub const ENV_SCHEMA: &[EnvVarSpec] = &[
    EnvVarSpec {
        name: env_vars::API_URL,
        default: Some(defaults::API_URL),
        choices: None,
        description: "Aqara open API base URL",
    },
    EnvVarSpec {
        name: env_vars::APP_ID,
        default: None,
        choices: None,
        description: "Aqara application id",
    },
    EnvVarSpec {
        name: env_vars::TOKEN,
        default: None,
        choices: None,
        description: "Aqara session token",
    },
    EnvVarSpec {
        name: env_vars::SUBJECT_ID,
        default: Some(""),
        choices: None,
        description: "Only bridge this device id (empty bridges every camera)",
    },
    EnvVarSpec {
        name: env_vars::MQTT_URL,
        default: Some(defaults::MQTT_URL),
        choices: None,
        description: "Broker URL (mqtt://, tcp://, mqtts://, ssl://)",
    },
    EnvVarSpec {
        name: env_vars::MQTT_USER,
        default: Some(""),
        choices: None,
        description: "Broker user name",
    },
    EnvVarSpec {
        name: env_vars::MQTT_PASS,
        default: Some(""),
        choices: None,
        description: "Broker password",
    },
    EnvVarSpec {
        name: env_vars::POLL_INTERVAL,
        default: Some("1"),
        choices: None,
        description: "Seconds between full polls",
    },
    EnvVarSpec {
        name: env_vars::LOG_LEVEL,
        default: Some(defaults::LOG_LEVEL),
        choices: Some(&LogLevel::ALL),
        description: "Log verbosity",
    },
    EnvVarSpec {
        name: env_vars::DISCOVERY_PREFIX,
        default: Some(defaults::DISCOVERY_PREFIX),
        choices: None,
        description: "Topic root for discovery, state and command topics",
    },
    EnvVarSpec {
        name: env_vars::CAMERA_MODEL_PREFIX,
        default: Some(defaults::CAMERA_MODEL_PREFIX),
        choices: None,
        description: "Device model prefix selecting cameras",
    },
    EnvVarSpec {
        name: env_vars::REQUEST_TIMEOUT,
        default: Some("10"),
        choices: None,
        description: "HTTP request timeout in seconds",
    },
];

/// Render the schema as a `.env` document, required variables first.
pub fn render_env_example() -> String {
    let mut required = Vec::new();
    let mut optional = Vec::new();

    for spec in ENV_SCHEMA {
        let mut lines = vec![format!("# {}", spec.description)];
        if let Some(choices) = spec.choices {
            lines.push(format!("# one of: {}", choices.join(", ")));
        }
        lines.push(format!("{}={}", spec.name, spec.default.unwrap_or("xxxxx")));

        let block = lines.join("\n");
        if spec.default.is_some() {
            optional.push(block);
        } else {
            required.push(block);
        }
    }

    let mut sections: Vec<String> = Vec::new();
    if !required.is_empty() {
        sections.push("## Required environment variables".to_string());
        sections.extend(required);
        sections.push(String::new());
    }
    if !optional.is_empty() {
        sections.push("## Optional environment variables".to_string());
        sections.extend(optional);
        sections.push(String::new());
    }

    sections.join("\n")
}

/// Write [`render_env_example`] to `path`.
pub fn write_env_example(path: &Path) -> ConfigResult<()> {
    std::fs::write(path, render_env_example()).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(category = "config", "Generated {}", path.display());
    Ok(())
}
