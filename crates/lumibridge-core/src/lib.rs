//! Shared configuration for lumibridge.
//!
//! This crate holds everything that is loaded once at startup and read by the
//! rest of the workspace: the bridge configuration, its defaults and the
//! environment variable schema used to render `.env.example`.

pub mod config;
pub mod env_example;

pub use config::{BridgeConfig, BrokerEndpoint, ConfigError, ConfigResult, LogLevel};
pub use env_example::{render_env_example, write_env_example, EnvVarSpec, ENV_SCHEMA};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
