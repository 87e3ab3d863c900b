//! Daemon configuration
//!
//! Loads configuration from a TOML file. Every value has a default, so
//! the daemon runs without any file at all and a file only needs the
//! values it wants to override.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub simulator: SimulatorConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

/// UDP endpoints of the bridge
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Port for inbound indicator commands
    pub listen_port: u16,
    /// Destination address for outbound telemetry datagrams
    pub telemetry_target: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: 10388,
            telemetry_target: "127.0.0.1:10988".to_string(),
        }
    }
}

/// Simulation host connection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Host backend; "mock" runs the built-in virtual simulator
    pub backend: String,
    /// Delay between connection attempts in milliseconds
    pub connect_retry_ms: u64,
    /// Sleep between event polls when the host is idle, in milliseconds
    pub poll_idle_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            backend: "mock".to_string(),
            connect_retry_ms: 2000,
            poll_idle_ms: 5,
        }
    }
}

/// Indicator type catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the type-to-model mapping file, resolved against the
    /// working directory unless absolute
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "indicator_types.cfg".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.network.listen_port, 10388);
        assert_eq!(config.network.telemetry_target, "127.0.0.1:10988");
        assert_eq!(config.simulator.backend, "mock");
        assert_eq!(config.simulator.connect_retry_ms, 2000);
        assert_eq!(config.catalog.path, "indicator_types.cfg");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml_content = r#"
[network]
listen_port = 11000

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.network.listen_port, 11000);
        assert_eq!(config.network.telemetry_target, "127.0.0.1:10988");
        assert_eq!(config.simulator.connect_retry_ms, 2000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[network]"));
        assert!(toml_string.contains("[simulator]"));
        assert!(toml_string.contains("[catalog]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("listen_port = 10388"));
        assert!(toml_string.contains("telemetry_target = \"127.0.0.1:10988\""));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(toml::from_str::<AppConfig>("network = 5").is_err());
    }
}
