//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigKey, ConfigResult};
use crate::device::{DeviceOptions, DEFAULT_IO_TIMEOUT};
use crate::mux::{MuxOptions, DEFAULT_IDLE_INTERVAL, DEFAULT_REGISTRY_CAPACITY};
use crate::port::SerialConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Receive multiplexer configuration
    pub mux: MuxConfig,
    /// Serial device defaults
    pub serial: SerialSection,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values that would make the system unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mux.capacity == 0 {
            return Err(ConfigError::invalid(
                ConfigKey::MuxCapacity,
                "registry capacity must be at least 1",
            ));
        }
        if self.serial.line.baud_rate == 0 {
            return Err(ConfigError::invalid(
                ConfigKey::BaudRate,
                "baud rate must be non-zero",
            ));
        }
        if self.serial.line.bufsz == 0 {
            return Err(ConfigError::invalid(
                ConfigKey::Bufsz,
                "receive buffer size must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Receive multiplexer section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Maximum number of devices the multiplexer polls
    pub capacity: usize,
    /// Idle time between poll passes in milliseconds (0 = continuous)
    pub idle_interval_ms: u64,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGISTRY_CAPACITY,
            idle_interval_ms: DEFAULT_IDLE_INTERVAL.as_millis() as u64,
        }
    }
}

impl MuxConfig {
    /// Get the idle interval as Duration
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn options(&self) -> MuxOptions {
        MuxOptions {
            capacity: self.capacity,
            idle_interval: self.idle_interval(),
        }
    }
}

/// Serial device defaults section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// Blocking read/write timeout in milliseconds
    pub io_timeout_ms: u64,
    /// Port aliases for convenience
    pub port_aliases: HashMap<String, String>,
    /// Line configuration applied to newly registered devices
    pub line: SerialConfig,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            io_timeout_ms: DEFAULT_IO_TIMEOUT.as_millis() as u64,
            port_aliases: HashMap::new(),
            line: SerialConfig::default(),
        }
    }
}

impl SerialSection {
    /// Get the I/O timeout as Duration
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            config: self.line.clone(),
            io_timeout: self.io_timeout(),
            ..DeviceOptions::default()
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::invalid(
                ConfigKey::LogFormat,
                format!("unknown log format '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Parity;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mux.capacity, DEFAULT_REGISTRY_CAPACITY);
        assert_eq!(config.serial.line, SerialConfig::default());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_alias_resolution() {
        let mut serial = SerialSection::default();
        serial
            .port_aliases
            .insert("console".to_string(), "/dev/ttyS0".to_string());

        assert_eq!(serial.resolve_port("console"), "/dev/ttyS0");
        assert_eq!(serial.resolve_port("/dev/ttyUSB1"), "/dev/ttyUSB1");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[mux]"));
        assert!(toml_str.contains("[serial.line]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [mux]
            capacity = 8

            [serial.line]
            baud_rate = 9600
            parity = "even"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mux.capacity, 8);
        assert_eq!(config.serial.line.baud_rate, 9600);
        assert_eq!(config.serial.line.parity, Parity::Even);
        // Defaults should still work
        assert_eq!(config.serial.line.bufsz, SerialConfig::default().bufsz);
        assert_eq!(config.mux.idle_interval_ms, 1);
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = Config::default();
        config.mux.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: ConfigKey::MuxCapacity, .. })
        ));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("fancy".parse::<LogFormat>().is_err());
    }
}
