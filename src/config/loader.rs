//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERIAL_MUX";

/// Config file name
const CONFIG_FILE_NAME: &str = "serial-mux.toml";

/// Application directory under the platform config directory
const APP_DIR_NAME: &str = "serial-mux";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERIAL_MUX_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERIAL_MUX_CONFIG` environment variable (explicit path)
    /// 2. `./serial-mux.toml` (current directory)
    /// 3. `~/.config/serial-mux/serial-mux.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\serial-mux\serial-mux.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides still apply; if any of them is malformed or the
    /// result fails validation, all of them are ignored with a warning.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if let Err(e) = apply_env_overrides(&mut config).and_then(|()| config.validate()) {
            warn!(error = %e, "ignoring SERIAL_MUX_* overrides, using built-in defaults");
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Parse an override variable if it is set.
fn env_value<T: std::str::FromStr>(key: &str, expected: &'static str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    let Ok(value) = std::env::var(&var) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::EnvOverride {
            var,
            value,
            expected,
        }),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERIAL_MUX_<SECTION>_<KEY>`
/// For example:
/// - `SERIAL_MUX_MUX_CAPACITY=8`
/// - `SERIAL_MUX_SERIAL_BAUD_RATE=9600`
/// - `SERIAL_MUX_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Multiplexer overrides
    if let Some(val) = env_value("MUX_CAPACITY", "registry capacity")? {
        config.mux.capacity = val;
    }
    if let Some(val) = env_value("MUX_IDLE_INTERVAL_MS", "idle interval in milliseconds")? {
        config.mux.idle_interval_ms = val;
    }

    // Serial overrides
    if let Some(val) = env_value("SERIAL_BAUD_RATE", "baud rate")? {
        config.serial.line.baud_rate = val;
    }
    if let Some(val) = env_value("SERIAL_BUFSZ", "buffer size")? {
        config.serial.line.bufsz = val;
    }
    if let Some(val) = env_value("SERIAL_IO_TIMEOUT_MS", "timeout in milliseconds")? {
        config.serial.io_timeout_ms = val;
    }

    // Logging overrides
    if let Some(val) = env_value::<String>("LOGGING_LEVEL", "log level")? {
        config.logging.level = val;
    }
    if let Some(val) = env_value("LOGGING_FORMAT", "log format (json, pretty, compact)")? {
        config.logging.format = val;
    }

    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}
