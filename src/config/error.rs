//! Errors from loading, validating and saving `serial-mux.toml`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Settings `Config::validate` and value parsing can refuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MuxCapacity,
    BaudRate,
    Bufsz,
    LogFormat,
}

impl ConfigKey {
    /// Dotted path of the key in the TOML file.
    pub fn path(self) -> &'static str {
        match self {
            Self::MuxCapacity => "mux.capacity",
            Self::BaudRate => "serial.line.baud_rate",
            Self::Bufsz => "serial.line.bufsz",
            Self::LogFormat => "logging.format",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("serial-mux config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("cannot read serial-mux config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed serial-mux config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode serial-mux config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write serial-mux config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but would leave the device layer unusable.
    #[error("{key}: {reason}")]
    Invalid { key: ConfigKey, reason: String },

    /// A `SERIAL_MUX_*` override could not be parsed for its key.
    #[error("{var}={value:?} is not a valid {expected}")]
    EnvOverride {
        var: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub fn invalid(key: ConfigKey, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    /// Key the error refers to, for `Invalid` errors.
    pub fn key(&self) -> Option<ConfigKey> {
        match self {
            Self::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
