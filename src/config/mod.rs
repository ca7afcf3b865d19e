//! Configuration module for serial-mux.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_MUX_CONFIG` environment variable (explicit path)
//! 2. `./serial-mux.toml` (current directory)
//! 3. `~/.config/serial-mux/serial-mux.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\serial-mux\serial-mux.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Selected values can be overridden via `SERIAL_MUX_<SECTION>_<KEY>`:
//! - `SERIAL_MUX_MUX_CAPACITY=8`
//! - `SERIAL_MUX_MUX_IDLE_INTERVAL_MS=0`
//! - `SERIAL_MUX_SERIAL_BAUD_RATE=9600`
//! - `SERIAL_MUX_SERIAL_BUFSZ=256`
//! - `SERIAL_MUX_SERIAL_IO_TIMEOUT_MS=500`
//! - `SERIAL_MUX_LOGGING_LEVEL=debug`, `SERIAL_MUX_LOGGING_FORMAT=json`
//!
//! # Example
//!
//! ```toml
//! [mux]
//! capacity = 8
//! idle_interval_ms = 2
//!
//! [serial]
//! io_timeout_ms = 500
//!
//! [serial.line]
//! baud_rate = 115200
//! bufsz = 256
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigKey, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, MuxConfig, SerialSection};
