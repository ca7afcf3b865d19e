//! Serial Mux Library
//!
//! Character-device layer for serial ports: devices registered under unique
//! names, reference-counted open/close, a control state machine, and a single
//! background receive multiplexer that polls every port and notifies readers.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `device`: Device record, open flags and control commands
//! - `error`: Device-layer error handling
//! - `logging`: Tracing subscriber setup
//! - `manager`: Named device table
//! - `mux`: Receive multiplexer worker and pause/resume protocol
//! - `port`: Port abstraction layer for serial communication

pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod manager;
pub mod mux;
pub mod port;

// Re-export commonly used types for convenience
pub use device::{
    ControlCommand, ControlReply, DeviceFlags, DeviceHandle, DeviceId, DeviceOptions,
    DeviceStats, RxIndicate, SerialDevice,
};
pub use error::{DeviceError, DeviceResult};
pub use manager::DeviceTable;
pub use mux::{Attach, MuxOptions, MuxStats, RxMultiplexer};
pub use port::{
    BitOrder, DataBits, FlowControl, FlushQueue, MockTransport, Parity, PortError,
    PortTransport, SerialConfig, SerialPortTransport, StopBits,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
