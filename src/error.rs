//! Device-level error type.
//!
//! Every lifecycle and control operation returns `DeviceResult`; transport
//! failures are carried inside as `PortError`.

use crate::port::PortError;
use thiserror::Error;

/// Errors returned by device lifecycle, control and registration operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The transport refused a line configuration.
    #[error("Configuration rejected by transport: {0}")]
    ConfigRejected(#[source] PortError),

    /// The device cannot take the request in its current state, e.g. a
    /// buffer-size change while open.
    #[error("Device is busy")]
    Busy,

    /// The receive multiplexer registry is full.
    #[error("Device registry is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    /// The request has no handler.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// A read, write or query failed in the transport.
    #[error("Transport error: {0}")]
    Transport(#[from] PortError),

    /// The device has no open handles.
    #[error("Device is not open")]
    NotOpen,

    /// A device with this name is already registered.
    #[error("Device '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The receive multiplexer has been shut down.
    #[error("Receive multiplexer has been shut down")]
    ShutDown,

    /// The receive multiplexer worker thread could not be started.
    #[error("Failed to start receive multiplexer worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl DeviceError {
    /// Create a NotSupported error from a description of the request.
    pub fn not_supported(what: impl Into<String>) -> Self {
        Self::NotSupported(what.into())
    }

    /// Map a transport failure from a control request, turning "no handler"
    /// into `NotSupported`.
    pub(crate) fn from_control(err: PortError) -> Self {
        match err {
            PortError::Unsupported(what) => Self::NotSupported(what),
            other => Self::Transport(other),
        }
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
