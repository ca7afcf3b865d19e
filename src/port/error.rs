//! Transport-level error types.
//!
//! Kept separate from the device-level `DeviceError` so that transports can be
//! implemented without depending on the control facade.

use thiserror::Error;

/// Errors a port transport can report.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport refused a configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The transport has no handler for the request.
    #[error("Unsupported transport request: {0}")]
    Unsupported(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Create an Unsupported error describing the rejected request.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }

    /// Whether this error only signals that nothing arrived before the deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::config("Invalid baud rate");
        assert_eq!(err.to_string(), "Configuration error: Invalid baud rate");

        let err = PortError::unsupported("control code 0x21");
        assert_eq!(
            err.to_string(),
            "Unsupported transport request: control code 0x21"
        );
    }

    #[test]
    fn test_timeout_detection() {
        assert!(PortError::timeout(Duration::from_millis(500)).is_timeout());
        assert!(PortError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_timeout());
        assert!(!PortError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_timeout());
        assert!(!PortError::config("x").is_timeout());
    }
}
