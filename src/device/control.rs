//! Control requests understood by a serial device.

use crate::port::{FlushQueue, SerialConfig};

/// A control request.
///
/// The device handles every variant except `Transport`, which is passed
/// verbatim to the transport's own control handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Set the suspended flag.
    Suspend,
    /// Clear the suspended flag.
    Resume,
    /// Adopt a new line configuration, re-applying it if the device is open.
    Configure(SerialConfig),
    /// Report the current line configuration.
    GetConfig,
    /// Report how many bytes the transport holds for reading.
    BytesWaiting,
    /// Discard queued data in the transport.
    Flush(FlushQueue),
    /// Transport-specific request.
    Transport { code: u32, arg: Option<u64> },
}

/// Result payload of a successful control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    Done,
    Config(SerialConfig),
    BytesWaiting(usize),
}
