//! Core traits for the port transport abstraction.
//!
//! Defines the `PortTransport` trait that concrete byte channels (real serial
//! ports, in-memory mocks) implement, and the `SerialConfig` they are driven by.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default receive-buffer size in bytes.
pub const DEFAULT_BUFSZ: usize = 64;

/// Default baud rate (bits per second).
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Line configuration for a serial device.
///
/// `bufsz` sizes the device's receive buffer and may not change while the
/// device is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Bit transmission order.
    pub bit_order: BitOrder,

    /// Whether the line levels are inverted.
    pub invert: bool,

    /// Receive-buffer size in bytes.
    pub bufsz: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            bit_order: BitOrder::LsbFirst,
            invert: false,
            bufsz: DEFAULT_BUFSZ,
        }
    }
}

impl SerialConfig {
    /// Same configuration with a different baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Same configuration with a different receive-buffer size.
    pub fn with_bufsz(mut self, bufsz: usize) -> Self {
        self.bufsz = bufsz;
        self
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Order in which the bits of a character are shifted out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

/// Which transport queue a flush request discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushQueue {
    Input,
    Output,
    Both,
}

impl From<FlushQueue> for serialport::ClearBuffer {
    fn from(queue: FlushQueue) -> Self {
        match queue {
            FlushQueue::Input => serialport::ClearBuffer::Input,
            FlushQueue::Output => serialport::ClearBuffer::Output,
            FlushQueue::Both => serialport::ClearBuffer::All,
        }
    }
}

/// A byte channel underlying one serial device.
///
/// All methods take `&self`: the receive multiplexer queries `bytes_waiting`
/// from its own thread while callers may be blocked in `read` or `write`, so
/// implementations provide their own interior synchronization.
pub trait PortTransport: Send + Sync {
    /// Number of bytes that can be read without blocking.
    fn bytes_waiting(&self) -> Result<usize, PortError>;

    /// Read into `buffer`, blocking until at least one byte arrives or
    /// `timeout` elapses.
    ///
    /// Returns the number of bytes copied, `0` when the timeout elapsed first.
    fn read(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, PortError>;

    /// Write all of `data`, blocking until accepted or `timeout` elapses.
    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), PortError>;

    /// Apply a line configuration.
    fn configure(&self, config: &SerialConfig) -> Result<(), PortError>;

    /// Transport-specific control request.
    fn control(&self, code: u32, arg: Option<u64>) -> Result<(), PortError> {
        let _ = arg;
        Err(PortError::unsupported(format!("control code {code:#x}")))
    }

    /// Discard pending data in one or both queues.
    fn flush(&self, queue: FlushQueue) -> Result<(), PortError> {
        Err(PortError::unsupported(format!("flush {queue:?}")))
    }
}
