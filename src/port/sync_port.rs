//! Transport backed by an operating-system serial port.
//!
//! Wraps the `serialport` crate. The port is cloned into separate reader,
//! writer and control handles so that a blocked read never holds up a
//! `bytes_waiting` query from the receive multiplexer.

use super::error::PortError;
use super::traits::{BitOrder, FlushQueue, PortTransport, SerialConfig};
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

type RawPort = Box<dyn SerialPort>;

/// `PortTransport` over a `serialport::SerialPort`.
pub struct SerialPortTransport {
    reader: Mutex<RawPort>,
    writer: Mutex<RawPort>,
    control: Mutex<RawPort>,
    name: String,
}

impl SerialPortTransport {
    /// Open a serial port with the given line configuration.
    ///
    /// # Example
    /// ```no_run
    /// use serial_mux::port::{SerialConfig, SerialPortTransport};
    ///
    /// let port = SerialPortTransport::open("/dev/ttyUSB0", &SerialConfig::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &SerialConfig) -> Result<Self, PortError> {
        check_line_options(config)?;
        let control = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice
                | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;
        let reader = control.try_clone()?;
        let writer = control.try_clone()?;

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            control: Mutex::new(control),
            name: port_name.to_string(),
        })
    }

    /// System path of the port.
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl PortTransport for SerialPortTransport {
    fn bytes_waiting(&self) -> Result<usize, PortError> {
        let n = self.control.lock().bytes_to_read()?;
        Ok(n as usize)
    }

    fn read(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, PortError> {
        let mut port = self.reader.lock();
        port.set_timeout(timeout)?;
        match port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), PortError> {
        let mut port = self.writer.lock();
        port.set_timeout(timeout)?;
        port.write_all(data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                PortError::timeout(timeout)
            } else {
                PortError::Io(e)
            }
        })?;
        port.flush()?;
        Ok(())
    }

    fn configure(&self, config: &SerialConfig) -> Result<(), PortError> {
        check_line_options(config)?;
        let mut port = self.control.lock();
        port.set_baud_rate(config.baud_rate)
            .map_err(|e| PortError::config(e.to_string()))?;
        port.set_data_bits(config.data_bits.into())?;
        port.set_parity(config.parity.into())?;
        port.set_stop_bits(config.stop_bits.into())?;
        port.set_flow_control(config.flow_control.into())?;
        Ok(())
    }

    fn flush(&self, queue: FlushQueue) -> Result<(), PortError> {
        self.control.lock().clear(queue.into())?;
        Ok(())
    }
}

/// Refuse line options an OS serial port cannot apply.
fn check_line_options(config: &SerialConfig) -> Result<(), PortError> {
    if config.invert {
        return Err(PortError::config("inverted line levels are not supported"));
    }
    if config.bit_order == BitOrder::MsbFirst {
        return Err(PortError::config("MSB-first bit order is not supported"));
    }
    Ok(())
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.control.lock().baud_rate().ok())
            .finish()
    }
}
