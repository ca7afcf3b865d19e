//! Serial device record and its control facade.
//!
//! A `SerialDevice` wraps one `PortTransport` and tracks the state the
//! character-device layer needs: line configuration, open-handle count,
//! suspension, and the receive-notification callback invoked by the
//! [`RxMultiplexer`](crate::mux::RxMultiplexer).
//!
//! # State machine
//!
//! ```text
//!            open (0 -> 1, init)          open (n -> n+1)
//!   Closed ──────────────────────> Open ─────────────────┐
//!     ^                             │ ^                  │
//!     └──────── close (1 -> 0) ─────┘ └──────────────────┘
//!
//!   Suspended is orthogonal: Suspend/Resume toggle it in either state.
//!   Configure with a new bufsz is refused while Open.
//! ```

mod control;
mod flags;

pub use control::{ControlCommand, ControlReply};
pub use flags::DeviceFlags;

use crate::error::{DeviceError, DeviceResult};
use crate::mux::RxMultiplexer;
use crate::port::{PortTransport, SerialConfig};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Shared handle to a registered device.
pub type DeviceHandle = Arc<SerialDevice>;

/// Receive-notification callback: `(device, bytes_waiting)`.
///
/// Runs on the multiplexer thread with the registry locked, so it must not
/// block for long and must not register devices. It may shut the
/// multiplexer down.
pub type RxIndicate = Arc<dyn Fn(&SerialDevice, usize) + Send + Sync>;

/// Default blocking timeout for reads and writes.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(1000);

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

impl DeviceId {
    fn next() -> Self {
        Self(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Construction-time settings for a device.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Registration flags; runtime bits are ignored.
    pub flags: DeviceFlags,
    /// Initial line configuration.
    pub config: SerialConfig,
    /// Timeout passed to the transport for blocking reads and writes.
    pub io_timeout: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            flags: DeviceFlags::RDWR,
            config: SerialConfig::default(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// State changed by open/close/init/configure.
#[derive(Debug)]
struct Lifecycle {
    config: SerialConfig,
    ref_count: usize,
    open_flags: DeviceFlags,
}

/// Snapshot of a device's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub ref_count: usize,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_notifications: u64,
}

/// One registered serial endpoint.
pub struct SerialDevice {
    id: DeviceId,
    name: String,
    port: Arc<dyn PortTransport>,
    io_timeout: Duration,
    flags: AtomicU16,
    lifecycle: Mutex<Lifecycle>,
    rx_indicate: RwLock<Option<RxIndicate>>,
    mux: Weak<RxMultiplexer>,
    rx_bytes: AtomicU64,
    tx_bytes: AtomicU64,
    rx_notifications: AtomicU64,
}

impl SerialDevice {
    /// Create a device bound to `mux`. The device is not yet in the
    /// multiplexer registry; `open` (or `RxMultiplexer::attach`) puts it there.
    pub fn new(
        name: impl Into<String>,
        port: Arc<dyn PortTransport>,
        options: DeviceOptions,
        mux: &Arc<RxMultiplexer>,
    ) -> DeviceHandle {
        Arc::new(Self {
            id: DeviceId::next(),
            name: name.into(),
            port,
            io_timeout: options.io_timeout,
            flags: AtomicU16::new(options.flags.without_runtime().bits()),
            lifecycle: Mutex::new(Lifecycle {
                config: options.config,
                ref_count: 0,
                open_flags: DeviceFlags::empty(),
            }),
            rx_indicate: RwLock::new(None),
            mux: Arc::downgrade(mux),
            rx_bytes: AtomicU64::new(0),
            tx_bytes: AtomicU64::new(0),
            rx_notifications: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The transport behind this device.
    pub fn transport(&self) -> &Arc<dyn PortTransport> {
        &self.port
    }

    /// Registration flags plus runtime state bits.
    pub fn flags(&self) -> DeviceFlags {
        DeviceFlags::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    /// Flags passed to the most recent successful `open`.
    pub fn open_flags(&self) -> DeviceFlags {
        self.lifecycle.lock().open_flags
    }

    pub fn ref_count(&self) -> usize {
        self.lifecycle.lock().ref_count
    }

    pub fn is_open(&self) -> bool {
        self.ref_count() > 0
    }

    pub fn is_suspended(&self) -> bool {
        self.flags().contains(DeviceFlags::SUSPENDED)
    }

    pub fn is_initialized(&self) -> bool {
        self.flags().contains(DeviceFlags::ACTIVATED)
    }

    /// Current line configuration.
    pub fn config(&self) -> SerialConfig {
        self.lifecycle.lock().config.clone()
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            ref_count: self.ref_count(),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_notifications: self.rx_notifications.load(Ordering::Relaxed),
        }
    }

    /// Install the receive-notification callback, replacing any previous one.
    pub fn set_rx_indicate<F>(&self, callback: F)
    where
        F: Fn(&SerialDevice, usize) + Send + Sync + 'static,
    {
        *self.rx_indicate.write() = Some(Arc::new(callback));
    }

    /// Remove the receive-notification callback.
    pub fn clear_rx_indicate(&self) {
        *self.rx_indicate.write() = None;
    }

    pub fn has_rx_indicate(&self) -> bool {
        self.rx_indicate.read().is_some()
    }

    /// Invoke the receive callback with `count`, if one is installed.
    ///
    /// Returns whether a callback ran.
    pub(crate) fn notify_rx(&self, count: usize) -> bool {
        let callback = self.rx_indicate.read().clone();
        match callback {
            Some(callback) => {
                self.rx_notifications.fetch_add(1, Ordering::Relaxed);
                callback(self, count);
                true
            }
            None => false,
        }
    }

    /// Reset the per-session rx/tx state and apply the current configuration
    /// to the transport.
    ///
    /// Safe to call repeatedly.
    pub fn init(&self) -> DeviceResult<()> {
        let lifecycle = self.lifecycle.lock();
        self.init_locked(&lifecycle)
    }

    fn init_locked(&self, lifecycle: &Lifecycle) -> DeviceResult<()> {
        self.rx_bytes.store(0, Ordering::Relaxed);
        self.tx_bytes.store(0, Ordering::Relaxed);

        self.port
            .configure(&lifecycle.config)
            .map_err(DeviceError::ConfigRejected)?;
        self.flags
            .fetch_or(DeviceFlags::ACTIVATED.bits(), Ordering::AcqRel);
        debug!(device = %self.name, baud = lifecycle.config.baud_rate, "device initialized");
        Ok(())
    }

    /// Open a handle on the device.
    ///
    /// Every call registers the device with the receive multiplexer; repeat
    /// registrations are no-ops. The first open (re)initializes the device so
    /// that a configuration adopted while closed reaches the transport.
    pub fn open(self: &Arc<Self>, flags: DeviceFlags) -> DeviceResult<()> {
        let registered = self.flags().access();
        if !registered.contains(flags.access()) {
            return Err(DeviceError::not_supported(format!(
                "open {:?} on device '{}' registered {:?}",
                flags.access(),
                self.name,
                registered
            )));
        }

        // Never attach while holding the lifecycle lock: rx callbacks run
        // under the registry lock and may take it.
        let mux = self.mux.upgrade().ok_or(DeviceError::ShutDown)?;
        mux.attach(self)?;

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.ref_count > 0 && self.flags().contains(DeviceFlags::STANDALONE) {
            return Err(DeviceError::Busy);
        }
        if lifecycle.ref_count == 0 {
            self.init_locked(&lifecycle)?;
        }
        lifecycle.ref_count += 1;
        lifecycle.open_flags = flags;
        debug!(device = %self.name, ref_count = lifecycle.ref_count, "device opened");
        Ok(())
    }

    /// Release one open handle.
    ///
    /// Fails with `NotOpen` when no handle is open; the count never goes
    /// below zero.
    pub fn close(&self) -> DeviceResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.ref_count == 0 {
            return Err(DeviceError::NotOpen);
        }
        lifecycle.ref_count -= 1;
        if lifecycle.ref_count >= 1 {
            trace!(device = %self.name, ref_count = lifecycle.ref_count, "device still shared");
            return Ok(());
        }
        lifecycle.open_flags = DeviceFlags::empty();
        debug!(device = %self.name, "device closed");
        Ok(())
    }

    /// Read up to `buffer.len()` bytes.
    ///
    /// Blocks until at least one byte arrives or the I/O timeout elapses and
    /// returns the number of bytes copied (`0` on timeout). An empty buffer
    /// returns `0` without touching the transport.
    pub fn read(&self, buffer: &mut [u8]) -> DeviceResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }

        let n = match self.port.read(buffer, self.io_timeout) {
            Ok(n) => n,
            Err(e) if e.is_timeout() => 0,
            Err(e) => return Err(e.into()),
        };
        self.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    /// Write all of `data`, blocking until the transport accepts it.
    ///
    /// Returns `data.len()`. An empty buffer returns `0` without touching the
    /// transport.
    pub fn write(&self, data: &[u8]) -> DeviceResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }

        self.port.write(data, self.io_timeout)?;
        self.tx_bytes.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data.len())
    }

    /// Handle a control request.
    pub fn control(&self, command: ControlCommand) -> DeviceResult<ControlReply> {
        match command {
            ControlCommand::Suspend => {
                self.flags
                    .fetch_or(DeviceFlags::SUSPENDED.bits(), Ordering::AcqRel);
                debug!(device = %self.name, "device suspended");
                Ok(ControlReply::Done)
            }
            ControlCommand::Resume => {
                self.flags
                    .fetch_and(!DeviceFlags::SUSPENDED.bits(), Ordering::AcqRel);
                debug!(device = %self.name, "device resumed");
                Ok(ControlReply::Done)
            }
            ControlCommand::Configure(config) => {
                self.reconfigure(config)?;
                Ok(ControlReply::Done)
            }
            ControlCommand::GetConfig => Ok(ControlReply::Config(self.config())),
            ControlCommand::BytesWaiting => {
                Ok(ControlReply::BytesWaiting(self.port.bytes_waiting()?))
            }
            ControlCommand::Flush(queue) => {
                self.port.flush(queue).map_err(DeviceError::from_control)?;
                Ok(ControlReply::Done)
            }
            ControlCommand::Transport { code, arg } => {
                self.port
                    .control(code, arg)
                    .map_err(DeviceError::from_control)?;
                Ok(ControlReply::Done)
            }
        }
    }

    fn reconfigure(&self, config: SerialConfig) -> DeviceResult<()> {
        let mut lifecycle = self.lifecycle.lock();
        let open = lifecycle.ref_count > 0;
        if open && config.bufsz != lifecycle.config.bufsz {
            return Err(DeviceError::Busy);
        }
        if open {
            self.port
                .configure(&config)
                .map_err(DeviceError::ConfigRejected)?;
        }
        debug!(device = %self.name, baud = config.baud_rate, applied = open, "configuration adopted");
        lifecycle.config = config;
        Ok(())
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flags", &self.flags())
            .field("ref_count", &self.ref_count())
            .field("rx_indicate", &self.has_rx_indicate())
            .finish()
    }
}
