//! Device table: named registration of serial devices.
//!
//! `DeviceTable` owns the receive multiplexer and maps unique names to device
//! handles. Registering a device also attaches it to the multiplexer, so a
//! table never holds more devices than the registry capacity.

use crate::config::Config;
use crate::device::{DeviceFlags, DeviceHandle, DeviceOptions, SerialDevice};
use crate::error::{DeviceError, DeviceResult};
use crate::mux::{MuxOptions, MuxStats, RxMultiplexer};
use crate::port::PortTransport;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::info;

/// Named collection of serial devices sharing one receive multiplexer.
#[derive(Debug)]
pub struct DeviceTable {
    mux: Arc<RxMultiplexer>,
    devices: RwLock<Vec<DeviceHandle>>,
    /// Serializes registrations; never held by rx callbacks.
    registering: Mutex<()>,
    defaults: DeviceOptions,
}

impl DeviceTable {
    pub fn new(options: MuxOptions) -> Self {
        Self::with_defaults(options, DeviceOptions::default())
    }

    /// Table whose devices start from `defaults` (config and I/O timeout).
    pub fn with_defaults(options: MuxOptions, defaults: DeviceOptions) -> Self {
        Self {
            mux: Arc::new(RxMultiplexer::new(options)),
            devices: RwLock::new(Vec::new()),
            registering: Mutex::new(()),
            defaults,
        }
    }

    /// Table built from the `[mux]` and `[serial]` configuration sections.
    pub fn from_config(config: &Config) -> Self {
        Self::with_defaults(config.mux.options(), config.serial.device_options())
    }

    /// Register a device under `name` with the table's default configuration.
    ///
    /// Fails with `AlreadyRegistered` for a taken name and with
    /// `CapacityExceeded` when the multiplexer registry is full; the table is
    /// unchanged on failure.
    pub fn register_device(
        &self,
        name: &str,
        flags: DeviceFlags,
        transport: Arc<dyn PortTransport>,
    ) -> DeviceResult<DeviceHandle> {
        let options = DeviceOptions {
            flags,
            ..self.defaults.clone()
        };
        self.register_device_with(name, transport, options)
    }

    /// Register a device with explicit options.
    pub fn register_device_with(
        &self,
        name: &str,
        transport: Arc<dyn PortTransport>,
        options: DeviceOptions,
    ) -> DeviceResult<DeviceHandle> {
        let _registering = self.registering.lock();
        if self.find(name).is_some() {
            return Err(DeviceError::AlreadyRegistered(name.to_string()));
        }

        let flags = options.flags;
        let device = SerialDevice::new(name, transport, options, &self.mux);
        self.mux.attach(&device)?;
        self.devices.write().push(Arc::clone(&device));
        info!(device = name, flags = ?flags, "serial device registered");
        Ok(device)
    }

    /// Look up a device by name.
    pub fn find(&self, name: &str) -> Option<DeviceHandle> {
        self.devices
            .read()
            .iter()
            .find(|d| d.name() == name)
            .cloned()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.devices
            .read()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn multiplexer(&self) -> &Arc<RxMultiplexer> {
        &self.mux
    }

    pub fn mux_stats(&self) -> MuxStats {
        self.mux.stats()
    }

    /// Stop the receive multiplexer. Registered devices stay in the table.
    pub fn shutdown(&self) {
        self.mux.shutdown();
    }
}
