//! Shared test utilities for serial-mux integration tests.
//!
//! This module provides common test infrastructure including:
//! - Device tables with fast I/O timeouts
//! - Mock-backed device registration
//! - Polling helpers for asynchronous multiplexer effects

#![allow(dead_code)]

use serial_mux::{
    DeviceFlags, DeviceHandle, DeviceOptions, DeviceTable, MockTransport, MuxOptions,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// I/O timeout used by test devices so blocking reads return quickly.
pub const TEST_IO_TIMEOUT: Duration = Duration::from_millis(50);

/// How long asynchronous expectations are given to come true.
pub const SETTLE: Duration = Duration::from_secs(2);

/// Create a table with the given registry capacity.
pub fn table_with_capacity(capacity: usize) -> DeviceTable {
    DeviceTable::with_defaults(
        MuxOptions {
            capacity,
            ..MuxOptions::default()
        },
        DeviceOptions {
            io_timeout: TEST_IO_TIMEOUT,
            ..DeviceOptions::default()
        },
    )
}

/// Register a mock-backed read/write device.
///
/// # Example
/// ```ignore
/// let table = table_with_capacity(5);
/// let (dev, mock) = register_mock(&table, "uart0");
/// mock.enqueue_read(b"hello");
/// ```
pub fn register_mock(table: &DeviceTable, name: &str) -> (DeviceHandle, MockTransport) {
    let mock = MockTransport::new(format!("MOCK-{name}"));
    let device = table
        .register_device(name, DeviceFlags::RDWR, Arc::new(mock.clone()))
        .expect("register mock device");
    (device, mock)
}

/// Poll `check` until it holds or `deadline` passes.
pub fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    check()
}
