//! Device lifecycle integration tests
//!
//! Exercises registration, open/close reference counting and blocking I/O
//! through the public `DeviceTable` API with mock transports.

mod common;

use common::{register_mock, table_with_capacity, wait_until, SETTLE};
use pretty_assertions::assert_eq;
use serial_mux::{DeviceError, DeviceFlags, MockTransport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Read / write
// ============================================================================

#[test]
fn test_write_forwards_exact_bytes() {
    // Arrange
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();

    // Act
    let payload = b"0123456789";
    let written = dev.write(payload).unwrap();

    // Assert
    assert_eq!(written, 10);
    assert_eq!(mock.write_log(), vec![payload.to_vec()]);
    assert_eq!(dev.stats().tx_bytes, 10);
}

#[test]
fn test_zero_length_read_skips_transport() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();
    mock.enqueue_read(b"pending");

    let mut empty = [0u8; 0];
    assert_eq!(dev.read(&mut empty).unwrap(), 0);
    assert_eq!(mock.read_count(), 0);
    assert_eq!(mock.available_bytes(), 7);
}

#[test]
fn test_read_returns_queued_bytes() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();
    mock.enqueue_read(b"hello");

    let mut buf = [0u8; 16];
    let n = dev.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(dev.stats().rx_bytes, 5);
}

#[test]
fn test_read_times_out_with_zero() {
    let table = table_with_capacity(5);
    let (dev, _mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(dev.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_io_on_closed_device_is_rejected() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");

    assert!(matches!(dev.write(b"x"), Err(DeviceError::NotOpen)));
    let mut buf = [0u8; 4];
    assert!(matches!(dev.read(&mut buf), Err(DeviceError::NotOpen)));
    assert!(mock.write_log().is_empty());
}

// ============================================================================
// Reference counting
// ============================================================================

#[test]
fn test_shared_open_close_sequence() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");

    dev.open(DeviceFlags::RDWR).unwrap();
    dev.open(DeviceFlags::RDWR).unwrap();
    assert_eq!(dev.ref_count(), 2);
    // Only the first open initializes the transport
    assert_eq!(mock.configure_log().len(), 1);

    dev.close().unwrap();
    assert!(dev.is_open());
    dev.close().unwrap();
    assert!(!dev.is_open());
    assert!(matches!(dev.close(), Err(DeviceError::NotOpen)));
    assert_eq!(dev.ref_count(), 0);
}

#[test]
fn test_reopen_reinitializes() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");

    dev.open(DeviceFlags::RDWR).unwrap();
    dev.write(b"abc").unwrap();
    dev.close().unwrap();
    dev.open(DeviceFlags::RDWR).unwrap();

    assert_eq!(mock.configure_log().len(), 2);
    assert_eq!(dev.stats().tx_bytes, 0);
}

#[test]
fn test_closed_device_stays_registered() {
    let table = table_with_capacity(5);
    let (dev, _mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();
    dev.close().unwrap();

    assert!(table.find("A").is_some());
    assert!(table.multiplexer().contains(dev.id()));
}

#[test]
fn test_read_only_registration_refuses_write_open() {
    let table = table_with_capacity(5);
    let mock = MockTransport::new("MOCK-ro");
    let dev = table
        .register_device("ro", DeviceFlags::RDONLY, Arc::new(mock))
        .unwrap();

    assert!(matches!(
        dev.open(DeviceFlags::RDWR),
        Err(DeviceError::NotSupported(_))
    ));
    dev.open(DeviceFlags::RDONLY).unwrap();
    assert_eq!(dev.ref_count(), 1);
}

// ============================================================================
// Receive notification
// ============================================================================

#[test]
fn test_pending_bytes_without_callback_are_ignored() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();
    mock.enqueue_read(b"12345");

    let queries_before = mock.query_count();
    assert!(wait_until(SETTLE, || mock.query_count() > queries_before + 2));

    let stats = table.mux_stats();
    assert_eq!(stats.notifications, 0);
    assert_eq!(stats.query_errors, 0);
    assert_eq!(dev.stats().rx_notifications, 0);
    assert_eq!(mock.available_bytes(), 5);
}

#[test]
fn test_callback_drains_received_bytes() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();

    let received = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&received);
    dev.set_rx_indicate(move |device, waiting| {
        let mut buf = vec![0u8; waiting];
        if let Ok(n) = device.read(&mut buf) {
            sink.fetch_add(n, Ordering::SeqCst);
        }
    });

    mock.enqueue_read(b"abc");
    assert!(wait_until(SETTLE, || received.load(Ordering::SeqCst) == 3));
    mock.enqueue_read(b"defg");
    assert!(wait_until(SETTLE, || received.load(Ordering::SeqCst) == 7));
    assert_eq!(mock.available_bytes(), 0);
}

#[test]
fn test_callback_replaced_and_cleared() {
    let table = table_with_capacity(5);
    let (dev, mock) = register_mock(&table, "A");
    dev.open(DeviceFlags::RDWR).unwrap();

    let first = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&first);
    dev.set_rx_indicate(move |_, _| {
        hits.fetch_add(1, Ordering::SeqCst);
    });
    mock.enqueue_read(b"x");
    assert!(wait_until(SETTLE, || first.load(Ordering::SeqCst) > 0));

    dev.clear_rx_indicate();
    table.multiplexer().pause();
    let frozen = first.load(Ordering::SeqCst);
    table.multiplexer().resume();

    let queries = mock.query_count();
    assert!(wait_until(SETTLE, || mock.query_count() > queries + 2));
    assert_eq!(first.load(Ordering::SeqCst), frozen);
    assert!(!dev.has_rx_indicate());
}
