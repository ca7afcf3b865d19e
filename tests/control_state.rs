//! Control state machine tests against a strict transport double.
//!
//! Every transport call the device makes must be expected here, so these tests
//! also pin down exactly when configuration reaches the port.

mod common;

use common::table_with_capacity;
use mockall::{mock, predicate::eq, Sequence};
use pretty_assertions::assert_eq;
use serial_mux::{
    ControlCommand, ControlReply, DeviceError, DeviceFlags, DeviceHandle, DeviceTable, FlushQueue,
    PortError, PortTransport, SerialConfig,
};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Port {}

    impl PortTransport for Port {
        fn bytes_waiting(&self) -> Result<usize, PortError>;
        fn read(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, PortError>;
        fn write(&self, data: &[u8], timeout: Duration) -> Result<(), PortError>;
        fn configure(&self, config: &SerialConfig) -> Result<(), PortError>;
        fn control(&self, code: u32, arg: Option<u64>) -> Result<(), PortError>;
        fn flush(&self, queue: FlushQueue) -> Result<(), PortError>;
    }
}

/// Port that reports an idle line to the multiplexer.
fn idle_port() -> MockPort {
    let mut port = MockPort::new();
    port.expect_bytes_waiting().returning(|| Ok(0));
    port
}

fn register(table: &DeviceTable, port: MockPort) -> DeviceHandle {
    table
        .register_device("uart0", DeviceFlags::RDWR, Arc::new(port))
        .unwrap()
}

#[test]
fn test_configure_while_open_reaches_transport() {
    let fast = SerialConfig::default().with_baud_rate(9600);
    let mut seq = Sequence::new();
    let mut port = idle_port();
    port.expect_configure()
        .with(eq(SerialConfig::default()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    port.expect_configure()
        .with(eq(fast.clone()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let table = table_with_capacity(5);
    let dev = register(&table, port);
    dev.open(DeviceFlags::RDWR).unwrap();

    let reply = dev.control(ControlCommand::Configure(fast.clone())).unwrap();
    assert_eq!(reply, ControlReply::Done);
    assert_eq!(
        dev.control(ControlCommand::GetConfig).unwrap(),
        ControlReply::Config(fast)
    );
}

#[test]
fn test_configure_while_closed_waits_for_open() {
    let slow = SerialConfig::default().with_baud_rate(1200);
    let mut port = idle_port();
    // Only the open applies configuration, and it applies the new one
    port.expect_configure()
        .with(eq(slow.clone()))
        .times(1)
        .returning(|_| Ok(()));

    let table = table_with_capacity(5);
    let dev = register(&table, port);
    dev.control(ControlCommand::Configure(slow)).unwrap();
    dev.open(DeviceFlags::RDWR).unwrap();
    assert_eq!(dev.config().baud_rate, 1200);
}

#[test]
fn test_rejected_configuration_keeps_previous() {
    let mut port = idle_port();
    port.expect_configure()
        .withf(|config| config.baud_rate == SerialConfig::default().baud_rate)
        .returning(|_| Ok(()));
    port.expect_configure()
        .withf(|config| config.baud_rate == 31)
        .times(1)
        .returning(|_| Err(PortError::config("unsupported baud rate 31")));

    let table = table_with_capacity(5);
    let dev = register(&table, port);
    dev.open(DeviceFlags::RDWR).unwrap();

    let err = dev
        .control(ControlCommand::Configure(
            SerialConfig::default().with_baud_rate(31),
        ))
        .unwrap_err();
    assert!(matches!(err, DeviceError::ConfigRejected(PortError::Config(_))));
    assert_eq!(dev.config(), SerialConfig::default());
}

#[test]
fn test_buffer_size_locked_while_open() {
    let mut port = idle_port();
    port.expect_configure().times(1).returning(|_| Ok(()));

    let table = table_with_capacity(5);
    let dev = register(&table, port);
    dev.open(DeviceFlags::RDWR).unwrap();

    let bigger = SerialConfig::default().with_bufsz(1024);
    assert!(matches!(
        dev.control(ControlCommand::Configure(bigger)),
        Err(DeviceError::Busy)
    ));
    assert_eq!(dev.config().bufsz, SerialConfig::default().bufsz);
}

#[test]
fn test_suspend_and_resume_toggle_flag() {
    let table = table_with_capacity(5);
    let dev = register(&table, idle_port());

    assert_eq!(dev.control(ControlCommand::Suspend).unwrap(), ControlReply::Done);
    assert!(dev.is_suspended());
    assert!(dev.flags().contains(DeviceFlags::SUSPENDED));
    dev.control(ControlCommand::Suspend).unwrap();
    assert!(dev.is_suspended());

    dev.control(ControlCommand::Resume).unwrap();
    assert!(!dev.is_suspended());
    assert!(dev.flags().contains(DeviceFlags::RDWR));
}

#[test]
fn test_unrecognized_codes_forward_to_transport() {
    let mut port = idle_port();
    port.expect_control()
        .with(eq(0x5401u32), eq(Some(7u64)))
        .times(1)
        .returning(|_, _| Ok(()));
    port.expect_control()
        .with(eq(0x9999u32), eq(None::<u64>))
        .times(1)
        .returning(|code, _| Err(PortError::unsupported(format!("control {code:#x}"))));

    let table = table_with_capacity(5);
    let dev = register(&table, port);

    let reply = dev
        .control(ControlCommand::Transport {
            code: 0x5401,
            arg: Some(7),
        })
        .unwrap();
    assert_eq!(reply, ControlReply::Done);
    assert!(matches!(
        dev.control(ControlCommand::Transport {
            code: 0x9999,
            arg: None
        }),
        Err(DeviceError::NotSupported(_))
    ));
}

#[test]
fn test_queue_queries_and_flush() {
    let mut port = MockPort::new();
    port.expect_bytes_waiting().returning(|| Ok(5));
    port.expect_flush()
        .with(eq(FlushQueue::Input))
        .times(1)
        .returning(|_| Ok(()));

    let table = table_with_capacity(5);
    let dev = register(&table, port);

    assert_eq!(
        dev.control(ControlCommand::BytesWaiting).unwrap(),
        ControlReply::BytesWaiting(5)
    );
    assert_eq!(
        dev.control(ControlCommand::Flush(FlushQueue::Input)).unwrap(),
        ControlReply::Done
    );
    // Five bytes pending and no callback installed: polling stays silent
    assert_eq!(table.mux_stats().notifications, 0);
}
