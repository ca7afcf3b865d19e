//! Port transport layer.
//!
//! Provides the `PortTransport` trait the device layer drives, plus a real
//! serial-port implementation and an in-memory mock for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockTransport;
pub use sync_port::SerialPortTransport;
pub use traits::*;
