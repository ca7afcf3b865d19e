//! In-memory transport for tests and benchmarks.
//!
//! `MockTransport` simulates a serial line without hardware: bytes queued with
//! `enqueue_read` become readable (and visible to `bytes_waiting`), writes are
//! logged, and configuration or query failures can be scripted. Clones share
//! state, so a test can keep one handle while a device owns another.

use super::error::PortError;
use super::traits::{FlushQueue, PortTransport, SerialConfig};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MockState {
    /// Bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every successful write, in order.
    write_log: Vec<Vec<u8>>,
    /// Every configuration the transport accepted.
    configure_log: Vec<SerialConfig>,
    /// Forwarded control requests that were accepted.
    control_log: Vec<(u32, Option<u64>)>,
    /// Flush requests, in order.
    flush_log: Vec<FlushQueue>,
    /// Baud rates `configure` refuses.
    rejected_bauds: Vec<u32>,
    /// Control codes `control` accepts; everything else is unsupported.
    supported_controls: Vec<u32>,
    /// Whether `bytes_waiting` fails.
    fail_queries: bool,
    /// Whether `write` fails.
    fail_writes: bool,
    /// Number of `bytes_waiting` calls.
    queries: u64,
    /// Number of `read` calls.
    reads: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    readable: Condvar,
}

/// Scriptable in-memory transport.
///
/// # Example
/// ```
/// use serial_mux::port::{MockTransport, PortTransport};
/// use std::time::Duration;
///
/// let port = MockTransport::new("MOCK0");
/// port.enqueue_read(b"Hello");
/// assert_eq!(port.bytes_waiting().unwrap(), 5);
///
/// let mut buffer = [0u8; 8];
/// let n = port.read(&mut buffer, Duration::from_millis(10)).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// port.write(b"ack", Duration::from_millis(10)).unwrap();
/// assert_eq!(port.write_log(), vec![b"ack".to_vec()]);
/// ```
#[derive(Clone, Debug)]
pub struct MockTransport {
    name: String,
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a new mock transport with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make bytes available to subsequent reads and wake a blocked reader.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.readable.notify_all();
    }

    /// Number of bytes currently queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }

    /// Copy of every write, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Every configuration applied so far.
    pub fn configure_log(&self) -> Vec<SerialConfig> {
        self.shared.state.lock().configure_log.clone()
    }

    /// Most recently applied configuration.
    pub fn last_config(&self) -> Option<SerialConfig> {
        self.shared.state.lock().configure_log.last().cloned()
    }

    /// Accepted control requests.
    pub fn control_log(&self) -> Vec<(u32, Option<u64>)> {
        self.shared.state.lock().control_log.clone()
    }

    /// Flush requests received.
    pub fn flush_log(&self) -> Vec<FlushQueue> {
        self.shared.state.lock().flush_log.clone()
    }

    /// Make `configure` refuse the given baud rate.
    pub fn reject_baud(&self, baud_rate: u32) {
        self.shared.state.lock().rejected_bauds.push(baud_rate);
    }

    /// Make `control` accept the given code.
    pub fn support_control(&self, code: u32) {
        self.shared.state.lock().supported_controls.push(code);
    }

    /// Make `bytes_waiting` fail (or succeed again).
    pub fn set_query_failure(&self, fail: bool) {
        self.shared.state.lock().fail_queries = fail;
    }

    /// Make `write` fail (or succeed again).
    pub fn set_write_failure(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Number of `bytes_waiting` calls so far, failed ones included.
    pub fn query_count(&self) -> u64 {
        self.shared.state.lock().queries
    }

    /// Number of `read` calls so far.
    pub fn read_count(&self) -> u64 {
        self.shared.state.lock().reads
    }
}

impl PortTransport for MockTransport {
    fn bytes_waiting(&self) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        state.queries += 1;
        if state.fail_queries {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated query failure",
            )));
        }
        Ok(state.read_queue.len())
    }

    fn read(&self, buffer: &mut [u8], timeout: Duration) -> Result<usize, PortError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        state.reads += 1;

        while state.read_queue.is_empty() {
            if self
                .shared
                .readable
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&self, data: &[u8], timeout: Duration) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if state.fail_writes {
            return Err(PortError::timeout(timeout));
        }
        state.write_log.push(data.to_vec());
        Ok(())
    }

    fn configure(&self, config: &SerialConfig) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if state.rejected_bauds.contains(&config.baud_rate) {
            return Err(PortError::config(format!(
                "unsupported baud rate {}",
                config.baud_rate
            )));
        }
        state.configure_log.push(config.clone());
        Ok(())
    }

    fn control(&self, code: u32, arg: Option<u64>) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if !state.supported_controls.contains(&code) {
            return Err(PortError::unsupported(format!("control code {code:#x}")));
        }
        state.control_log.push((code, arg));
        Ok(())
    }

    fn flush(&self, queue: FlushQueue) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if matches!(queue, FlushQueue::Input | FlushQueue::Both) {
            state.read_queue.clear();
        }
        state.flush_log.push(queue);
        Ok(())
    }
}
