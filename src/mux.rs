//! Receive multiplexer.
//!
//! One background worker polls every registered device's transport for
//! waiting bytes and invokes the device's `rx_indicate` callback, replacing a
//! thread per port. The registry is append-only and capacity-checked.
//!
//! # Pause/resume protocol
//!
//! The registry, the pause depth and the stop flag share one mutex. A poll
//! pass holds that mutex from start to finish, and `attach` mutates the
//! registry only between a pause and a resume:
//!
//! ```text
//! attach(dev):  pause ─> start worker (once) ─> append ─> resume
//! worker:       lock ─> wait while paused ─> poll all ─> unlock ─> idle
//! ```
//!
//! so the worker never observes a partially updated registry. Pauses nest: the
//! worker polls again only once every `pause` has been matched by a `resume`,
//! so devices attached during an explicit pause stay unpolled until it ends.

use crate::device::{DeviceHandle, DeviceId};
use crate::error::{DeviceError, DeviceResult};
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry capacity used when none is configured.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 5;

/// Pause between poll passes used when none is configured.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(1);

const WORKER_THREAD_NAME: &str = "serial-rx-mux";

/// Multiplexer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxOptions {
    /// Maximum number of registered devices; fixed for the multiplexer's life.
    pub capacity: usize,
    /// Time the worker waits between passes. Zero polls continuously,
    /// yielding the CPU between passes.
    pub idle_interval: Duration,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGISTRY_CAPACITY,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }
}

/// Outcome of a successful `attach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    Inserted,
    AlreadyPresent,
}

/// Snapshot of the multiplexer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxStats {
    /// Completed poll passes.
    pub cycles: u64,
    /// `bytes_waiting` calls, failed ones included.
    pub queries: u64,
    /// Callbacks delivered.
    pub notifications: u64,
    /// Failed `bytes_waiting` calls.
    pub query_errors: u64,
    /// Worker threads started.
    pub workers_spawned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    queries: AtomicU64,
    notifications: AtomicU64,
    query_errors: AtomicU64,
    workers_spawned: AtomicU64,
}

#[derive(Debug, Default)]
struct Registry {
    pauses: usize,
    stopped: bool,
    devices: Vec<DeviceHandle>,
}

#[derive(Debug)]
struct Shared {
    registry: Mutex<Registry>,
    /// Stop request readable without the registry lock, which the worker
    /// holds while callbacks run.
    stop_requested: AtomicBool,
    wake: Condvar,
    counters: Counters,
    idle_interval: Duration,
}

/// Single-thread receive poller for all registered devices.
#[derive(Debug)]
pub struct RxMultiplexer {
    shared: Arc<Shared>,
    capacity: usize,
    worker: OnceCell<Worker>,
}

#[derive(Debug)]
struct Worker {
    thread: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RxMultiplexer {
    pub fn new(options: MuxOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                stop_requested: AtomicBool::new(false),
                wake: Condvar::new(),
                counters: Counters::default(),
                idle_interval: options.idle_interval,
            }),
            capacity: options.capacity,
            worker: OnceCell::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.shared.registry.lock().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.shared
            .registry
            .lock()
            .devices
            .iter()
            .any(|d| d.id() == id)
    }

    /// Names of the registered devices, in registration order.
    pub fn device_names(&self) -> Vec<String> {
        self.shared
            .registry
            .lock()
            .devices
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.registry.lock().pauses > 0
    }

    /// Whether the worker thread has been started.
    pub fn is_running(&self) -> bool {
        self.worker.get().is_some() && !self.shared.registry.lock().stopped
    }

    pub fn stats(&self) -> MuxStats {
        let c = &self.shared.counters;
        MuxStats {
            cycles: c.cycles.load(Ordering::Relaxed),
            queries: c.queries.load(Ordering::Relaxed),
            notifications: c.notifications.load(Ordering::Relaxed),
            query_errors: c.query_errors.load(Ordering::Relaxed),
            workers_spawned: c.workers_spawned.load(Ordering::Relaxed),
        }
    }

    /// Stop new poll passes from starting.
    ///
    /// A pass in progress holds the registry lock, so once this returns no
    /// pass is running and none starts until the matching `resume`.
    pub fn pause(&self) {
        self.shared.registry.lock().pauses += 1;
    }

    /// Undo one `pause`; the worker polls again when none remain.
    pub fn resume(&self) {
        let mut registry = self.shared.registry.lock();
        registry.pauses = registry.pauses.saturating_sub(1);
        if registry.pauses == 0 {
            self.shared.wake.notify_all();
            debug!("rx multiplexer resumed");
        }
    }

    /// Add a device to the registry, starting the worker on first use.
    ///
    /// Attaching a device that is already registered is a no-op. Fails with
    /// `CapacityExceeded` when the registry is full and `ShutDown` after
    /// `shutdown`; existing entries are untouched either way.
    pub fn attach(&self, device: &DeviceHandle) -> DeviceResult<Attach> {
        self.pause();
        let result = self
            .ensure_worker()
            .and_then(|()| self.append(device));
        self.resume();
        result
    }

    fn append(&self, device: &DeviceHandle) -> DeviceResult<Attach> {
        let mut registry = self.shared.registry.lock();
        if registry.stopped {
            return Err(DeviceError::ShutDown);
        }
        if registry.devices.iter().any(|d| d.id() == device.id()) {
            return Ok(Attach::AlreadyPresent);
        }
        if registry.devices.len() >= self.capacity {
            warn!(
                device = device.name(),
                capacity = self.capacity,
                "rx registry full"
            );
            return Err(DeviceError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        registry.devices.push(device.clone());
        info!(
            device = device.name(),
            registered = registry.devices.len(),
            "device attached to rx multiplexer"
        );
        Ok(Attach::Inserted)
    }

    fn ensure_worker(&self) -> DeviceResult<()> {
        if self.shared.registry.lock().stopped {
            return Err(DeviceError::ShutDown);
        }
        self.worker
            .get_or_try_init(|| {
                let shared = Arc::clone(&self.shared);
                let handle = thread::Builder::new()
                    .name(WORKER_THREAD_NAME.to_string())
                    .spawn(move || run(shared))
                    .map_err(DeviceError::WorkerSpawn)?;
                self.shared
                    .counters
                    .workers_spawned
                    .fetch_add(1, Ordering::Relaxed);
                Ok(Worker {
                    thread: handle.thread().id(),
                    handle: Mutex::new(Some(handle)),
                })
            })
            .map(|_| ())
    }

    /// Stop the worker and wait for it to exit. Idempotent.
    ///
    /// Called on the worker thread (from an rx callback, or by dropping the
    /// last handle there) the worker is only flagged; it stops as soon as the
    /// current callback returns and skips the rest of the pass.
    pub fn shutdown(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        if self.on_worker_thread() {
            debug!("rx multiplexer stop requested from worker thread");
            return;
        }

        {
            let mut registry = self.shared.registry.lock();
            registry.stopped = true;
            self.shared.wake.notify_all();
        }

        let Some(worker) = self.worker.get() else {
            return;
        };
        let Some(handle) = worker.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("rx multiplexer worker panicked");
        }
    }

    fn on_worker_thread(&self) -> bool {
        self.worker
            .get()
            .is_some_and(|worker| worker.thread == thread::current().id())
    }
}

impl Drop for RxMultiplexer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<Shared>) {
    info!(idle_interval = ?shared.idle_interval, "rx multiplexer started");
    let mut registry = shared.registry.lock();
    loop {
        while registry.pauses > 0 && !registry.stopped {
            shared.wake.wait(&mut registry);
        }
        if registry.stopped || shared.stop_requested.load(Ordering::Acquire) {
            registry.stopped = true;
            break;
        }

        for device in &registry.devices {
            if shared.stop_requested.load(Ordering::Acquire) {
                break;
            }
            poll_device(&shared.counters, device);
        }
        shared.counters.cycles.fetch_add(1, Ordering::Relaxed);

        idle(&shared, &mut registry);
    }
    info!("rx multiplexer stopped");
}

/// Release the registry between passes.
fn idle(shared: &Shared, registry: &mut MutexGuard<'_, Registry>) {
    if shared.idle_interval.is_zero() {
        MutexGuard::unlocked(registry, thread::yield_now);
    } else {
        let _ = shared.wake.wait_for(registry, shared.idle_interval);
    }
}

fn poll_device(counters: &Counters, device: &DeviceHandle) {
    counters.queries.fetch_add(1, Ordering::Relaxed);
    match device.transport().bytes_waiting() {
        Ok(0) => {}
        Ok(n) => {
            if device.notify_rx(n) {
                counters.notifications.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(e) => {
            counters.query_errors.fetch_add(1, Ordering::Relaxed);
            warn!(device = device.name(), error = %e, "rx poll query failed");
        }
    }
}
