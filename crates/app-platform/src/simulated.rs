//! In-process location service
//!
//! Stands in for the OS location service on hosts without a GPS receiver
//! (desktop builds, CI). Positions are pushed in with [`SimulatedLocationService::emit`]
//! and fanned out to every live watch, applying each watch's own
//! interval/distance filter the way a device would.
//!
//! Permission requests and watch starts can be held pending, which lets
//! callers exercise what happens when the user takes a while to answer the
//! permission prompt.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::location::{LocationUpdate, PermissionStatus, WatchOptions};
use crate::service::{LocationService, PlatformError, Result, UpdateSink, WatchHandle};

/// Holds suspending calls until opened
struct Gate {
    open: watch::Sender<bool>,
}

impl Gate {
    fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self { open }
    }

    fn close(&self) {
        self.open.send_replace(false);
    }

    fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives as long as the gate, so this only returns once open
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Monotonic counter that can be awaited
struct Counter {
    value: watch::Sender<usize>,
}

impl Counter {
    fn new() -> Self {
        let (value, _) = watch::channel(0);
        Self { value }
    }

    fn increment(&self) {
        self.value.send_modify(|v| *v += 1);
    }

    fn get(&self) -> usize {
        *self.value.borrow()
    }

    async fn reached(&self, count: usize) {
        let mut rx = self.value.subscribe();
        let _ = rx.wait_for(|v| *v >= count).await;
    }
}

struct ActiveWatch {
    id: u64,
    options: WatchOptions,
    sink: UpdateSink,
    last_delivered: Option<LocationUpdate>,
}

impl ActiveWatch {
    /// Whether `update` passes this watch's interval/distance filter
    fn accepts(&self, update: &LocationUpdate) -> bool {
        let Some(last) = &self.last_delivered else {
            return true;
        };

        let elapsed_enough = (update.timestamp - last.timestamp)
            .to_std()
            .map(|elapsed| elapsed >= self.options.time_interval())
            .unwrap_or(false);

        elapsed_enough
            || last.coords.distance_to(&update.coords) >= self.options.distance_interval
    }
}

#[derive(Default)]
struct WatchRegistry {
    next_id: u64,
    watches: Vec<ActiveWatch>,
    released: usize,
}

impl WatchRegistry {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.watches.len();
        self.watches.retain(|w| w.id != id);
        let removed = self.watches.len() != before;
        if removed {
            self.released += 1;
        }
        removed
    }
}

/// Handle for a watch registered with [`SimulatedLocationService`]
pub struct SimulatedWatch {
    id: u64,
    registry: Arc<Mutex<WatchRegistry>>,
    removed: bool,
}

impl WatchHandle for SimulatedWatch {
    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        if self.registry.lock().remove(self.id) {
            tracing::debug!(watch_id = self.id, "Simulated watch removed");
        }
    }
}

/// Location service driven from inside the process
pub struct SimulatedLocationService {
    permission: Mutex<PermissionStatus>,
    permission_error: Mutex<Option<PlatformError>>,
    start_failure: Mutex<Option<PlatformError>>,
    permission_gate: Gate,
    start_gate: Gate,
    permission_requests: Counter,
    start_requests: Counter,
    watches_started: Counter,
    registry: Arc<Mutex<WatchRegistry>>,
}

impl SimulatedLocationService {
    /// Create a service that grants permission and starts watches immediately
    pub fn new() -> Self {
        Self {
            permission: Mutex::new(PermissionStatus::Granted),
            permission_error: Mutex::new(None),
            start_failure: Mutex::new(None),
            permission_gate: Gate::new(),
            start_gate: Gate::new(),
            permission_requests: Counter::new(),
            start_requests: Counter::new(),
            watches_started: Counter::new(),
            registry: Arc::new(Mutex::new(WatchRegistry::default())),
        }
    }

    /// Create a service that answers permission requests with `status`
    pub fn with_permission(status: PermissionStatus) -> Self {
        let service = Self::new();
        service.set_permission(status);
        service
    }

    /// Change the answer to future permission requests
    pub fn set_permission(&self, status: PermissionStatus) {
        *self.permission.lock() = status;
    }

    /// Make future permission requests fail with `error` (`None` to clear)
    pub fn set_permission_error(&self, error: Option<PlatformError>) {
        *self.permission_error.lock() = error;
    }

    /// Make future watch starts fail with `error` (`None` to clear)
    pub fn set_start_failure(&self, error: Option<PlatformError>) {
        *self.start_failure.lock() = error;
    }

    /// Hold permission requests pending until [`Self::resume_permission_requests`]
    pub fn pause_permission_requests(&self) {
        self.permission_gate.close();
    }

    /// Let pending and future permission requests resolve
    pub fn resume_permission_requests(&self) {
        self.permission_gate.open();
    }

    /// Hold watch starts pending until [`Self::resume_watch_starts`]
    pub fn pause_watch_starts(&self) {
        self.start_gate.close();
    }

    /// Let pending and future watch starts resolve
    pub fn resume_watch_starts(&self) {
        self.start_gate.open();
    }

    /// Number of permission requests received so far
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.get()
    }

    /// Wait until at least `count` permission requests were received
    pub async fn wait_for_permission_requests(&self, count: usize) {
        self.permission_requests.reached(count).await;
    }

    /// Number of watch starts received so far, including pending ones
    pub fn start_requests(&self) -> usize {
        self.start_requests.get()
    }

    /// Wait until at least `count` watch starts were received
    pub async fn wait_for_start_requests(&self, count: usize) {
        self.start_requests.reached(count).await;
    }

    /// Number of watches successfully registered
    pub fn watches_started(&self) -> usize {
        self.watches_started.get()
    }

    /// Number of watches removed
    pub fn watches_released(&self) -> usize {
        self.registry.lock().released
    }

    /// Number of watches currently registered
    pub fn active_watches(&self) -> usize {
        self.registry.lock().watches.len()
    }

    /// Options of the currently registered watches, in registration order
    pub fn active_options(&self) -> Vec<WatchOptions> {
        self.registry.lock().watches.iter().map(|w| w.options).collect()
    }

    /// Report a new position
    ///
    /// Delivers `update` to every live watch whose filter accepts it and
    /// returns how many watches received it. Sinks run after the registry
    /// lock is released, so a sink may remove its own watch.
    pub fn emit(&self, update: LocationUpdate) -> usize {
        let sinks: Vec<UpdateSink> = {
            let mut registry = self.registry.lock();
            registry
                .watches
                .iter_mut()
                .filter(|w| w.accepts(&update))
                .map(|w| {
                    w.last_delivered = Some(update.clone());
                    Arc::clone(&w.sink)
                })
                .collect()
        };

        for sink in &sinks {
            sink(update.clone());
        }

        sinks.len()
    }
}

impl Default for SimulatedLocationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationService for SimulatedLocationService {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        self.permission_requests.increment();
        self.permission_gate.pass().await;

        if let Some(error) = self.permission_error.lock().clone() {
            return Err(error);
        }
        Ok(*self.permission.lock())
    }

    async fn start_watch(
        &self,
        options: WatchOptions,
        sink: UpdateSink,
    ) -> Result<Box<dyn WatchHandle>> {
        self.start_requests.increment();
        self.start_gate.pass().await;

        if let Some(error) = self.start_failure.lock().clone() {
            return Err(error);
        }

        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.watches.push(ActiveWatch { id, options, sink, last_delivered: None });
            id
        };
        self.watches_started.increment();
        tracing::debug!(watch_id = id, ?options, "Simulated watch registered");

        Ok(Box::new(SimulatedWatch { id, registry: Arc::clone(&self.registry), removed: false }))
    }
}
