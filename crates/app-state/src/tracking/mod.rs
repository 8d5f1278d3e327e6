//! Location tracking
//!
//! [`LocationTracker`] turns a boolean "should track" signal and a callback
//! into at most one live platform location watch. Screens feed it their focus
//! state; the tracker requests permission, starts the watch, forwards every
//! update to the callback and removes the watch when tracking is switched
//! off, the callback changes, or the tracker goes away.
//!
//! Failures to obtain permission or to start the watch never propagate out of
//! the tracker. They are recorded as the tracker's error state for the screen
//! to render, and the next change of configuration retries.
//!
//! # Example
//!
//! ```no_run
//! use app_platform::SimulatedLocationService;
//! use app_state::tracking::{LocationCallback, LocationTracker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = Arc::new(SimulatedLocationService::new());
//!     let tracker = LocationTracker::new(service);
//!     let on_update = LocationCallback::new(|update| println!("{:?}", update.coords));
//!
//!     // Screen gained focus
//!     tracker.configure(true, on_update.clone());
//!     tracker.settle().await;
//!     assert!(tracker.error().is_none());
//!
//!     // Screen lost focus
//!     tracker.configure(false, on_update);
//! }
//! ```

mod config;
mod subscription;

pub use config::{decide, LocationCallback, TrackingAction, TrackingConfig};

use app_platform::{LocationService, PlatformError, UpdateSink, WatchOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use subscription::Subscription;

/// Why location updates are not flowing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    /// The user or the OS refused location access
    #[error("Location permission denied")]
    PermissionDenied,

    /// The permission prompt itself could not be shown
    #[error("Location permission request failed: {0}")]
    PermissionRequestFailed(#[source] PlatformError),

    /// The platform could not begin streaming locations
    #[error("Failed to start location watch: {0}")]
    WatchStartFailure(#[source] PlatformError),
}

/// Observable state of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No watch and no failure to report
    Idle,

    /// Waiting on the platform for permission or for the watch to start
    Starting,

    /// A watch is live
    Watching,

    /// No watch; the last attempt failed
    Failed,
}

#[derive(Default)]
struct TrackerInner {
    /// Last configuration applied
    config: Option<TrackingConfig>,

    /// The live watch, if any
    subscription: Option<Subscription>,

    /// Generation of the in-flight start attempt that is still current
    starting: Option<u64>,

    /// Start attempts that may not have resolved yet
    pending: Vec<JoinHandle<()>>,

    torn_down: bool,
}

/// State shared between a tracker and its start attempts
struct Shared {
    inner: Mutex<TrackerInner>,

    /// Bumped by every stop, restart and teardown. A start attempt, and the
    /// deliveries of the watch it creates, only count while it matches.
    epoch: Arc<AtomicU64>,

    errors: watch::Sender<Option<TrackingError>>,
}

impl Shared {
    fn new() -> Self {
        let (errors, _) = watch::channel(None);
        Self {
            inner: Mutex::new(TrackerInner::default()),
            epoch: Arc::new(AtomicU64::new(0)),
            errors,
        }
    }

    /// Invalidate every earlier attempt and return the new generation
    fn advance(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == generation
    }

    /// Adopt the watch created by attempt `generation`, or release it on the
    /// spot if the attempt has been superseded
    fn accept(&self, generation: u64, mut subscription: Subscription) {
        {
            let mut inner = self.inner.lock();
            if !inner.torn_down && self.is_current(generation) {
                let previous = inner.subscription.replace(subscription);
                debug_assert!(previous.is_none(), "a tracker holds at most one watch");
                inner.starting = None;
                drop(inner);

                self.errors.send_if_modified(|error| error.take().is_some());
                tracing::info!(generation, "Location watch started");
                return;
            }
        }

        tracing::debug!(
            generation = subscription.generation(),
            "Start attempt superseded, releasing its watch on arrival"
        );
        subscription.release();
    }

    /// Record the failure of attempt `generation` unless it was superseded
    fn fail(&self, generation: u64, error: TrackingError) {
        let mut inner = self.inner.lock();
        if inner.torn_down || !self.is_current(generation) {
            tracing::debug!(generation, %error, "Discarding failure of superseded start attempt");
            return;
        }
        inner.starting = None;
        drop(inner);

        tracing::warn!(generation, %error, "Location tracking failed");
        self.errors.send_replace(Some(error));
    }

    /// Release the watch for good; returns false if already torn down
    fn teardown(&self) -> bool {
        let released = {
            let mut inner = self.inner.lock();
            if inner.torn_down {
                return false;
            }
            inner.torn_down = true;
            inner.starting = None;
            self.advance();
            inner.subscription.take()
        };

        if let Some(mut subscription) = released {
            subscription.release();
        }
        tracing::debug!("Location tracker torn down");
        true
    }
}

/// Owner of a single location watch
///
/// See the [module documentation](self) for the lifecycle. All methods take
/// `&self`; wrap the tracker in an [`Arc`] to share it with a
/// [`FocusBinding`](crate::focus::FocusBinding).
pub struct LocationTracker<S> {
    service: Arc<S>,
    options: WatchOptions,
    shared: Arc<Shared>,
}

impl<S: LocationService + 'static> LocationTracker<S> {
    /// Create a tracker using the default watch options
    /// (best-for-navigation accuracy, 1 s, 10 m)
    pub fn new(service: Arc<S>) -> Self {
        Self::with_options(service, WatchOptions::default())
    }

    /// Create a tracker with custom watch options
    pub fn with_options(service: Arc<S>, options: WatchOptions) -> Self {
        Self { service, options, shared: Arc::new(Shared::new()) }
    }

    /// Options every watch of this tracker is started with
    pub fn options(&self) -> WatchOptions {
        self.options
    }

    /// Apply a configuration and return the current error state
    ///
    /// Repeating the previous configuration (same signal, same callback
    /// instance) does nothing. Otherwise the tracker starts, stops or
    /// restarts its watch as needed. Starting is asynchronous: the permission
    /// request and the watch start run on a spawned task, and the returned
    /// error state does not yet reflect their outcome. Use
    /// [`settle`](Self::settle) to wait for it.
    ///
    /// # Panics
    ///
    /// Starting a watch panics if called outside a Tokio runtime.
    pub fn configure(&self, tracking: bool, callback: LocationCallback) -> Option<TrackingError> {
        let next = TrackingConfig::new(tracking, callback);

        let released = {
            let mut inner = self.shared.inner.lock();
            if inner.torn_down {
                tracing::warn!("Ignoring configuration of a torn down location tracker");
                drop(inner);
                return self.error();
            }

            let action = decide(inner.config.as_ref(), &next);
            inner.config = Some(next.clone());

            match action {
                TrackingAction::NoOp => None,
                TrackingAction::Stop => {
                    self.shared.advance();
                    inner.starting = None;
                    tracing::info!("Location tracking stopped");
                    inner.subscription.take()
                }
                TrackingAction::Start | TrackingAction::Restart => {
                    let generation = self.shared.advance();
                    let released = inner.subscription.take();
                    inner.starting = Some(generation);
                    inner.pending.retain(|task| !task.is_finished());
                    inner.pending.push(tokio::spawn(start_watching(
                        Arc::clone(&self.shared),
                        Arc::clone(&self.service),
                        self.options,
                        next.callback,
                        generation,
                    )));
                    tracing::info!(generation, ?action, "Location tracking requested");
                    released
                }
            }
        };

        if let Some(mut subscription) = released {
            subscription.release();
        }

        self.error()
    }

    /// Wait until every start attempt issued so far has resolved
    pub async fn settle(&self) {
        let pending = std::mem::take(&mut self.shared.inner.lock().pending);
        for task in pending {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Location start attempt panicked: {}", e);
                }
            }
        }
    }
}

impl<S> LocationTracker<S> {
    /// Most recent failure, if any
    pub fn error(&self) -> Option<TrackingError> {
        self.shared.errors.borrow().clone()
    }

    /// Subscribe to error state changes
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<TrackingError>> {
        self.shared.errors.subscribe()
    }

    /// Current lifecycle state
    pub fn state(&self) -> TrackerState {
        let inner = self.shared.inner.lock();
        if inner.subscription.is_some() {
            TrackerState::Watching
        } else if inner.starting.is_some() {
            TrackerState::Starting
        } else if self.shared.errors.borrow().is_some() {
            TrackerState::Failed
        } else {
            TrackerState::Idle
        }
    }

    /// Whether a watch is live
    pub fn is_watching(&self) -> bool {
        self.shared.inner.lock().subscription.is_some()
    }

    /// Release the watch and stop reacting to configuration
    ///
    /// Attempts still waiting on the platform release their watch as soon as
    /// it arrives. Calling this more than once, or dropping the tracker
    /// afterwards, has no further effect.
    pub fn shutdown(&self) {
        if self.shared.teardown() {
            tracing::info!("Location tracker shut down");
        }
    }
}

impl<S> Drop for LocationTracker<S> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

/// Build the sink handed to the platform
///
/// Forwards synchronously, but only while `generation` is the tracker's
/// current attempt, so nothing is delivered after a stop or teardown.
fn delivery_sink(epoch: Arc<AtomicU64>, generation: u64, callback: LocationCallback) -> UpdateSink {
    Arc::new(move |update| {
        if epoch.load(Ordering::SeqCst) == generation {
            callback.call(update);
        }
    })
}

async fn start_watching<S: LocationService>(
    shared: Arc<Shared>,
    service: Arc<S>,
    options: WatchOptions,
    callback: LocationCallback,
    generation: u64,
) {
    match service.request_permission().await {
        Ok(status) if status.is_granted() => {}
        Ok(_) => {
            shared.fail(generation, TrackingError::PermissionDenied);
            return;
        }
        Err(e) => {
            shared.fail(generation, TrackingError::PermissionRequestFailed(e));
            return;
        }
    }

    if !shared.is_current(generation) {
        tracing::debug!(generation, "Start attempt superseded while awaiting permission");
        return;
    }

    let sink = delivery_sink(Arc::clone(&shared.epoch), generation, callback);
    match service.start_watch(options, sink).await {
        Ok(handle) => shared.accept(generation, Subscription::new(handle, generation)),
        Err(e) => shared.fail(generation, TrackingError::WatchStartFailure(e)),
    }
}
