//! Tracking configuration and the reconfiguration decision
//!
//! A tracker is configured with a boolean tracking signal and a callback.
//! The callback is part of the configuration key: two configurations are the
//! same only if they share the signal value and the very same callback
//! instance.

use app_platform::LocationUpdate;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied receiver of location updates
///
/// Cloning shares the underlying closure, so clones compare equal. Two
/// callbacks built from separate closures never compare equal, even if the
/// closures do the same thing.
#[derive(Clone)]
pub struct LocationCallback(Arc<dyn Fn(LocationUpdate) + Send + Sync>);

impl LocationCallback {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(LocationUpdate) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Hand an update to the callback
    pub fn call(&self, update: LocationUpdate) {
        (self.0)(update)
    }

    /// Whether both handles point at the same closure
    pub fn same_as(&self, other: &LocationCallback) -> bool {
        // Compare data pointers only; vtable pointers are not stable across
        // codegen units.
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl PartialEq for LocationCallback {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for LocationCallback {}

impl fmt::Debug for LocationCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocationCallback({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// One configuration of a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Whether location updates should be flowing
    pub tracking: bool,

    /// Where updates go
    pub callback: LocationCallback,
}

impl TrackingConfig {
    /// Create a configuration
    pub fn new(tracking: bool, callback: LocationCallback) -> Self {
        Self { tracking, callback }
    }
}

/// What a tracker must do to move from one configuration to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingAction {
    /// Nothing changes
    NoOp,

    /// Request permission and start a watch
    Start,

    /// Release the current watch
    Stop,

    /// Release the current watch and start a new one for the new callback
    Restart,
}

/// Decide how to react to a new configuration
///
/// `previous` is `None` before the first configuration.
///
/// # Example
///
/// ```
/// use app_state::tracking::{decide, LocationCallback, TrackingAction, TrackingConfig};
///
/// let cb = LocationCallback::new(|_| {});
/// let on = TrackingConfig::new(true, cb.clone());
/// let off = TrackingConfig::new(false, cb);
///
/// assert_eq!(decide(None, &on), TrackingAction::Start);
/// assert_eq!(decide(Some(&on), &on), TrackingAction::NoOp);
/// assert_eq!(decide(Some(&on), &off), TrackingAction::Stop);
/// ```
pub fn decide(previous: Option<&TrackingConfig>, next: &TrackingConfig) -> TrackingAction {
    let Some(previous) = previous else {
        return if next.tracking { TrackingAction::Start } else { TrackingAction::NoOp };
    };

    if previous == next {
        return TrackingAction::NoOp;
    }

    match (previous.tracking, next.tracking) {
        (false, true) => TrackingAction::Start,
        (true, false) => TrackingAction::Stop,
        // Same signal, so the callback changed
        (true, true) => TrackingAction::Restart,
        (false, false) => TrackingAction::NoOp,
    }
}
