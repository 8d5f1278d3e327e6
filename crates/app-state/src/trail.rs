//! In-memory location trail
//!
//! The trip screen shows where the user is and, while a recording is running,
//! the path walked so far. [`LocationTrail`] is the receiving end of a
//! tracker's callback and holds both. Nothing here is persisted.

use app_platform::LocationUpdate;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::tracking::LocationCallback;

#[derive(Debug, Default)]
struct TrailState {
    current: Option<LocationUpdate>,
    recording: bool,
    points: Vec<LocationUpdate>,
}

impl TrailState {
    fn add(&mut self, update: LocationUpdate) {
        if self.recording {
            self.points.push(update.clone());
        }
        self.current = Some(update);
    }
}

/// Current location plus the recorded trail
///
/// Clones share the same trail.
#[derive(Clone)]
pub struct LocationTrail {
    state: Arc<Mutex<TrailState>>,
    callback: LocationCallback,
}

impl LocationTrail {
    /// Create an empty trail that is not recording
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(TrailState::default()));
        let sink = Arc::clone(&state);
        let callback = LocationCallback::new(move |update| sink.lock().add(update));
        Self { state, callback }
    }

    /// Callback feeding this trail
    ///
    /// Always the same instance, so handing it to a tracker repeatedly does
    /// not restart the tracker's watch.
    pub fn callback(&self) -> LocationCallback {
        self.callback.clone()
    }

    /// Add a location by hand
    pub fn add_location(&self, update: LocationUpdate) {
        self.state.lock().add(update);
    }

    /// Start appending locations to the trail
    pub fn start_recording(&self) {
        self.state.lock().recording = true;
    }

    /// Stop appending locations; the recorded points are kept
    pub fn stop_recording(&self) {
        self.state.lock().recording = false;
    }

    /// Whether locations are being recorded
    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    /// Drop the recorded points and stop recording
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.recording = false;
        state.points.clear();
    }

    /// Most recent location, recorded or not
    pub fn current_location(&self) -> Option<LocationUpdate> {
        self.state.lock().current.clone()
    }

    /// Recorded points, oldest first
    pub fn points(&self) -> Vec<LocationUpdate> {
        self.state.lock().points.clone()
    }

    /// Length of the recorded path in metres
    pub fn distance_travelled(&self) -> f64 {
        self.state
            .lock()
            .points
            .windows(2)
            .map(|pair| pair[0].coords.distance_to(&pair[1].coords))
            .sum()
    }
}

impl Default for LocationTrail {
    fn default() -> Self {
        Self::new()
    }
}
