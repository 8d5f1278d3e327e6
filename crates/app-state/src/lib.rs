//! Application state for Wayfarer
//!
//! This crate owns the live location tracking used by the trip screens:
//! the tracker that manages the platform location watch, the binding from
//! screen focus to that tracker, and the in-memory trail fed by it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod focus;
pub mod settings;
pub mod tracking;
pub mod trail;

pub use focus::{bind_focus, FocusBinding, FocusSignal};
pub use settings::TrackingSettings;
pub use trail::LocationTrail;
pub use tracking::{LocationCallback, LocationTracker, TrackerState, TrackingError};
