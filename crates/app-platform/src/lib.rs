//! Platform location services for Wayfarer
//!
//! This crate defines the contract with the OS location service (permission
//! prompt, streaming watches) and an in-process implementation for hosts
//! without a GPS receiver.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod location;
pub mod service;
pub mod simulated;

pub use location::{Accuracy, Coordinates, LocationUpdate, PermissionStatus, WatchOptions};
pub use service::{LocationService, PlatformError, UpdateSink, WatchHandle};
pub use simulated::SimulatedLocationService;
