//! Location data reported by the platform
//!
//! These types mirror what a mobile location service hands back on every
//! position fix, along with the options used to register a watch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mean Earth radius in metres, used for great-circle distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Default minimum time between two reports of a watch (1 second)
pub const DEFAULT_TIME_INTERVAL_MS: u64 = 1000;

/// Default minimum displacement between two reports of a watch (10 metres)
pub const DEFAULT_DISTANCE_INTERVAL_METERS: f64 = 10.0;

/// Accuracy tier requested from the platform
///
/// Higher tiers cost more battery. The ordering follows the tiers from the
/// coarsest to the finest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Accuracy {
    /// Accurate to roughly three kilometres
    Lowest,
    /// Accurate to roughly one kilometre
    Low,
    /// Accurate to roughly a hundred metres
    Balanced,
    /// Accurate to roughly ten metres
    High,
    /// The best accuracy the device can provide
    Highest,
    /// Highest accuracy plus sensor fusion, meant for turn-by-turn navigation
    #[default]
    BestForNavigation,
}

/// Options for a streaming location watch
///
/// The platform reports a new position once `time_interval_ms` has elapsed
/// or the device moved at least `distance_interval` metres, whichever
/// happens first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchOptions {
    /// Requested accuracy tier
    pub accuracy: Accuracy,

    /// Minimum time between reports, in milliseconds
    #[serde(rename = "timeInterval")]
    pub time_interval_ms: u64,

    /// Minimum displacement between reports, in metres
    pub distance_interval: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::BestForNavigation,
            time_interval_ms: DEFAULT_TIME_INTERVAL_MS,
            distance_interval: DEFAULT_DISTANCE_INTERVAL_METERS,
        }
    }
}

impl WatchOptions {
    /// Minimum time between reports
    pub fn time_interval(&self) -> Duration {
        Duration::from_millis(self.time_interval_ms)
    }

    /// Set the accuracy tier
    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the minimum time between reports
    pub fn with_time_interval(mut self, interval: Duration) -> Self {
        self.time_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the minimum displacement between reports, in metres
    pub fn with_distance_interval(mut self, meters: f64) -> Self {
        self.distance_interval = meters;
        self
    }
}

/// Result of asking the user/OS for location access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    /// Location access was granted
    Granted,
    /// Location access was refused
    Denied,
}

impl PermissionStatus {
    /// Whether access was granted
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Position fix coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Altitude in metres above sea level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// Horizontal accuracy radius in metres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Vertical accuracy in metres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,

    /// Heading in degrees from true north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Ground speed in metres per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl Coordinates {
    /// Create coordinates with only a latitude and longitude
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        }
    }

    /// Great-circle distance to another point, in metres (haversine)
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

/// One reported position sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// Where the device was
    pub coords: Coordinates,

    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    /// Create an update for the given coordinates and time
    pub fn new(coords: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self { coords, timestamp }
    }

    /// Create an update at the given position, stamped with the current time
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self::new(Coordinates::new(latitude, longitude), Utc::now())
    }
}
