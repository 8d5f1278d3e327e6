//! Tracking settings
//!
//! Watch options can be tuned from a JSON settings file. Missing keys fall
//! back to the navigation-grade defaults.
//!
//! ```json
//! {
//!   "watch": {
//!     "accuracy": "bestForNavigation",
//!     "timeInterval": 1000,
//!     "distanceInterval": 10
//!   }
//! }
//! ```

use app_platform::{LocationService, WatchOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::tracking::LocationTracker;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON for these settings
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Location tracking settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingSettings {
    /// Options for every location watch
    pub watch: WatchOptions,
}

impl TrackingSettings {
    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), ?settings, "Loaded tracking settings");
        Ok(settings)
    }

    /// Check that the values make sense
    pub fn validate(&self) -> Result<()> {
        if self.watch.time_interval_ms == 0 {
            return Err(SettingsError::Invalid("timeInterval must be greater than zero".into()));
        }

        let distance = self.watch.distance_interval;
        if !distance.is_finite() || distance < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "distanceInterval must be a non-negative number, got {}",
                distance
            )));
        }

        Ok(())
    }

    /// Create a tracker using these settings
    pub fn tracker<S: LocationService + 'static>(&self, service: Arc<S>) -> LocationTracker<S> {
        LocationTracker::with_options(service, self.watch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_platform::{Accuracy, SimulatedLocationService};
    use tempfile::TempDir;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = TrackingSettings::from_json("{}").unwrap();
        assert_eq!(settings, TrackingSettings::default());
        assert_eq!(settings.watch, WatchOptions::default());
    }

    #[test]
    fn test_partial_watch_settings() {
        let settings = TrackingSettings::from_json(r#"{"watch":{"distanceInterval":25}}"#).unwrap();
        assert_eq!(settings.watch.distance_interval, 25.0);
        assert_eq!(settings.watch.time_interval_ms, 1000);
        assert_eq!(settings.watch.accuracy, Accuracy::BestForNavigation);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = TrackingSettings::from_json(r#"{"watch":{"timeInterval":0}}"#);
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_negative_distance_rejected() {
        let result = TrackingSettings::from_json(r#"{"watch":{"distanceInterval":-1}}"#);
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = TrackingSettings::from_json(r#"{"watch":{"accuracy":"precise"}}"#);
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracking.json");
        tokio::fs::write(&path, r#"{"watch":{"accuracy":"balanced","timeInterval":5000}}"#)
            .await
            .unwrap();

        let settings = TrackingSettings::load(&path).await.unwrap();
        assert_eq!(settings.watch.accuracy, Accuracy::Balanced);
        assert_eq!(settings.watch.time_interval_ms, 5000);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = TrackingSettings::load(temp_dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }

    #[tokio::test]
    async fn test_tracker_uses_settings() {
        let settings = TrackingSettings::from_json(r#"{"watch":{"distanceInterval":50}}"#).unwrap();
        let tracker = settings.tracker(Arc::new(SimulatedLocationService::new()));
        assert_eq!(tracker.options().distance_interval, 50.0);
    }
}
