//! Platform location service contract
//!
//! The mobile OS exposes location access through two suspending calls, a
//! permission request and a watch registration, plus a synchronous way to
//! cancel a registered watch. Everything above this module talks to the
//! platform only through [`LocationService`] and [`WatchHandle`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::location::{LocationUpdate, PermissionStatus, WatchOptions};

/// Errors raised by the platform location service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// Location services are switched off on the device
    #[error("Location services are disabled")]
    ServicesDisabled,

    /// No location provider is available on this device
    #[error("Location provider unavailable: {0}")]
    Unavailable(String),

    /// The platform rejected the request
    #[error("Platform request failed: {0}")]
    RequestFailed(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Callback the platform invokes for every reported position
///
/// Invoked synchronously on delivery, one update at a time, in the order the
/// platform produces them.
pub type UpdateSink = Arc<dyn Fn(LocationUpdate) + Send + Sync>;

/// A live watch registration with the platform
///
/// `remove` cancels the registration. Calling it more than once must be
/// harmless.
pub trait WatchHandle: Send + Sync {
    /// Cancel the watch
    fn remove(&mut self);
}

/// Platform location service
#[async_trait]
pub trait LocationService: Send + Sync {
    /// Ask the user/OS for location access
    ///
    /// Suspends until the user or the OS answers. Resolves immediately when
    /// access was already granted.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Register a streaming watch
    ///
    /// Every position that passes the interval/distance filter of `options`
    /// is handed to `sink` until the returned handle is removed.
    async fn start_watch(
        &self,
        options: WatchOptions,
        sink: UpdateSink,
    ) -> Result<Box<dyn WatchHandle>>;
}
