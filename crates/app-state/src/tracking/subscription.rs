//! Scoped ownership of a platform location watch

use app_platform::WatchHandle;

/// An active platform watch owned by a tracker
///
/// The watch is removed by [`Subscription::release`] or, failing that, when
/// the subscription is dropped. Releasing twice is a no-op.
pub(crate) struct Subscription {
    handle: Option<Box<dyn WatchHandle>>,
    generation: u64,
}

impl Subscription {
    pub(crate) fn new(handle: Box<dyn WatchHandle>, generation: u64) -> Self {
        Self { handle: Some(handle), generation }
    }

    /// Start attempt this watch belongs to
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Remove the platform watch
    pub(crate) fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.remove();
            tracing::debug!(generation = self.generation, "Location watch released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
