//! Screen focus as a tracking signal
//!
//! A screen that draws the user's trail only needs locations while it is in
//! front. [`FocusSignal`] carries that focus state and [`bind_focus`] keeps a
//! [`LocationTracker`] configured from it.

use app_platform::LocationService;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::tracking::{LocationCallback, LocationTracker};

/// Whether a screen currently has focus
///
/// # Example
///
/// ```
/// use app_state::focus::FocusSignal;
///
/// let signal = FocusSignal::new(false);
/// let rx = signal.subscribe();
///
/// signal.focus();
/// assert!(*rx.borrow());
/// ```
pub struct FocusSignal {
    focused: watch::Sender<bool>,
}

impl FocusSignal {
    /// Create a signal with the given initial focus
    pub fn new(focused: bool) -> Self {
        let (focused, _) = watch::channel(focused);
        Self { focused }
    }

    /// Whether the screen has focus right now
    pub fn is_focused(&self) -> bool {
        *self.focused.borrow()
    }

    /// Set the focus state; subscribers only hear about actual changes
    pub fn set_focused(&self, focused: bool) {
        self.focused.send_if_modified(|current| {
            if *current == focused {
                false
            } else {
                *current = focused;
                true
            }
        });
    }

    /// The screen came to the front
    pub fn focus(&self) {
        self.set_focused(true);
    }

    /// The screen went to the back
    pub fn blur(&self) {
        self.set_focused(false);
    }

    /// Receive focus changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.focused.subscribe()
    }
}

impl Default for FocusSignal {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Keep `tracker` configured from a focus signal
///
/// Spawns a task that applies the current focus right away and then every
/// change of it, always with the same `callback`. The task ends when the
/// returned binding is stopped or dropped, or when the signal itself goes
/// away. It holds a reference to the tracker until then; if that was the
/// last reference, the tracker is torn down with it.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn bind_focus<S>(
    tracker: Arc<LocationTracker<S>>,
    mut focus: watch::Receiver<bool>,
    callback: LocationCallback,
) -> FocusBinding
where
    S: LocationService + 'static,
{
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let focused = *focus.borrow_and_update();
        tracker.configure(focused, callback.clone());

        loop {
            tokio::select! {
                changed = focus.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Focus signal dropped, unbinding location tracker");
                        break;
                    }
                    let focused = *focus.borrow_and_update();
                    tracing::debug!(focused, "Screen focus changed");
                    tracker.configure(focused, callback.clone());
                }
                _ = &mut stop_rx => {
                    break;
                }
            }
        }
    });

    FocusBinding { stop_tx: Some(stop_tx), handle }
}

/// Handle for a running focus binding
///
/// When dropped, the binding stops. The tracker keeps whatever configuration
/// it had at that point.
pub struct FocusBinding {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl FocusBinding {
    /// Stop following the focus signal
    pub fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Whether the binding task has ended
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for FocusBinding {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}
