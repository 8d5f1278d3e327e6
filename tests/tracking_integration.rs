//! Location tracking integration tests
//!
//! End-to-end tests of a trip screen: focus drives the tracker, the tracker
//! drives the simulated platform, and updates land in the trail.

use app_platform::{
    Accuracy, Coordinates, LocationUpdate, PermissionStatus, PlatformError,
    SimulatedLocationService,
};
use app_state::{
    bind_focus, FocusSignal, LocationCallback, LocationTracker, LocationTrail, TrackerState,
    TrackingError, TrackingSettings,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// A walk north along a meridian, one fix per second, ~20 m apart
fn walk(steps: usize) -> Vec<LocationUpdate> {
    let start = chrono::Utc::now();
    (0..steps)
        .map(|i| {
            LocationUpdate::new(
                Coordinates::new(40.7456827 + i as f64 * 0.00018, -73.9954344),
                start + chrono::Duration::seconds(i as i64),
            )
        })
        .collect()
}

/// Test a trip screen recording a walk while focused
#[tokio::test]
async fn test_trip_screen_records_walk_while_focused() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::new());
    let tracker = Arc::new(LocationTracker::new(Arc::clone(&service)));
    let trail = LocationTrail::new();
    let focus = FocusSignal::new(false);

    let _binding = bind_focus(Arc::clone(&tracker), focus.subscribe(), trail.callback());

    // Screen comes to the front and the user starts recording
    focus.focus();
    service.wait_for_permission_requests(1).await;
    tracker.settle().await;
    assert_eq!(tracker.state(), TrackerState::Watching);
    trail.start_recording();

    for update in walk(5) {
        service.emit(update);
    }
    assert_eq!(trail.points().len(), 5);
    let travelled = trail.distance_travelled();
    assert!(travelled > 70.0 && travelled < 90.0, "unexpected distance {travelled}");

    // User switches tab: no more updates
    focus.blur();
    until(|| !tracker.is_watching()).await;
    for update in walk(3) {
        assert_eq!(service.emit(update), 0);
    }
    assert_eq!(trail.points().len(), 5);

    // Back to the screen: tracking resumes with the same trail
    focus.focus();
    service.wait_for_permission_requests(2).await;
    tracker.settle().await;
    service.emit(LocationUpdate::at(40.75, -73.99));
    assert_eq!(trail.points().len(), 6);

    assert_eq!(service.watches_started(), 2);
    assert_eq!(service.watches_released(), 1);
}

/// Test that a screen being destroyed releases the watch
#[tokio::test]
async fn test_screen_teardown_releases_watch() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::new());
    let trail = LocationTrail::new();

    {
        let tracker = LocationTracker::new(Arc::clone(&service));
        tracker.configure(true, trail.callback());
        tracker.settle().await;
        assert_eq!(service.active_watches(), 1);
    }

    assert_eq!(service.active_watches(), 0);
    assert_eq!(service.watches_released(), 1);
    assert_eq!(service.emit(LocationUpdate::at(1.0, 1.0)), 0);
    assert!(trail.current_location().is_none());
}

/// Test the user denying location access, then granting it from settings
#[tokio::test]
async fn test_permission_denied_then_granted() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::with_permission(PermissionStatus::Denied));
    let tracker = LocationTracker::new(Arc::clone(&service));
    let trail = LocationTrail::new();
    let mut errors = tracker.subscribe_errors();

    tracker.configure(true, trail.callback());
    errors.changed().await.unwrap();
    assert_eq!(*errors.borrow_and_update(), Some(TrackingError::PermissionDenied));
    assert_eq!(tracker.state(), TrackerState::Failed);

    // The user grants access in the OS settings and comes back to the screen
    service.set_permission(PermissionStatus::Granted);
    tracker.configure(false, trail.callback());
    tracker.configure(true, trail.callback());

    errors.changed().await.unwrap();
    assert!(errors.borrow_and_update().is_none());
    assert!(tracker.is_watching());

    service.emit(LocationUpdate::at(1.0, 1.0));
    assert!(trail.current_location().is_some());
}

/// Test location services being switched off
#[tokio::test]
async fn test_location_services_disabled() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::new());
    service.set_start_failure(Some(PlatformError::ServicesDisabled));

    let tracker = LocationTracker::new(Arc::clone(&service));
    tracker.configure(true, LocationCallback::new(|_| {}));
    tracker.settle().await;

    let error = tracker.error().expect("start should fail");
    assert_eq!(error, TrackingError::WatchStartFailure(PlatformError::ServicesDisabled));
    assert_eq!(error.to_string(), "Failed to start location watch: Location services are disabled");
    assert_eq!(service.active_watches(), 0);
}

/// Test swapping the callback while tracking
#[tokio::test]
async fn test_callback_swap_routes_updates_to_new_callback() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::new());
    let tracker = LocationTracker::new(Arc::clone(&service));

    let first = Arc::new(Mutex::new(0usize));
    let second = Arc::new(Mutex::new(0usize));
    let f = Arc::clone(&first);
    let s = Arc::clone(&second);
    let cb1 = LocationCallback::new(move |_| *f.lock() += 1);
    let cb2 = LocationCallback::new(move |_| *s.lock() += 1);

    tracker.configure(true, cb1);
    tracker.settle().await;
    service.emit(LocationUpdate::at(1.0, 1.0));

    tracker.configure(true, cb2);
    tracker.settle().await;
    service.emit(LocationUpdate::at(2.0, 2.0));

    assert_eq!(*first.lock(), 1);
    assert_eq!(*second.lock(), 1);
    assert_eq!(service.active_watches(), 1);
}

/// Test leaving the screen while the permission prompt is still open
#[tokio::test]
async fn test_leaving_screen_during_permission_prompt() {
    init_tracing();

    let service = Arc::new(SimulatedLocationService::new());
    let tracker = Arc::new(LocationTracker::new(Arc::clone(&service)));
    let trail = LocationTrail::new();
    let focus = FocusSignal::new(true);
    service.pause_permission_requests();

    let _binding = bind_focus(Arc::clone(&tracker), focus.subscribe(), trail.callback());
    service.wait_for_permission_requests(1).await;
    assert_eq!(tracker.state(), TrackerState::Starting);

    focus.blur();
    until(|| tracker.state() != TrackerState::Starting).await;

    service.resume_permission_requests();
    tracker.settle().await;

    assert_eq!(service.active_watches(), 0);
    assert_eq!(service.emit(LocationUpdate::at(1.0, 1.0)), 0);
    assert!(trail.current_location().is_none());
}

/// Test settings flowing into the platform watch
#[tokio::test]
async fn test_settings_configure_watch() {
    init_tracing();

    let settings = TrackingSettings::from_json(
        r#"{"watch":{"accuracy":"high","timeInterval":2000,"distanceInterval":5}}"#,
    )
    .unwrap();

    let service = Arc::new(SimulatedLocationService::new());
    let tracker = settings.tracker(Arc::clone(&service));
    tracker.configure(true, LocationCallback::new(|_| {}));
    tracker.settle().await;

    let options = service.active_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].accuracy, Accuracy::High);
    assert_eq!(options[0].time_interval(), Duration::from_secs(2));
    assert_eq!(options[0].distance_interval, 5.0);
}
