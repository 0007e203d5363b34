use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_test::assert_ok;
use useractivity::platform::{EventLoopPlatform, FileMarker, SharedMarker};
use useractivity::{ActivityEvent, ActivityState, ActivityTracker, InputChannel, TrackerError};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Count transitions by kind.
fn counters(tracker: &ActivityTracker<EventLoopPlatform>) -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let active = Rc::new(Cell::new(0));
    let inactive = Rc::new(Cell::new(0));
    let a = active.clone();
    tracker.on_user_active(move || a.set(a.get() + 1));
    let i = inactive.clone();
    tracker.on_user_inactive(move || i.set(i.get() + 1));
    (active, inactive)
}

#[test]
fn test_requires_runtime() {
    let result = EventLoopPlatform::new(SharedMarker::new());
    assert!(matches!(result, Err(TrackerError::NoRuntime(_))));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_input_scenario() {
    let marker = SharedMarker::new();
    let platform = assert_ok!(EventLoopPlatform::new(marker.clone()));
    platform
        .run_until(async {
            let tracker = ActivityTracker::new(platform.clone(), ms(1000));
            let (active, inactive) = counters(&tracker);

            tracker.register();
            assert_eq!(marker.get(), Some(ActivityState::Active));
            assert_eq!(platform.subscription_count(), 3);

            sleep(ms(900)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Active));

            sleep(ms(200)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Inactive));
            assert_eq!(marker.get(), Some(ActivityState::Inactive));
            assert_eq!(inactive.get(), 1);

            // t=1500
            sleep(ms(400)).await;
            platform.dispatch(InputChannel::PointerDown);
            assert_eq!(tracker.state(), Some(ActivityState::Active));
            assert_eq!(active.get(), 1);

            // New deadline at t=2500.
            sleep(ms(900)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Active));
            sleep(ms(200)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Inactive));
            assert_eq!(inactive.get(), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_input_every_half_timeout_stays_active() {
    let platform = EventLoopPlatform::new(SharedMarker::new()).unwrap();
    platform
        .run_until(async {
            let tracker = ActivityTracker::new(platform.clone(), ms(1000));
            let (active, inactive) = counters(&tracker);
            tracker.register();

            for _ in 0..6 {
                sleep(ms(500)).await;
                platform.dispatch(InputChannel::PointerMove);
            }
            sleep(ms(500)).await;

            assert_eq!(tracker.state(), Some(ActivityState::Active));
            assert_eq!(active.get(), 0);
            assert_eq!(inactive.get(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_unregister_before_deadline_has_no_effect() {
    let marker = SharedMarker::new();
    let platform = EventLoopPlatform::new(marker.clone()).unwrap();
    platform
        .run_until(async {
            let tracker = ActivityTracker::new(platform.clone(), ms(1000));
            let mut events = tracker.subscribe();
            tracker.register();

            sleep(ms(999)).await;
            tracker.unregister();
            sleep(ms(2000)).await;

            assert_eq!(marker.get(), None);
            assert_eq!(tracker.state(), None);
            assert_eq!(platform.subscription_count(), 0);
            assert!(events.try_recv().is_err());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_set_timeout_rearms_from_call() {
    let platform = EventLoopPlatform::new(SharedMarker::new()).unwrap();
    platform
        .run_until(async {
            let tracker = ActivityTracker::new(platform.clone(), ms(1000));
            let mut events = tracker.subscribe();
            tracker.register();

            sleep(ms(800)).await;
            tracker.set_timeout(ms(1000));
            sleep(ms(300)).await;
            assert_eq!(events.recv().await.unwrap(), ActivityEvent::UserInactive);

            platform.dispatch(InputChannel::KeyDown);
            assert_eq!(events.recv().await.unwrap(), ActivityEvent::UserActive);

            // t=1100: a new value restarts the countdown here.
            tracker.set_timeout(ms(2000));
            sleep(ms(1900)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Active));
            sleep(ms(200)).await;
            assert_eq!(tracker.state(), Some(ActivityState::Inactive));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_file_marker_follows_state() {
    let dir = tempfile::tempdir().unwrap();
    let marker = FileMarker::new(dir.path().join("marker"));
    let reader = marker.clone();
    let platform = EventLoopPlatform::new(marker).unwrap();

    platform
        .run_until(async {
            let tracker = ActivityTracker::new(platform.clone(), ms(100));

            tracker.register();
            assert_eq!(reader.read(), Some(ActivityState::Active));

            sleep(ms(150)).await;
            assert_eq!(reader.read(), Some(ActivityState::Inactive));

            platform.dispatch(InputChannel::KeyDown);
            assert_eq!(reader.read(), Some(ActivityState::Active));

            tracker.unregister();
            assert_eq!(std::fs::read_to_string(reader.path()).unwrap(), "");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_register_outside_run_until_fires_once_driven() {
    let marker = SharedMarker::new();
    let platform = EventLoopPlatform::new(marker.clone()).unwrap();
    let tracker = ActivityTracker::new(platform.clone(), ms(100));
    let mut events = tracker.subscribe();

    // Plain runtime context, no LocalSet around the caller.
    tracker.register();
    assert_eq!(marker.get(), Some(ActivityState::Active));

    platform.run_until(sleep(ms(150))).await;
    assert_eq!(tracker.state(), Some(ActivityState::Inactive));
    assert_eq!(events.try_recv().unwrap(), ActivityEvent::UserInactive);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_counts_from_scheduling_not_from_driving() {
    let platform = EventLoopPlatform::new(SharedMarker::new()).unwrap();
    let tracker = ActivityTracker::new(platform.clone(), ms(1000));
    tracker.register();

    // Time passes before the platform is driven at all.
    sleep(ms(600)).await;
    platform.run_until(sleep(ms(500))).await;

    assert_eq!(tracker.state(), Some(ActivityState::Inactive));
}
