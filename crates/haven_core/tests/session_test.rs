//! End-to-end session tests
//!
//! Run a full watcher set against scripted sensors on tokio's paused clock
//! and check what ends up in the event store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use haven_core::{
    AlertKind, CheckInSource, EventStore, Mood, MoodSummary, Notification, Notifier, SensorSuite,
    StoreEvent, WatcherContext, WatcherKind, WatcherSet, WatcherState,
    config::WatchersConfig,
    notify::{NoHaptics, NotificationTrigger, NotifyError},
    scripted::{
        Reading, ScriptedAccess, ScriptedLightMeter, ScriptedMotionSensor, ScriptedNoiseMeter,
    },
    watcher::IdleReason,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Inbox {
    received: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for Inbox {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        self.received.lock().push(notification);
        Ok(())
    }
}

struct Rejecting;

#[async_trait]
impl Notifier for Rejecting {
    async fn schedule(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::NotPermitted)
    }
}

fn context(store: &Arc<EventStore>, notifier: Arc<dyn Notifier>) -> WatcherContext {
    WatcherContext::new(store.clone(), notifier, Arc::new(NoHaptics))
}

#[tokio::test(start_paused = true)]
async fn test_all_watchers_share_one_store() {
    let store = Arc::new(EventStore::new());
    let inbox = Arc::new(Inbox::default());
    let mut events = store.subscribe();

    let sensors = SensorSuite {
        motion: Some(Arc::new(ScriptedMotionSensor::from_magnitudes(&[1.0, 2.5, 2.6, 1.0]))),
        noise: Some(Arc::new(ScriptedNoiseMeter::from_levels(&[-3.0]))),
        light: Some(Arc::new(ScriptedLightMeter::from_levels(&[0.5, 0.92]))),
    };
    let ctx = context(&store, inbox.clone());
    let set = WatcherSet::start(&WatchersConfig::default(), sensors, ctx);

    tokio::time::sleep(Duration::from_secs(60)).await;
    set.shutdown().await;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.check_ins.len(), 3);
    assert_eq!(snapshot.alerts.len(), 3);
    assert!(snapshot.check_ins.iter().all(|c| c.source.is_sensor()));
    assert!(
        snapshot
            .check_ins
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp)
    );

    let summary = MoodSummary::from_snapshot(&snapshot);
    assert_eq!(summary.alert_count(AlertKind::Movement), 1);
    assert_eq!(summary.alert_count(AlertKind::Noise), 1);
    assert_eq!(summary.alert_count(AlertKind::Light), 1);
    assert_eq!(summary.mood_count(Mood::Overwhelmed), 2);
    assert_eq!(summary.mood_count(Mood::Angry), 1);

    // Movement and light send one notification each, noise sends two
    let received = inbox.received.lock().clone();
    assert_eq!(received.len(), 4);
    assert_eq!(
        received
            .iter()
            .filter(|n| matches!(n.trigger, NotificationTrigger::After(_)))
            .count(),
        1
    );

    let mut appended = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StoreEvent::CheckInAdded(_) | StoreEvent::AlertLogged(_)) {
            appended += 1;
        }
    }
    assert_eq!(appended, 6);
}

#[tokio::test(start_paused = true)]
async fn test_denied_sensors_record_nothing() {
    let store = Arc::new(EventStore::new());
    let sensors = SensorSuite {
        motion: Some(Arc::new(ScriptedMotionSensor::with_access(
            vec![haven_core::sensor::MotionSample::vertical(9.0)],
            ScriptedAccess::denied(),
        ))),
        noise: Some(Arc::new(ScriptedNoiseMeter::with_access(
            vec![Reading::Level(0.0)],
            ScriptedAccess::unavailable(),
        ))),
        light: Some(Arc::new(ScriptedLightMeter::with_access(
            vec![Reading::Level(1.0)],
            ScriptedAccess::denied(),
        ))),
    };
    let set = WatcherSet::start(
        &WatchersConfig::default(),
        sensors,
        context(&store, Arc::new(Inbox::default())),
    );

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(
        set.state(WatcherKind::Movement),
        Some(WatcherState::Idle(IdleReason::PermissionDenied))
    );
    assert_eq!(
        set.state(WatcherKind::Noise),
        Some(WatcherState::Idle(IdleReason::Unavailable))
    );
    assert_eq!(
        set.state(WatcherKind::Light),
        Some(WatcherState::Idle(IdleReason::PermissionDenied))
    );
    set.shutdown().await;

    assert_eq!(store.check_in_count(), 0);
    assert_eq!(store.alert_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_notifications_keep_the_record() {
    let store = Arc::new(EventStore::new());
    let sensors = SensorSuite {
        light: Some(Arc::new(ScriptedLightMeter::from_levels(&[0.99]))),
        ..Default::default()
    };
    let ctx = context(&store, Arc::new(Rejecting));
    let set = WatcherSet::start(&WatchersConfig::default(), sensors, ctx);

    tokio::time::sleep(Duration::from_secs(1)).await;
    set.shutdown().await;

    let check_in = store.latest_check_in().unwrap();
    assert_eq!(check_in.source, CheckInSource::Sensor(WatcherKind::Light));
    assert_eq!(store.alerts()[0].kind, AlertKind::Light);
}

#[tokio::test(start_paused = true)]
async fn test_manual_and_sensor_entries_interleave() {
    let store = Arc::new(EventStore::new());
    let sensors = SensorSuite {
        light: Some(Arc::new(ScriptedLightMeter::from_levels(&[0.3, 0.95]))),
        ..Default::default()
    };
    let set = WatcherSet::start(
        &WatchersConfig::default(),
        sensors,
        context(&store, Arc::new(Inbox::default())),
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    store.add_check_in(Mood::Okay, vec!["very bright screen".to_string()]);
    tokio::time::sleep(Duration::from_secs(40)).await;
    set.shutdown().await;

    let sources: Vec<CheckInSource> = store.check_ins().iter().map(|c| c.source).collect();
    assert_eq!(
        sources,
        vec![CheckInSource::Sensor(WatcherKind::Light), CheckInSource::Manual]
    );
}
