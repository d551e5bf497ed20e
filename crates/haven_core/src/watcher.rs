//! Passive overload watchers
//!
//! Each watcher owns one sensor, one [`OverloadGuard`] and one sampling loop.
//! When the guard fires the watcher records a sensor check-in and an alert
//! in the shared [`EventStore`], then asks the notifier for a supportive
//! nudge. Watchers never fail outward: permission problems park the watcher
//! in [`WatcherState::Idle`], read failures are logged and retried on the
//! next cycle, notification failures leave the recorded events in place.

mod light;
mod movement;
mod noise;
mod set;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    event::{AlertEvent, CheckIn, Mood},
    guard::OverloadGuard,
    notify::{Haptics, Notification, Notifier},
    sensor::{PermissionStatus, SensorAccess},
    store::EventStore,
};

pub use crate::event::WatcherKind;
pub use light::LightWatcher;
pub use movement::MovementWatcher;
pub use noise::NoiseWatcher;
pub use set::{SensorSuite, WatcherSet};

/// Why a watcher is not sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    NotStarted,
    Unavailable,
    PermissionDenied,
    SubscriptionFailed,
    SensorStopped,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle(IdleReason),
    Watching,
    /// A trigger fired; further triggers are suppressed until `until`
    CoolingDown { until: Instant },
}

/// Everything a watcher writes to
#[derive(Clone)]
pub struct WatcherContext {
    pub store: Arc<EventStore>,
    pub notifier: Arc<dyn Notifier>,
    pub haptics: Arc<dyn Haptics>,
}

impl WatcherContext {
    pub fn new(
        store: Arc<EventStore>,
        notifier: Arc<dyn Notifier>,
        haptics: Arc<dyn Haptics>,
    ) -> Self {
        Self {
            store,
            notifier,
            haptics,
        }
    }
}

/// What one firing wrote to the store
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub check_in: CheckIn,
    pub alert: AlertEvent,
}

#[async_trait]
pub trait Watcher: Send + 'static {
    fn kind(&self) -> WatcherKind;

    fn subscribe_state(&self) -> watch::Receiver<WatcherState>;

    /// Sample until cancelled or until the sensor becomes unusable
    async fn run(self: Box<Self>, cancel: CancellationToken);
}

/// The fixed reaction of one watcher to an overload
#[derive(Debug, Clone)]
pub(crate) struct OverloadResponse {
    pub kind: WatcherKind,
    pub haptic: bool,
    pub mood: Mood,
    pub symptoms: &'static [&'static str],
    pub alert_message: String,
    pub notification: Notification,
    pub follow_up: Option<Notification>,
}

/// Record the overload and nudge the user, in that order
pub(crate) async fn respond(ctx: &WatcherContext, response: OverloadResponse) -> Trigger {
    if response.haptic {
        ctx.haptics.pulse();
    }

    let symptoms = response.symptoms.iter().map(|s| s.to_string()).collect();
    let check_in = ctx
        .store
        .add_sensor_check_in(response.kind, response.mood, symptoms);
    let alert = ctx
        .store
        .log_alert_event(response.kind.alert_kind(), response.alert_message);

    tracing::info!(
        watcher = %response.kind,
        check_in_id = %check_in.id,
        alert_id = %alert.id,
        "Overload detected"
    );

    let notifications = std::iter::once(response.notification).chain(response.follow_up);
    for notification in notifications {
        let title = notification.title.clone();
        if let Err(e) = ctx.notifier.schedule(notification).await {
            tracing::error!(
                watcher = %response.kind,
                notification = %title,
                error = %e,
                "Notification scheduling failed, recorded events kept"
            );
        }
    }

    Trigger { check_in, alert }
}

/// Check availability and ask for permission. `false` leaves the watcher idle.
pub(crate) async fn acquire_sensor<S>(
    sensor: &S,
    kind: WatcherKind,
    state: &watch::Sender<WatcherState>,
    cancel: &CancellationToken,
) -> bool
where
    S: SensorAccess + ?Sized,
{
    if !sensor.is_available().await {
        tracing::warn!(
            watcher = %kind,
            sensor = %sensor.kind(),
            "Sensor not available, watcher disabled"
        );
        state.send_replace(WatcherState::Idle(IdleReason::Unavailable));
        return false;
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            state.send_replace(WatcherState::Idle(IdleReason::Cancelled));
            return false;
        }
        status = sensor.request_permission() => status,
    };

    if status != PermissionStatus::Granted {
        tracing::warn!(
            watcher = %kind,
            sensor = %sensor.kind(),
            ?status,
            "Sensor permission not granted, watcher disabled for this session"
        );
        state.send_replace(WatcherState::Idle(IdleReason::PermissionDenied));
        return false;
    }

    tracing::debug!(watcher = %kind, "Sensor access granted");
    true
}

/// Publish Watching or CoolingDown depending on the guard, if it changed
pub(crate) fn refresh_state(
    state: &watch::Sender<WatcherState>,
    guard: &OverloadGuard,
    now: Instant,
) {
    let next = match guard.remaining_cooldown(now) {
        Some(remaining) => WatcherState::CoolingDown {
            until: now + remaining,
        },
        None => WatcherState::Watching,
    };
    state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        tracing::debug!(from = ?current, to = ?next, "Watcher state changed");
        *current = next;
        true
    });
}

/// Wait for `duration` unless cancelled first; returns `false` on cancel
pub(crate) async fn pause(duration: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::event::{AlertKind, CheckInSource};
    use crate::notify::{MockNotifier, NotifyError};
    use crate::scripted::{ScriptedAccess, ScriptedLightMeter};
    use crate::test_helpers::CountingHaptics;
    use pretty_assertions::assert_eq;

    fn light_response() -> OverloadResponse {
        OverloadResponse {
            kind: WatcherKind::Light,
            haptic: false,
            mood: Mood::Overwhelmed,
            symptoms: &["very bright screen"],
            alert_message: "bright".to_string(),
            notification: Notification::immediate("Bright screen", "Lower it"),
            follow_up: Some(Notification::delayed(
                "Checking in",
                "Still ok?",
                Duration::from_secs(90),
            )),
        }
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_recorded_events() {
        let store = Arc::new(EventStore::new());
        let mut notifier = MockNotifier::new();
        notifier
            .expect_schedule()
            .times(2)
            .returning(|_| Err(NotifyError::DispatchFailed("no channel".to_string())));
        let ctx = WatcherContext::new(
            store.clone(),
            Arc::new(notifier),
            Arc::new(CountingHaptics::default()),
        );

        let trigger = respond(&ctx, light_response()).await;

        assert_eq!(store.check_ins(), vec![trigger.check_in.clone()]);
        assert_eq!(store.alerts(), vec![trigger.alert.clone()]);
        assert_eq!(trigger.check_in.source, CheckInSource::Sensor(WatcherKind::Light));
        assert_eq!(trigger.alert.kind, AlertKind::Light);
    }

    #[tokio::test]
    async fn test_follow_up_is_scheduled_after_immediate() {
        let store = Arc::new(EventStore::new());
        let mut seq = mockall::Sequence::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_schedule()
            .withf(|n| n.title == "Bright screen")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        notifier
            .expect_schedule()
            .withf(|n| n.title == "Checking in")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let haptics = Arc::new(CountingHaptics::default());
        let ctx = WatcherContext::new(store, Arc::new(notifier), haptics.clone());

        respond(&ctx, light_response()).await;

        assert_eq!(haptics.pulses(), 0);
    }

    #[tokio::test]
    async fn test_denied_permission_parks_watcher() {
        let meter = ScriptedLightMeter::with_access(vec![], ScriptedAccess::denied());
        let (state, rx) = watch::channel(WatcherState::Idle(IdleReason::NotStarted));

        let cancel = CancellationToken::new();
        let acquired = acquire_sensor(&meter, WatcherKind::Light, &state, &cancel).await;

        assert!(!acquired);
        assert_eq!(*rx.borrow(), WatcherState::Idle(IdleReason::PermissionDenied));
    }

    #[tokio::test]
    async fn test_unavailable_sensor_parks_watcher() {
        let meter = ScriptedLightMeter::with_access(vec![], ScriptedAccess::unavailable());
        let (state, rx) = watch::channel(WatcherState::Idle(IdleReason::NotStarted));

        let cancel = CancellationToken::new();
        assert!(!acquire_sensor(&meter, WatcherKind::Light, &state, &cancel).await);
        assert_eq!(*rx.borrow(), WatcherState::Idle(IdleReason::Unavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_returns_early_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pause(Duration::from_secs(30), &cancel).await);
        assert!(pause(Duration::from_secs(30), &CancellationToken::new()).await);
    }
}
