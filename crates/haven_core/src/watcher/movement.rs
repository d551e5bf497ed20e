use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    IdleReason, OverloadResponse, Trigger, Watcher, WatcherContext, WatcherKind, WatcherState,
    acquire_sensor, refresh_state, respond,
};
use crate::{
    config::MovementSettings,
    event::Mood,
    guard::{GuardDecision, OverloadGuard},
    notify::Notification,
    sensor::MotionSensor,
};

const SYMPTOMS: &[&str] = &["sudden intense movement", "possible overload"];

/// Watches the accelerometer for hard shakes
pub struct MovementWatcher {
    sensor: Arc<dyn MotionSensor>,
    settings: MovementSettings,
    ctx: WatcherContext,
    guard: OverloadGuard,
    state: watch::Sender<WatcherState>,
}

impl MovementWatcher {
    pub fn new(
        sensor: Arc<dyn MotionSensor>,
        settings: MovementSettings,
        ctx: WatcherContext,
    ) -> Self {
        let guard = OverloadGuard::new(settings.threshold, settings.cooldown());
        let (state, _) = watch::channel(WatcherState::Idle(IdleReason::NotStarted));
        Self {
            sensor,
            settings,
            ctx,
            guard,
            state,
        }
    }

    /// Feed one sample magnitude through the guard
    pub async fn observe(&mut self, magnitude: f64, now: Instant) -> Option<Trigger> {
        let decision = self.guard.check(magnitude, now);
        let trigger = match decision {
            GuardDecision::Fire => Some(respond(&self.ctx, self.response(magnitude)).await),
            GuardDecision::CoolingDown { remaining } => {
                tracing::debug!(magnitude, ?remaining, "Shake suppressed by cooldown");
                None
            }
            GuardDecision::BelowThreshold => None,
        };
        refresh_state(&self.state, &self.guard, now);
        trigger
    }

    fn response(&self, magnitude: f64) -> OverloadResponse {
        OverloadResponse {
            kind: WatcherKind::Movement,
            haptic: true,
            mood: Mood::Angry,
            symptoms: SYMPTOMS,
            alert_message: format!("Intense movement detected ({:.2} g)", magnitude),
            notification: Notification::immediate(
                "Take a moment",
                "That was a big movement. If things feel like too much, try a slow breath with me.",
            )
            .with_data("watcher", WatcherKind::Movement.as_str()),
            follow_up: None,
        }
    }
}

#[async_trait]
impl Watcher for MovementWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Movement
    }

    fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    async fn run(mut self: Box<Self>, cancel: CancellationToken) {
        if !acquire_sensor(self.sensor.as_ref(), WatcherKind::Movement, &self.state, &cancel)
            .await
        {
            return;
        }

        let mut samples = match self.sensor.subscribe(self.settings.sample_interval()).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(
                    watcher = %WatcherKind::Movement,
                    error = %e,
                    "Accelerometer subscription failed"
                );
                self.state.send_replace(WatcherState::Idle(IdleReason::SubscriptionFailed));
                return;
            }
        };

        self.state.send_replace(WatcherState::Watching);
        tracing::info!(
            threshold = self.guard.threshold(),
            cooldown_secs = self.guard.cooldown().as_secs(),
            interval_ms = self.settings.sample_interval_ms,
            "Movement watcher started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.state.send_replace(WatcherState::Idle(IdleReason::Cancelled));
                    break;
                }
                sample = samples.next() => match sample {
                    Some(sample) => {
                        self.observe(sample.magnitude(), Instant::now()).await;
                    }
                    None => {
                        tracing::info!("Accelerometer stream ended");
                        self.state.send_replace(WatcherState::Idle(IdleReason::SensorStopped));
                        break;
                    }
                },
            }
        }
    }
}
