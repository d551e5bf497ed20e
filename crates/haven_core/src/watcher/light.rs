use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    IdleReason, OverloadResponse, Trigger, Watcher, WatcherContext, WatcherKind, WatcherState,
    acquire_sensor, pause, refresh_state, respond,
};
use crate::{
    config::LightSettings,
    event::Mood,
    guard::{GuardDecision, OverloadGuard},
    notify::Notification,
    sensor::LightMeter,
};

const SYMPTOMS: &[&str] = &["very bright screen"];

/// Polls screen brightness
pub struct LightWatcher {
    meter: Arc<dyn LightMeter>,
    settings: LightSettings,
    ctx: WatcherContext,
    guard: OverloadGuard,
    state: watch::Sender<WatcherState>,
}

impl LightWatcher {
    pub fn new(meter: Arc<dyn LightMeter>, settings: LightSettings, ctx: WatcherContext) -> Self {
        let guard = OverloadGuard::new(settings.threshold, settings.cooldown());
        let (state, _) = watch::channel(WatcherState::Idle(IdleReason::NotStarted));
        Self {
            meter,
            settings,
            ctx,
            guard,
            state,
        }
    }

    pub async fn observe_brightness(&mut self, level: f64, now: Instant) -> Option<Trigger> {
        let trigger = match self.guard.check(level, now) {
            GuardDecision::Fire => Some(respond(&self.ctx, self.response(level)).await),
            decision => {
                tracing::debug!(level, ?decision, "Brightness below alert");
                None
            }
        };
        refresh_state(&self.state, &self.guard, now);
        trigger
    }

    fn response(&self, level: f64) -> OverloadResponse {
        OverloadResponse {
            kind: WatcherKind::Light,
            haptic: false,
            mood: Mood::Overwhelmed,
            symptoms: SYMPTOMS,
            alert_message: format!(
                "Very bright screen detected ({:.0}% brightness)",
                level * 100.0
            ),
            notification: Notification::immediate(
                "Bright screen",
                "The screen is very bright. Lowering brightness can help your eyes rest.",
            )
            .with_data("watcher", WatcherKind::Light.as_str()),
            follow_up: None,
        }
    }
}

#[async_trait]
impl Watcher for LightWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Light
    }

    fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    async fn run(mut self: Box<Self>, cancel: CancellationToken) {
        if !acquire_sensor(self.meter.as_ref(), WatcherKind::Light, &self.state, &cancel).await {
            return;
        }

        self.state.send_replace(WatcherState::Watching);
        tracing::info!(
            threshold = self.guard.threshold(),
            cooldown_secs = self.guard.cooldown().as_secs(),
            idle_gap_secs = self.settings.idle_gap_secs,
            "Light watcher started"
        );

        loop {
            let reading = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                reading = self.meter.read_brightness() => reading,
            };

            match reading {
                Ok(level) => {
                    self.observe_brightness(level, Instant::now()).await;
                }
                Err(e) => {
                    tracing::warn!(
                        watcher = %WatcherKind::Light,
                        error = %e,
                        "Skipping brightness read"
                    );
                }
            }

            if !pause(self.settings.idle_gap(), &cancel).await {
                break;
            }
        }

        self.state.send_replace(WatcherState::Idle(IdleReason::Cancelled));
    }
}
