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
    config::NoiseSettings,
    event::Mood,
    guard::{GuardDecision, OverloadGuard},
    notify::Notification,
    sensor::NoiseMeter,
};

const SYMPTOMS: &[&str] = &["very loud environment"];

/// Samples the microphone in short windows and flags very loud surroundings.
///
/// Each cycle records for `window`, compares the peak level against the
/// threshold, then rests for `idle_gap` before the next window.
pub struct NoiseWatcher {
    meter: Arc<dyn NoiseMeter>,
    settings: NoiseSettings,
    ctx: WatcherContext,
    guard: OverloadGuard,
    state: watch::Sender<WatcherState>,
}

impl NoiseWatcher {
    pub fn new(meter: Arc<dyn NoiseMeter>, settings: NoiseSettings, ctx: WatcherContext) -> Self {
        let guard = OverloadGuard::new(settings.threshold_db, settings.cooldown());
        let (state, _) = watch::channel(WatcherState::Idle(IdleReason::NotStarted));
        Self {
            meter,
            settings,
            ctx,
            guard,
            state,
        }
    }

    /// Feed one window's peak level (dBFS) through the guard
    pub async fn observe_peak(&mut self, peak_db: f64, now: Instant) -> Option<Trigger> {
        let trigger = match self.guard.check(peak_db, now) {
            GuardDecision::Fire => Some(respond(&self.ctx, self.response(peak_db)).await),
            decision => {
                tracing::debug!(peak_db, ?decision, "Noise window below alert");
                None
            }
        };
        refresh_state(&self.state, &self.guard, now);
        trigger
    }

    fn response(&self, peak_db: f64) -> OverloadResponse {
        OverloadResponse {
            kind: WatcherKind::Noise,
            haptic: false,
            mood: Mood::Overwhelmed,
            symptoms: SYMPTOMS,
            alert_message: format!("Very loud environment detected (peak {:.1} dBFS)", peak_db),
            notification: Notification::immediate(
                "It's quite loud around you",
                "Consider stepping somewhere quieter or putting on headphones.",
            )
            .with_data("watcher", WatcherKind::Noise.as_str()),
            follow_up: Some(
                Notification::delayed(
                    "Checking in",
                    "How are you feeling now? Tap to update your check-in.",
                    self.settings.follow_up(),
                )
                .with_data("watcher", WatcherKind::Noise.as_str()),
            ),
        }
    }
}

#[async_trait]
impl Watcher for NoiseWatcher {
    fn kind(&self) -> WatcherKind {
        WatcherKind::Noise
    }

    fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    async fn run(mut self: Box<Self>, cancel: CancellationToken) {
        if !acquire_sensor(self.meter.as_ref(), WatcherKind::Noise, &self.state, &cancel).await {
            return;
        }

        self.state.send_replace(WatcherState::Watching);
        tracing::info!(
            threshold_db = self.guard.threshold(),
            cooldown_secs = self.guard.cooldown().as_secs(),
            window_ms = self.settings.window_ms,
            idle_gap_secs = self.settings.idle_gap_secs,
            "Noise watcher started"
        );

        loop {
            let reading = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                reading = self.meter.record_peak(self.settings.window()) => reading,
            };

            match reading {
                Ok(peak_db) => {
                    self.observe_peak(peak_db, Instant::now()).await;
                }
                Err(e) => {
                    tracing::warn!(
                        watcher = %WatcherKind::Noise,
                        error = %e,
                        "Skipping noise window"
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
