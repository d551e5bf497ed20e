use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    LightWatcher, MovementWatcher, NoiseWatcher, Watcher, WatcherContext, WatcherKind,
    WatcherState,
};
use crate::{
    config::WatchersConfig,
    sensor::{LightMeter, MotionSensor, NoiseMeter},
};

/// The sensors a session can use. `None` means the device has no such sensor.
#[derive(Clone, Default)]
pub struct SensorSuite {
    pub motion: Option<Arc<dyn MotionSensor>>,
    pub noise: Option<Arc<dyn NoiseMeter>>,
    pub light: Option<Arc<dyn LightMeter>>,
}

/// Owns the running watcher tasks of one session.
///
/// Every watcher runs on a child of the set's cancellation token, so
/// [`WatcherSet::shutdown`] (or dropping the set) stops all of them.
pub struct WatcherSet {
    cancel: CancellationToken,
    tasks: Vec<(WatcherKind, JoinHandle<()>)>,
    states: HashMap<WatcherKind, watch::Receiver<WatcherState>>,
}

impl Default for WatcherSet {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherSet {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            states: HashMap::new(),
        }
    }

    /// Start every enabled watcher that has a sensor
    pub fn start(config: &WatchersConfig, sensors: SensorSuite, ctx: WatcherContext) -> Self {
        let mut set = Self::new();

        match (config.movement.enabled, sensors.motion) {
            (true, Some(sensor)) => set.spawn(Box::new(MovementWatcher::new(
                sensor,
                config.movement.clone(),
                ctx.clone(),
            ))),
            (true, None) => tracing::info!("No accelerometer, movement watcher not started"),
            (false, _) => tracing::debug!("Movement watcher disabled"),
        }

        match (config.noise.enabled, sensors.noise) {
            (true, Some(meter)) => set.spawn(Box::new(NoiseWatcher::new(
                meter,
                config.noise.clone(),
                ctx.clone(),
            ))),
            (true, None) => tracing::info!("No microphone, noise watcher not started"),
            (false, _) => tracing::debug!("Noise watcher disabled"),
        }

        match (config.light.enabled, sensors.light) {
            (true, Some(meter)) => set.spawn(Box::new(LightWatcher::new(
                meter,
                config.light.clone(),
                ctx,
            ))),
            (true, None) => tracing::info!("No light meter, light watcher not started"),
            (false, _) => tracing::debug!("Light watcher disabled"),
        }

        set
    }

    pub fn spawn(&mut self, watcher: Box<dyn Watcher>) {
        let kind = watcher.kind();
        self.states.insert(kind, watcher.subscribe_state());
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(async move {
            watcher.run(cancel).await;
            tracing::debug!(watcher = %kind, "Watcher task finished");
        });
        self.tasks.push((kind, handle));
    }

    pub fn kinds(&self) -> Vec<WatcherKind> {
        self.tasks.iter().map(|(kind, _)| *kind).collect()
    }

    /// Latest published state, `None` if that watcher was never spawned
    pub fn state(&self, kind: WatcherKind) -> Option<WatcherState> {
        self.states.get(&kind).map(|rx| *rx.borrow())
    }

    pub fn subscribe_state(&self, kind: WatcherKind) -> Option<watch::Receiver<WatcherState>> {
        self.states.get(&kind).cloned()
    }

    /// Cancel every watcher and wait for their tasks to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for (kind, handle) in std::mem::take(&mut self.tasks) {
            if let Err(e) = handle.await {
                tracing::error!(watcher = %kind, "Watcher task panicked: {}", e);
            }
        }
        tracing::info!("All watchers stopped");
    }
}

impl Drop for WatcherSet {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HavenConfig;
    use crate::scripted::{ScriptedLightMeter, ScriptedMotionSensor, ScriptedNoiseMeter};
    use crate::test_helpers::TestHarness;
    use crate::watcher::IdleReason;
    use pretty_assertions::assert_eq;

    #[tokio::test(start_paused = true)]
    async fn test_start_skips_disabled_and_missing() {
        let harness = TestHarness::new();
        let mut config = HavenConfig::default().watchers;
        config.noise.enabled = false;

        let sensors = SensorSuite {
            motion: Some(Arc::new(ScriptedMotionSensor::from_magnitudes(&[]))),
            noise: Some(Arc::new(ScriptedNoiseMeter::from_levels(&[]))),
            light: None,
        };
        let set = WatcherSet::start(&config, sensors, harness.context());

        assert_eq!(set.kinds(), vec![WatcherKind::Movement]);
        assert_eq!(set.state(WatcherKind::Light), None);
        set.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pull_watchers() {
        let harness = TestHarness::new();
        let sensors = SensorSuite {
            motion: None,
            noise: Some(Arc::new(ScriptedNoiseMeter::from_levels(&[]))),
            light: Some(Arc::new(ScriptedLightMeter::from_levels(&[]))),
        };
        let set = WatcherSet::start(&WatchersConfig::default(), sensors, harness.context());
        let mut noise = set.subscribe_state(WatcherKind::Noise).unwrap();
        let light = set.subscribe_state(WatcherKind::Light).unwrap();

        noise
            .wait_for(|state| *state == WatcherState::Watching)
            .await
            .unwrap();
        set.shutdown().await;

        assert_eq!(*noise.borrow(), WatcherState::Idle(IdleReason::Cancelled));
        assert_eq!(*light.borrow(), WatcherState::Idle(IdleReason::Cancelled));
    }
}
