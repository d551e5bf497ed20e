//! Scripted sensors
//!
//! Replay a fixed sequence of readings through the sensor traits. Used by the
//! CLI's `simulate` command and by tests; all waiting goes through tokio's
//! clock, so paused-time tests stay deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::sensor::{
    LightMeter, MotionSample, MotionSensor, MotionStream, NoiseMeter, PermissionStatus,
    SensorAccess, SensorError, SensorKind,
};

/// Quiet room level returned once a noise script runs out
pub const QUIET_ROOM_DB: f64 = -60.0;

/// Indoor brightness returned once a light script runs out
pub const INDOOR_BRIGHTNESS: f64 = 0.5;

/// One pull-style reading: a level, or a failed sampling window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Level(f64),
    Failure { error: String },
}

impl From<f64> for Reading {
    fn from(level: f64) -> Self {
        Reading::Level(level)
    }
}

/// Availability and permission answers for a scripted sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedAccess {
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default = "default_permission")]
    pub permission: PermissionStatus,
}

fn default_available() -> bool {
    true
}

fn default_permission() -> PermissionStatus {
    PermissionStatus::Granted
}

impl Default for ScriptedAccess {
    fn default() -> Self {
        Self {
            available: default_available(),
            permission: default_permission(),
        }
    }
}

impl ScriptedAccess {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::default()
        }
    }
}

/// Accelerometer that plays back a fixed list of samples, one per interval
#[derive(Debug)]
pub struct ScriptedMotionSensor {
    access: ScriptedAccess,
    samples: Mutex<Option<Vec<MotionSample>>>,
}

impl ScriptedMotionSensor {
    pub fn new(samples: Vec<MotionSample>) -> Self {
        Self::with_access(samples, ScriptedAccess::default())
    }

    /// Samples with the given magnitudes along one axis
    pub fn from_magnitudes(magnitudes: &[f64]) -> Self {
        Self::new(magnitudes.iter().copied().map(MotionSample::vertical).collect())
    }

    pub fn with_access(samples: Vec<MotionSample>, access: ScriptedAccess) -> Self {
        Self {
            access,
            samples: Mutex::new(Some(samples)),
        }
    }
}

#[async_trait]
impl SensorAccess for ScriptedMotionSensor {
    fn kind(&self) -> SensorKind {
        SensorKind::Accelerometer
    }

    async fn is_available(&self) -> bool {
        self.access.available
    }

    async fn request_permission(&self) -> PermissionStatus {
        self.access.permission
    }
}

#[async_trait]
impl MotionSensor for ScriptedMotionSensor {
    async fn subscribe(&self, interval: Duration) -> Result<MotionStream, SensorError> {
        let samples = self
            .samples
            .lock()
            .take()
            .ok_or_else(|| SensorError::SubscriptionFailed {
                sensor: SensorKind::Accelerometer,
                reason: "script already consumed".to_string(),
            })?;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stream = futures::stream::unfold(
            (samples.into_iter(), ticker),
            |(mut samples, mut ticker)| async move {
                let sample = samples.next()?;
                ticker.tick().await;
                Some((sample, (samples, ticker)))
            },
        );
        Ok(Box::pin(stream))
    }
}

/// Pops scripted readings in order, then repeats a baseline forever
#[derive(Debug)]
struct ReadingQueue {
    sensor: SensorKind,
    readings: Mutex<VecDeque<Reading>>,
    baseline: f64,
    reads: AtomicUsize,
}

impl ReadingQueue {
    fn new(sensor: SensorKind, readings: Vec<Reading>, baseline: f64) -> Self {
        Self {
            sensor,
            readings: Mutex::new(readings.into()),
            baseline,
            reads: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Result<f64, SensorError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.readings.lock().pop_front() {
            Some(Reading::Level(level)) => Ok(level),
            Some(Reading::Failure { error }) => Err(SensorError::read_failed(self.sensor, error)),
            None => Ok(self.baseline),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

/// Microphone meter that waits out each recording window, then returns the
/// next scripted peak
#[derive(Debug)]
pub struct ScriptedNoiseMeter {
    access: ScriptedAccess,
    queue: ReadingQueue,
}

impl ScriptedNoiseMeter {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self::with_access(readings, ScriptedAccess::default())
    }

    pub fn from_levels(levels: &[f64]) -> Self {
        Self::new(levels.iter().copied().map(Reading::from).collect())
    }

    pub fn with_access(readings: Vec<Reading>, access: ScriptedAccess) -> Self {
        Self {
            access,
            queue: ReadingQueue::new(SensorKind::Microphone, readings, QUIET_ROOM_DB),
        }
    }

    /// Number of recording windows completed so far
    pub fn windows_recorded(&self) -> usize {
        self.queue.reads()
    }
}

#[async_trait]
impl SensorAccess for ScriptedNoiseMeter {
    fn kind(&self) -> SensorKind {
        SensorKind::Microphone
    }

    async fn is_available(&self) -> bool {
        self.access.available
    }

    async fn request_permission(&self) -> PermissionStatus {
        self.access.permission
    }
}

#[async_trait]
impl NoiseMeter for ScriptedNoiseMeter {
    async fn record_peak(&self, window: Duration) -> Result<f64, SensorError> {
        tokio::time::sleep(window).await;
        self.queue.next()
    }
}

/// Brightness reader returning the next scripted level on each read
#[derive(Debug)]
pub struct ScriptedLightMeter {
    access: ScriptedAccess,
    queue: ReadingQueue,
}

impl ScriptedLightMeter {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self::with_access(readings, ScriptedAccess::default())
    }

    pub fn from_levels(levels: &[f64]) -> Self {
        Self::new(levels.iter().copied().map(Reading::from).collect())
    }

    pub fn with_access(readings: Vec<Reading>, access: ScriptedAccess) -> Self {
        Self {
            access,
            queue: ReadingQueue::new(SensorKind::LightMeter, readings, INDOOR_BRIGHTNESS),
        }
    }

    pub fn reads(&self) -> usize {
        self.queue.reads()
    }
}

#[async_trait]
impl SensorAccess for ScriptedLightMeter {
    fn kind(&self) -> SensorKind {
        SensorKind::LightMeter
    }

    async fn is_available(&self) -> bool {
        self.access.available
    }

    async fn request_permission(&self) -> PermissionStatus {
        self.access.permission
    }
}

#[async_trait]
impl LightMeter for ScriptedLightMeter {
    async fn read_brightness(&self) -> Result<f64, SensorError> {
        self.queue.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_readings_parse_from_toml() {
        #[derive(Deserialize)]
        struct Script {
            peaks: Vec<Reading>,
        }

        let script: Script =
            toml::from_str(r#"peaks = [-40.0, { error = "recorder busy" }, -3.5]"#).unwrap();
        assert_eq!(
            script.peaks,
            vec![
                Reading::Level(-40.0),
                Reading::Failure {
                    error: "recorder busy".to_string()
                },
                Reading::Level(-3.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_light_meter_falls_back_to_baseline() {
        let meter = ScriptedLightMeter::new(vec![
            Reading::Level(0.9),
            Reading::Failure {
                error: "busy".to_string(),
            },
        ]);

        assert_eq!(meter.read_brightness().await.unwrap(), 0.9);
        assert!(meter.read_brightness().await.is_err());
        assert_eq!(meter.read_brightness().await.unwrap(), INDOOR_BRIGHTNESS);
        assert_eq!(meter.reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noise_meter_waits_out_the_window() {
        let meter = ScriptedNoiseMeter::from_levels(&[-4.0]);
        let start = tokio::time::Instant::now();

        let peak = meter.record_peak(Duration::from_millis(2_500)).await.unwrap();

        assert_eq!(peak, -4.0);
        assert_eq!(start.elapsed(), Duration::from_millis(2_500));
        assert_eq!(meter.windows_recorded(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_script_plays_once() {
        let sensor = ScriptedMotionSensor::from_magnitudes(&[1.0, 2.5]);
        let stream = sensor.subscribe(Duration::from_millis(100)).await.unwrap();
        let magnitudes: Vec<f64> = stream.map(|s| s.magnitude()).collect().await;

        assert_eq!(magnitudes, vec![1.0, 2.5]);
        assert!(sensor.subscribe(Duration::from_millis(100)).await.is_err());
    }
}
