//! Device sensor seams
//!
//! Platform adapters implement these traits; the watchers only ever see the
//! traits. Movement is push-style (a stream of accelerometer samples), noise
//! and light are pull-style point reads.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::event::WatcherKind;

/// Physical sensors the watchers sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Microphone,
    LightMeter,
}

impl SensorKind {
    /// The sensor a watcher samples
    pub fn for_watcher(kind: WatcherKind) -> Self {
        match kind {
            WatcherKind::Movement => SensorKind::Accelerometer,
            WatcherKind::Noise => SensorKind::Microphone,
            WatcherKind::Light => SensorKind::LightMeter,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Microphone => "microphone",
            SensorKind::LightMeter => "light meter",
        };
        f.write_str(s)
    }
}

/// Outcome of a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
pub enum SensorError {
    #[error("{sensor} is not available on this device")]
    #[diagnostic(code(haven_core::sensor::unavailable))]
    Unavailable { sensor: SensorKind },

    #[error("permission to use the {sensor} was denied")]
    #[diagnostic(code(haven_core::sensor::permission_denied))]
    PermissionDenied { sensor: SensorKind },

    #[error("{sensor} read failed: {reason}")]
    #[diagnostic(code(haven_core::sensor::read_failed))]
    ReadFailed { sensor: SensorKind, reason: String },

    #[error("{sensor} subscription failed: {reason}")]
    #[diagnostic(code(haven_core::sensor::subscription_failed))]
    SubscriptionFailed { sensor: SensorKind, reason: String },
}

impl SensorError {
    pub fn sensor(&self) -> SensorKind {
        match self {
            SensorError::Unavailable { sensor }
            | SensorError::PermissionDenied { sensor }
            | SensorError::ReadFailed { sensor, .. }
            | SensorError::SubscriptionFailed { sensor, .. } => *sensor,
        }
    }

    pub fn read_failed(sensor: SensorKind, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            sensor,
            reason: reason.into(),
        }
    }
}

/// Availability and permission handling shared by every sensor
#[async_trait]
pub trait SensorAccess: Send + Sync {
    fn kind(&self) -> SensorKind;

    async fn is_available(&self) -> bool {
        true
    }

    /// Prompt the user if needed. Sensors without a permission model grant.
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }
}

/// One accelerometer reading, in g along each device axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Sample whose vector norm is `magnitude`, along the z axis
    pub fn vertical(magnitude: f64) -> Self {
        Self::new(0.0, 0.0, magnitude)
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

pub type MotionStream = Pin<Box<dyn Stream<Item = MotionSample> + Send>>;

/// Push-style accelerometer
#[async_trait]
pub trait MotionSensor: SensorAccess {
    /// Start delivering samples every `interval`. The stream ends when the
    /// platform stops the subscription.
    async fn subscribe(&self, interval: Duration) -> Result<MotionStream, SensorError>;
}

/// Pull-style microphone level meter
#[async_trait]
pub trait NoiseMeter: SensorAccess {
    /// Record for `window` and return the peak metered level in dBFS
    /// (0.0 is full scale, quieter is more negative).
    async fn record_peak(&self, window: Duration) -> Result<f64, SensorError>;
}

/// Pull-style brightness reader
#[async_trait]
pub trait LightMeter: SensorAccess {
    /// Current brightness as a fraction of the maximum, `0.0..=1.0`
    async fn read_brightness(&self) -> Result<f64, SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_is_vector_norm() {
        let sample = MotionSample::new(3.0, 4.0, 0.0);
        assert!((sample.magnitude() - 5.0).abs() < f64::EPSILON);
        assert!((MotionSample::vertical(2.5).magnitude() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_reports_sensor() {
        let err = SensorError::read_failed(SensorKind::Microphone, "recorder busy");
        assert_eq!(err.sensor(), SensorKind::Microphone);
        assert_eq!(err.to_string(), "microphone read failed: recorder busy");
    }
}
