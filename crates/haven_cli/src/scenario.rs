//! Scripted sensor scenarios for `haven simulate`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use haven_core::{
    HavenConfig, SensorSuite,
    config::{PartialConfig, merge_configs},
    scripted::{
        Reading, ScriptedAccess, ScriptedLightMeter, ScriptedMotionSensor, ScriptedNoiseMeter,
    },
    sensor::{LightMeter, MotionSample, MotionSensor, NoiseMeter},
};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};

fn default_duration() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Settings applied on top of the loaded configuration
    #[serde(default)]
    pub overrides: PartialConfig,

    pub motion: Option<MotionScript>,
    pub noise: Option<NoiseScript>,
    pub light: Option<LightScript>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionScript {
    /// Sample magnitudes in g, one per sampling interval
    #[serde(default)]
    pub magnitudes: Vec<f64>,
    #[serde(flatten)]
    pub access: ScriptedAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseScript {
    /// Peak level in dBFS per recording window
    #[serde(default)]
    pub peaks: Vec<Reading>,
    #[serde(flatten)]
    pub access: ScriptedAccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightScript {
    /// Brightness per poll, `0.0..=1.0`
    #[serde(default)]
    pub levels: Vec<Reading>,
    #[serde(flatten)]
    pub access: ScriptedAccess,
}

impl Scenario {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .into_diagnostic()
            .wrap_err("Invalid scenario file")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// The configuration with this scenario's overrides applied
    pub fn apply(&self, config: &HavenConfig) -> HavenConfig {
        merge_configs(config.clone(), self.overrides.clone())
    }

    /// Scripted sensors for every section present. Missing sections mean the
    /// simulated device lacks that sensor.
    pub fn sensors(&self) -> SensorSuite {
        SensorSuite {
            motion: self.motion.as_ref().map(|script| {
                let samples = script
                    .magnitudes
                    .iter()
                    .copied()
                    .map(MotionSample::vertical)
                    .collect();
                Arc::new(ScriptedMotionSensor::with_access(samples, script.access))
                    as Arc<dyn MotionSensor>
            }),
            noise: self.noise.as_ref().map(|script| {
                Arc::new(ScriptedNoiseMeter::with_access(script.peaks.clone(), script.access))
                    as Arc<dyn NoiseMeter>
            }),
            light: self.light.as_ref().map(|script| {
                Arc::new(ScriptedLightMeter::with_access(script.levels.clone(), script.access))
                    as Arc<dyn LightMeter>
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::sensor::PermissionStatus;
    use pretty_assertions::assert_eq;

    const SCENARIO: &str = r#"
duration_secs = 20

[overrides.noise]
idle_gap_secs = 5

[motion]
magnitudes = [1.0, 2.6]

[noise]
peaks = [-30.0, { error = "recorder busy" }, -4.0]
permission = "denied"

[light]
levels = [0.9]
available = false
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SCENARIO).unwrap();

        assert_eq!(scenario.duration(), Duration::from_secs(20));
        assert_eq!(scenario.motion.as_ref().unwrap().magnitudes, vec![1.0, 2.6]);
        assert_eq!(scenario.motion.as_ref().unwrap().access, ScriptedAccess::default());

        let noise = scenario.noise.as_ref().unwrap();
        assert_eq!(noise.peaks.len(), 3);
        assert_eq!(noise.access.permission, PermissionStatus::Denied);
        assert!(!scenario.light.as_ref().unwrap().access.available);
    }

    #[test]
    fn test_overrides_replace_whole_watcher_section() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let config = scenario.apply(&HavenConfig::default());

        assert_eq!(config.watchers.noise.idle_gap_secs, 5);
        // Unset fields in an override table fall back to defaults
        assert_eq!(config.watchers.noise.threshold_db, -10.0);
        assert_eq!(config.watchers.movement, HavenConfig::default().watchers.movement);
    }

    #[test]
    fn test_missing_sections_mean_missing_sensors() {
        let scenario = Scenario::parse("[light]\nlevels = [0.2]\n").unwrap();
        let sensors = scenario.sensors();

        assert_eq!(scenario.duration_secs, 60);
        assert!(sensors.motion.is_none());
        assert!(sensors.noise.is_none());
        assert!(sensors.light.is_some());
    }

    #[tokio::test]
    async fn test_load_bundled_scenario() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/overload.toml");
        let scenario = Scenario::load(&path).await.unwrap();

        assert!(scenario.motion.is_some());
        assert!(scenario.noise.is_some());
        assert!(scenario.light.is_some());
    }
}
