//! Configuration system for Haven
//!
//! Watcher thresholds, cooldowns and sampling intervals, plus an optional
//! default profile for headless sessions. Every field has a default, so an
//! empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result, error::ConfigError, profile::UserProfile};

/// Top-level configuration for Haven
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HavenConfig {
    /// Profile loaded into new sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,

    #[serde(default)]
    pub watchers: WatchersConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchersConfig {
    #[serde(default)]
    pub movement: MovementSettings,

    #[serde(default)]
    pub noise: NoiseSettings,

    #[serde(default)]
    pub light: LightSettings,
}

/// Shake detection on the accelerometer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    pub enabled: bool,

    /// Magnitude in g above which a sample counts as a hard shake
    pub threshold: f64,

    pub cooldown_secs: u64,

    pub sample_interval_ms: u64,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 2.2,
            cooldown_secs: 6,
            sample_interval_ms: 100,
        }
    }
}

impl MovementSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Loudness detection on the microphone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub enabled: bool,

    /// Peak level in dBFS above which the environment is very loud
    pub threshold_db: f64,

    pub cooldown_secs: u64,

    /// Length of each metered recording
    pub window_ms: u64,

    /// Pause between recordings
    pub idle_gap_secs: u64,

    /// Delay of the follow-up asking the user to re-confirm
    pub follow_up_secs: u64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_db: -10.0,
            cooldown_secs: 300,
            window_ms: 2_500,
            idle_gap_secs: 30,
            follow_up_secs: 90,
        }
    }
}

impl NoiseSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn idle_gap(&self) -> Duration {
        Duration::from_secs(self.idle_gap_secs)
    }

    pub fn follow_up(&self) -> Duration {
        Duration::from_secs(self.follow_up_secs)
    }
}

/// Brightness detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub enabled: bool,

    /// Fraction of maximum brightness above which the screen is very bright
    pub threshold: f64,

    pub cooldown_secs: u64,

    pub idle_gap_secs: u64,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.85,
            cooldown_secs: 300,
            idle_gap_secs: 30,
        }
    }
}

impl LightSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn idle_gap(&self) -> Duration {
        Duration::from_secs(self.idle_gap_secs)
    }
}

impl HavenConfig {
    /// Reject values no sensor can produce
    pub fn validate(&self, config_path: &str) -> Result<()> {
        let movement = &self.watchers.movement;
        if movement.threshold.is_nan() || movement.threshold <= 0.0 {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.movement.threshold",
                "positive magnitude in g",
                movement.threshold.to_string(),
            ));
        }
        if movement.sample_interval_ms == 0 {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.movement.sample_interval_ms",
                "non-zero interval",
                "0",
            ));
        }

        let noise = &self.watchers.noise;
        if noise.threshold_db.is_nan() || noise.threshold_db > 0.0 {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.noise.threshold_db",
                "dBFS value at or below 0.0",
                noise.threshold_db.to_string(),
            ));
        }
        if noise.window_ms == 0 {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.noise.window_ms",
                "non-zero recording window",
                "0",
            ));
        }

        let light = &self.watchers.light;
        if !(0.0..1.0).contains(&light.threshold) {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.light.threshold",
                "fraction in 0.0..1.0",
                light.threshold.to_string(),
            ));
        }
        if light.idle_gap_secs == 0 {
            return Err(CoreError::invalid_config(
                config_path,
                "watchers.light.idle_gap_secs",
                "non-zero gap between brightness reads",
                "0",
            ));
        }

        Ok(())
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<HavenConfig> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::ConfigurationError {
                config_path: path.display().to_string(),
                field: "file".to_string(),
                expected: "readable TOML file".to_string(),
                cause: ConfigError::Io(e.to_string()),
            })?;

    let config: HavenConfig =
        toml::from_str(&content).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "content".to_string(),
            expected: "valid TOML configuration".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })?;

    config.validate(&path.display().to_string())?;
    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &HavenConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::ConfigurationError {
                config_path: parent.display().to_string(),
                field: "directory".to_string(),
                expected: "writable directory".to_string(),
                cause: ConfigError::Io(e.to_string()),
            })?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| CoreError::ConfigurationError {
        config_path: path.display().to_string(),
        field: "serialization".to_string(),
        expected: "serializable config structure".to_string(),
        cause: ConfigError::TomlSerialize(e.to_string()),
    })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    Ok(())
}

/// Partial configuration for overlaying
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement: Option<MovementSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise: Option<NoiseSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<LightSettings>,
}

/// Merge two configurations, with the overlay taking precedence
pub fn merge_configs(base: HavenConfig, overlay: PartialConfig) -> HavenConfig {
    HavenConfig {
        profile: overlay.profile.or(base.profile),
        watchers: WatchersConfig {
            movement: overlay.movement.unwrap_or(base.watchers.movement),
            noise: overlay.noise.unwrap_or(base.watchers.noise),
            light: overlay.light.unwrap_or(base.watchers.light),
        },
    }
}

/// Standard config file locations
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from("haven.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("haven").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".haven").join("config.toml"));
    }

    paths
}

/// Load configuration from standard locations
pub async fn load_config_from_standard_locations() -> Result<HavenConfig> {
    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Using config file {}", path.display());
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(HavenConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = HavenConfig::default();
        assert_eq!(config.profile, None);
        assert_eq!(config.watchers.movement.cooldown(), Duration::from_secs(6));
        assert_eq!(config.watchers.movement.sample_interval(), Duration::from_millis(100));
        assert_eq!(config.watchers.noise.cooldown(), Duration::from_secs(300));
        assert_eq!(config.watchers.noise.window(), Duration::from_millis(2_500));
        assert_eq!(config.watchers.noise.follow_up(), Duration::from_secs(90));
        assert_eq!(config.watchers.light.idle_gap(), Duration::from_secs(30));
        assert!(config.validate("default").is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: HavenConfig = toml::from_str("").unwrap();
        assert_eq!(config, HavenConfig::default());
    }

    #[test]
    fn test_partial_watcher_table_keeps_other_defaults() {
        let config: HavenConfig = toml::from_str(
            r#"
            [watchers.noise]
            threshold_db = -6.0
            idle_gap_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.watchers.noise.threshold_db, -6.0);
        assert_eq!(config.watchers.noise.idle_gap_secs, 10);
        assert_eq!(config.watchers.noise.cooldown_secs, 300);
        assert!(config.watchers.noise.enabled);
        assert_eq!(config.watchers.light, LightSettings::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = HavenConfig {
            profile: Some(UserProfile::new("Sam", "sam@example.com")),
            ..Default::default()
        };
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[profile]"));
        assert!(toml.contains("[watchers.movement]"));
        assert!(toml.contains("[watchers.noise]"));
        assert!(toml.contains("[watchers.light]"));
    }

    #[test]
    fn test_validate_rejects_impossible_thresholds() {
        let mut config = HavenConfig::default();
        config.watchers.light.threshold = 1.5;
        let err = config.validate("haven.toml").unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConfigurationError { ref field, .. } if field == "watchers.light.threshold"
        ));

        let mut config = HavenConfig::default();
        config.watchers.noise.threshold_db = 3.0;
        assert!(config.validate("haven.toml").is_err());
    }

    #[test]
    fn test_validate_rejects_nan_noise_threshold() {
        let mut config = HavenConfig::default();
        config.watchers.noise.threshold_db = f64::NAN;
        let err = config.validate("haven.toml").unwrap_err();
        let CoreError::ConfigurationError { field, .. } = &err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert_eq!(field.as_str(), "watchers.noise.threshold_db");
    }

    #[test]
    fn test_validate_rejects_zero_light_idle_gap() {
        let mut config = HavenConfig::default();
        config.watchers.light.idle_gap_secs = 0;
        let err = config.validate("haven.toml").unwrap_err();
        let CoreError::ConfigurationError { field, .. } = &err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert_eq!(field.as_str(), "watchers.light.idle_gap_secs");

        let overlay: PartialConfig = toml::from_str("[light]\nidle_gap_secs = 0\n").unwrap();
        let merged = merge_configs(HavenConfig::default(), overlay);
        assert!(merged.validate("scenario.toml").is_err());
    }

    #[test]
    fn test_merge_configs() {
        let base = HavenConfig::default();
        let overlay = PartialConfig {
            profile: Some(UserProfile::guest()),
            light: Some(LightSettings {
                enabled: false,
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.profile.map(|p| p.role), Some(Role::Guest));
        assert!(!merged.watchers.light.enabled);
        assert!(merged.watchers.noise.enabled);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("haven.toml");

        let mut config = HavenConfig::default();
        config.watchers.movement.threshold = 2.8;
        config.profile = Some(UserProfile::new("Ari", "ari@example.com").with_role(Role::Minor));

        tokio_test::assert_ok!(save_config(&config, &path).await);
        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haven.toml");
        tokio::fs::write(&path, "[watchers.light\nthreshold = ").await.unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConfigurationError {
                cause: ConfigError::TomlParse(_),
                ..
            }
        ));
    }
}
