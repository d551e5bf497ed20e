//! Check-ins and alert events recorded during a session

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::id::{AlertId, CheckInId};

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

pub(crate) fn now_millis() -> EpochMillis {
    Utc::now().timestamp_millis()
}

/// The closed set of moods a check-in can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Calm,
    Okay,
    Overwhelmed,
    Angry,
    Sad,
    Unknown,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Calm,
        Mood::Okay,
        Mood::Overwhelmed,
        Mood::Angry,
        Mood::Sad,
        Mood::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Calm => "calm",
            Mood::Okay => "okay",
            Mood::Overwhelmed => "overwhelmed",
            Mood::Angry => "angry",
            Mood::Sad => "sad",
            Mood::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("Unknown mood '{0}'")]
#[diagnostic(help("Expected one of: calm, okay, overwhelmed, angry, sad, unknown"))]
pub struct ParseMoodError(String);

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMoodError(s.to_string()))
    }
}

/// The three passive overload watchers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherKind {
    Movement,
    Noise,
    Light,
}

impl WatcherKind {
    pub const ALL: [WatcherKind; 3] =
        [WatcherKind::Movement, WatcherKind::Noise, WatcherKind::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatcherKind::Movement => "movement",
            WatcherKind::Noise => "noise",
            WatcherKind::Light => "light",
        }
    }

    /// The alert tag this watcher logs under
    pub fn alert_kind(&self) -> AlertKind {
        match self {
            WatcherKind::Movement => AlertKind::Movement,
            WatcherKind::Noise => AlertKind::Noise,
            WatcherKind::Light => AlertKind::Light,
        }
    }
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a check-in came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "watcher", rename_all = "snake_case")]
pub enum CheckInSource {
    Manual,
    Sensor(WatcherKind),
}

impl CheckInSource {
    pub fn is_sensor(&self) -> bool {
        matches!(self, CheckInSource::Sensor(_))
    }
}

impl fmt::Display for CheckInSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckInSource::Manual => f.write_str("manual"),
            CheckInSource::Sensor(kind) => write!(f, "sensor:{}", kind),
        }
    }
}

/// A mood and symptom record at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub timestamp: EpochMillis,
    pub mood: Mood,
    pub symptoms: Vec<String>,
    pub source: CheckInSource,
}

impl CheckIn {
    pub(crate) fn new(mood: Mood, symptoms: Vec<String>, source: CheckInSource) -> Self {
        Self {
            id: CheckInId::generate(),
            timestamp: now_millis(),
            mood,
            symptoms,
            source,
        }
    }
}

/// Alert tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Movement,
    Noise,
    Light,
    ManualHighRisk,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Movement => "movement",
            AlertKind::Noise => "noise",
            AlertKind::Light => "light",
            AlertKind::ManualHighRisk => "manual_high_risk",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record that an overload condition was detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: AlertId,
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: EpochMillis,
}

impl AlertEvent {
    pub(crate) fn new(kind: AlertKind, message: String) -> Self {
        Self {
            id: AlertId::generate(),
            kind,
            message,
            timestamp: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mood_parse_is_case_insensitive() {
        assert_eq!("Overwhelmed".parse::<Mood>().unwrap(), Mood::Overwhelmed);
        assert_eq!(" calm ".parse::<Mood>().unwrap(), Mood::Calm);
        assert!("furious".parse::<Mood>().is_err());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(CheckInSource::Manual.to_string(), "manual");
        assert_eq!(
            CheckInSource::Sensor(WatcherKind::Noise).to_string(),
            "sensor:noise"
        );
    }

    #[test]
    fn test_check_in_serialization_shape() {
        let check_in = CheckIn::new(
            Mood::Overwhelmed,
            vec!["very bright screen".to_string()],
            CheckInSource::Sensor(WatcherKind::Light),
        );
        let json = serde_json::to_value(&check_in).unwrap();

        assert_eq!(json["mood"], "overwhelmed");
        assert_eq!(json["source"]["type"], "sensor");
        assert_eq!(json["source"]["watcher"], "light");
        assert!(json["id"].as_str().unwrap().starts_with("checkin_"));
    }

    #[test]
    fn test_watcher_alert_kinds() {
        assert_eq!(WatcherKind::Movement.alert_kind(), AlertKind::Movement);
        assert_eq!(WatcherKind::Noise.alert_kind(), AlertKind::Noise);
        assert_eq!(WatcherKind::Light.alert_kind(), AlertKind::Light);
        assert_eq!(AlertKind::ManualHighRisk.to_string(), "manual_high_risk");
    }
}
