use miette::Diagnostic;
use thiserror::Error;

use crate::sensor::SensorError;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Sensor unavailable")]
    #[diagnostic(
        code(haven_core::sensor_unavailable),
        help("The {sensor} sensor is not supported on this device; its watcher stays idle")
    )]
    SensorUnavailable { sensor: String },

    #[error("Sensor permission denied")]
    #[diagnostic(
        code(haven_core::permission_denied),
        help("Grant {sensor} access in the system settings and restart the session")
    )]
    PermissionDenied { sensor: String },

    #[error("Sensor read failed")]
    #[diagnostic(
        code(haven_core::sensor_read_failed),
        help("A single sampling window failed for {sensor}; the next cycle retries")
    )]
    SensorReadFailed {
        sensor: String,
        #[source]
        cause: SensorError,
    },

    #[error("Serialization error")]
    #[diagnostic(
        code(haven_core::serialization_error),
        help("Failed to serialize/deserialize {data_type}")
    )]
    SerializationError {
        data_type: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Configuration error")]
    #[diagnostic(
        code(haven_core::configuration_error),
        help("Check configuration file at {config_path}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },
}

/// Low-level causes behind [`CoreError::ConfigurationError`]
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<SensorError> for CoreError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::Unavailable { sensor } => Self::SensorUnavailable {
                sensor: sensor.to_string(),
            },
            SensorError::PermissionDenied { sensor } => Self::PermissionDenied {
                sensor: sensor.to_string(),
            },
            other => Self::SensorReadFailed {
                sensor: other.sensor().to_string(),
                cause: other,
            },
        }
    }
}

impl CoreError {
    pub fn invalid_config(
        config_path: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::ConfigurationError {
            config_path: config_path.into(),
            field: field.into(),
            expected: expected.into(),
            cause: ConfigError::InvalidValue(detail.into()),
        }
    }
}
