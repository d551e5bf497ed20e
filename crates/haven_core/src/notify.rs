//! Local notification and haptic seams

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// When a scheduled notification should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTrigger {
    Immediate,
    After(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub sound: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, Value>,
    pub trigger: NotificationTrigger,
}

impl Notification {
    pub fn immediate(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            sound: true,
            data: HashMap::new(),
            trigger: NotificationTrigger::Immediate,
        }
    }

    pub fn delayed(title: impl Into<String>, body: impl Into<String>, delay: Duration) -> Self {
        Self {
            trigger: NotificationTrigger::After(delay),
            ..Self::immediate(title, body)
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn silent(mut self) -> Self {
        self.sound = false;
        self
    }
}

#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
pub enum NotifyError {
    #[error("notification permission not granted")]
    #[diagnostic(code(haven_core::notify::not_permitted))]
    NotPermitted,

    #[error("notification dispatcher failed: {0}")]
    #[diagnostic(code(haven_core::notify::dispatch_failed))]
    DispatchFailed(String),
}

/// Schedules local notifications. Fire-and-forget from the caller's side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Immediate physical cue on the device
pub trait Haptics: Send + Sync {
    fn pulse(&self);
}

/// Notifier that only writes to the log, for headless sessions
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            title = %notification.title,
            trigger = ?notification.trigger,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Haptics for devices without a vibration motor
#[derive(Debug, Default, Clone)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self) {}
}
