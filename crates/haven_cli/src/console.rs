//! Terminal stand-ins for the device notification and haptic services

use async_trait::async_trait;
use haven_core::{
    Haptics, Notification, Notifier,
    notify::{NotificationTrigger, NotifyError},
};

use crate::output::Output;

/// Prints notifications as they would appear on a device. Delayed ones are
/// announced when scheduled and shown again when they come due.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    output: Output,
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        self.output.notification(&notification);

        if let NotificationTrigger::After(delay) = notification.trigger {
            let output = self.output;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                output.notification(&Notification {
                    trigger: NotificationTrigger::Immediate,
                    ..notification
                });
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsoleHaptics {
    output: Output,
}

impl Haptics for ConsoleHaptics {
    fn pulse(&self) {
        self.output.haptic();
    }
}
