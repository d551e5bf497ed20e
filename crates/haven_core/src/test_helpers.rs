#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    notify::{Haptics, Notification, Notifier, NotifyError},
    store::EventStore,
    watcher::WatcherContext,
};

#[derive(Debug, Default)]
pub struct CountingHaptics {
    pulses: AtomicUsize,
}

impl CountingHaptics {
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Haptics for CountingHaptics {
    fn pulse(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps every scheduled notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn schedule(&self, notification: Notification) -> Result<(), NotifyError> {
        self.notifications.lock().push(notification);
        Ok(())
    }
}

pub struct TestHarness {
    pub store: Arc<EventStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub haptics: Arc<CountingHaptics>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(EventStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            haptics: Arc::new(CountingHaptics::default()),
        }
    }

    pub fn context(&self) -> WatcherContext {
        WatcherContext::new(
            self.store.clone(),
            self.notifier.clone(),
            self.haptics.clone(),
        )
    }
}
