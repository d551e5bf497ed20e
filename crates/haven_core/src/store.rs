//! Session event store
//!
//! Single source of truth for the profile, the check-in log and the alert
//! log of one running session. Both logs are kept newest-first and grow
//! without bound until the store is dropped. Nothing is persisted.
//!
//! Every mutation is a single critical section, so concurrent watchers can
//! never interleave mid-append. Changes are fanned out to subscribers over a
//! broadcast channel; slow subscribers lag and miss events rather than
//! blocking writers.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tokio_stream::{Stream, StreamExt};

use crate::{
    CoreError, Result,
    event::{AlertEvent, AlertKind, CheckIn, CheckInSource, Mood, WatcherKind},
    id::SessionId,
    profile::UserProfile,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notifications published by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ProfileChanged(Option<UserProfile>),
    CheckInAdded(CheckIn),
    AlertLogged(AlertEvent),
}

/// Point-in-time copy of everything the store holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub profile: Option<UserProfile>,
    pub check_ins: Vec<CheckIn>,
    pub alerts: Vec<AlertEvent>,
}

impl StoreSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::SerializationError {
            data_type: "StoreSnapshot".to_string(),
            cause: e,
        })
    }
}

#[derive(Debug, Default)]
struct StoreState {
    profile: Option<UserProfile>,
    check_ins: VecDeque<CheckIn>,
    alerts: VecDeque<AlertEvent>,
}

#[derive(Debug)]
pub struct EventStore {
    session_id: SessionId,
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session_id: SessionId::generate(),
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    pub fn with_profile(profile: UserProfile) -> Self {
        let store = Self::new();
        store.state.write().profile = Some(profile);
        store
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Receive every change made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// [`subscribe`](Self::subscribe) as a stream. Events missed by a lagging
    /// consumer are skipped with a warning.
    pub fn events(&self) -> impl Stream<Item = StoreEvent> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Store subscriber lagged, events skipped");
                None
            }
        })
    }

    /// Replace the active profile. Setting the value already held is a no-op.
    pub fn set_profile(&self, profile: Option<UserProfile>) {
        {
            let mut state = self.state.write();
            if state.profile == profile {
                tracing::debug!("Profile unchanged, skipping update");
                return;
            }
            state.profile = profile.clone();
            self.publish(StoreEvent::ProfileChanged(profile.clone()));
        }

        tracing::info!(
            session = %self.session_id,
            role = ?profile.as_ref().map(|p| p.role),
            "Profile replaced"
        );
    }

    /// Record a check-in made by the user
    pub fn add_check_in(&self, mood: Mood, symptoms: Vec<String>) -> CheckIn {
        self.push_check_in(CheckIn::new(mood, symptoms, CheckInSource::Manual))
    }

    /// Record a check-in synthesized by one of the overload watchers
    pub fn add_sensor_check_in(
        &self,
        watcher: WatcherKind,
        mood: Mood,
        symptoms: Vec<String>,
    ) -> CheckIn {
        self.push_check_in(CheckIn::new(mood, symptoms, CheckInSource::Sensor(watcher)))
    }

    pub fn log_alert_event(&self, kind: AlertKind, message: impl Into<String>) -> AlertEvent {
        let alert = AlertEvent::new(kind, message.into());
        {
            let mut state = self.state.write();
            state.alerts.push_front(alert.clone());
            self.publish(StoreEvent::AlertLogged(alert.clone()));
        }

        tracing::info!(
            session = %self.session_id,
            alert_id = %alert.id,
            kind = %alert.kind,
            "Alert logged"
        );
        alert
    }

    fn push_check_in(&self, check_in: CheckIn) -> CheckIn {
        {
            let mut state = self.state.write();
            state.check_ins.push_front(check_in.clone());
            self.publish(StoreEvent::CheckInAdded(check_in.clone()));
        }

        tracing::info!(
            session = %self.session_id,
            check_in_id = %check_in.id,
            mood = %check_in.mood,
            source = %check_in.source,
            "Check-in recorded"
        );
        check_in
    }

    /// Called with the state lock held so subscribers see log order
    fn publish(&self, event: StoreEvent) {
        // No receivers is the normal case when nothing is rendering
        let _ = self.events.send(event);
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.read().profile.clone()
    }

    /// Check-ins, newest first
    pub fn check_ins(&self) -> Vec<CheckIn> {
        self.state.read().check_ins.iter().cloned().collect()
    }

    /// Alert events, newest first
    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.state.read().alerts.iter().cloned().collect()
    }

    pub fn latest_check_in(&self) -> Option<CheckIn> {
        self.state.read().check_ins.front().cloned()
    }

    pub fn check_in_count(&self) -> usize {
        self.state.read().check_ins.len()
    }

    pub fn alert_count(&self) -> usize {
        self.state.read().alerts.len()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read();
        StoreSnapshot {
            profile: state.profile.clone(),
            check_ins: state.check_ins.iter().cloned().collect(),
            alerts: state.alerts.iter().cloned().collect(),
        }
    }
}
