//! Haven Core - session store and passive overload watchers
//!
//! This crate holds the in-memory record of one support session (the user
//! profile, mood check-ins and overload alerts) and the sensor watchers
//! that write to it when movement, noise or screen brightness crosses a
//! threshold.

pub mod config;
pub mod error;
pub mod event;
pub mod guard;
pub mod id;
pub mod notify;
pub mod profile;
pub mod scripted;
pub mod sensor;
pub mod stats;
pub mod store;
pub mod watcher;

mod test_helpers;

pub use config::HavenConfig;
pub use error::{CoreError, Result};
pub use event::{AlertEvent, AlertKind, CheckIn, CheckInSource, EpochMillis, Mood, WatcherKind};
pub use guard::{GuardDecision, OverloadGuard};
pub use id::{AlertId, CheckInId, Id, IdType, SessionId};
pub use notify::{Haptics, Notification, Notifier};
pub use profile::{Role, UserProfile};
pub use stats::MoodSummary;
pub use store::{EventStore, StoreEvent, StoreSnapshot};
pub use watcher::{SensorSuite, Watcher, WatcherContext, WatcherSet, WatcherState};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AlertEvent, AlertKind, CheckIn, CheckInSource, CoreError, EventStore, HavenConfig,
        Haptics, Mood, MoodSummary, Notification, Notifier, Result, Role, SensorSuite,
        UserProfile, WatcherContext, WatcherKind, WatcherSet, WatcherState,
    };
}
