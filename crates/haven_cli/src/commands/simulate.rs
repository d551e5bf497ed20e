use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use haven_core::{
    CoreError, EventStore, Haptics, HavenConfig, MoodSummary, Notifier, StoreEvent, UserProfile,
    WatcherContext, WatcherKind, WatcherSet, WatcherState,
    notify::{LogNotifier, NoHaptics},
    sensor::{SensorError, SensorKind},
    watcher::IdleReason,
};
use miette::{Diagnostic, IntoDiagnostic, Result};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    console::{ConsoleHaptics, ConsoleNotifier},
    output::{Output, format_watcher_state},
    scenario::Scenario,
};

/// Run a watcher set against a scripted scenario, then print the session
pub async fn run(
    config: &HavenConfig,
    scenario_path: &Path,
    duration: Option<u64>,
    name: Option<&str>,
    headless: bool,
    export: Option<&Path>,
) -> Result<()> {
    let output = Output::new();
    let scenario = Scenario::load(scenario_path).await?;
    let config = scenario.apply(config);
    config.validate(&scenario_path.display().to_string())?;

    let profile = match (name, &config.profile) {
        (Some(name), Some(profile)) => Some(UserProfile {
            name: name.to_string(),
            ..profile.clone()
        }),
        (Some(name), None) => Some(UserProfile::new(name, "")),
        (None, profile) => profile.clone(),
    };
    let store = Arc::new(EventStore::new());
    store.set_profile(profile);

    let (notifier, haptics): (Arc<dyn Notifier>, Arc<dyn Haptics>) = if headless {
        (Arc::new(LogNotifier), Arc::new(NoHaptics))
    } else {
        (Arc::new(ConsoleNotifier::default()), Arc::new(ConsoleHaptics::default()))
    };

    let run_for = duration.map(Duration::from_secs).unwrap_or(scenario.duration());
    output.section("Simulating session");
    output.kv("Scenario", &scenario_path.display().to_string());
    output.kv("Duration", &format!("{}s", run_for.as_secs()));
    if let Some(profile) = store.profile() {
        output.kv("Profile", &profile.name);
    }

    let printer_cancel = CancellationToken::new();
    let printer = tokio::spawn(print_events(store.events(), printer_cancel.clone()));

    let ctx = WatcherContext::new(store.clone(), notifier, haptics);
    let watchers = WatcherSet::start(&config.watchers, scenario.sensors(), ctx);
    if watchers.kinds().is_empty() {
        output.warning("No watchers started; check the scenario's sensor sections");
    }

    tokio::select! {
        _ = tokio::time::sleep(run_for) => {}
        _ = tokio::signal::ctrl_c() => {
            output.status("Interrupted, stopping watchers");
        }
    }

    output.section("Watchers");
    for kind in WatcherKind::ALL {
        let state = watchers.state(kind);
        let label = state
            .as_ref()
            .map(format_watcher_state)
            .unwrap_or_else(|| "not started".to_string());
        output.kv(kind.as_str(), &label);
        if let Some(WatcherState::Idle(reason)) = state {
            explain_idle(&output, kind, reason);
        }
    }

    watchers.shutdown().await;
    printer_cancel.cancel();
    if let Err(e) = printer.await {
        tracing::warn!("Event printer task failed: {}", e);
    }

    let snapshot = store.snapshot();

    output.section("Check-ins");
    if snapshot.check_ins.is_empty() {
        output.status("none");
    }
    for check_in in &snapshot.check_ins {
        output.check_in(check_in);
    }

    output.section("Alerts");
    if snapshot.alerts.is_empty() {
        output.status("none");
    }
    for alert in &snapshot.alerts {
        output.alert(alert);
    }

    output.section("Summary");
    output.summary(&MoodSummary::from_snapshot(&snapshot));

    if let Some(path) = export {
        tokio::fs::write(path, snapshot.to_json()?)
            .await
            .into_diagnostic()?;
        println!();
        output.success(&format!("Session exported to {}", path.display()));
    }

    Ok(())
}

/// Show the help text for watchers parked by the sensor itself
fn explain_idle(output: &Output, kind: WatcherKind, reason: IdleReason) {
    let sensor = SensorKind::for_watcher(kind);
    let error = match reason {
        IdleReason::Unavailable => SensorError::Unavailable { sensor },
        IdleReason::PermissionDenied => SensorError::PermissionDenied { sensor },
        _ => return,
    };
    let error = CoreError::from(error);
    output.warning(&error.to_string());
    if let Some(help) = error.help() {
        output.status(&help.to_string());
    }
}

/// Echo store changes while the session runs
async fn print_events(
    events: impl Stream<Item = StoreEvent> + Send + 'static,
    cancel: CancellationToken,
) {
    let output = Output::new();
    let mut events = Box::pin(events);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.next() => match event {
                Some(StoreEvent::AlertLogged(alert)) => output.alert(&alert),
                Some(StoreEvent::CheckInAdded(check_in)) => output.check_in(&check_in),
                Some(StoreEvent::ProfileChanged(_)) => {}
                None => break,
            },
        }
    }
}
