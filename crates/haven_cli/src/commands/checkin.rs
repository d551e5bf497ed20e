use haven_core::{EventStore, HavenConfig, Mood};
use miette::Result;

use crate::output::Output;

/// Record a manual check-in in a fresh session and print it
pub fn record(config: &HavenConfig, mood: &str, symptoms: Vec<String>) -> Result<()> {
    let output = Output::new();
    let mood: Mood = mood.parse()?;

    let store = match &config.profile {
        Some(profile) => EventStore::with_profile(profile.clone()),
        None => EventStore::new(),
    };
    let check_in = store.add_check_in(mood, symptoms);

    output.section("Check-in recorded");
    if let Some(profile) = store.profile() {
        output.kv("Profile", &profile.name);
    }
    output.kv("Session", &store.session_id().to_string());
    output.check_in(&check_in);

    Ok(())
}
