use chrono::{Local, TimeZone};
use haven_core::{
    AlertEvent, CheckIn, Mood, MoodSummary, Notification, WatcherState, event::EpochMillis,
    notify::NotificationTrigger,
};
use owo_colors::OwoColorize;

/// Standard output formatting for the CLI
#[derive(Debug, Clone, Copy, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Print a system/status message (indented)
    pub fn status(&self, message: &str) {
        println!("  {}", message.dimmed());
    }

    /// Print an info message (indented)
    pub fn info(&self, label: &str, value: &str) {
        println!("  {} {}", label.bright_blue(), value);
    }

    /// Print a success message (indented)
    pub fn success(&self, message: &str) {
        println!("  {} {}", "✓".bright_green(), message);
    }

    /// Print a warning message (indented)
    pub fn warning(&self, message: &str) {
        println!("  {} {}", "⚠".yellow(), message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
    }

    /// Print a list item (already indented)
    pub fn list_item(&self, item: &str) {
        println!("    • {}", item);
    }

    /// Print a key-value pair (indented)
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {} {}", format!("{}:", key).dimmed(), value);
    }

    /// Print a notification the way a device banner would show it
    pub fn notification(&self, notification: &Notification) {
        let bell = if notification.sound { "🔔" } else { "🔕" };
        println!();
        println!("  {} {}", bell, notification.title.bright_white().bold());
        println!("     {}", notification.body);
        if let NotificationTrigger::After(delay) = notification.trigger {
            println!("     {}", format!("(follow-up after {}s)", delay.as_secs()).dimmed());
        }
    }

    pub fn haptic(&self) {
        println!("  {}", "~ bzzt ~".magenta());
    }

    pub fn check_in(&self, check_in: &CheckIn) {
        let symptoms = if check_in.symptoms.is_empty() {
            String::new()
        } else {
            format!(" ({})", check_in.symptoms.join(", "))
        };
        println!(
            "  {} {} {}{} {}",
            format_timestamp(check_in.timestamp).dimmed(),
            format_mood(check_in.mood),
            check_in.source.to_string().dimmed(),
            symptoms,
            check_in.id.to_string().dimmed()
        );
    }

    pub fn alert(&self, alert: &AlertEvent) {
        println!(
            "  {} {} {}",
            format_timestamp(alert.timestamp).dimmed(),
            format!("[{}]", alert.kind).bright_red(),
            alert.message
        );
    }

    pub fn summary(&self, summary: &MoodSummary) {
        self.kv("Check-ins", &summary.total_check_ins.to_string());
        self.kv(
            "Manual / sensor",
            &format!("{} / {}", summary.manual_check_ins, summary.sensor_check_ins),
        );
        if let Some(mood) = summary.dominant_mood {
            self.kv("Dominant mood", &format_mood(mood));
        }
        for (mood, count) in &summary.moods {
            self.list_item(&format!("{}: {}", mood, count));
        }
        self.kv("Alerts", &summary.total_alerts().to_string());
        for (kind, count) in &summary.alerts {
            self.list_item(&format!("{}: {}", kind, count));
        }
        if !summary.top_symptoms.is_empty() {
            self.kv("Top symptoms", "");
            for entry in &summary.top_symptoms {
                self.list_item(&format!("{} ×{}", entry.symptom, entry.count));
            }
        }
    }
}

/// Format a mood for display
pub fn format_mood(mood: Mood) -> String {
    match mood {
        Mood::Calm => "calm".bright_green().to_string(),
        Mood::Okay => "okay".green().to_string(),
        Mood::Overwhelmed => "overwhelmed".bright_yellow().to_string(),
        Mood::Angry => "angry".bright_red().to_string(),
        Mood::Sad => "sad".bright_blue().to_string(),
        Mood::Unknown => "unknown".dimmed().to_string(),
    }
}

/// Format watcher state for display
pub fn format_watcher_state(state: &WatcherState) -> String {
    match state {
        WatcherState::Idle(reason) => format!("idle ({:?})", reason).dimmed().to_string(),
        WatcherState::Watching => "watching".bright_green().to_string(),
        WatcherState::CoolingDown { .. } => "cooling down".bright_yellow().to_string(),
    }
}

fn format_timestamp(millis: EpochMillis) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}
