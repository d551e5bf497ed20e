//! Threshold-and-cooldown guard shared by the overload watchers
//!
//! A reading fires when it is strictly above the threshold and the previous
//! firing is at least one cooldown period in the past. Cooling down is not a
//! separate loop; it is this timestamp check evaluated on every sample.

use std::time::Duration;

use tokio::time::Instant;

/// What the guard decided for one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardDecision {
    BelowThreshold,
    CoolingDown { remaining: Duration },
    Fire,
}

#[derive(Debug, Clone)]
pub struct OverloadGuard {
    threshold: f64,
    cooldown: Duration,
    last_fired: Option<Instant>,
}

impl OverloadGuard {
    pub fn new(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            last_fired: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn exceeds(&self, level: f64) -> bool {
        level > self.threshold
    }

    /// Time left before the guard may fire again, if any
    pub fn remaining_cooldown(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fired?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.remaining_cooldown(now).is_some()
    }

    /// Evaluate one reading and record a firing if it fires
    pub fn check(&mut self, level: f64, now: Instant) -> GuardDecision {
        if !self.exceeds(level) {
            return GuardDecision::BelowThreshold;
        }
        if let Some(remaining) = self.remaining_cooldown(now) {
            return GuardDecision::CoolingDown { remaining };
        }
        self.last_fired = Some(now);
        GuardDecision::Fire
    }
}
