//! Mood statistics derived from a store snapshot

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    event::{AlertKind, CheckIn, EpochMillis, Mood},
    store::StoreSnapshot,
};

const DEFAULT_TOP_SYMPTOMS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomCount {
    pub symptom: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub total_check_ins: usize,
    pub manual_check_ins: usize,
    pub sensor_check_ins: usize,
    pub moods: BTreeMap<Mood, usize>,
    /// Most frequent mood; ties go to the one recorded most recently
    pub dominant_mood: Option<Mood>,
    pub alerts: BTreeMap<AlertKind, usize>,
    pub top_symptoms: Vec<SymptomCount>,
    pub latest_check_in: Option<EpochMillis>,
}

impl MoodSummary {
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Self {
        Self::build(snapshot, None, DEFAULT_TOP_SYMPTOMS)
    }

    /// Only entries with a timestamp at or after `cutoff`
    pub fn since(snapshot: &StoreSnapshot, cutoff: EpochMillis) -> Self {
        Self::build(snapshot, Some(cutoff), DEFAULT_TOP_SYMPTOMS)
    }

    /// Keep only the `n` most frequent symptoms
    pub fn with_top_symptoms(
        snapshot: &StoreSnapshot,
        cutoff: Option<EpochMillis>,
        n: usize,
    ) -> Self {
        Self::build(snapshot, cutoff, n)
    }

    fn build(snapshot: &StoreSnapshot, cutoff: Option<EpochMillis>, top_n: usize) -> Self {
        let in_range = |timestamp: EpochMillis| cutoff.is_none_or(|c| timestamp >= c);
        let check_ins: Vec<&CheckIn> = snapshot
            .check_ins
            .iter()
            .filter(|c| in_range(c.timestamp))
            .collect();

        let mut summary = MoodSummary {
            total_check_ins: check_ins.len(),
            latest_check_in: check_ins.iter().map(|c| c.timestamp).max(),
            ..Default::default()
        };

        // Logs are newest-first, so the first sighting is the most recent
        let mut first_seen: HashMap<Mood, usize> = HashMap::new();
        let mut symptoms: HashMap<&str, usize> = HashMap::new();
        for (index, check_in) in check_ins.iter().enumerate() {
            if check_in.source.is_sensor() {
                summary.sensor_check_ins += 1;
            } else {
                summary.manual_check_ins += 1;
            }
            *summary.moods.entry(check_in.mood).or_default() += 1;
            first_seen.entry(check_in.mood).or_insert(index);
            for symptom in &check_in.symptoms {
                *symptoms.entry(symptom.as_str()).or_default() += 1;
            }
        }

        summary.dominant_mood = summary
            .moods
            .iter()
            .max_by(|(a, a_count), (b, b_count)| {
                a_count
                    .cmp(b_count)
                    .then_with(|| first_seen[*b].cmp(&first_seen[*a]))
            })
            .map(|(mood, _)| *mood);

        for alert in snapshot.alerts.iter().filter(|a| in_range(a.timestamp)) {
            *summary.alerts.entry(alert.kind).or_default() += 1;
        }

        let mut ranked: Vec<SymptomCount> = symptoms
            .into_iter()
            .map(|(symptom, count)| SymptomCount {
                symptom: symptom.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.symptom.cmp(&b.symptom)));
        ranked.truncate(top_n);
        summary.top_symptoms = ranked;

        summary
    }

    pub fn alert_count(&self, kind: AlertKind) -> usize {
        self.alerts.get(&kind).copied().unwrap_or(0)
    }

    pub fn mood_count(&self, mood: Mood) -> usize {
        self.moods.get(&mood).copied().unwrap_or(0)
    }

    pub fn total_alerts(&self) -> usize {
        self.alerts.values().sum()
    }
}
