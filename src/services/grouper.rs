//! Entity grouping and daily session admission
//!
//! Readings are partitioned by calendar day and then by entity. A day is
//! only rendered when it is a weekday with enough readings; excluded days
//! are logged and skipped, never treated as errors.

use crate::domain::types::{EntityId, Reading};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;
use tracing::debug;

/// Rules deciding which days become timeline pages
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPolicy {
    pub min_observations: usize,
    pub skip_weekends: bool,
    /// Stop after this many admitted days (None = no limit)
    pub max_days: Option<usize>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { min_observations: 100, skip_weekends: true, max_days: None }
    }
}

/// Why a day was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Weekend(Weekday),
    TooFewObservations { count: usize, min: usize },
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Weekend(_) => "weekend",
            SkipReason::TooFewObservations { .. } => "too_few_observations",
        }
    }
}

impl SessionPolicy {
    /// Check a day against the weekend and minimum-count rules
    pub fn admit(&self, day: NaiveDate, count: usize) -> Result<(), SkipReason> {
        let weekday = day.weekday();
        if self.skip_weekends && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return Err(SkipReason::Weekend(weekday));
        }
        if count < self.min_observations {
            return Err(SkipReason::TooFewObservations { count, min: self.min_observations });
        }
        Ok(())
    }
}

/// One admitted day: every entity's readings, each sorted by time
#[derive(Debug, Clone)]
pub struct DailySession {
    pub day: NaiveDate,
    pub entities: BTreeMap<EntityId, Vec<Reading>>,
}

impl DailySession {
    pub fn observation_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}

/// Partition readings by calendar day
pub fn group_by_day(readings: Vec<Reading>) -> BTreeMap<NaiveDate, Vec<Reading>> {
    let mut days: BTreeMap<NaiveDate, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        days.entry(reading.day()).or_default().push(reading);
    }
    days
}

/// Partition one day's readings by entity, sorting each entity by time
pub fn group_by_entity(readings: Vec<Reading>) -> BTreeMap<EntityId, Vec<Reading>> {
    let mut entities: BTreeMap<EntityId, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        entities.entry(reading.entity_id).or_default().push(reading);
    }
    for group in entities.values_mut() {
        group.sort_by_key(|r| r.time);
    }
    entities
}

/// Build the admitted daily sessions in calendar order
pub fn daily_sessions(readings: Vec<Reading>, policy: &SessionPolicy) -> Vec<DailySession> {
    let mut sessions = Vec::new();

    for (day, day_readings) in group_by_day(readings) {
        if policy.max_days.is_some_and(|max| sessions.len() >= max) {
            debug!(day = %day, "day_limit_reached");
            break;
        }

        if let Err(reason) = policy.admit(day, day_readings.len()) {
            debug!(day = %day, reason = reason.as_str(), count = day_readings.len(), "day_skipped");
            continue;
        }

        sessions.push(DailySession { day, entities: group_by_entity(day_readings) });
    }

    sessions
}
