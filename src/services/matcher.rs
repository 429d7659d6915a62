//! Co-presence matching between patients and providers
//!
//! A patient minute is matched when some provider was observed at exactly
//! the same timestamp in the same smoothed room. The first such provider
//! minute (in provider file order) is marked matched as well. Minutes with
//! no room or the no-signal label never match.

use crate::domain::types::Reading;
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Per-row match flags, index-aligned with the inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFlags {
    pub patients: Vec<bool>,
    pub providers: Vec<bool>,
}

impl MatchFlags {
    pub fn matched_patients(&self) -> usize {
        self.patients.iter().filter(|m| **m).count()
    }

    pub fn matched_providers(&self) -> usize {
        self.providers.iter().filter(|m| **m).count()
    }
}

pub fn match_co_presence(
    patients: &[Reading],
    providers: &[Reading],
    no_signal_label: &str,
) -> MatchFlags {
    let mut by_time: FxHashMap<NaiveDateTime, Vec<usize>> = FxHashMap::default();
    for (idx, provider) in providers.iter().enumerate() {
        by_time.entry(provider.time).or_default().push(idx);
    }

    let mut flags = MatchFlags {
        patients: vec![false; patients.len()],
        providers: vec![false; providers.len()],
    };

    for (pat_idx, patient) in patients.iter().enumerate() {
        let Some(room) = patient.smoothed_room.as_deref() else {
            continue;
        };
        if room == no_signal_label {
            continue;
        }
        let Some(candidates) = by_time.get(&patient.time) else {
            continue;
        };

        let hit = candidates
            .iter()
            .copied()
            .find(|&idx| providers[idx].smoothed_room.as_deref() == Some(room));
        if let Some(prov_idx) = hit {
            flags.patients[pat_idx] = true;
            flags.providers[prov_idx] = true;
        }
    }

    debug!(
        patients = patients.len(),
        providers = providers.len(),
        matched_patients = flags.matched_patients(),
        matched_providers = flags.matched_providers(),
        "co_presence_matched"
    );

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EntityId, EntityKind};
    use chrono::{NaiveDate, TimeDelta};

    fn reading(kind: EntityKind, id: i64, m: i64, room: Option<&str>) -> Reading {
        let base = NaiveDate::from_ymd_opt(2016, 3, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        Reading {
            entity_id: EntityId(id),
            kind,
            time: base + TimeDelta::minutes(m),
            rooms: [room.map(str::to_string), None],
            signals: [None, None],
            smoothed_room: room.map(str::to_string),
            provider_type: None,
        }
    }

    #[test]
    fn test_same_room_same_minute_matches() {
        let patients = vec![
            reading(EntityKind::Patient, 1, 0, Some("Exam1")),
            reading(EntityKind::Patient, 1, 1, Some("Exam1")),
        ];
        let providers = vec![
            reading(EntityKind::Provider, 9, 0, Some("Exam1")),
            reading(EntityKind::Provider, 9, 1, Some("Exam2")),
        ];

        let flags = match_co_presence(&patients, &providers, "NoSignal");
        assert_eq!(flags.patients, vec![true, false]);
        assert_eq!(flags.providers, vec![true, false]);
    }

    #[test]
    fn test_no_signal_and_null_never_match() {
        let patients = vec![
            reading(EntityKind::Patient, 1, 0, Some("NoSignal")),
            reading(EntityKind::Patient, 1, 1, None),
        ];
        let providers = vec![
            reading(EntityKind::Provider, 9, 0, Some("NoSignal")),
            reading(EntityKind::Provider, 9, 1, None),
        ];

        let flags = match_co_presence(&patients, &providers, "NoSignal");
        assert_eq!(flags.matched_patients(), 0);
        assert_eq!(flags.matched_providers(), 0);
    }

    #[test]
    fn test_only_first_provider_flagged() {
        let patients = vec![reading(EntityKind::Patient, 1, 0, Some("Exam1"))];
        let providers = vec![
            reading(EntityKind::Provider, 8, 0, Some("Exam1")),
            reading(EntityKind::Provider, 9, 0, Some("Exam1")),
        ];

        let flags = match_co_presence(&patients, &providers, "NoSignal");
        assert_eq!(flags.providers, vec![true, false]);
    }
}
