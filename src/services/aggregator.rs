//! Statistics aggregation over matched-presence minutes
//!
//! Every table is a pure function of the record slice. Grouped tables only
//! contain groups with at least one member; rows with a null grouping key
//! are left out of that table but still count toward the totals.

use crate::domain::error::PipelineResult;
use crate::domain::report::{CountRow, MeanRow, Section, StatisticsReport, Summary, TotalLine};
use crate::domain::rooms::RoomCategories;
use crate::domain::types::{EntityId, EntityKind, MatchedPresenceRecord};
use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Number of person-minutes in the collection
#[inline]
pub fn total_minutes(records: &[MatchedPresenceRecord]) -> u64 {
    records.len() as u64
}

/// Number of distinct person ids
pub fn distinct_entities(records: &[MatchedPresenceRecord]) -> u64 {
    let ids: FxHashSet<EntityId> = records.iter().map(|r| r.person_id).collect();
    ids.len() as u64
}

/// Turn per-key counts into rows with share-of-total percentages
fn count_rows(counts: BTreeMap<&str, u64>) -> Vec<CountRow> {
    let total: u64 = counts.values().sum();
    counts
        .into_iter()
        .map(|(key, count)| CountRow {
            key: key.to_string(),
            count,
            percentage: 100.0 * count as f64 / total as f64,
        })
        .collect()
}

/// Minutes per room, largest first (ties by room name)
pub fn minutes_by_room(records: &[MatchedPresenceRecord]) -> Vec<CountRow> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for room in records.iter().filter_map(|r| r.room.as_deref()) {
        *counts.entry(room).or_default() += 1;
    }

    let mut rows = count_rows(counts);
    // Stable sort keeps the name order among equal counts
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Minutes per provider type, ordered by type
pub fn minutes_by_provider_type(records: &[MatchedPresenceRecord]) -> Vec<CountRow> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for provider_type in records.iter().filter_map(|r| r.provider_type.as_deref()) {
        *counts.entry(provider_type).or_default() += 1;
    }
    count_rows(counts)
}

/// Mean number of simultaneous occupants per room, over the minutes in
/// which the room had at least one occupant
pub fn mean_occupancy_by_room(records: &[MatchedPresenceRecord]) -> Vec<MeanRow> {
    let mut per_minute: FxHashMap<(&str, NaiveDateTime), u64> = FxHashMap::default();
    for record in records {
        if let Some(room) = record.room.as_deref() {
            *per_minute.entry((room, record.time)).or_default() += 1;
        }
    }

    // room -> (sum of occupant counts, occupied minutes)
    let mut per_room: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for ((room, _), occupants) in per_minute {
        let entry = per_room.entry(room).or_default();
        entry.0 += occupants;
        entry.1 += 1;
    }

    per_room
        .into_iter()
        .map(|(room, (occupants, minutes))| MeanRow {
            key: room.to_string(),
            value: occupants as f64 / minutes as f64,
        })
        .collect()
}

/// Group records and return 100 * mean(matched) per key
fn co_presence_by<'a, K, F>(records: &'a [MatchedPresenceRecord], key: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&'a MatchedPresenceRecord) -> Option<K>,
{
    // key -> (matched minutes, minutes)
    let mut groups: BTreeMap<K, (u64, u64)> = BTreeMap::new();
    for record in records {
        let Some(k) = key(record) else {
            continue;
        };
        let entry = groups.entry(k).or_default();
        entry.0 += u64::from(record.matched);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(k, (matched, minutes))| (k, 100.0 * matched as f64 / minutes as f64))
        .collect()
}

/// Percentage of matched minutes for each person
pub fn co_presence_by_entity(records: &[MatchedPresenceRecord]) -> BTreeMap<EntityId, f64> {
    co_presence_by(records, |r| Some(r.person_id))
}

/// Distribution of per-person matched percentages
pub fn co_presence_distribution(records: &[MatchedPresenceRecord]) -> Option<Summary> {
    let per_entity: Vec<f64> = co_presence_by_entity(records).into_values().collect();
    Summary::from_values(&per_entity)
}

pub fn co_presence_by_provider_type(records: &[MatchedPresenceRecord]) -> Vec<MeanRow> {
    co_presence_by(records, |r| r.provider_type.as_deref())
        .into_iter()
        .map(|(key, value)| MeanRow { key: key.to_string(), value })
        .collect()
}

pub fn co_presence_by_room(records: &[MatchedPresenceRecord]) -> Vec<MeanRow> {
    co_presence_by(records, |r| r.room.as_deref())
        .into_iter()
        .map(|(key, value)| MeanRow { key: key.to_string(), value })
        .collect()
}

/// Builds the facility report from the patient and provider collections
pub struct Aggregator<'a> {
    patients: &'a [MatchedPresenceRecord],
    providers: &'a [MatchedPresenceRecord],
}

impl<'a> Aggregator<'a> {
    pub fn new(
        patients: &'a [MatchedPresenceRecord],
        providers: &'a [MatchedPresenceRecord],
    ) -> Self {
        Self { patients, providers }
    }

    /// Like `new`, but every non-null room must be in the category map
    pub fn checked(
        patients: &'a [MatchedPresenceRecord],
        providers: &'a [MatchedPresenceRecord],
        rooms: &RoomCategories,
    ) -> PipelineResult<Self> {
        rooms.check_labels(patients.iter().chain(providers).map(|r| r.room.as_deref()))?;
        Ok(Self::new(patients, providers))
    }

    pub fn report(&self) -> StatisticsReport {
        let (pat, prov) = (self.patients, self.providers);
        let pat_id = EntityKind::Patient.id_column();
        let prov_id = EntityKind::Provider.id_column();

        let sections = vec![
            Section::Totals {
                lines: vec![
                    total_line("total patient minutes", total_minutes(pat)),
                    total_line("total provider minutes", total_minutes(prov)),
                ],
            },
            Section::Totals {
                lines: vec![
                    total_line(&format!("distinct {} values", pat_id), distinct_entities(pat)),
                    total_line("distinct provider id's", distinct_entities(prov)),
                ],
            },
            Section::Counts {
                title: "Total patient minutes per location:".to_string(),
                key_header: "Room_HMM".to_string(),
                rows: minutes_by_room(pat),
            },
            Section::Counts {
                title: "Total provider minutes per location:".to_string(),
                key_header: "Room_HMM".to_string(),
                rows: minutes_by_room(prov),
            },
            Section::Counts {
                title: "Total provider minutes by provider type:".to_string(),
                key_header: "Provider".to_string(),
                rows: minutes_by_provider_type(prov),
            },
            Section::Means {
                title: "Average number of patients per room given at least 1 patient is present:"
                    .to_string(),
                key_header: "Room_HMM".to_string(),
                value_header: "Patients".to_string(),
                decimals: 3,
                rows: mean_occupancy_by_room(pat),
            },
            Section::Means {
                title:
                    "Average number of providers per room given at least 1 provider is present:"
                        .to_string(),
                key_header: "Room_HMM".to_string(),
                value_header: "Providers".to_string(),
                decimals: 3,
                rows: mean_occupancy_by_room(prov),
            },
            Section::Distribution {
                title: format!("Distribution of provider-in-room percentages, per {}:", pat_id),
                value_header: "Match".to_string(),
                summary: co_presence_distribution(pat),
            },
            Section::Distribution {
                title: format!("Distribution of patient-in-room percentages, per {}:", prov_id),
                value_header: "Match".to_string(),
                summary: co_presence_distribution(prov),
            },
            Section::Means {
                title: "Patient-in-room percentage, by provider type:".to_string(),
                key_header: "Provider".to_string(),
                value_header: "Match".to_string(),
                decimals: 1,
                rows: co_presence_by_provider_type(prov),
            },
            Section::Means {
                title: "Provider-in-room percentage, by room:".to_string(),
                key_header: "Room_HMM".to_string(),
                value_header: "Match".to_string(),
                decimals: 1,
                rows: co_presence_by_room(prov),
            },
        ];

        StatisticsReport::new(sections)
    }
}

fn total_line(label: &str, value: u64) -> TotalLine {
    TotalLine { label: label.to_string(), value }
}
