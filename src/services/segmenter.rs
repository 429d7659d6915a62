//! Interval segmentation
//!
//! Turns one entity's chronologically sorted observations for one day and
//! one channel into maximal constant-room intervals:
//! - Runs are found with a single forward scan (`runs`)
//! - A run closes at its last observation time plus the global time step
//! - Null-room runs are dropped but still separate their neighbours
//! - The "no person" entity never yields intervals

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::rooms::RoomCategories;
use crate::domain::types::{Channel, EntityId, Observation, OccupancyInterval, Reading};
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::BTreeSet;

/// A maximal span `[start, end)` of items sharing the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<K> {
    pub label: K,
    pub start: usize,
    pub end: usize,
}

impl<K> Run<K> {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Run-length iterator over a slice
#[derive(Debug, Clone)]
pub struct Runs<'a, T, F> {
    items: &'a [T],
    pos: usize,
    key: F,
}

impl<'a, T, K, F> Iterator for Runs<'a, T, F>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    type Item = Run<K>;

    fn next(&mut self) -> Option<Run<K>> {
        let items = self.items;
        let first = items.get(self.pos)?;
        let start = self.pos;
        let label = (self.key)(first);

        let mut end = start + 1;
        while let Some(item) = items.get(end) {
            if (self.key)(item) != label {
                break;
            }
            end += 1;
        }

        self.pos = end;
        Some(Run { label, start, end })
    }
}

/// Scan `items` into maximal runs of equal `key`
pub fn runs<'a, T, K, F>(items: &'a [T], key: F) -> Runs<'a, T, F>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    Runs { items, pos: 0, key }
}

/// Smallest positive gap between distinct timestamps
///
/// Returns `None` when fewer than two distinct timestamps exist.
pub fn discover_time_step<I>(times: I) -> Option<TimeDelta>
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let distinct: BTreeSet<NaiveDateTime> = times.into_iter().collect();
    distinct
        .iter()
        .zip(distinct.iter().skip(1))
        .map(|(a, b)| *b - *a)
        .min()
}

/// Like `discover_time_step`, but an undiscoverable step is a data error
pub fn require_time_step(readings: &[Reading]) -> PipelineResult<TimeDelta> {
    discover_time_step(readings.iter().map(|r| r.time)).ok_or_else(|| {
        PipelineError::data_integrity(format!(
            "cannot discover a time step from {} readings (need two distinct timestamps)",
            readings.len()
        ))
    })
}

/// Converts observation sequences into occupancy intervals
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    step: TimeDelta,
    rooms: &'a RoomCategories,
    no_person_id: EntityId,
}

impl<'a> Segmenter<'a> {
    pub fn new(step: TimeDelta, rooms: &'a RoomCategories, no_person_id: EntityId) -> Self {
        Self { step, rooms, no_person_id }
    }

    #[inline]
    pub fn no_person_id(&self) -> EntityId {
        self.no_person_id
    }

    /// Segment one (entity, day, channel) sequence
    ///
    /// Input must be sorted by time and belong to a single entity and
    /// channel. Empty input, or input with only null rooms, yields no
    /// intervals.
    pub fn segment(&self, observations: &[Observation]) -> PipelineResult<Vec<OccupancyInterval>> {
        let Some(first) = observations.first() else {
            return Ok(Vec::new());
        };
        if first.entity_id == self.no_person_id {
            return Ok(Vec::new());
        }

        let mut intervals = Vec::new();
        for run in runs(observations, |o| o.room.as_deref()) {
            let Some(room) = run.label else {
                continue;
            };
            let category = self.rooms.category(room)?;
            intervals.push(OccupancyInterval {
                entity_id: first.entity_id,
                channel: first.channel,
                room: room.to_string(),
                category: category.clone(),
                start: observations[run.start].time,
                end: observations[run.end - 1].time + self.step,
            });
        }

        Ok(intervals)
    }

    /// Segment one channel of an entity's readings for a day
    pub fn segment_readings(
        &self,
        readings: &[Reading],
        channel: Channel,
    ) -> PipelineResult<Vec<OccupancyInterval>> {
        let observations: Vec<Observation> =
            readings.iter().map(|r| r.observation(channel)).collect();
        self.segment(&observations)
    }
}

/// Instants where adjacent intervals change room but not display category
///
/// Renderers may draw a thin separator there; the intervals stay distinct.
pub fn soft_boundaries(intervals: &[OccupancyInterval]) -> Vec<NaiveDateTime> {
    intervals
        .windows(2)
        .filter(|pair| {
            pair[0].end == pair[1].start
                && pair[0].category == pair[1].category
                && pair[0].room != pair[1].room
        })
        .map(|pair| pair[0].end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::EntityKind;
    use chrono::NaiveDate;

    fn minute(m: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
            + TimeDelta::minutes(m)
    }

    fn observations(entity: i64, labels: &[Option<&str>]) -> Vec<Observation> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Observation {
                entity_id: EntityId(entity),
                kind: EntityKind::Patient,
                time: minute(i as i64),
                channel: Channel::Primary,
                room: label.map(str::to_string),
            })
            .collect()
    }

    fn spans(intervals: &[OccupancyInterval]) -> Vec<(&str, NaiveDateTime, NaiveDateTime)> {
        intervals.iter().map(|i| (i.room.as_str(), i.start, i.end)).collect()
    }

    #[test]
    fn test_runs_basic() {
        let items = [1, 1, 2, 2, 2, 1];
        let found: Vec<Run<i32>> = runs(&items, |x| *x).collect();
        assert_eq!(
            found,
            vec![
                Run { label: 1, start: 0, end: 2 },
                Run { label: 2, start: 2, end: 5 },
                Run { label: 1, start: 5, end: 6 },
            ]
        );
        assert_eq!(found[1].len(), 3);
    }

    #[test]
    fn test_runs_empty_and_restartable() {
        let empty: [i32; 0] = [];
        assert_eq!(runs(&empty, |x| *x).count(), 0);

        let items = ["a", "a", "b"];
        let iter = runs(&items, |x| *x);
        let again = iter.clone();
        assert_eq!(iter.count(), 2);
        assert_eq!(again.count(), 2);
    }

    #[test]
    fn test_discover_time_step() {
        let times = vec![minute(0), minute(3), minute(3), minute(4), minute(10)];
        assert_eq!(discover_time_step(times), Some(TimeDelta::minutes(1)));
        assert_eq!(discover_time_step(vec![minute(5), minute(5)]), None);
        assert_eq!(discover_time_step(Vec::new()), None);
    }

    #[test]
    fn test_constant_label_single_interval() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(5, &[Some("Exam1"); 10]);

        let intervals = segmenter.segment(&obs).unwrap();
        assert_eq!(spans(&intervals), vec![("Exam1", minute(0), minute(10))]);
        assert_eq!(intervals[0].category.as_str(), "Exam");
    }

    #[test]
    fn test_alternating_labels() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(
            5,
            &[Some("Exam1"), Some("Exam1"), Some("Field1"), Some("Field1"), Some("Exam1")],
        );

        let intervals = segmenter.segment(&obs).unwrap();
        assert_eq!(
            spans(&intervals),
            vec![
                ("Exam1", minute(0), minute(2)),
                ("Field1", minute(2), minute(4)),
                ("Exam1", minute(4), minute(5)),
            ]
        );
    }

    #[test]
    fn test_null_run_splits_but_is_not_emitted() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(5, &[Some("Admin"), None, None, Some("Admin")]);

        let intervals = segmenter.segment(&obs).unwrap();
        assert_eq!(
            spans(&intervals),
            vec![("Admin", minute(0), minute(1)), ("Admin", minute(3), minute(4))]
        );
    }

    #[test]
    fn test_empty_and_all_null_inputs() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));

        assert!(segmenter.segment(&[]).unwrap().is_empty());
        assert!(segmenter.segment(&observations(5, &[None, None, None])).unwrap().is_empty());
    }

    #[test]
    fn test_no_person_entity_discarded() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(0, &[Some("Exam1"), Some("Exam2")]);

        assert!(segmenter.segment(&obs).unwrap().is_empty());
    }

    #[test]
    fn test_unmapped_room_fails() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(5, &[Some("Exam1"), Some("Basement")]);

        let err = segmenter.segment(&obs).unwrap_err();
        assert!(matches!(err, PipelineError::UnmappedRoom { ref room } if room == "Basement"));
    }

    #[test]
    fn test_step_closes_interval() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::seconds(30), &rooms, EntityId(0));
        let obs = observations(5, &[Some("Treatment")]);

        let intervals = segmenter.segment(&obs).unwrap();
        assert_eq!(intervals[0].end, minute(0) + TimeDelta::seconds(30));
    }

    #[test]
    fn test_soft_boundaries_same_category_only() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let obs = observations(
            5,
            &[Some("Exam1"), Some("Exam2"), Some("Field1"), None, Some("Field2")],
        );

        let intervals = segmenter.segment(&obs).unwrap();
        assert_eq!(intervals.len(), 4);
        // Exam1 -> Exam2 touches and shares "Exam"; Field1 -> Field2 is separated by a null run
        assert_eq!(soft_boundaries(&intervals), vec![minute(1)]);
    }

    #[test]
    fn test_coverage_and_maximality() {
        let rooms = RoomCategories::clinic_defaults();
        let segmenter = Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0));
        let labels = [
            Some("Exam1"),
            None,
            Some("Exam1"),
            Some("Exam1"),
            Some("Checkout"),
            None,
            None,
            Some("Admin"),
            Some("Admin"),
        ];
        let obs = observations(9, &labels);
        let intervals = segmenter.segment(&obs).unwrap();

        // Adjacent emitted intervals never repeat a room back to back without a gap
        for pair in intervals.windows(2) {
            assert!(pair[0].room != pair[1].room || pair[0].end < pair[1].start);
            assert!(pair[0].end <= pair[1].start);
        }

        // Emitted minutes plus null minutes cover the whole range once
        let emitted: i64 = intervals.iter().map(|i| i.duration().num_minutes()).sum();
        let nulls = labels.iter().filter(|l| l.is_none()).count() as i64;
        assert_eq!(emitted + nulls, labels.len() as i64);
    }
}
