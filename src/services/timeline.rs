//! Day timeline assembly
//!
//! Combines grouping and segmentation into the renderer's input: one row
//! per (entity, channel), the sorted legend of categories present that
//! day, and the display window.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::types::{Channel, DisplayCategory, EntityId, OccupancyInterval};
use crate::services::grouper::DailySession;
use crate::services::segmenter::{soft_boundaries, Segmenter};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub entity_id: EntityId,
    pub provider_type: Option<String>,
    pub channel: Channel,
    pub intervals: Vec<OccupancyInterval>,
    pub soft_boundaries: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTimeline {
    pub day: NaiveDate,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub rows: Vec<TimelineRow>,
    /// Categories present in this day's intervals, sorted
    pub legend: Vec<DisplayCategory>,
}

impl DayTimeline {
    pub fn intervals(&self) -> impl Iterator<Item = &OccupancyInterval> {
        self.rows.iter().flat_map(|row| row.intervals.iter())
    }

    pub fn interval_count(&self) -> usize {
        self.rows.iter().map(|row| row.intervals.len()).sum()
    }
}

pub struct TimelineBuilder<'a> {
    segmenter: Segmenter<'a>,
    window_start_hour: u32,
    window_end_hour: u32,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(segmenter: Segmenter<'a>, window_start_hour: u32, window_end_hour: u32) -> Self {
        Self { segmenter, window_start_hour, window_end_hour }
    }

    fn window(&self, day: NaiveDate) -> PipelineResult<(NaiveDateTime, NaiveDateTime)> {
        let start = day.and_hms_opt(self.window_start_hour, 0, 0);
        let end = day.and_hms_opt(self.window_end_hour, 0, 0);
        match (start, end) {
            (Some(start), Some(end)) if start < end => Ok((start, end)),
            _ => Err(PipelineError::configuration(format!(
                "invalid display window {}:00-{}:00",
                self.window_start_hour, self.window_end_hour
            ))),
        }
    }

    pub fn build(&self, session: &DailySession) -> PipelineResult<DayTimeline> {
        let (window_start, window_end) = self.window(session.day)?;
        let mut rows = Vec::new();

        for (entity_id, readings) in &session.entities {
            if *entity_id == self.segmenter.no_person_id() {
                debug!(day = %session.day, entity_id = %entity_id, "no_person_entity_skipped");
                continue;
            }

            let intervals_by_channel = Channel::ALL
                .iter()
                .map(|&channel| {
                    self.segmenter
                        .segment_readings(readings, channel)
                        .map(|intervals| (channel, intervals))
                })
                .collect::<PipelineResult<Vec<_>>>()?;

            let provider_type = readings.first().and_then(|r| r.provider_type.clone());
            for (channel, intervals) in intervals_by_channel {
                rows.push(TimelineRow {
                    entity_id: *entity_id,
                    provider_type: provider_type.clone(),
                    channel,
                    soft_boundaries: soft_boundaries(&intervals),
                    intervals,
                });
            }
        }

        let legend: BTreeSet<&DisplayCategory> =
            rows.iter().flat_map(|row| row.intervals.iter().map(|i| &i.category)).collect();
        let legend = legend.into_iter().cloned().collect();

        Ok(DayTimeline { day: session.day, window_start, window_end, rows, legend })
    }

    /// Build every session's timeline, stopping at the first error
    pub fn build_all(&self, sessions: &[DailySession]) -> PipelineResult<Vec<DayTimeline>> {
        sessions.iter().map(|session| self.build(session)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rooms::RoomCategories;
    use crate::domain::types::{EntityKind, Reading};
    use crate::services::grouper::{daily_sessions, SessionPolicy};
    use chrono::TimeDelta;

    fn readings(entity: i64, rooms: &[(&str, &str)]) -> Vec<Reading> {
        let base = NaiveDate::from_ymd_opt(2016, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        rooms
            .iter()
            .enumerate()
            .map(|(i, (primary, secondary))| Reading {
                entity_id: EntityId(entity),
                kind: EntityKind::Provider,
                time: base + TimeDelta::minutes(i as i64),
                rooms: [Some(primary.to_string()), Some(secondary.to_string())],
                signals: [None, None],
                smoothed_room: None,
                provider_type: Some("Tech".to_string()),
            })
            .collect()
    }

    fn policy() -> SessionPolicy {
        SessionPolicy { min_observations: 1, ..SessionPolicy::default() }
    }

    #[test]
    fn test_rows_per_entity_and_channel() {
        let rooms = RoomCategories::clinic_defaults();
        let builder =
            TimelineBuilder::new(Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0)), 7, 19);

        let mut input = readings(5, &[("Exam1", "Field1"), ("Exam2", "Field1")]);
        input.extend(readings(6, &[("Admin", "Admin"), ("Admin", "Admin")]));
        let sessions = daily_sessions(input, &policy());

        let timeline = builder.build(&sessions[0]).unwrap();
        assert_eq!(timeline.rows.len(), 4);
        assert_eq!(timeline.rows[0].entity_id, EntityId(5));
        assert_eq!(timeline.rows[0].channel, Channel::Primary);
        assert_eq!(timeline.rows[1].channel, Channel::Secondary);
        assert_eq!(timeline.rows[0].provider_type.as_deref(), Some("Tech"));
        assert_eq!(timeline.rows[0].soft_boundaries.len(), 1);
        assert_eq!(timeline.interval_count(), 5);

        let legend: Vec<&str> = timeline.legend.iter().map(|c| c.as_str()).collect();
        assert_eq!(legend, vec!["Admin", "Exam", "Field"]);

        assert_eq!(timeline.window_start.format("%H:%M").to_string(), "07:00");
        assert_eq!(timeline.window_end.format("%H:%M").to_string(), "19:00");
    }

    #[test]
    fn test_no_person_rows_dropped() {
        let rooms = RoomCategories::clinic_defaults();
        let builder =
            TimelineBuilder::new(Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0)), 7, 19);

        let mut input = readings(0, &[("Exam1", "Exam1")]);
        input.extend(readings(4, &[("Exam3", "Exam3")]));
        let sessions = daily_sessions(input, &policy());

        let timeline = builder.build(&sessions[0]).unwrap();
        assert!(timeline.rows.iter().all(|row| row.entity_id == EntityId(4)));
        assert_eq!(timeline.rows.len(), 2);
    }

    #[test]
    fn test_invalid_window_is_configuration_error() {
        let rooms = RoomCategories::clinic_defaults();
        let builder =
            TimelineBuilder::new(Segmenter::new(TimeDelta::minutes(1), &rooms, EntityId(0)), 19, 7);
        let sessions = daily_sessions(readings(4, &[("Exam3", "Exam3")]), &policy());

        let err = builder.build(&sessions[0]).unwrap_err();
        assert!(err.is_configuration());
    }
}
