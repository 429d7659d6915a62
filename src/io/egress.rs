//! Interval egress - writes segmented intervals to file
//!
//! Intervals are written in JSONL format (one JSON object per line).
//! The file is created (or truncated) once per run and every write error
//! is returned to the caller.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::types::OccupancyInterval;
use crate::services::timeline::DayTimeline;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Egress writer for occupancy intervals
pub struct Egress {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl Egress {
    /// Create the egress file, truncating output from a previous run
    pub fn create<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }

        let file = File::create(&path).map_err(|e| PipelineError::io(&path, e))?;
        info!(file_path = %path.display(), "egress_initialized");
        Ok(Self { path, writer: BufWriter::new(file), written: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one interval as a JSON line
    pub fn write_interval(&mut self, interval: &OccupancyInterval) -> PipelineResult<()> {
        let json = interval.to_json()?;
        writeln!(self.writer, "{}", json).map_err(|e| PipelineError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    /// Write every interval of a day, returning how many were written
    pub fn write_day(&mut self, timeline: &DayTimeline) -> PipelineResult<usize> {
        let mut count = 0;
        for interval in timeline.intervals() {
            self.write_interval(interval)?;
            count += 1;
        }
        debug!(day = %timeline.day, intervals = count, "day_intervals_egressed");
        Ok(count)
    }

    /// Flush buffered lines; returns the number of intervals written this run
    pub fn finish(mut self) -> PipelineResult<usize> {
        self.writer.flush().map_err(|e| PipelineError::io(&self.path, e))?;
        info!(file_path = %self.path.display(), intervals = self.written, "egress_finished");
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Channel, DisplayCategory, EntityId};
    use crate::services::timeline::TimelineRow;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::fs;
    use tempfile::tempdir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 3, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn interval(entity: i64, room: &str) -> OccupancyInterval {
        OccupancyInterval {
            entity_id: EntityId(entity),
            channel: Channel::Primary,
            room: room.to_string(),
            category: DisplayCategory::new("Exam"),
            start: at(9, 0),
            end: at(9, 30),
        }
    }

    fn timeline(intervals: Vec<OccupancyInterval>) -> DayTimeline {
        DayTimeline {
            day: at(0, 0).date(),
            window_start: at(7, 0),
            window_end: at(19, 0),
            rows: vec![TimelineRow {
                entity_id: EntityId(7),
                provider_type: None,
                channel: Channel::Primary,
                intervals,
                soft_boundaries: Vec::new(),
            }],
            legend: vec![DisplayCategory::new("Exam")],
        }
    }

    #[test]
    fn test_write_interval() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("intervals.jsonl");
        let mut egress = Egress::create(&file_path).unwrap();

        egress.write_interval(&interval(100, "Exam1")).unwrap();
        assert_eq!(egress.finish().unwrap(), 1);

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["entity_id"], 100);
        assert_eq!(parsed["room"], "Exam1");
        assert_eq!(parsed["start"], "2016-03-01T09:00:00");
    }

    #[test]
    fn test_write_day() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("intervals.jsonl");
        let mut egress = Egress::create(&file_path).unwrap();

        let day = timeline(vec![interval(7, "Exam1"), interval(7, "Exam2")]);
        assert_eq!(egress.write_day(&day).unwrap(), 2);
        assert_eq!(egress.finish().unwrap(), 2);

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_create_truncates() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("intervals.jsonl");
        fs::write(&file_path, "{\"existing\":\"data\"}\n").unwrap();

        let mut egress = Egress::create(&file_path).unwrap();
        egress.write_interval(&interval(1, "Admin")).unwrap();
        egress.finish().unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(!content.contains("existing"));
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("plain_file");
        fs::write(&blocker, "not a directory").unwrap();

        let result = Egress::create(blocker.join("intervals.jsonl"));
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
