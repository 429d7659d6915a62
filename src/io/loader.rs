//! CSV loading and writing for observation and matched-presence files
//!
//! Paths ending in `.gz` are gzip (de)compressed transparently. Columns are
//! looked up by header name; a missing required column, an unparseable
//! timestamp or id, or an unknown match flag aborts loading of that file.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::types::{Channel, EntityId, EntityKind, MatchedPresenceRecord, Reading};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

pub const TIME_COLUMN: &str = "Time";
pub const PROVIDER_COLUMN: &str = "Provider";
pub const SMOOTHED_ROOM_COLUMN: &str = "Room_HMM";
pub const MATCH_COLUMN: &str = "Match";

/// Signal column paired with a room column (`Room1` -> `Signal1`)
fn signal_column(room_column: &str) -> Option<String> {
    room_column.strip_prefix("Room").map(|suffix| format!("Signal{}", suffix))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn open_input(path: &Path) -> PipelineResult<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Output file, optionally gzip compressed
enum OutputSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputSink {
    fn create(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }
        let writer = BufWriter::new(File::create(path).map_err(|e| PipelineError::io(path, e))?);
        if is_gzip(path) {
            Ok(Self::Gzip(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(Self::Plain(writer))
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(mut w) => w.flush(),
            Self::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

/// Parse the timestamp formats the upstream exporters produce
pub fn parse_time(value: &str) -> PipelineResult<NaiveDateTime> {
    const FORMATS: [&str; 4] =
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| PipelineError::data_integrity(format!("unparseable timestamp '{}'", value)))
}

/// Parse a `T`/`F` co-presence flag
pub fn parse_match(value: &str) -> PipelineResult<bool> {
    match value.trim() {
        "T" | "1" | "true" | "True" => Ok(true),
        "F" | "0" | "false" | "False" => Ok(false),
        other => Err(PipelineError::data_integrity(format!("unknown match flag '{}'", other))),
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// An in-memory CSV file: header plus raw records
#[derive(Debug, Clone)]
pub struct CsvTable {
    name: String,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CsvTable {
    pub fn read<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new().flexible(false).from_reader(open_input(path)?);

        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        info!(file = %path.display(), rows = rows.len(), "csv_loaded");

        Ok(Self { name: path.display().to_string(), headers, rows })
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == column)
    }

    pub fn require(&self, column: &str) -> PipelineResult<usize> {
        self.position(column).ok_or_else(|| PipelineError::MissingColumn {
            column: column.to_string(),
            source_name: self.name.clone(),
        })
    }

    fn parse_id(&self, row: &StringRecord, idx: usize) -> PipelineResult<EntityId> {
        let raw = row.get(idx).unwrap_or("").trim();
        raw.parse::<i64>().map(EntityId).map_err(|_| {
            let message = format!("unparseable person id '{}' in {}", raw, self.name);
            PipelineError::data_integrity(message)
        })
    }

    /// Interpret rows as raw location readings
    ///
    /// `columns` names the CSV column read for each channel.
    pub fn readings(&self, kind: EntityKind, columns: [&str; 2]) -> PipelineResult<Vec<Reading>> {
        let id_idx = self.require(kind.id_column())?;
        let time_idx = self.require(TIME_COLUMN)?;
        let room_idx = [self.require(columns[0])?, self.require(columns[1])?];
        let signal_idx = columns.map(|c| signal_column(c).and_then(|s| self.position(&s)));
        let smoothed_idx = self.position(SMOOTHED_ROOM_COLUMN);
        let provider_idx = self.position(PROVIDER_COLUMN);

        self.rows
            .iter()
            .map(|row| {
                let signals = signal_idx.map(|idx| {
                    idx.and_then(|i| row.get(i)).and_then(|v| v.trim().parse::<f64>().ok())
                });
                Ok(Reading {
                    entity_id: self.parse_id(row, id_idx)?,
                    kind,
                    time: parse_time(row.get(time_idx).unwrap_or(""))?,
                    rooms: room_idx.map(|i| optional(row.get(i))),
                    signals,
                    smoothed_room: smoothed_idx.and_then(|i| optional(row.get(i))),
                    provider_type: provider_idx.and_then(|i| optional(row.get(i))),
                })
            })
            .collect()
    }

    /// Interpret rows as matched-presence minutes
    pub fn matched_records(&self, kind: EntityKind) -> PipelineResult<Vec<MatchedPresenceRecord>> {
        let id_idx = self.require(kind.id_column())?;
        let time_idx = self.require(TIME_COLUMN)?;
        let room_idx = self.require(SMOOTHED_ROOM_COLUMN)?;
        let match_idx = self.require(MATCH_COLUMN)?;
        let provider_idx = match kind {
            EntityKind::Provider => Some(self.require(PROVIDER_COLUMN)?),
            EntityKind::Patient => None,
        };

        self.rows
            .iter()
            .map(|row| {
                Ok(MatchedPresenceRecord {
                    person_id: self.parse_id(row, id_idx)?,
                    kind,
                    room: optional(row.get(room_idx)),
                    provider_type: provider_idx.and_then(|i| optional(row.get(i))),
                    time: parse_time(row.get(time_idx).unwrap_or(""))?,
                    matched: parse_match(row.get(match_idx).unwrap_or(""))?,
                })
            })
            .collect()
    }

    /// Write the table with the `Match` column set from `flags`
    ///
    /// An existing `Match` column is overwritten, otherwise one is appended.
    pub fn write_with_match<P: AsRef<Path>>(&self, path: P, flags: &[bool]) -> PipelineResult<()> {
        let path = path.as_ref();
        if flags.len() != self.rows.len() {
            return Err(PipelineError::data_integrity(format!(
                "{} match flags for {} rows of {}",
                flags.len(),
                self.rows.len(),
                self.name
            )));
        }

        let match_idx = self.position(MATCH_COLUMN);
        let mut headers = self.headers.clone();
        if match_idx.is_none() {
            headers.push_field(MATCH_COLUMN);
        }

        let mut writer = WriterBuilder::new().from_writer(OutputSink::create(path)?);
        writer.write_record(&headers)?;
        for (row, &matched) in self.rows.iter().zip(flags) {
            let flag = if matched { "T" } else { "F" };
            let record: StringRecord = match match_idx {
                Some(idx) => row
                    .iter()
                    .enumerate()
                    .map(|(i, field)| if i == idx { flag } else { field })
                    .collect(),
                None => row.iter().chain(std::iter::once(flag)).collect(),
            };
            writer.write_record(&record)?;
        }

        let sink = writer.into_inner().map_err(|e| PipelineError::io(path, e.into_error()))?;
        sink.finish().map_err(|e| PipelineError::io(path, e))?;
        debug!(file = %path.display(), rows = self.rows.len(), "matched_csv_written");
        Ok(())
    }
}

/// Load raw readings using the configured channel columns
pub fn load_readings<P: AsRef<Path>>(
    path: P,
    kind: EntityKind,
    columns: [&str; 2],
) -> PipelineResult<Vec<Reading>> {
    CsvTable::read(path)?.readings(kind, columns)
}

/// Load a matched-presence dataset
pub fn load_matched<P: AsRef<Path>>(
    path: P,
    kind: EntityKind,
) -> PipelineResult<Vec<MatchedPresenceRecord>> {
    CsvTable::read(path)?.matched_records(kind)
}

/// Channel columns in channel order
pub fn channel_columns<'a>(column: impl Fn(Channel) -> &'a str) -> [&'a str; 2] {
    Channel::ALL.map(column)
}
