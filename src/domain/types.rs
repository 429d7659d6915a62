//! Shared types for location readings and occupancy intervals

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for person IDs (CSN for patients, UMid for providers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which population a dataset describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patient,
    Provider,
}

impl EntityKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patient",
            EntityKind::Provider => "provider",
        }
    }

    /// CSV column holding the person identifier
    #[inline]
    pub fn id_column(&self) -> &'static str {
        match self {
            EntityKind::Patient => "CSN",
            EntityKind::Provider => "UMid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the two parallel room signals recorded per reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Primary,
    Secondary,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Primary, Channel::Secondary];

    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Channel::Primary => 0,
            Channel::Secondary => 1,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Primary => "primary",
            Channel::Secondary => "secondary",
        }
    }
}

/// Display grouping for a room label (e.g. every exam room maps to "Exam")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayCategory(pub String);

impl DisplayCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw per-minute row from an observation file
///
/// Carries both channels; `observation()` projects it onto one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub time: NaiveDateTime,
    pub rooms: [Option<String>; 2],
    /// Signal confidence per channel (parsed, not used by segmentation)
    pub signals: [Option<f64>; 2],
    /// Smoothed single-valued room, when the file carries `Room_HMM`
    pub smoothed_room: Option<String>,
    pub provider_type: Option<String>,
}

impl Reading {
    #[inline]
    pub fn day(&self) -> NaiveDate {
        self.time.date()
    }

    #[inline]
    pub fn room(&self, channel: Channel) -> Option<&str> {
        self.rooms[channel.index()].as_deref()
    }

    pub fn observation(&self, channel: Channel) -> Observation {
        Observation {
            entity_id: self.entity_id,
            kind: self.kind,
            time: self.time,
            channel,
            room: self.rooms[channel.index()].clone(),
        }
    }
}

/// A single-channel room observation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity_id: EntityId,
    pub kind: EntityKind,
    pub time: NaiveDateTime,
    pub channel: Channel,
    pub room: Option<String>,
}

/// Maximal contiguous stay of one entity in one room on one channel
///
/// `end` is exclusive: last observation time plus one time step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyInterval {
    pub entity_id: EntityId,
    pub channel: Channel,
    pub room: String,
    pub category: DisplayCategory,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl OccupancyInterval {
    #[inline]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A per-minute row of the smoothed, matched dataset
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPresenceRecord {
    pub person_id: EntityId,
    pub kind: EntityKind,
    pub room: Option<String>,
    pub provider_type: Option<String>,
    pub time: NaiveDateTime,
    /// Whether a counterpart shared the room this minute
    pub matched: bool,
}
