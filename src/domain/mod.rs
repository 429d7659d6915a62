//! Domain models - value types shared by every stage
//!
//! - `types` - readings, observations, occupancy intervals, matched minutes
//! - `rooms` - room label to display category map
//! - `report` - statistics report tables
//! - `error` - pipeline error taxonomy

pub mod error;
pub mod report;
pub mod rooms;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use rooms::RoomCategories;
pub use types::{
    Channel, DisplayCategory, EntityId, EntityKind, MatchedPresenceRecord, Observation,
    OccupancyInterval, Reading,
};
