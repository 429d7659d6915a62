//! Services - segmentation, aggregation and matching
//!
//! - `grouper` - partitions readings by day and entity, admits days
//! - `segmenter` - run-length segmentation into occupancy intervals
//! - `timeline` - assembles per-day renderer input
//! - `matcher` - patient/provider co-presence flags
//! - `aggregator` - facility statistics report
//! - `stats` - descriptive statistics helpers

pub mod aggregator;
pub mod grouper;
pub mod matcher;
pub mod segmenter;
pub mod stats;
pub mod timeline;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use grouper::{daily_sessions, DailySession, SessionPolicy};
pub use matcher::{match_co_presence, MatchFlags};
pub use segmenter::{discover_time_step, require_time_step, Segmenter};
pub use timeline::{DayTimeline, TimelineBuilder};
