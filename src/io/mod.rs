//! IO modules - file interfaces
//!
//! - `loader` - CSV (optionally gzipped) observation and matched-presence files
//! - `egress` - Interval output to file (JSONL format)
//! - `timeline_svg` - One SVG timeline page per rendered day
//! - `report_writer` - Plain-text statistics report

pub mod egress;
pub mod loader;
pub mod report_writer;
pub mod timeline_svg;

// Re-export commonly used types
pub use egress::Egress;
pub use loader::{load_matched, load_readings, CsvTable};
pub use timeline_svg::CategoryPalette;
