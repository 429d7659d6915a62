//! RFID occupancy - timelines and facility statistics from location readings
//!
//! Module structure:
//! - `domain/` - Core types (readings, intervals, report tables, errors)
//! - `services/` - Grouping, segmentation, matching, aggregation
//! - `io/` - CSV loading, interval egress, SVG pages, text report
//! - `infra/` - Configuration

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rfid_occupancy::domain::{EntityKind, Reading};
use rfid_occupancy::infra::Config;
use rfid_occupancy::io::loader::{channel_columns, SMOOTHED_ROOM_COLUMN};
use rfid_occupancy::io::{load_matched, load_readings, report_writer, timeline_svg};
use rfid_occupancy::io::{CategoryPalette, CsvTable, Egress};
use rfid_occupancy::services::{
    daily_sessions, match_co_presence, require_time_step, Aggregator, Segmenter, TimelineBuilder,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// RFID occupancy - room timelines and co-presence statistics
#[derive(Parser, Debug)]
#[command(name = "rfid-occupancy", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment raw readings into intervals and render one page per day
    Timeline {
        /// Which dataset to render (defaults to dataset.mode from config)
        #[arg(short, long, value_enum)]
        dataset: Option<Dataset>,

        /// Stop after this many rendered days
        #[arg(long)]
        max_days: Option<usize>,
    },
    /// Flag minutes where a patient and a provider share a room
    Match,
    /// Write the facility statistics report from the matched datasets
    Summary,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dataset {
    Patient,
    Provider,
}

impl From<Dataset> for EntityKind {
    fn from(dataset: Dataset) -> Self {
        match dataset {
            Dataset::Patient => EntityKind::Patient,
            Dataset::Provider => EntityKind::Provider,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_DESCRIBE"),
        "rfid_occupancy_starting"
    );

    let config = Config::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config))?;
    info!(
        config_file = %config.config_file(),
        dataset_mode = %config.dataset_mode(),
        rooms = config.rooms().len(),
        "config_loaded"
    );

    match args.command {
        Command::Timeline { dataset, max_days } => {
            let kind = dataset.map(EntityKind::from).unwrap_or(config.dataset_mode());
            run_timeline(&config, kind, max_days)
        }
        Command::Match => run_match(&config),
        Command::Summary => run_summary(&config),
    }
}

fn run_timeline(config: &Config, kind: EntityKind, max_days: Option<usize>) -> anyhow::Result<()> {
    let path = config.observations_path(kind);
    let columns = channel_columns(|c| config.channel_column(c));
    let readings = load_readings(path, kind, columns)
        .with_context(|| format!("Failed to load {} observations from {}", kind, path))?;

    if readings.is_empty() {
        warn!(file = %path, "no_readings");
        return Ok(());
    }

    let step = require_time_step(&readings).with_context(|| format!("Invalid data in {}", path))?;
    info!(time_step_secs = step.num_seconds(), readings = readings.len(), "time_step_discovered");

    let mut policy = config.session_policy();
    if max_days.is_some() {
        policy.max_days = max_days;
    }
    let sessions = daily_sessions(readings, &policy);

    let segmenter = Segmenter::new(step, config.rooms(), config.no_person_id());
    let builder =
        TimelineBuilder::new(segmenter, config.window_start_hour(), config.window_end_hour());
    let palette = CategoryPalette::new(config.rooms().categories());

    let mut egress = Egress::create(config.intervals_path())?;
    let timeline_dir = Path::new(config.timeline_dir());

    for session in &sessions {
        let timeline = builder
            .build(session)
            .with_context(|| format!("Failed to segment {}", session.day))?;
        egress.write_day(&timeline)?;
        timeline_svg::write_day(timeline_dir, kind.as_str(), &timeline, &palette)?;
    }
    let intervals = egress.finish()?;

    info!(dataset = %kind, days = sessions.len(), intervals, "timeline_complete");
    Ok(())
}

fn run_match(config: &Config) -> anyhow::Result<()> {
    let columns = channel_columns(|c| config.channel_column(c));

    let load = |kind: EntityKind| -> anyhow::Result<(CsvTable, Vec<Reading>)> {
        let path = config.observations_path(kind);
        let table = CsvTable::read(path).with_context(|| format!("Failed to read {}", path))?;
        table.require(SMOOTHED_ROOM_COLUMN)?;
        let readings = table.readings(kind, columns)?;
        config
            .rooms()
            .check_labels(readings.iter().map(|r| r.smoothed_room.as_deref()))
            .with_context(|| format!("Unmapped room in {}", path))?;
        Ok((table, readings))
    };

    let (patient_table, patients) = load(EntityKind::Patient)?;
    let (provider_table, providers) = load(EntityKind::Provider)?;
    let flags = match_co_presence(&patients, &providers, config.no_signal_label());

    patient_table.write_with_match(config.matched_path(EntityKind::Patient), &flags.patients)?;
    provider_table.write_with_match(config.matched_path(EntityKind::Provider), &flags.providers)?;

    info!(
        patient_minutes = patients.len(),
        provider_minutes = providers.len(),
        matched_patient_minutes = flags.matched_patients(),
        matched_provider_minutes = flags.matched_providers(),
        "match_complete"
    );
    Ok(())
}

fn run_summary(config: &Config) -> anyhow::Result<()> {
    let patient_path = config.matched_path(EntityKind::Patient);
    let provider_path = config.matched_path(EntityKind::Provider);

    let patients = load_matched(patient_path, EntityKind::Patient)
        .with_context(|| format!("Failed to load {}", patient_path))?;
    let providers = load_matched(provider_path, EntityKind::Provider)
        .with_context(|| format!("Failed to load {}", provider_path))?;

    let report = Aggregator::checked(&patients, &providers, config.rooms())?.report();
    report_writer::write_report(config.report_path(), &report)?;

    info!(
        patient_minutes = patients.len(),
        provider_minutes = providers.len(),
        report = %config.report_path(),
        "summary_complete"
    );
    Ok(())
}
