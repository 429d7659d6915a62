//! Configuration loading from TOML files
//!
//! The binary picks the file from `--config`, then the `CONFIG_FILE`
//! environment variable, then `config/dev.toml`. A missing file means
//! built-in defaults; a file that exists but fails to parse or validate
//! is an error.

use crate::domain::rooms::RoomCategories;
use crate::domain::types::{Channel, EntityId, EntityKind};
use crate::services::grouper::SessionPolicy;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_patient_observations")]
    pub patient_observations: String,
    #[serde(default = "default_provider_observations")]
    pub provider_observations: String,
    #[serde(default = "default_patient_matched")]
    pub patient_matched: String,
    #[serde(default = "default_provider_matched")]
    pub provider_matched: String,
    /// JSONL output for segmented intervals
    #[serde(default = "default_intervals")]
    pub intervals: String,
    /// Directory receiving one SVG page per rendered day
    #[serde(default = "default_timeline_dir")]
    pub timeline_dir: String,
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            patient_observations: default_patient_observations(),
            provider_observations: default_provider_observations(),
            patient_matched: default_patient_matched(),
            provider_matched: default_provider_matched(),
            intervals: default_intervals(),
            timeline_dir: default_timeline_dir(),
            report: default_report(),
        }
    }
}

fn default_patient_observations() -> String {
    "patient_locations_s.csv.gz".to_string()
}

fn default_provider_observations() -> String {
    "provider_locations_s.csv.gz".to_string()
}

fn default_patient_matched() -> String {
    "patient_locations_sm.csv.gz".to_string()
}

fn default_provider_matched() -> String {
    "provider_locations_sm.csv.gz".to_string()
}

fn default_intervals() -> String {
    "intervals.jsonl".to_string()
}

fn default_timeline_dir() -> String {
    "timelines".to_string()
}

fn default_report() -> String {
    "rfid_summaries.txt".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_mode")]
    pub mode: EntityKind,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self { mode: default_mode() }
    }
}

fn default_mode() -> EntityKind {
    EntityKind::Provider
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsConfig {
    /// CSV column read as the primary channel
    #[serde(default = "default_primary_column")]
    pub primary: String,
    /// CSV column read as the secondary channel (may be Room_HMM)
    #[serde(default = "default_secondary_column")]
    pub secondary: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self { primary: default_primary_column(), secondary: default_secondary_column() }
    }
}

fn default_primary_column() -> String {
    "Room1".to_string()
}

fn default_secondary_column() -> String {
    "Room2".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
    #[serde(default = "default_skip_weekends")]
    pub skip_weekends: bool,
    /// Entity id meaning "tag not assigned to anyone"
    #[serde(default)]
    pub no_person_id: i64,
    /// Stop after this many rendered days
    #[serde(default)]
    pub max_days: Option<usize>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            min_observations: default_min_observations(),
            skip_weekends: default_skip_weekends(),
            no_person_id: 0,
            max_days: None,
        }
    }
}

fn default_min_observations() -> usize {
    100
}

fn default_skip_weekends() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_window_start_hour")]
    pub window_start_hour: u32,
    #[serde(default = "default_window_end_hour")]
    pub window_end_hour: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            window_start_hour: default_window_start_hour(),
            window_end_hour: default_window_end_hour(),
        }
    }
}

fn default_window_start_hour() -> u32 {
    7
}

fn default_window_end_hour() -> u32 {
    19
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_no_signal_label")]
    pub no_signal_label: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { no_signal_label: default_no_signal_label() }
    }
}

fn default_no_signal_label() -> String {
    "NoSignal".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Room label -> display category; replaces the built-in map when set
    #[serde(default)]
    pub rooms: Option<BTreeMap<String, String>>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    files: FilesConfig,
    dataset_mode: EntityKind,
    primary_column: String,
    secondary_column: String,
    min_observations: usize,
    skip_weekends: bool,
    no_person_id: EntityId,
    max_days: Option<usize>,
    window_start_hour: u32,
    window_end_hour: u32,
    no_signal_label: String,
    rooms: RoomCategories,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let rooms = match toml_config.rooms {
            Some(map) => RoomCategories::new(map),
            None => RoomCategories::clinic_defaults(),
        };

        Self {
            files: toml_config.files,
            dataset_mode: toml_config.dataset.mode,
            primary_column: toml_config.channels.primary,
            secondary_column: toml_config.channels.secondary,
            min_observations: toml_config.sessions.min_observations,
            skip_weekends: toml_config.sessions.skip_weekends,
            no_person_id: EntityId(toml_config.sessions.no_person_id),
            max_days: toml_config.sessions.max_days,
            window_start_hour: toml_config.timeline.window_start_hour,
            window_end_hour: toml_config.timeline.window_end_hour,
            no_signal_label: toml_config.matching.no_signal_label,
            rooms,
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if toml_config.timeline.window_start_hour >= toml_config.timeline.window_end_hour
            || toml_config.timeline.window_end_hour > 23
        {
            anyhow::bail!(
                "Invalid timeline window {}-{} in {}",
                toml_config.timeline.window_start_hour,
                toml_config.timeline.window_end_hour,
                path.display()
            );
        }

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration, using defaults only when the file does not exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(config_file = %path.display(), "config_missing_using_defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Raw observation file for a dataset
    pub fn observations_path(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Patient => &self.files.patient_observations,
            EntityKind::Provider => &self.files.provider_observations,
        }
    }

    /// Matched-presence file for a dataset
    pub fn matched_path(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Patient => &self.files.patient_matched,
            EntityKind::Provider => &self.files.provider_matched,
        }
    }

    /// CSV column read for a channel
    pub fn channel_column(&self, channel: Channel) -> &str {
        match channel {
            Channel::Primary => &self.primary_column,
            Channel::Secondary => &self.secondary_column,
        }
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            min_observations: self.min_observations,
            skip_weekends: self.skip_weekends,
            max_days: self.max_days,
        }
    }

    pub fn dataset_mode(&self) -> EntityKind {
        self.dataset_mode
    }

    pub fn intervals_path(&self) -> &str {
        &self.files.intervals
    }

    pub fn timeline_dir(&self) -> &str {
        &self.files.timeline_dir
    }

    pub fn report_path(&self) -> &str {
        &self.files.report
    }

    pub fn no_person_id(&self) -> EntityId {
        self.no_person_id
    }

    pub fn window_start_hour(&self) -> u32 {
        self.window_start_hour
    }

    pub fn window_end_hour(&self) -> u32 {
        self.window_end_hour
    }

    pub fn no_signal_label(&self) -> &str {
        &self.no_signal_label
    }

    pub fn rooms(&self) -> &RoomCategories {
        &self.rooms
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to lower the per-day threshold
    #[cfg(test)]
    pub fn with_min_observations(mut self, min: usize) -> Self {
        self.min_observations = min;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset_mode(), EntityKind::Provider);
        assert_eq!(config.channel_column(Channel::Primary), "Room1");
        assert_eq!(config.channel_column(Channel::Secondary), "Room2");
        assert_eq!(config.no_person_id(), EntityId(0));
        assert_eq!(config.window_start_hour(), 7);
        assert_eq!(config.window_end_hour(), 19);
        assert_eq!(config.no_signal_label(), "NoSignal");
        assert_eq!(config.config_file(), "default");
        assert_eq!(config.rooms().len(), 26);
    }

    #[test]
    fn test_session_policy_defaults() {
        let policy = Config::default().session_policy();
        assert_eq!(policy.min_observations, 100);
        assert!(policy.skip_weekends);
        assert_eq!(policy.max_days, None);

        let policy = Config::default().with_min_observations(5).session_policy();
        assert_eq!(policy.min_observations, 5);
    }

    #[test]
    fn test_paths_by_kind() {
        let config = Config::default();
        assert_eq!(config.observations_path(EntityKind::Patient), "patient_locations_s.csv.gz");
        assert_eq!(config.matched_path(EntityKind::Provider), "provider_locations_sm.csv.gz");
        assert_eq!(config.report_path(), "rfid_summaries.txt");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from_path("/nonexistent/rfid-occupancy.toml").unwrap();
        assert_eq!(config.config_file(), "default");
        assert_eq!(config.rooms().len(), 26);
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[files\nintervals = 3\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}
