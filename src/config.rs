//! Tracker configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::bulk::DEFAULT_HEADER_KEYWORD;
use crate::publish::BoardSettings;
use crate::ranking::{DEFAULT_MIN_GAMES_AVERAGE, TOP_N};
use crate::tracker::TrackerSettings;
use crate::view::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub boards: BoardsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

impl Config {
    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            average_destination: self.boards.average_destination.clone(),
            kills_destination: self.boards.kills_destination.clone(),
            history_destination: self.boards.history_destination.clone(),
            min_games_average: self.boards.min_games_average,
            top_n: self.boards.top_n,
            page_size: self.view.page_size,
            fallback_discovery: self.boards.fallback_discovery,
            discovery_limit: self.boards.discovery_limit,
            placeholder_label: self.identity.placeholder.clone(),
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            require_known: self.identity.require_known,
            header_keyword: self.import.header_keyword.clone(),
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the ledger, aggregate and registry files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,

    #[serde(default = "default_aggregate_file")]
    pub aggregate_file: String,

    #[serde(default = "default_registry_file")]
    pub registry_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: default_ledger_file(),
            aggregate_file: default_aggregate_file(),
            registry_file: default_registry_file(),
        }
    }
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn aggregate_path(&self) -> PathBuf {
        self.data_dir.join(&self.aggregate_file)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.registry_file)
    }
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_ledger_file() -> String { "capts.json".to_string() }
fn default_aggregate_file() -> String { "stats.json".to_string() }
fn default_registry_file() -> String { "artifacts.json".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardsConfig {
    /// Root directory of the file channel; destinations are subdirectories
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default)]
    pub average_destination: Option<String>,

    #[serde(default)]
    pub kills_destination: Option<String>,

    #[serde(default)]
    pub history_destination: Option<String>,

    /// Games needed to appear on the average damage board
    #[serde(default = "default_min_games_average")]
    pub min_games_average: u64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_true")]
    pub fallback_discovery: bool,

    #[serde(default = "default_discovery_limit")]
    pub discovery_limit: usize,
}

impl Default for BoardsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            average_destination: None,
            kills_destination: None,
            history_destination: None,
            min_games_average: default_min_games_average(),
            top_n: default_top_n(),
            fallback_discovery: true,
            discovery_limit: default_discovery_limit(),
        }
    }
}

fn default_artifact_dir() -> PathBuf { PathBuf::from("boards") }
fn default_min_games_average() -> u64 { DEFAULT_MIN_GAMES_AVERAGE }
fn default_top_n() -> usize { TOP_N }
fn default_discovery_limit() -> usize { 50 }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between full refreshes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_interval() -> u64 { 300 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize { DEFAULT_PAGE_SIZE }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// TOML roster with a `[members]` table
    #[serde(default)]
    pub roster_file: Option<PathBuf>,

    #[serde(default)]
    pub require_known: bool,

    /// `{id}` is replaced with the participant id
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            roster_file: None,
            require_known: false,
            placeholder: default_placeholder(),
        }
    }
}

fn default_placeholder() -> String { "Player {id}".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Word that opens a match header in bulk imports, matched case-insensitively.
    /// Upload files written for a Russian-speaking guild need
    /// `header_keyword = "Семья"`.
    #[serde(default = "default_header_keyword")]
    pub header_keyword: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_keyword: default_header_keyword(),
        }
    }
}

fn default_header_keyword() -> String { DEFAULT_HEADER_KEYWORD.to_string() }
