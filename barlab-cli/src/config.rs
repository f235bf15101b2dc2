//! Replay configuration files.
//!
//! TOML mirror of the `replay` command's flags:
//!
//! ```toml
//! [feed]
//! csv = "data/spy.csv"
//! realtime_bars = 3
//! updates_per_bar = 5
//! seed = 7
//!
//! [runner]
//! record_trace = true
//! max_drawings = 50
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayFileConfig {
    pub feed: FeedSection,
    #[serde(default)]
    pub runner: RunnerSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedSection {
    /// CSV bar file (date,open,high,low,close,volume).
    pub csv: PathBuf,
    /// Trailing bars delivered as realtime.
    #[serde(default)]
    pub realtime_bars: usize,
    /// Revisions per realtime bar, not counting the close.
    #[serde(default = "default_updates_per_bar")]
    pub updates_per_bar: u32,
    /// Seed for synthesized intrabar revisions.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    #[serde(default)]
    pub record_trace: bool,
    #[serde(default = "default_max_drawings")]
    pub max_drawings: usize,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            record_trace: false,
            max_drawings: default_max_drawings(),
        }
    }
}

fn default_updates_per_bar() -> u32 {
    4
}

fn default_seed() -> u64 {
    7
}

fn default_max_drawings() -> usize {
    50
}

impl ReplayFileConfig {
    /// Load a replay config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse a replay config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse replay config TOML")
    }
}
