//! TOML configuration file and command-line overrides.
//!
//! ```toml
//! [pipeline]
//! city = "Lyon"
//! max_results = 40
//! max_attempts = 3
//! top_n = 5
//!
//! [pipeline.timeouts]
//! collect_secs = 1800
//!
//! [collector]
//! source = "snapshot"
//! snapshot = "data/paris.json"
//!
//! [notify]
//! directory = "notifications"
//! webhook_url = "https://hooks.example.com/T000/B000"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use reviewflow_model::PipelineOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pipeline: PipelineOptions,
    pub collector: CollectorConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorSource {
    #[default]
    GooglePlaces,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub source: CollectorSource,
    /// Batch file replayed when `source = "snapshot"`.
    pub snapshot: Option<PathBuf>,
    /// Review language requested from Google Places.
    pub language: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source: CollectorSource::default(),
            snapshot: None,
            language: "fr".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    /// Write the notification to the log.
    pub log: bool,
    /// Directory receiving one text file per run.
    pub directory: Option<PathBuf>,
    pub webhook_url: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            log: true,
            directory: None,
            webhook_url: None,
        }
    }
}

/// Values given on the command line. Each one replaces the file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub city: Option<String>,
    pub max_results: Option<usize>,
    pub max_attempts: Option<u32>,
    pub top_n: Option<usize>,
    pub snapshot: Option<PathBuf>,
    pub notify_dir: Option<PathBuf>,
    pub webhook_url: Option<String>,
}

impl Config {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("in {}", path.display()))
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Apply command-line overrides. A snapshot path also selects the
    /// snapshot source.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(city) = overrides.city {
            self.pipeline.city = city;
        }
        if let Some(max_results) = overrides.max_results {
            self.pipeline.max_results = max_results;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.pipeline.max_attempts = max_attempts;
        }
        if let Some(top_n) = overrides.top_n {
            self.pipeline.top_n = top_n;
        }
        if let Some(snapshot) = overrides.snapshot {
            self.collector.source = CollectorSource::Snapshot;
            self.collector.snapshot = Some(snapshot);
        }
        if let Some(dir) = overrides.notify_dir {
            self.notify.directory = Some(dir);
        }
        if let Some(url) = overrides.webhook_url {
            self.notify.webhook_url = Some(url);
        }
    }

    /// Validate the pipeline section and the collector/source pairing.
    pub fn validate(&self) -> Result<()> {
        self.pipeline
            .validate()
            .context("invalid [pipeline] section")?;
        if self.collector.source == CollectorSource::Snapshot && self.collector.snapshot.is_none()
        {
            anyhow::bail!("collector source is \"snapshot\" but no snapshot path is set");
        }
        Ok(())
    }
}
