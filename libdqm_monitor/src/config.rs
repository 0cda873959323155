use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::constants::{CURRENT_RUN, DEFAULT_PROGRAM};
use super::error::ConfigError;
use super::source::{PlotSource, RetrievalSource};

/// One plot of the monitor: a title and the histograms drawn on it, in drawing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub title: String,
    #[serde(default)]
    pub series: Vec<RetrievalSource>,
}

impl PlotConfig {
    /// The source to register for this plot. A plot without series is registered unbound.
    pub fn source(&self) -> Option<PlotSource> {
        if self.series.is_empty() {
            None
        } else {
            Some(PlotSource::new(self.series.clone()))
        }
    }
}

/// Structure representing the monitor configuration. Contains the backend, run and plot
/// information. Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub program: String,
    pub run_numbers: Vec<u32>,
    pub update_interval_ms: u64,
    pub replay_path: PathBuf,
    pub plots: Vec<PlotConfig>,
}

impl Default for Config {
    /// Generate a template Config, watching two histograms of the current run
    fn default() -> Self {
        Self {
            program: String::from(DEFAULT_PROGRAM),
            run_numbers: vec![CURRENT_RUN],
            update_interval_ms: 2000,
            replay_path: PathBuf::from("./replies"),
            plots: vec![
                PlotConfig {
                    title: String::from("Hit pattern"),
                    series: vec![RetrievalSource::new("demo/hitmap")],
                },
                PlotConfig {
                    title: String::from("Pad plane"),
                    series: vec![RetrievalSource::new("demo/pad_plane")],
                },
            ],
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file, replacing anything already there
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Time between the end of one update cycle and the start of the next. Zero means a
    /// single cycle with no automatic repeat.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Check that the directory of recorded replies exists
    pub fn get_replay_directory(&self) -> Result<&Path, ConfigError> {
        if self.replay_path.is_dir() {
            Ok(&self.replay_path)
        } else {
            Err(ConfigError::BadFilePath(self.replay_path.clone()))
        }
    }

    pub fn has_plots(&self) -> bool {
        !self.plots.is_empty()
    }
}
