//! Pipeline configuration, read from YAML with every field defaulted.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{cleaner::CleaningStrategy, io_utils};

pub const DEFAULT_RAW_DATA: &str = "data/raw/sales_data_sample.csv";
pub const DEFAULT_CLEANED_DATA: &str = "data/processed/sales_data_cleaned.csv";
pub const DEFAULT_DATABASE: &str = "data/processed/sales_analysis.db";
pub const DEFAULT_OUTPUT_DIR: &str = "data/final";
pub const DEFAULT_LOG_FILE: &str = "logs/sales_analysis.log";
pub const EXPORT_SUBDIR: &str = "exports";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartToggles {
    pub temporal: bool,
    pub product: bool,
    pub customer: bool,
    pub correlation: bool,
    pub dashboard: bool,
}

impl Default for ChartToggles {
    fn default() -> Self {
        Self {
            temporal: true,
            product: true,
            customer: true,
            correlation: true,
            dashboard: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_data: PathBuf,
    pub cleaned_data: PathBuf,
    pub database: PathBuf,
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
    /// One of `auto`, `drop` or `fill`; checked by [`PipelineConfig::strategy`].
    pub cleaning_strategy: String,
    pub charts: ChartToggles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from(DEFAULT_RAW_DATA),
            cleaned_data: PathBuf::from(DEFAULT_CLEANED_DATA),
            database: PathBuf::from(DEFAULT_DATABASE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            cleaning_strategy: CleaningStrategy::Auto.to_string(),
            charts: ChartToggles::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening config file {path:?}"))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config.strategy()?;
        Ok(config)
    }

    /// Loads `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing config")?;
        io_utils::write_text_atomically(path, &serialized)
    }

    pub fn strategy(&self) -> Result<CleaningStrategy> {
        Ok(self.cleaning_strategy.parse::<CleaningStrategy>()?)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.output_dir.join(EXPORT_SUBDIR)
    }

    /// Creates the directories every stage writes into and warns when the
    /// raw input is absent. Returns whether the raw input exists.
    pub fn validate(&self) -> Result<bool> {
        let parents = [
            self.cleaned_data.parent(),
            self.database.parent(),
            self.log_file.parent(),
        ];
        for dir in parents
            .into_iter()
            .flatten()
            .chain([self.output_dir.as_path()])
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            fs::create_dir_all(dir).with_context(|| format!("Creating directory {dir:?}"))?;
        }
        let present = self.raw_data.exists();
        if present {
            info!("Configuration validated; raw data at {:?}", self.raw_data);
        } else {
            warn!("Raw data file not found: {:?}", self.raw_data);
        }
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        fs::write(
            &path,
            "raw_data: input/sales.csv\ncleaning_strategy: drop\ncharts:\n  dashboard: false\n",
        )
        .unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.raw_data, PathBuf::from("input/sales.csv"));
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(config.strategy().unwrap(), CleaningStrategy::Drop);
        assert!(!config.charts.dashboard);
        assert!(config.charts.temporal);
    }

    #[test]
    fn unknown_strategy_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        fs::write(&path, "cleaning_strategy: interpolate\n").unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownStrategy(name)) if name == "interpolate"
        ));
    }

    #[test]
    fn validate_creates_directories_and_reports_missing_input() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let config = PipelineConfig {
            raw_data: root.join("raw/sales.csv"),
            cleaned_data: root.join("processed/cleaned.csv"),
            database: root.join("processed/sales.db"),
            output_dir: root.join("final"),
            log_file: root.join("logs/run.log"),
            ..PipelineConfig::default()
        };
        assert!(!config.validate().unwrap());
        assert!(root.join("processed").is_dir());
        assert!(root.join("final").is_dir());
        assert!(root.join("logs").is_dir());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        let mut config = PipelineConfig::default();
        config.charts.correlation = false;
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }
}
