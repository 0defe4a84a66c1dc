//! Pipeline configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings shared by the CLI subcommands. Every field has a default, so an
/// empty (or absent) TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Seed for the synthetic data source
    pub seed: u64,
    /// Number of distinct order lines to generate (before duplicates)
    pub num_records: usize,
    /// Share of generated rows that get one cell blanked
    pub missing_rate: f64,
    /// Share of generated rows appended again as exact duplicates
    pub duplicate_rate: f64,
    /// Order dates are spread over this many days before now
    pub history_days: i64,
    /// Size of the best-seller tables
    pub top_n: usize,
    /// Width of the per-category price window, in standard deviations
    pub outlier_sigma: f64,

    pub raw_path: PathBuf,
    pub cleaned_path: PathBuf,
    pub output_dir: PathBuf,
    pub dashboard_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_records: 1200,
            missing_rate: 0.05,
            duplicate_rate: 0.02,
            history_days: 730,
            top_n: 10,
            outlier_sigma: 3.0,
            raw_path: PathBuf::from("raw_ecommerce_data.csv"),
            cleaned_path: PathBuf::from("cleaned_ecommerce_data.csv"),
            output_dir: PathBuf::from("analysis_output"),
            dashboard_path: PathBuf::from("dashboard.html"),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
