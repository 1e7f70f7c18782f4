//! Configuration types for the profiling pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for region selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Sphere radius in dataset units.
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Field whose weight each sample carries (mass by default).
    #[serde(default = "default_weight_field")]
    pub weight_field: String,

    /// Field whose global maximum locates the default sphere center.
    #[serde(default = "default_center_field")]
    pub center_field: String,
}

fn default_radius() -> f64 {
    1000.0
}

fn default_weight_field() -> String {
    "gas:mass".to_string()
}

fn default_center_field() -> String {
    "gas:density".to_string()
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            weight_field: default_weight_field(),
            center_field: default_center_field(),
        }
    }
}

/// Configuration for profile binning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Number of bins.
    #[serde(default = "default_n_bins")]
    pub n_bins: usize,

    /// Lower extremum of the bin field.
    #[serde(default = "default_extrema_low")]
    pub extrema_low: f64,

    /// Upper extremum of the bin field.
    #[serde(default = "default_extrema_high")]
    pub extrema_high: f64,

    /// Use log-spaced bins.
    #[serde(default = "default_log_spaced")]
    pub log_spaced: bool,
}

fn default_n_bins() -> usize {
    64
}

fn default_extrema_low() -> f64 {
    0.1
}

fn default_extrema_high() -> f64 {
    1000.0
}

fn default_log_spaced() -> bool {
    true
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            n_bins: default_n_bins(),
            extrema_low: default_extrema_low(),
            extrema_high: default_extrema_high(),
            log_spaced: default_log_spaced(),
        }
    }
}

/// Configuration for plot output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Render with log-log axes.
    #[serde(default = "default_log_axes")]
    pub log_axes: bool,
}

fn default_log_axes() -> bool {
    true
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            log_axes: default_log_axes(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub binning: BinningConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
