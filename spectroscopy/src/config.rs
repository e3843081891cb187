//! Analysis configuration file
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "continuum": { "window_length": 151 },
//!   "equivalent_width": { "half_width": 8.0 },
//!   "ew_lines": [4102.0, 4340.0, 4860.0]
//! }
//! ```

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::continuum::ContinuumConfig;
use crate::equivalent_width::EquivalentWidthConfig;
use crate::lines::DEFAULT_EW_LINES;
use crate::plot::PlotStyle;

/// Errors that can occur while reading or writing a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters for normalization, measurement and charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub continuum: ContinuumConfig,
    pub equivalent_width: EquivalentWidthConfig,
    pub plot: PlotStyle,

    /// Wavelengths (Å) of the lines measured for equivalent widths
    pub ew_lines: Vec<f64>,

    /// Matching tolerance (Å) when looking up `ew_lines` in a line list
    pub line_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            continuum: ContinuumConfig::default(),
            equivalent_width: EquivalentWidthConfig::default(),
            plot: PlotStyle::default(),
            ew_lines: DEFAULT_EW_LINES.to_vec(),
            line_tolerance: 3.0,
        }
    }
}

impl AnalysisConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        info!("Loaded analysis config from {}", path.display());
        Ok(config)
    }
}
