use crate::config::AnalysisConfig;
use crate::lines::{LineList, LineListError};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Built-in absorption-line lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinLineList {
    /// Lines used to identify the problem stars (23 lines)
    ProblemStars,
    /// Lines marked on the stacked main-sequence chart (21 lines)
    MainSequence,
    /// Classification lines for early-type stars (11 lines)
    Classification,
    /// Classification lines plus Fe I 5270 (12 lines)
    ClassificationExtended,
    /// Balmer series with He I, Si III/IV and Ca I markers
    BalmerMetals,
}

impl std::fmt::Display for BuiltinLineList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinLineList::ProblemStars => write!(f, "problem-stars"),
            BuiltinLineList::MainSequence => write!(f, "main-sequence"),
            BuiltinLineList::Classification => write!(f, "classification"),
            BuiltinLineList::ClassificationExtended => write!(f, "classification-extended"),
            BuiltinLineList::BalmerMetals => write!(f, "balmer-metals"),
        }
    }
}

impl BuiltinLineList {
    /// Get the corresponding line list for the selected catalogue
    pub fn to_list(&self) -> LineList {
        match self {
            BuiltinLineList::ProblemStars => LineList::problem_stars(),
            BuiltinLineList::MainSequence => LineList::main_sequence(),
            BuiltinLineList::Classification => LineList::classification(),
            BuiltinLineList::ClassificationExtended => LineList::classification_extended(),
            BuiltinLineList::BalmerMetals => LineList::balmer_and_metals(),
        }
    }
}

/// Line list selection shared by every subcommand that marks lines
#[derive(Args, Debug, Clone)]
pub struct LineArgs {
    /// Built-in line list to overlay
    #[arg(long, value_enum, default_value_t = BuiltinLineList::ProblemStars)]
    pub lines: BuiltinLineList,

    /// JSON line list to use instead of a built-in one
    #[arg(long)]
    pub line_file: Option<PathBuf>,
}

impl LineArgs {
    /// Load the selected line list
    pub fn load(&self) -> Result<LineList, LineListError> {
        match &self.line_file {
            Some(path) => LineList::load_from_file(path),
            None => Ok(self.lines.to_list()),
        }
    }
}

/// Smoothing overrides shared by subcommands that normalize
#[derive(Args, Debug, Clone, Default)]
pub struct ContinuumArgs {
    /// Savitzky-Golay window length in samples (odd)
    #[arg(long)]
    pub window: Option<usize>,

    /// Savitzky-Golay polynomial order
    #[arg(long)]
    pub polyorder: Option<usize>,
}

impl ContinuumArgs {
    /// Apply command line overrides on top of a loaded config
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(window) = self.window {
            config.continuum.window_length = window;
        }
        if let Some(polyorder) = self.polyorder {
            config.continuum.polyorder = polyorder;
        }
    }
}

/// Equivalent-width overrides
#[derive(Args, Debug, Clone, Default)]
pub struct EquivalentWidthArgs {
    /// Half width (Å) of the integration window
    #[arg(long)]
    pub half_width: Option<f64>,
}

impl EquivalentWidthArgs {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(half_width) = self.half_width {
            config.equivalent_width.half_width = half_width;
        }
    }
}

/// Stacked chart overrides
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Vertical offset between spectra
    #[arg(long)]
    pub offset: Option<f64>,
}

impl StackArgs {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(offset) = self.offset {
            config.plot.flux_offset = offset;
        }
    }
}

/// Lines to measure: the explicit `--at` wavelengths named from the
/// catalogue, or the config's `ew_lines` when none were given
pub fn measurement_targets(
    catalogue: &LineList,
    at: &[f64],
    config: &AnalysisConfig,
) -> LineList {
    if at.is_empty() {
        catalogue.select(&config.ew_lines, config.line_tolerance)
    } else {
        catalogue.identify(at, config.line_tolerance)
    }
}

/// Load the analysis config, or the defaults when no file is given
pub fn load_config(
    path: Option<&PathBuf>,
) -> Result<AnalysisConfig, crate::config::ConfigError> {
    match path {
        Some(path) => AnalysisConfig::load_from_file(path),
        None => Ok(AnalysisConfig::default()),
    }
}
