//! Stellar spectrum analysis
//!
//! Loads tabulated wavelength/flux spectra, estimates the continuum with a
//! Savitzky-Golay filter, normalizes flux by that continuum, measures
//! absorption-line equivalent widths and draws static charts with the
//! catalogue line wavelengths overlaid.

pub mod config;
pub mod continuum;
pub mod equivalent_width;
pub mod integrate;
pub mod lines;
pub mod plot;
pub mod shared_args;
pub mod smoothing;
pub mod spectrum;
pub mod stars;

pub use config::AnalysisConfig;
pub use continuum::{normalize, normalize_all, ContinuumConfig, NormalizedSpectrum};
pub use equivalent_width::{equivalent_width, EquivalentWidthConfig, LineMeasurement};
pub use integrate::{simpson, trapezoid};
pub use lines::{AbsorptionLine, LineList};
pub use smoothing::SavitzkyGolay;
pub use spectrum::ObservedSpectrum;
pub use stars::{StarEntry, StarSet};
