//! Equivalent width of absorption lines
//!
//! The equivalent width is the width of a zero-flux rectangle that removes
//! the same integrated flux as the line. It is measured by integrating
//! `1 - f / f_c` with Simpson's rule over a fixed window centred on the line,
//! where the local continuum `f_c` is the mean of the first few flux samples
//! at the blue edge of the window.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::integrate::{simpson, IntegrationError};
use crate::lines::AbsorptionLine;
use crate::spectrum::ObservedSpectrum;

/// Errors that can occur while measuring one line
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EquivalentWidthError {
    #[error("Line at {center} Å lies outside the spectrum ({lower}..{upper} Å)")]
    LineOutOfRange { center: f64, lower: f64, upper: f64 },

    #[error("Integration window holds {found} samples, need at least 2")]
    TooFewSamples { found: usize },

    #[error("Local continuum is zero")]
    ZeroContinuum,

    #[error("Integration window contains non-finite flux")]
    NonFiniteFlux,

    #[error("Integration failed: {0}")]
    Integration(#[from] IntegrationError),
}

/// Window parameters for equivalent-width measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquivalentWidthConfig {
    /// Half width of the integration window in Ångström
    pub half_width: f64,

    /// Number of leading window samples averaged for the local continuum
    pub continuum_samples: usize,
}

impl Default for EquivalentWidthConfig {
    fn default() -> Self {
        Self {
            half_width: 5.0,
            continuum_samples: 5,
        }
    }
}

/// Equivalent width in Ångström of the line centred on `line_center`.
///
/// Positive for absorption, negative for emission.
pub fn equivalent_width(
    spectrum: &ObservedSpectrum,
    line_center: f64,
    config: &EquivalentWidthConfig,
) -> Result<f64, EquivalentWidthError> {
    if !spectrum.covers(line_center) {
        let (lower, upper) = spectrum.range();
        return Err(EquivalentWidthError::LineOutOfRange {
            center: line_center,
            lower,
            upper,
        });
    }

    let (wavelengths, flux) = spectrum.select(
        line_center - config.half_width,
        line_center + config.half_width,
    );

    if wavelengths.len() < 2 {
        return Err(EquivalentWidthError::TooFewSamples {
            found: wavelengths.len(),
        });
    }
    if flux.iter().any(|f| !f.is_finite()) {
        return Err(EquivalentWidthError::NonFiniteFlux);
    }

    let leading = &flux[..config.continuum_samples.clamp(1, flux.len())];
    let continuum = leading.iter().sum::<f64>() / leading.len() as f64;
    if continuum == 0.0 {
        return Err(EquivalentWidthError::ZeroContinuum);
    }

    let depth: Vec<f64> = flux.iter().map(|f| 1.0 - f / continuum).collect();
    let ew = simpson(wavelengths, &depth)?;

    debug!(
        "EW at {:.2} Å: {:.4} Å over {} samples (continuum {:.4})",
        line_center,
        ew,
        wavelengths.len(),
        continuum
    );

    Ok(ew)
}

/// Result of measuring one catalogue line
#[derive(Debug, Clone)]
pub struct LineMeasurement {
    pub line: AbsorptionLine,
    pub result: Result<f64, EquivalentWidthError>,
}

impl std::fmt::Display for LineMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(ew) => write!(
                f,
                "Equivalent Width of {} at {} Å: {:.2} Å",
                self.line.label, self.line.wavelength, ew
            ),
            Err(e) => write!(
                f,
                "Equivalent Width of {} at {} Å: unavailable ({})",
                self.line.label, self.line.wavelength, e
            ),
        }
    }
}

/// Measure every given line, keeping failures per line
pub fn measure_lines<'a, I>(
    spectrum: &ObservedSpectrum,
    lines: I,
    config: &EquivalentWidthConfig,
) -> Vec<LineMeasurement>
where
    I: IntoIterator<Item = &'a AbsorptionLine>,
{
    lines
        .into_iter()
        .map(|line| {
            let result = equivalent_width(spectrum, line.wavelength, config);
            if let Err(e) = &result {
                warn!("{} at {} Å: {}", line.label, line.wavelength, e);
            }
            LineMeasurement {
                line: line.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| 4080.0 + i as f64 * step).collect()
    }

    #[test]
    fn test_flat_spectrum_has_zero_width() {
        let spectrum = ObservedSpectrum::new(grid(0.25, 200), vec![1.0; 200]).unwrap();
        let ew = equivalent_width(&spectrum, 4102.0, &EquivalentWidthConfig::default()).unwrap();
        assert_relative_eq!(ew, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rectangular_notch() {
        // Notch of depth 0.5 between 4100 and 4104 Å sampled every 0.1 Å
        let wavelengths = grid(0.1, 400);
        let flux: Vec<f64> = wavelengths
            .iter()
            .map(|&w| if (4100.0..=4104.0).contains(&w) { 0.5 } else { 1.0 })
            .collect();
        let spectrum = ObservedSpectrum::new(wavelengths, flux).unwrap();

        let ew = equivalent_width(&spectrum, 4102.0, &EquivalentWidthConfig::default()).unwrap();
        // Sharp edges cost a fraction of one sample spacing
        assert_relative_eq!(ew, 2.0, epsilon = 0.1);
    }

    #[test]
    fn test_gaussian_line_matches_analytic_area() {
        let depth: f64 = 0.4;
        let sigma: f64 = 0.6;
        let wavelengths = grid(0.05, 1000);
        let flux: Vec<f64> = wavelengths
            .iter()
            .map(|&w| {
                let d = (w - 4102.0) / sigma;
                1.0 - depth * (-0.5 * d * d).exp()
            })
            .collect();
        let spectrum = ObservedSpectrum::new(wavelengths, flux).unwrap();

        let ew = equivalent_width(&spectrum, 4102.0, &EquivalentWidthConfig::default()).unwrap();
        let expected = depth * sigma * (2.0 * std::f64::consts::PI).sqrt();
        assert_relative_eq!(ew, expected, epsilon = 1e-4);
    }

    #[test]
    fn test_emission_is_negative() {
        let wavelengths = grid(0.1, 400);
        let flux: Vec<f64> = wavelengths
            .iter()
            .map(|&w| if (4101.0..=4103.0).contains(&w) { 1.5 } else { 1.0 })
            .collect();
        let spectrum = ObservedSpectrum::new(wavelengths, flux).unwrap();

        let ew = equivalent_width(&spectrum, 4102.0, &EquivalentWidthConfig::default()).unwrap();
        assert!(ew < 0.0);
    }

    #[test]
    fn test_continuum_from_leading_samples() {
        // Continuum of 2.0 is recovered from the window edge, so a flat
        // spectrum at 2.0 still has zero width.
        let spectrum = ObservedSpectrum::new(grid(0.5, 100), vec![2.0; 100]).unwrap();
        let ew = equivalent_width(&spectrum, 4100.0, &EquivalentWidthConfig::default()).unwrap();
        assert_relative_eq!(ew, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_line_out_of_range() {
        let spectrum = ObservedSpectrum::new(grid(0.5, 100), vec![1.0; 100]).unwrap();
        let result = equivalent_width(&spectrum, 6563.0, &EquivalentWidthConfig::default());
        assert!(matches!(
            result,
            Err(EquivalentWidthError::LineOutOfRange { .. })
        ));
    }

    #[test]
    fn test_sparse_window() {
        // Samples every 20 Å leave only one inside a ±5 Å window
        let spectrum = ObservedSpectrum::new(grid(20.0, 10), vec![1.0; 10]).unwrap();
        let result = equivalent_width(&spectrum, 4100.0, &EquivalentWidthConfig::default());
        assert_eq!(result, Err(EquivalentWidthError::TooFewSamples { found: 1 }));
    }

    #[test]
    fn test_zero_continuum() {
        let spectrum = ObservedSpectrum::new(grid(0.5, 100), vec![0.0; 100]).unwrap();
        let result = equivalent_width(&spectrum, 4100.0, &EquivalentWidthConfig::default());
        assert_eq!(result, Err(EquivalentWidthError::ZeroContinuum));
    }

    #[test]
    fn test_nan_in_window() {
        let base = ObservedSpectrum::new(grid(0.5, 100), vec![1.0; 100]).unwrap();
        let mut flux = vec![1.0; 100];
        flux[40] = f64::NAN;
        let spectrum = base.with_flux(flux).unwrap();

        let result = equivalent_width(&spectrum, 4100.0, &EquivalentWidthConfig::default());
        assert_eq!(result, Err(EquivalentWidthError::NonFiniteFlux));
    }

    #[test]
    fn test_measure_lines_keeps_failures() {
        let spectrum = ObservedSpectrum::new(grid(0.5, 100), vec![1.0; 100]).unwrap();
        let lines = vec![
            AbsorptionLine::new(4102.0, "Hδ"),
            AbsorptionLine::new(6563.0, "Hα"),
        ];

        let measurements = measure_lines(&spectrum, &lines, &EquivalentWidthConfig::default());
        assert_eq!(measurements.len(), 2);
        assert!(measurements[0].result.is_ok());
        assert!(measurements[1].result.is_err());
        assert_eq!(
            measurements[0].to_string(),
            "Equivalent Width of Hδ at 4102 Å: 0.00 Å"
        );
    }
}
