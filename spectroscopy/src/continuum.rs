//! Continuum estimation and flux normalization
//!
//! The continuum is estimated by smoothing the flux with a wide
//! Savitzky-Golay window, which follows the slowly varying baseline while
//! averaging over narrow absorption dips. Dividing the flux by it gives a
//! spectrum that sits near 1.0 with lines dipping below.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::smoothing::{SavitzkyGolay, SmoothingError};
use crate::spectrum::{ObservedSpectrum, SpectrumError};

/// Errors that can occur while normalizing a spectrum
#[derive(Debug, Error)]
pub enum ContinuumError {
    #[error("Smoothing failed: {0}")]
    Smoothing(#[from] SmoothingError),

    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

/// Smoothing parameters for the continuum estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuumConfig {
    /// Filter window in samples, must be odd
    pub window_length: usize,

    /// Order of the locally fitted polynomial
    pub polyorder: usize,
}

impl Default for ContinuumConfig {
    fn default() -> Self {
        Self {
            window_length: 101,
            polyorder: 3,
        }
    }
}

impl ContinuumConfig {
    pub fn filter(&self) -> Result<SavitzkyGolay, SmoothingError> {
        SavitzkyGolay::new(self.window_length, self.polyorder)
    }
}

/// A spectrum together with its continuum and the normalized flux
#[derive(Debug, Clone)]
pub struct NormalizedSpectrum {
    /// The input spectrum
    pub raw: ObservedSpectrum,

    /// Smoothed flux on the same wavelength grid
    pub continuum: Vec<f64>,

    /// `raw / continuum`; NaN where the continuum is zero or non-finite
    pub normalized: ObservedSpectrum,

    /// Number of samples that could not be normalized
    pub invalid_samples: usize,
}

impl NormalizedSpectrum {
    pub fn wavelengths(&self) -> &[f64] {
        self.raw.wavelengths()
    }

    pub fn normalized_flux(&self) -> &[f64] {
        self.normalized.flux()
    }
}

/// Smoothed flux used as the continuum
pub fn estimate_continuum(
    spectrum: &ObservedSpectrum,
    config: &ContinuumConfig,
) -> Result<Vec<f64>, ContinuumError> {
    Ok(config.filter()?.apply(spectrum.flux())?)
}

/// Divide the flux by its smoothed continuum
pub fn normalize(
    spectrum: &ObservedSpectrum,
    config: &ContinuumConfig,
) -> Result<NormalizedSpectrum, ContinuumError> {
    let continuum = estimate_continuum(spectrum, config)?;

    let mut invalid_samples = 0;
    let normalized_flux: Vec<f64> = spectrum
        .flux()
        .iter()
        .zip(continuum.iter())
        .map(|(&f, &c)| {
            if c == 0.0 || !c.is_finite() {
                invalid_samples += 1;
                f64::NAN
            } else {
                f / c
            }
        })
        .collect();

    if invalid_samples > 0 {
        warn!(
            "{}: continuum vanished at {} of {} samples, normalized flux is NaN there",
            spectrum.display_name(),
            invalid_samples,
            spectrum.len()
        );
    }
    debug!(
        "Normalized {} with window {} order {}",
        spectrum.display_name(),
        config.window_length,
        config.polyorder
    );

    let normalized = spectrum.with_flux(normalized_flux)?;

    Ok(NormalizedSpectrum {
        raw: spectrum.clone(),
        continuum,
        normalized,
        invalid_samples,
    })
}

/// Normalize a batch of spectra, dropping the ones that cannot be normalized
pub fn normalize_all(
    spectra: Vec<ObservedSpectrum>,
    config: &ContinuumConfig,
) -> Vec<ObservedSpectrum> {
    spectra
        .into_iter()
        .filter_map(|spectrum| match normalize(&spectrum, config) {
            Ok(result) => Some(result.normalized),
            Err(e) => {
                warn!("Skipping {}: {e}", spectrum.display_name());
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|i| 4000.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn test_default_config() {
        let config = ContinuumConfig::default();
        assert_eq!(config.window_length, 101);
        assert_eq!(config.polyorder, 3);
    }

    #[test]
    fn test_constant_spectrum_normalizes_to_one() {
        let spectrum = ObservedSpectrum::new(grid(300), vec![2.5e-13; 300]).unwrap();
        let result = normalize(&spectrum, &ContinuumConfig::default()).unwrap();

        assert_eq!(result.invalid_samples, 0);
        for v in result.normalized_flux() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sloped_continuum_is_removed() {
        let wavelengths = grid(400);
        let flux: Vec<f64> = wavelengths.iter().map(|w| 1.0 + (w - 4000.0) * 1e-3).collect();
        let spectrum = ObservedSpectrum::new(wavelengths, flux).unwrap();

        let result = normalize(&spectrum, &ContinuumConfig::default()).unwrap();
        for v in result.normalized_flux() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_narrow_line_stays_below_continuum() {
        let wavelengths = grid(400);
        let flux: Vec<f64> = wavelengths
            .iter()
            .map(|w| {
                let d = (w - 4050.0) / 0.8;
                1.0 - 0.6 * (-0.5 * d * d).exp()
            })
            .collect();
        let spectrum = ObservedSpectrum::new(wavelengths, flux).unwrap();

        let result = normalize(&spectrum, &ContinuumConfig::default()).unwrap();
        let centre = 100;
        assert_relative_eq!(result.wavelengths()[centre], 4050.0);
        assert!(result.normalized_flux()[centre] < 0.6);
        assert!(result.normalized_flux()[350] > 0.95);
    }

    #[test]
    fn test_zero_continuum_yields_nan() {
        let spectrum = ObservedSpectrum::new(grid(5), vec![0.0; 5]).unwrap();
        let config = ContinuumConfig {
            window_length: 3,
            polyorder: 1,
        };

        let result = normalize(&spectrum, &config).unwrap();
        assert_eq!(result.invalid_samples, 5);
        assert!(result.normalized_flux().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_short_spectrum_is_an_error() {
        let spectrum = ObservedSpectrum::new(grid(50), vec![1.0; 50]).unwrap();
        let result = normalize(&spectrum, &ContinuumConfig::default());
        assert!(matches!(
            result,
            Err(ContinuumError::Smoothing(SmoothingError::WindowTooLong { .. }))
        ));
    }

    #[test]
    fn test_normalize_all_drops_failures() {
        let long = ObservedSpectrum::new(grid(300), vec![3.0; 300])
            .unwrap()
            .named("long");
        let short = ObservedSpectrum::new(grid(50), vec![3.0; 50])
            .unwrap()
            .named("short");

        let normalized = normalize_all(vec![short, long], &ContinuumConfig::default());
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].display_name(), "long");
        assert_relative_eq!(normalized[0].flux()[150], 1.0, epsilon = 1e-9);
    }
}
