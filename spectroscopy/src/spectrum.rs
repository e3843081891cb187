//! Tabulated stellar spectra
//!
//! A spectrum is a pair of equal-length columns: wavelength in Ångström and
//! flux in whatever unit the source table uses. Tables are plain text with
//! one sample per row and tab- or whitespace-separated columns.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};
use thiserror::Error;

/// Errors that can occur while building, reading or writing a spectrum
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Wavelength and flux columns must have the same length ({wavelengths} vs {flux})")]
    LengthMismatch { wavelengths: usize, flux: usize },

    #[error("A spectrum needs at least 2 samples, got {0}")]
    TooFewSamples(usize),

    #[error("Wavelengths must be strictly ascending (sample {0})")]
    NotAscending(usize),

    #[error("Non-finite wavelength at sample {0}")]
    NonFinite(usize),
}

/// A wavelength/flux table for one star
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSpectrum {
    /// Optional display name, usually the star label or file stem
    pub name: Option<String>,

    /// Wavelengths in Ångström, strictly ascending
    wavelengths: Vec<f64>,

    /// Flux for each wavelength
    flux: Vec<f64>,
}

impl ObservedSpectrum {
    /// Create a spectrum from wavelength and flux columns
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The columns have different lengths
    /// - There are fewer than two samples
    /// - Any wavelength is NaN or infinite
    /// - Wavelengths are not strictly ascending
    ///
    /// Non-finite flux is kept. Normalized tables carry NaN wherever the
    /// continuum vanished, and they must load back.
    pub fn new(wavelengths: Vec<f64>, flux: Vec<f64>) -> Result<Self, SpectrumError> {
        if wavelengths.len() != flux.len() {
            return Err(SpectrumError::LengthMismatch {
                wavelengths: wavelengths.len(),
                flux: flux.len(),
            });
        }

        if wavelengths.len() < 2 {
            return Err(SpectrumError::TooFewSamples(wavelengths.len()));
        }

        if let Some(i) = wavelengths.iter().position(|w| !w.is_finite()) {
            return Err(SpectrumError::NonFinite(i));
        }

        for i in 1..wavelengths.len() {
            if wavelengths[i] <= wavelengths[i - 1] {
                return Err(SpectrumError::NotAscending(i));
            }
        }

        Ok(Self {
            name: None,
            wavelengths,
            flux,
        })
    }

    /// Attach a display name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Load a two-column table from disk, naming the spectrum after the file stem
    pub fn load(path: &Path) -> Result<Self, SpectrumError> {
        let file = File::open(path)?;
        let spectrum = Self::from_reader(file)?;
        info!(
            "Loaded {} samples from {}",
            spectrum.len(),
            path.display()
        );

        Ok(match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => spectrum.named(stem),
            None => spectrum,
        })
    }

    /// Parse a two-column table from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SpectrumError> {
        let mut wavelengths = Vec::new();
        let mut flux = Vec::new();

        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if let Some((w, f)) = parse_row(&line, idx + 1)? {
                wavelengths.push(w);
                flux.push(f);
            }
        }

        debug!("Parsed {} rows", wavelengths.len());
        Self::new(wavelengths, flux)
    }

    /// Parse a two-column table held in memory
    pub fn parse_str(text: &str) -> Result<Self, SpectrumError> {
        Self::from_reader(text.as_bytes())
    }

    /// Write the table as tab-separated text
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SpectrumError> {
        let mut writer = BufWriter::new(writer);
        for (w, f) in self.points() {
            writeln!(writer, "{w}\t{f}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Save the table to disk as tab-separated text
    pub fn save(&self, path: &Path) -> Result<(), SpectrumError> {
        self.write_to(File::create(path)?)?;
        info!("Wrote {} samples to {}", self.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Name to use in legends and labels
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("spectrum")
    }

    /// Covered wavelength range as (first, last)
    pub fn range(&self) -> (f64, f64) {
        (self.wavelengths[0], self.wavelengths[self.len() - 1])
    }

    /// Minimum and maximum flux
    pub fn flux_range(&self) -> (f64, f64) {
        finite_range(&self.flux).unwrap_or((0.0, 0.0))
    }

    /// Whether a wavelength lies inside the covered range
    pub fn covers(&self, wavelength: f64) -> bool {
        let (lo, hi) = self.range();
        (lo..=hi).contains(&wavelength)
    }

    /// Iterate over (wavelength, flux) pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelengths
            .iter()
            .copied()
            .zip(self.flux.iter().copied())
    }

    /// Same wavelength grid with a replacement flux column
    pub fn with_flux(&self, flux: Vec<f64>) -> Result<Self, SpectrumError> {
        if flux.len() != self.len() {
            return Err(SpectrumError::LengthMismatch {
                wavelengths: self.len(),
                flux: flux.len(),
            });
        }
        Ok(Self {
            name: self.name.clone(),
            wavelengths: self.wavelengths.clone(),
            flux,
        })
    }

    /// Samples with `lower <= wavelength <= upper`, as borrowed column slices
    pub fn select(&self, lower: f64, upper: f64) -> (&[f64], &[f64]) {
        let start = self.wavelengths.partition_point(|&w| w < lower);
        let end = self.wavelengths.partition_point(|&w| w <= upper);
        if start >= end {
            return (&[], &[]);
        }
        (&self.wavelengths[start..end], &self.flux[start..end])
    }
}

/// Min and max over the finite values of a series
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Parse one table row; blank lines and `#` comments yield `None`
fn parse_row(line: &str, line_number: usize) -> Result<Option<(f64, f64)>, SpectrumError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut columns = trimmed
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty());

    let mut next_value = |column: &str| -> Result<f64, SpectrumError> {
        let token = columns.next().ok_or_else(|| SpectrumError::Parse {
            line: line_number,
            message: format!("missing {column} column"),
        })?;
        token.parse::<f64>().map_err(|_| SpectrumError::Parse {
            line: line_number,
            message: format!("invalid {column} value '{token}'"),
        })
    };

    let wavelength = next_value("wavelength")?;
    let flux = next_value("flux")?;
    Ok(Some((wavelength, flux)))
}
