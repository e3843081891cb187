//! Absorption-line catalogue
//!
//! Rest wavelengths (Ångström) of the lines marked on charts and measured
//! for equivalent widths, grouped into the lists used for the different
//! star samples.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing a line list
#[derive(Debug, Error)]
pub enum LineListError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid line list JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lines measured for equivalent widths by default
pub const DEFAULT_EW_LINES: [f64; 7] = [4102.0, 4340.0, 4471.0, 4540.0, 4684.0, 4860.0, 6560.0];

/// Element symbols recognised when deriving an element from a line label
const ELEMENTS: [&str; 16] = [
    "H", "He", "C", "N", "O", "Na", "Mg", "Al", "Si", "S", "K", "Ca", "Ti", "Cr", "Mn", "Fe",
];

/// A single catalogue line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsorptionLine {
    /// Rest wavelength in Ångström
    pub wavelength: f64,

    /// Display label, e.g. "Ca II" or "Hδ"
    pub label: String,

    /// Literature source for the identification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl AbsorptionLine {
    pub fn new(wavelength: f64, label: impl Into<String>) -> Self {
        Self {
            wavelength,
            label: label.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Chemical element responsible for the line, if the label names one.
    ///
    /// "Ca II" gives "Ca", "Hδ" and "H_{beta}" give "H", while labels such
    /// as "blend", "DIB" or "TENT." give `None`.
    pub fn element(&self) -> Option<&str> {
        let token = self
            .label
            .split(|c: char| c.is_whitespace() || c == '_')
            .find(|s| !s.is_empty())?;

        let mut chars = token.char_indices();
        let (_, first) = chars.next()?;
        if !first.is_ascii_uppercase() {
            return None;
        }
        let end = match chars.next() {
            Some((i, c)) if c.is_ascii_lowercase() => i + c.len_utf8(),
            Some((i, _)) => i,
            None => token.len(),
        };

        let symbol = &token[..end];
        ELEMENTS.contains(&symbol).then_some(symbol)
    }
}

fn line(wavelength: f64, label: &str, reference: Option<&str>) -> AbsorptionLine {
    let line = AbsorptionLine::new(wavelength, label);
    match reference {
        Some(r) => line.with_reference(r),
        None => line,
    }
}

const GRAY: Option<&str> = Some("Gray");
const WALBORN: Option<&str> = Some("Walborn & Fitzpatrick 1990");
const MORTON: Option<&str> = Some("Gray, Morton 2003");
const HERBIG: Option<&str> = Some("Herbig 1995");
const SNOW_HERBIG: Option<&str> = Some("Snow, York & Welty 1977, Herbig 1995");

/// An ordered list of catalogue lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineList {
    lines: Vec<AbsorptionLine>,
}

impl LineList {
    pub fn new(lines: Vec<AbsorptionLine>) -> Self {
        Self { lines }
    }

    /// Lines used to identify the two problem stars
    pub fn problem_stars() -> Self {
        Self::new(vec![
            line(3932.0, "Ca II", GRAY),
            line(3967.0, "Ca II", GRAY),
            line(4030.0, "blend", GRAY),
            line(4102.0, "Hδ", GRAY),
            line(4340.0, "Hγ", GRAY),
            line(4383.0, "Fe I", GRAY),
            line(4471.0, "He I", Some("NIST")),
            line(4540.0, "He II", WALBORN),
            line(4684.0, "He II", WALBORN),
            line(4860.0, "Hβ", GRAY),
            line(4921.0, "Fe I", GRAY),
            line(5014.0, "TENT.", None),
            line(5411.0, "TENT.", None),
            line(5875.0, "TENT.", None),
            line(5890.0, "Na I D1", MORTON),
            line(5896.0, "Na I D2", MORTON),
            line(6270.0, "TENT.", None),
            line(6284.0, "DIB", SNOW_HERBIG),
            line(6347.0, "TENT.", None),
            line(6380.0, "TENT.", None),
            line(6560.0, "Hα", GRAY),
            line(6614.0, "DIB", HERBIG),
            line(6684.0, "TENT.", None),
        ])
    }

    /// Lines marked on the stacked main-sequence chart
    pub fn main_sequence() -> Self {
        Self::new(vec![
            line(3932.0, "Ca II", GRAY),
            line(3967.0, "Ca II", GRAY),
            line(4030.0, "blend", GRAY),
            line(4101.0, "Hδ", GRAY),
            line(4338.0, "Hγ", GRAY),
            line(4383.0, "Fe I", GRAY),
            line(4540.0, "He II", WALBORN),
            line(4684.0, "He II", WALBORN),
            line(4860.0, "Hβ", GRAY),
            line(4921.0, "Fe I", GRAY),
            line(5014.0, "TENT.", None),
            line(5411.0, "TENT.", None),
            line(5875.0, "He I", None),
            line(5890.0, "Na I D1", MORTON),
            line(5896.0, "Na I D2", MORTON),
            line(6284.0, "DIB", SNOW_HERBIG),
            line(6347.0, "TENT.", None),
            line(6380.0, "TENT.", None),
            line(6561.0, "Hα", GRAY),
            line(6614.0, "DIB", HERBIG),
            line(6684.0, "TENT.", None),
        ])
    }

    /// Classification lines for early-type stars
    pub fn classification() -> Self {
        Self::new(vec![
            line(6563.0, "Hα", None),
            line(4861.0, "Hβ", None),
            line(4341.0, "Hγ", None),
            line(4102.0, "Hδ", None),
            line(4471.0, "He I 4471", None),
            line(4026.0, "He I 4026", None),
            line(3933.0, "Ca II K", None),
            line(3968.0, "Ca II H", None),
            line(4383.0, "Fe I 4383", None),
            line(5890.0, "Na I D1", None),
            line(5896.0, "Na I D2", None),
        ])
    }

    /// Classification lines with the Fe I 5270 marker used for later types
    pub fn classification_extended() -> Self {
        let mut list = Self::classification();
        let at = list
            .lines
            .iter()
            .position(|l| l.label == "Na I D1")
            .unwrap_or(list.lines.len());
        list.lines.insert(at, line(5270.0, "Fe I 5270", None));
        list
    }

    /// Balmer series with a few helium, silicon and calcium markers
    pub fn balmer_and_metals() -> Self {
        Self::new(vec![
            line(6562.79, "Hα", None),
            line(4861.35, "Hβ", None),
            line(4340.472, "Hγ", None),
            line(4101.734, "Hδ", None),
            line(3970.075, "Hε", None),
            line(4471.0, "He I", None),
            line(4121.0, "He I", None),
            line(4089.0, "Si IV", None),
            line(4552.0, "Si III", None),
            line(4226.0, "Ca I", None),
        ])
    }

    pub fn lines(&self) -> &[AbsorptionLine] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AbsorptionLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push(&mut self, line: AbsorptionLine) {
        self.lines.push(line);
    }

    /// Lines with `lower <= wavelength <= upper`
    pub fn within(&self, lower: f64, upper: f64) -> Self {
        Self::new(
            self.lines
                .iter()
                .filter(|l| (lower..=upper).contains(&l.wavelength))
                .cloned()
                .collect(),
        )
    }

    /// Closest line to `wavelength`, if one lies within `tolerance` Å
    pub fn nearest(&self, wavelength: f64, tolerance: f64) -> Option<&AbsorptionLine> {
        self.lines
            .iter()
            .map(|l| (l, (l.wavelength - wavelength).abs()))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(l, _)| l)
    }

    /// Pick lines by approximate wavelength, in the order requested.
    ///
    /// Each match is the catalogue entry itself. Wavelengths with no
    /// catalogue line within `tolerance` are kept as unidentified lines so
    /// they can still be measured.
    pub fn select(&self, wavelengths: &[f64], tolerance: f64) -> Self {
        self.resolve(wavelengths, tolerance, |_, line| line.clone())
    }

    /// Name lines at exactly the requested wavelengths.
    ///
    /// Like [`LineList::select`], but the requested wavelength is kept and only
    /// the label and reference come from the nearest catalogue entry.
    pub fn identify(&self, wavelengths: &[f64], tolerance: f64) -> Self {
        self.resolve(wavelengths, tolerance, |w, line| AbsorptionLine {
            wavelength: w,
            ..line.clone()
        })
    }

    fn resolve<F>(&self, wavelengths: &[f64], tolerance: f64, matched: F) -> Self
    where
        F: Fn(f64, &AbsorptionLine) -> AbsorptionLine,
    {
        Self::new(
            wavelengths
                .iter()
                .map(|&w| match self.nearest(w, tolerance) {
                    Some(line) => matched(w, line),
                    None => {
                        warn!("No catalogue line within {tolerance} Å of {w} Å");
                        AbsorptionLine::new(w, "unidentified")
                    }
                })
                .collect(),
        )
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), LineListError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, LineListError> {
        let json = std::fs::read_to_string(path)?;
        let list: Self = serde_json::from_str(&json)?;
        info!("Loaded {} lines from {}", list.len(), path.display());
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a LineList {
    type Item = &'a AbsorptionLine;
    type IntoIter = std::slice::Iter<'a, AbsorptionLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
