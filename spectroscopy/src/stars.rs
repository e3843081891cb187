//! Sets of stars to compare
//!
//! A star set maps display labels to spectrum files. Sets are either read
//! from a JSON file or discovered from a directory of `.dat` tables, in which
//! case labels come from the MK spectral type embedded in the file name
//! (e.g. `HD46223_O4V_Melchiors517392.dat` is labelled `O4V`).

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spectrum::{ObservedSpectrum, SpectrumError};

/// Errors that can occur while building a star set
#[derive(Debug, Error)]
pub enum StarSetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid star set JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Index {index} is out of range, set holds {len} stars")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No spectrum files found in {0}")]
    Empty(PathBuf),
}

/// Extension of the spectrum tables picked up from a directory
pub const SPECTRUM_EXTENSION: &str = "dat";

/// One star: a label and the table holding its spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarEntry {
    pub label: String,
    pub path: PathBuf,
}

impl StarEntry {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// Entry labelled by the spectral type in the file name, falling back to the file stem
    pub fn from_path(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let label = spectral_type_from_filename(file_name).unwrap_or(stem).to_string();
        Self { label, path }
    }

    /// Load this star's spectrum, named after its label
    pub fn load(&self) -> Result<ObservedSpectrum, SpectrumError> {
        Ok(ObservedSpectrum::load(&self.path)?.named(self.label.clone()))
    }
}

/// Whether a token looks like an MK spectral type such as `O4V`, `B0.2V` or `K0III`
fn is_spectral_type(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('O' | 'B' | 'A' | 'F' | 'G' | 'K' | 'M'))
        && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// MK spectral type embedded in a file name like `HD46223_O4V_Melchiors517392.dat`
pub fn spectral_type_from_filename(file_name: &str) -> Option<&str> {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    stem.split('_').skip(1).find(|token| is_spectral_type(token))
}

/// An ordered collection of stars
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarSet {
    stars: Vec<StarEntry>,
}

impl StarSet {
    pub fn new(stars: Vec<StarEntry>) -> Self {
        Self { stars }
    }

    /// Every `.dat` file in `dir`, sorted by file name
    pub fn from_directory(dir: &Path) -> Result<Self, StarSetError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|s| s.to_str()) == Some(SPECTRUM_EXTENSION)
            {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(StarSetError::Empty(dir.to_path_buf()));
        }

        paths.sort();
        debug!("Found {} spectra in {}", paths.len(), dir.display());

        Ok(Self::new(paths.into_iter().map(StarEntry::from_path).collect()))
    }

    /// Load from JSON file: an array of `{"label", "path"}` objects.
    ///
    /// Relative paths are resolved against the JSON file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self, StarSetError> {
        let json = std::fs::read_to_string(path)?;
        let mut set: Self = serde_json::from_str(&json)?;

        if let Some(base) = path.parent() {
            for star in &mut set.stars {
                if star.path.is_relative() {
                    star.path = base.join(&star.path);
                }
            }
        }

        info!("Loaded star set of {} from {}", set.len(), path.display());
        Ok(set)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), StarSetError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn stars(&self) -> &[StarEntry] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Star at `index`
    pub fn get(&self, index: usize) -> Result<&StarEntry, StarSetError> {
        self.stars.get(index).ok_or(StarSetError::IndexOutOfRange {
            index,
            len: self.stars.len(),
        })
    }

    /// Load every spectrum in parallel, keeping the set order
    pub fn load_spectra(&self) -> Vec<(String, Result<ObservedSpectrum, SpectrumError>)> {
        self.stars
            .par_iter()
            .map(|star| (star.label.clone(), star.load()))
            .collect()
    }

    /// Load every spectrum that can be read, skipping the rest with a warning
    pub fn load_available(&self) -> Vec<ObservedSpectrum> {
        self.load_spectra()
            .into_iter()
            .filter_map(|(label, result)| match result {
                Ok(spectrum) => Some(spectrum),
                Err(e) => {
                    warn!("Skipping {label}: {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_spectral_type_from_filename() {
        assert_eq!(
            spectral_type_from_filename("HD46223_O4V_Melchiors517392.dat"),
            Some("O4V")
        );
        assert_eq!(
            spectral_type_from_filename("HD149438_B0V_Melchiors885093.dat"),
            Some("B0V")
        );
        assert_eq!(
            spectral_type_from_filename("HD79211_M0V_Melchiors389347"),
            Some("M0V")
        );
        assert_eq!(spectral_type_from_filename("ProblemStar1.dat"), None);
        assert_eq!(spectral_type_from_filename("HD1_Melchiors_x.dat"), None);
    }

    #[test]
    fn test_from_directory_sorted_and_labelled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("HD48279_O8V_Melchiors506884.dat"), "1 1\n2 1\n").unwrap();
        fs::write(dir.path().join("HD32630_B3V_Melchiors343338.dat"), "1 1\n2 1\n").unwrap();
        fs::write(dir.path().join("ProblemStar1.dat"), "1 1\n2 1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = StarSet::from_directory(dir.path()).unwrap();
        let labels: Vec<&str> = set.stars().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B3V", "O8V", "ProblemStar1"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StarSet::from_directory(dir.path()),
            Err(StarSetError::Empty(_))
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let set = StarSet::new(vec![StarEntry::new("O4V", "a.dat")]);
        assert!(set.get(0).is_ok());
        assert!(matches!(
            set.get(3),
            Err(StarSetError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_json_paths_resolved_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("stars.json");
        fs::write(
            &json_path,
            r#"[{"label": "O4V", "path": "ExampleStars/a.dat"}, {"label": "abs", "path": "/tmp/b.dat"}]"#,
        )
        .unwrap();

        let set = StarSet::load_from_file(&json_path).unwrap();
        assert_eq!(set.stars()[0].path, dir.path().join("ExampleStars/a.dat"));
        assert_eq!(set.stars()[1].path, PathBuf::from("/tmp/b.dat"));
    }

    #[test]
    fn test_load_spectra_keeps_order_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.dat");
        fs::write(&good, "4000 1.0\n4001 1.1\n").unwrap();

        let set = StarSet::new(vec![
            StarEntry::new("good", &good),
            StarEntry::new("missing", dir.path().join("missing.dat")),
        ]);

        let loaded = set.load_spectra();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, "good");
        assert_eq!(loaded[0].1.as_ref().unwrap().display_name(), "good");
        assert!(matches!(loaded[1].1, Err(SpectrumError::Io(_))));
    }

    #[test]
    fn test_load_available_skips_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.dat");
        let broken = dir.path().join("broken.dat");
        fs::write(&good, "4000 1.0\n4001 1.1\n").unwrap();
        fs::write(&broken, "4000 1.0\n4001 oops\n").unwrap();

        let set = StarSet::new(vec![
            StarEntry::new("broken", &broken),
            StarEntry::new("missing", dir.path().join("missing.dat")),
            StarEntry::new("good", &good),
        ]);

        let loaded = set.load_available();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].display_name(), "good");
    }
}
