//! End-to-end checks: table on disk -> normalization -> equivalent widths

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use spectroscopy::equivalent_width::{equivalent_width, measure_lines, EquivalentWidthError};
use spectroscopy::lines::LineList;
use spectroscopy::stars::StarSet;
use spectroscopy::{normalize, normalize_all, AnalysisConfig, EquivalentWidthConfig, ObservedSpectrum};

const LINE_DEPTH: f64 = 0.5;
const LINE_SIGMA: f64 = 0.8;

/// Sloped continuum with Gaussian Hδ and Hγ lines, sampled every 0.25 Å
fn write_synthetic_star(path: &Path, scale: f64) {
    let mut table = String::from("# wavelength\tflux\n");
    for i in 0..2400 {
        let w = 4000.0 + i as f64 * 0.25;
        let continuum = scale * (1.0 + 2e-4 * (w - 4000.0));
        let absorption: f64 = [4102.0, 4340.0]
            .iter()
            .map(|c| {
                let d = (w - c) / LINE_SIGMA;
                LINE_DEPTH * (-0.5 * d * d).exp()
            })
            .sum();
        writeln!(table, "{w}\t{}", continuum * (1.0 - absorption)).unwrap();
    }
    fs::write(path, table).unwrap();
}

#[test]
fn normalized_equivalent_width_matches_line_area() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ProblemStar1.dat");
    write_synthetic_star(&path, 3.2e-13);

    let spectrum = ObservedSpectrum::load(&path).unwrap();
    assert_eq!(spectrum.len(), 2400);
    assert_eq!(spectrum.display_name(), "ProblemStar1");

    let config = AnalysisConfig::default();
    let result = normalize(&spectrum, &config.continuum).unwrap();
    assert_eq!(result.invalid_samples, 0);

    // Far from any line the normalized flux sits on 1.0
    let (_, far) = result.normalized.select(4500.0, 4510.0);
    for f in far {
        assert_relative_eq!(*f, 1.0, epsilon = 1e-3);
    }

    // The smoothed continuum dips slightly under the line, so the
    // normalized measurement lands a little below the analytic area.
    let analytic = LINE_DEPTH * LINE_SIGMA * (2.0 * std::f64::consts::PI).sqrt();
    let ew = equivalent_width(&result.normalized, 4102.0, &config.equivalent_width).unwrap();
    assert!(ew > 0.7 * analytic && ew < 1.05 * analytic, "ew = {ew}");
}

#[test]
fn raw_equivalent_width_is_scale_free() {
    let dir = tempfile::tempdir().unwrap();
    let faint = dir.path().join("faint.dat");
    let bright = dir.path().join("bright.dat");
    write_synthetic_star(&faint, 1e-14);
    write_synthetic_star(&bright, 5e-12);

    let config = EquivalentWidthConfig::default();
    let a = equivalent_width(&ObservedSpectrum::load(&faint).unwrap(), 4340.0, &config).unwrap();
    let b = equivalent_width(&ObservedSpectrum::load(&bright).unwrap(), 4340.0, &config).unwrap();
    assert_relative_eq!(a, b, max_relative = 1e-9);
}

#[test]
fn default_line_set_reports_every_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("star.dat");
    write_synthetic_star(&path, 1.0);

    let config = AnalysisConfig::default();
    let spectrum = ObservedSpectrum::load(&path).unwrap();
    let normalized = normalize(&spectrum, &config.continuum).unwrap().normalized;

    let targets = LineList::problem_stars().select(&config.ew_lines, config.line_tolerance);
    let measurements = measure_lines(&normalized, &targets, &config.equivalent_width);

    assert_eq!(measurements.len(), config.ew_lines.len());
    // Lines redward of the synthetic table are reported as failures, not dropped
    let measured: Vec<f64> = measurements
        .iter()
        .filter_map(|m| m.result.as_ref().ok().map(|_| m.line.wavelength))
        .collect();
    assert_eq!(measured, vec![4102.0, 4340.0, 4471.0, 4540.0]);
    assert!(measurements[0].to_string().starts_with("Equivalent Width of Hδ at 4102 Å:"));
}

#[test]
fn normalized_table_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("star.dat");
    let output = dir.path().join("star_norm.dat");
    write_synthetic_star(&input, 2.0);

    let spectrum = ObservedSpectrum::load(&input).unwrap();
    let result = normalize(&spectrum, &AnalysisConfig::default().continuum).unwrap();
    result.normalized.save(&output).unwrap();

    let reloaded = ObservedSpectrum::load(&output).unwrap();
    assert_eq!(reloaded.wavelengths(), spectrum.wavelengths());
    for (a, b) in reloaded.flux().iter().zip(result.normalized_flux()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn normalized_table_with_nan_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("gap.dat");
    let output = dir.path().join("gap_norm.dat");
    write_synthetic_star(&input, 1.0);

    // Detector gap: 300 zero samples around Hγ, wider than the smoothing window
    let spectrum = ObservedSpectrum::load(&input).unwrap();
    let mut flux = spectrum.flux().to_vec();
    for f in &mut flux[1200..1500] {
        *f = 0.0;
    }
    let spectrum = spectrum.with_flux(flux).unwrap();

    let config = AnalysisConfig::default();
    let result = normalize(&spectrum, &config.continuum).unwrap();
    assert!(result.invalid_samples >= 200);
    result.normalized.save(&output).unwrap();

    let reloaded = ObservedSpectrum::load(&output).unwrap();
    assert_eq!(reloaded.len(), spectrum.len());
    for (a, b) in reloaded.flux().iter().zip(result.normalized_flux()) {
        assert_eq!(a.is_nan(), b.is_nan());
        if !a.is_nan() {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    // Lines inside the gap fail on their own, the rest still measure
    let ew = &config.equivalent_width;
    assert_eq!(
        equivalent_width(&reloaded, 4340.0, ew),
        Err(EquivalentWidthError::NonFiniteFlux)
    );
    assert!(equivalent_width(&reloaded, 4102.0, ew).unwrap() > 0.5);
}

#[test]
fn directory_star_set_loads_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_synthetic_star(&dir.path().join("HD46223_O4V_Melchiors517392.dat"), 1.0);
    write_synthetic_star(&dir.path().join("HD32630_B3V_Melchiors343338.dat"), 2.0);
    fs::write(dir.path().join("HD0_A0V_broken.dat"), "4000 1.0\n4001 oops\n").unwrap();

    let set = StarSet::from_directory(dir.path()).unwrap();
    let labels: Vec<&str> = set.stars().iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["A0V", "B3V", "O4V"]);

    let loaded = set.load_spectra();
    assert!(loaded[0].1.is_err());
    assert_eq!(loaded[1].1.as_ref().unwrap().display_name(), "B3V");
    assert_eq!(loaded[2].1.as_ref().unwrap().len(), 2400);
}

#[test]
fn stacked_set_normalizes_readable_spectra() {
    let dir = tempfile::tempdir().unwrap();
    write_synthetic_star(&dir.path().join("HD46223_O4V_Melchiors517392.dat"), 1.0);
    write_synthetic_star(&dir.path().join("HD32630_B3V_Melchiors343338.dat"), 4.0);
    fs::write(dir.path().join("HD0_A0V_broken.dat"), "4000 1.0\n4001 oops\n").unwrap();
    // Readable but shorter than the smoothing window
    fs::write(dir.path().join("HD1_F0V_short.dat"), "4000 1.0\n4001 1.0\n4002 1.0\n").unwrap();

    let set = StarSet::from_directory(dir.path()).unwrap();
    let spectra = set.load_available();
    let labels: Vec<&str> = spectra.iter().map(|s| s.display_name()).collect();
    assert_eq!(labels, ["F0V", "B3V", "O4V"]);

    let normalized = normalize_all(spectra, &AnalysisConfig::default().continuum);
    let labels: Vec<&str> = normalized.iter().map(|s| s.display_name()).collect();
    assert_eq!(labels, ["B3V", "O4V"]);
    for spectrum in &normalized {
        let (_, far) = spectrum.select(4500.0, 4510.0);
        assert!(!far.is_empty());
        for f in far {
            assert_relative_eq!(*f, 1.0, epsilon = 1e-3);
        }
    }
}
