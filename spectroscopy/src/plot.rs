//! Static spectrum charts
//!
//! Charts are rendered with plotters to a PNG file, or to SVG when the
//! output path ends in `.svg`. Catalogue lines are drawn as vertical markers
//! spanning the middle 90% of the y axis.

use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::continuum::NormalizedSpectrum;
use crate::lines::{AbsorptionLine, LineList};
use crate::spectrum::{finite_range, ObservedSpectrum};

/// Errors that can occur while rendering a chart
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error("Nothing to plot")]
    EmptyInput,
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(e.to_string())
    }
}

/// Chart layout and labelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStyle {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Caption; each chart has its own default when unset
    pub title: Option<String>,

    pub x_label: String,
    pub y_label: String,

    /// Vertical offset between spectra on stacked charts
    pub flux_offset: f64,

    /// Line labels closer than this (Å) to the previous line flip to its left side
    pub crowding_angstrom: f64,

    /// Horizontal gap (Å) between a line marker and its label
    pub label_gap: f64,

    pub label_font_size: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1500,
            height: 1000,
            title: None,
            x_label: "Wavelength (Å)".to_string(),
            y_label: "Flux".to_string(),
            flux_offset: 2.0,
            crowding_angstrom: 10.0,
            label_gap: 10.0,
            label_font_size: 14.0,
        }
    }
}

impl PlotStyle {
    fn title_or(&self, default: impl Into<String>) -> String {
        self.title.clone().unwrap_or_else(|| default.into())
    }
}

/// Marker colour for lines of a given element
pub fn element_color(element: Option<&str>) -> RGBColor {
    match element {
        Some("H") => RED,
        Some("He") => GREEN,
        Some("Ca") => BLUE,
        Some("Mg") => MAGENTA,
        Some("Fe") => YELLOW,
        Some("Na") => CYAN,
        _ => BLACK,
    }
}

/// Label anchors for stacked charts.
///
/// Labels climb by `step` from `base`, one rung per line. A line closer than
/// `crowding` to the previous one gets its label on the left of the marker
/// so that pairs such as the sodium doublet stay readable.
pub fn stacked_label_positions(
    lines: &[AbsorptionLine],
    base: f64,
    step: f64,
    crowding: f64,
    gap: f64,
) -> Vec<(f64, f64)> {
    let mut previous: Option<f64> = None;
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let crowded = previous.is_some_and(|p| (line.wavelength - p).abs() < crowding);
            previous = Some(line.wavelength);
            let x = if crowded {
                line.wavelength - gap
            } else {
                line.wavelength + gap
            };
            (x, base + step * i as f64)
        })
        .collect()
}

fn padded(range: (f64, f64), fraction: f64) -> (f64, f64) {
    let (lo, hi) = range;
    let span = hi - lo;
    if span <= 0.0 || !span.is_finite() {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - span * fraction, hi + span * fraction)
}

fn merge(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0.min(b.0), a.1.max(b.1))
}

fn finite_points<'a>(
    wavelengths: &'a [f64],
    flux: &'a [f64],
    offset: f64,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    wavelengths
        .iter()
        .zip(flux.iter())
        .filter(|(_, f)| f.is_finite())
        .map(move |(&w, &f)| (w, f + offset))
}

/// Vertical marker between 5% and 95% of the y span
fn marker(wavelength: f64, y_range: (f64, f64)) -> Vec<(f64, f64)> {
    let span = y_range.1 - y_range.0;
    vec![
        (wavelength, y_range.0 + 0.05 * span),
        (wavelength, y_range.0 + 0.95 * span),
    ]
}

enum Chart<'a> {
    Normalized {
        spectrum: &'a NormalizedSpectrum,
        lines: &'a LineList,
    },
    Stacked {
        spectra: &'a [ObservedSpectrum],
        lines: &'a LineList,
    },
    Comparison {
        spectra: &'a [ObservedSpectrum],
        lines: &'a LineList,
    },
    Single {
        spectrum: &'a ObservedSpectrum,
        lines: &'a LineList,
    },
}

impl Chart<'_> {
    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        style: &PlotStyle,
    ) -> Result<(), PlotError> {
        root.fill(&WHITE)?;
        let root = root.margin(20, 20, 20, 20);

        match self {
            Chart::Normalized { spectrum, lines } => draw_normalized(&root, spectrum, lines, style),
            Chart::Stacked { spectra, lines } => draw_stacked(&root, spectra, lines, style),
            Chart::Comparison { spectra, lines } => draw_comparison(&root, spectra, lines, style),
            Chart::Single { spectrum, lines } => draw_single(&root, spectrum, lines, style),
        }
    }
}

fn render(path: &Path, style: &PlotStyle, chart: Chart<'_>) -> Result<(), PlotError> {
    let size = (style.width, style.height);
    let is_svg = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        chart.draw(&root, style)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        chart.draw(&root, style)?;
        root.present()?;
    }

    info!("Saved chart to {}", path.display());
    Ok(())
}

/// Raw and normalized flux on one set of axes with labelled line markers
pub fn plot_normalized(
    path: &Path,
    spectrum: &NormalizedSpectrum,
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    render(path, style, Chart::Normalized { spectrum, lines })
}

/// Spectra offset vertically by `flux_offset`, labelled at their red end
pub fn plot_stacked(
    path: &Path,
    spectra: &[ObservedSpectrum],
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    if spectra.is_empty() {
        return Err(PlotError::EmptyInput);
    }
    render(path, style, Chart::Stacked { spectra, lines })
}

/// Spectra overlaid without offset, line markers coloured by element
pub fn plot_comparison(
    path: &Path,
    spectra: &[ObservedSpectrum],
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    if spectra.is_empty() {
        return Err(PlotError::EmptyInput);
    }
    render(path, style, Chart::Comparison { spectra, lines })
}

/// One spectrum with a legend entry per line marker
pub fn plot_spectrum(
    path: &Path,
    spectrum: &ObservedSpectrum,
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    render(path, style, Chart::Single { spectrum, lines })
}

fn draw_normalized<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectrum: &NormalizedSpectrum,
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let wavelengths = spectrum.wavelengths();
    let raw = spectrum.raw.flux();
    let normalized = spectrum.normalized_flux();

    let x_range = spectrum.raw.range();
    let norm_range = finite_range(normalized).ok_or(PlotError::EmptyInput)?;
    let label_y = norm_range.0 - 0.05 * (norm_range.1 - norm_range.0);

    let data_range = merge(spectrum.raw.flux_range(), norm_range);
    let y_range = padded(merge(data_range, (label_y, label_y)), 0.05);

    let title = style.title_or(format!(
        "{} - Normalized and Unnormalized Spectrum",
        spectrum.raw.display_name()
    ));

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 32).into_font().color(&BLACK))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 16))
        .draw()?;

    let raw_color = BLUE.mix(0.5);
    chart
        .draw_series(LineSeries::new(
            finite_points(wavelengths, raw, 0.0),
            raw_color,
        ))?
        .label("Unnormalized Flux")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], raw_color.stroke_width(2)));

    let norm_color = RGBColor(255, 127, 14);
    chart
        .draw_series(LineSeries::new(
            finite_points(wavelengths, normalized, 0.0),
            norm_color,
        ))?
        .label("Normalized Flux")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], norm_color.stroke_width(2)));

    let font = ("sans-serif", style.label_font_size)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK);

    for line in lines.within(x_range.0, x_range.1).iter() {
        chart.draw_series(DashedLineSeries::new(
            marker(line.wavelength, y_range),
            6,
            4,
            BLACK.mix(0.5).stroke_width(1),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            line.label.clone(),
            (line.wavelength + style.label_gap, label_y),
            font.clone(),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .label_font(("sans-serif", 18))
        .draw()?;

    Ok(())
}

fn draw_stacked<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectra: &[ObservedSpectrum],
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    // Room on the right for the spectrum labels
    let label_shift = 50.0;

    let mut x_range = spectra[0].range();
    let mut y_range = (f64::INFINITY, f64::NEG_INFINITY);
    for (i, spectrum) in spectra.iter().enumerate() {
        let offset = i as f64 * style.flux_offset;
        x_range = merge(x_range, spectrum.range());
        if let Some((lo, hi)) = finite_range(spectrum.flux()) {
            y_range = merge(y_range, (lo + offset, hi + offset));
        }
    }
    if !y_range.0.is_finite() {
        return Err(PlotError::EmptyInput);
    }

    let visible_lines = lines.within(x_range.0, x_range.1);
    let label_positions = stacked_label_positions(
        visible_lines.lines(),
        y_range.0,
        0.5,
        style.crowding_angstrom,
        style.label_gap,
    );
    for &(_, y) in &label_positions {
        y_range = merge(y_range, (y, y));
    }

    let y_range = padded(y_range, 0.05);
    let x_range = (x_range.0, x_range.1 + 3.0 * label_shift);

    let mut chart = ChartBuilder::on(root)
        .caption(
            style.title_or("Stacked Spectra"),
            ("sans-serif", 32).into_font().color(&BLACK),
        )
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc("Normalized Flux + Constant")
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 16))
        .draw()?;

    for (i, spectrum) in spectra.iter().enumerate() {
        let offset = i as f64 * style.flux_offset;
        let color = Palette99::pick(i).to_rgba();

        chart.draw_series(LineSeries::new(
            finite_points(spectrum.wavelengths(), spectrum.flux(), offset),
            color,
        ))?;

        if let Some((w, f)) = finite_points(spectrum.wavelengths(), spectrum.flux(), offset).last() {
            chart.draw_series(std::iter::once(Text::new(
                spectrum.display_name().to_string(),
                (w + label_shift, f),
                ("sans-serif", 18).into_font().color(&color),
            )))?;
        }
    }

    let font = ("sans-serif", style.label_font_size)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK);

    for (line, &(x, y)) in visible_lines.iter().zip(label_positions.iter()) {
        chart.draw_series(DashedLineSeries::new(
            marker(line.wavelength, y_range),
            6,
            4,
            BLACK.mix(0.5).stroke_width(1),
        ))?;
        chart.draw_series(std::iter::once(Text::new(
            line.label.clone(),
            (x, y),
            font.clone(),
        )))?;
    }

    Ok(())
}

fn draw_comparison<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectra: &[ObservedSpectrum],
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let mut x_range = spectra[0].range();
    let mut y_range = spectra[0].flux_range();
    for spectrum in &spectra[1..] {
        x_range = merge(x_range, spectrum.range());
        y_range = merge(y_range, spectrum.flux_range());
    }
    let y_range = padded(y_range, 0.05);

    let mut chart = ChartBuilder::on(root)
        .caption(
            style.title_or("Comparison of Spectra"),
            ("sans-serif", 32).into_font().color(&BLACK),
        )
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 16))
        .draw()?;

    for (i, spectrum) in spectra.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(
                finite_points(spectrum.wavelengths(), spectrum.flux(), 0.0),
                color,
            ))?
            .label(spectrum.display_name())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    for line in lines.within(x_range.0, x_range.1).iter() {
        let color = element_color(line.element()).mix(0.3);
        chart.draw_series(DashedLineSeries::new(
            marker(line.wavelength, y_range),
            2,
            4,
            color.stroke_width(1),
        ))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .label_font(("sans-serif", 18))
        .draw()?;

    Ok(())
}

fn draw_single<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spectrum: &ObservedSpectrum,
    lines: &LineList,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let x_range = spectrum.range();
    let y_range = padded(spectrum.flux_range(), 0.05);

    let mut chart = ChartBuilder::on(root)
        .caption(
            style.title_or(format!("Spectrum from {}", spectrum.display_name())),
            ("sans-serif", 32).into_font().color(&BLACK),
        )
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.y_label.as_str())
        .axis_desc_style(("sans-serif", 20))
        .label_style(("sans-serif", 16))
        .draw()?;

    chart.draw_series(LineSeries::new(
        finite_points(spectrum.wavelengths(), spectrum.flux(), 0.0),
        BLUE,
    ))?;

    for line in lines.within(x_range.0, x_range.1).iter() {
        let color = element_color(line.element()).mix(0.5);
        chart
            .draw_series(DashedLineSeries::new(
                marker(line.wavelength, y_range),
                2,
                4,
                color.stroke_width(1),
            ))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.9))
        .border_style(BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    Ok(())
}
