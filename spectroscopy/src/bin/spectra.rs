//! Stellar spectrum normalization and line measurement tool
//!
//! # Usage
//!
//! ```bash
//! # Normalize a spectrum, write the normalized table and a chart
//! cargo run --release --bin spectra -- normalize ProblemStar1.dat \
//!     --output ProblemStar1_norm.dat --plot ProblemStar1.png
//!
//! # Equivalent widths of the default hydrogen and helium lines
//! cargo run --release --bin spectra -- ew ProblemStar1.dat
//!
//! # Equivalent widths of specific lines with a wider window
//! cargo run --release --bin spectra -- ew ProblemStar1.dat --at 4861 --at 6563 --half-width 8
//!
//! # Stacked chart of every spectrum in a directory
//! cargo run --release --bin spectra -- stack ExampleStars --plot stacked.png
//!
//! # Overlay of a hand-picked star set
//! cargo run --release --bin spectra -- compare --set main_sequence.json --plot overlay.png
//!
//! # List a directory, then chart one file from it
//! cargo run --release --bin spectra -- list TestStars
//! cargo run --release --bin spectra -- show TestStars --index 2 --plot test2.png
//! ```
//!
//! Every subcommand accepts `--config analysis.json` to override the default
//! smoothing window, equivalent-width window and chart style. Set
//! `RUST_LOG=debug` for per-step diagnostics.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use spectroscopy::continuum::normalize_all;
use spectroscopy::equivalent_width::measure_lines;
use spectroscopy::lines::LineList;
use spectroscopy::plot::{plot_comparison, plot_normalized, plot_spectrum, plot_stacked};
use spectroscopy::shared_args::{
    load_config, measurement_targets, ContinuumArgs, EquivalentWidthArgs, LineArgs, StackArgs,
};
use spectroscopy::stars::{spectral_type_from_filename, StarSet};
use spectroscopy::{normalize, AnalysisConfig, ObservedSpectrum};

#[derive(Parser, Debug)]
#[command(
    name = "spectra",
    about = "Continuum normalization, equivalent widths and line charts for stellar spectra",
    long_about = None
)]
struct Cli {
    /// JSON analysis config (smoothing, equivalent-width window, chart style)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Stars to process: a directory of `.dat` files or a JSON star set
#[derive(Args, Debug)]
struct StarSource {
    /// Directory of `.dat` spectrum tables
    #[arg(required_unless_present = "set")]
    dir: Option<PathBuf>,

    /// JSON star set (`[{"label": ..., "path": ...}]`)
    #[arg(long, conflicts_with = "dir")]
    set: Option<PathBuf>,
}

impl StarSource {
    fn load(&self) -> Result<StarSet> {
        match (&self.dir, &self.set) {
            (_, Some(set)) => StarSet::load_from_file(set)
                .with_context(|| format!("reading star set {}", set.display())),
            (Some(dir), None) => StarSet::from_directory(dir)
                .with_context(|| format!("listing {}", dir.display())),
            (None, None) => bail!("either a directory or --set is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize one spectrum by its smoothed continuum
    Normalize {
        /// Two-column wavelength/flux table
        input: PathBuf,

        /// Write the normalized table here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a chart of raw and normalized flux here (.png or .svg)
        #[arg(short, long)]
        plot: Option<PathBuf>,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        continuum: ContinuumArgs,
    },

    /// Measure equivalent widths of absorption lines
    Ew {
        /// Two-column wavelength/flux table
        input: PathBuf,

        /// Line wavelength (Å) to measure; repeatable, defaults to the config's line set
        #[arg(long = "at")]
        at: Vec<f64>,

        #[command(flatten)]
        equivalent_width: EquivalentWidthArgs,

        /// Measure on the raw flux instead of the normalized flux
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        continuum: ContinuumArgs,
    },

    /// Chart several spectra offset vertically
    Stack {
        #[command(flatten)]
        source: StarSource,

        /// Output chart (.png or .svg)
        #[arg(short, long)]
        plot: PathBuf,

        #[command(flatten)]
        stack: StackArgs,

        /// Normalize each spectrum before stacking
        #[arg(long)]
        normalize: bool,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        continuum: ContinuumArgs,
    },

    /// Overlay several spectra on one set of axes
    Compare {
        #[command(flatten)]
        source: StarSource,

        /// Output chart (.png or .svg)
        #[arg(short, long)]
        plot: PathBuf,

        /// Normalize each spectrum before overlaying
        #[arg(long)]
        normalize: bool,

        #[command(flatten)]
        lines: LineArgs,

        #[command(flatten)]
        continuum: ContinuumArgs,
    },

    /// List the spectra in a directory with their index and spectral type
    List {
        /// Directory of `.dat` spectrum tables
        dir: PathBuf,
    },

    /// Chart one spectrum picked by index from a directory
    Show {
        /// Directory of `.dat` spectrum tables
        dir: PathBuf,

        /// Index as printed by `list`
        #[arg(short, long)]
        index: usize,

        /// Output chart (.png or .svg)
        #[arg(short, long)]
        plot: PathBuf,

        #[command(flatten)]
        lines: LineArgs,
    },
}

fn run_normalize(
    config: &AnalysisConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    plot: Option<PathBuf>,
    lines: &LineList,
) -> Result<()> {
    let spectrum = ObservedSpectrum::load(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let result = normalize(&spectrum, &config.continuum)
        .with_context(|| format!("normalizing {}", input.display()))?;

    println!(
        "{}: {} samples, {:.1}-{:.1} Å, window {} order {}",
        spectrum.display_name(),
        spectrum.len(),
        spectrum.range().0,
        spectrum.range().1,
        config.continuum.window_length,
        config.continuum.polyorder
    );
    if result.invalid_samples > 0 {
        println!(
            "  {} samples have no usable continuum",
            result.invalid_samples
        );
    }

    if let Some(output) = output {
        result
            .normalized
            .save(&output)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    if let Some(plot) = plot {
        plot_normalized(&plot, &result, lines, &config.plot)
            .with_context(|| format!("drawing {}", plot.display()))?;
    }

    Ok(())
}

fn run_equivalent_widths(
    config: &AnalysisConfig,
    input: PathBuf,
    at: Vec<f64>,
    raw: bool,
    catalogue: &LineList,
) -> Result<()> {
    let spectrum = ObservedSpectrum::load(&input)
        .with_context(|| format!("reading {}", input.display()))?;

    let measured = if raw {
        spectrum
    } else {
        normalize(&spectrum, &config.continuum)
            .with_context(|| format!("normalizing {}", input.display()))?
            .normalized
    };

    let targets = measurement_targets(catalogue, &at, config);

    info!(
        "Measuring {} lines with a ±{} Å window",
        targets.len(),
        config.equivalent_width.half_width
    );

    for measurement in measure_lines(&measured, &targets, &config.equivalent_width) {
        println!("{measurement}");
    }

    Ok(())
}

fn run_list(dir: PathBuf) -> Result<()> {
    let set = StarSet::from_directory(&dir).with_context(|| format!("listing {}", dir.display()))?;

    println!("{:<6} {:<45} {:<10}", "Index", "File", "Type");
    println!("{:-<63}", "");
    for (index, star) in set.stars().iter().enumerate() {
        let file_name = star
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        println!(
            "{:<6} {:<45} {:<10}",
            index,
            file_name,
            spectral_type_from_filename(file_name).unwrap_or("-")
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())
        .context("reading analysis config")?;

    match cli.command {
        Commands::Normalize {
            input,
            output,
            plot,
            lines,
            continuum,
        } => {
            continuum.apply(&mut config);
            let lines = lines.load().context("reading line list")?;
            run_normalize(&config, input, output, plot, &lines)
        }

        Commands::Ew {
            input,
            at,
            equivalent_width,
            raw,
            lines,
            continuum,
        } => {
            continuum.apply(&mut config);
            equivalent_width.apply(&mut config);
            let lines = lines.load().context("reading line list")?;
            run_equivalent_widths(&config, input, at, raw, &lines)
        }

        Commands::Stack {
            source,
            plot,
            stack,
            normalize,
            lines,
            continuum,
        } => {
            continuum.apply(&mut config);
            stack.apply(&mut config);
            let lines = lines.load().context("reading line list")?;

            let mut spectra = source.load()?.load_available();
            if normalize {
                spectra = normalize_all(spectra, &config.continuum);
            }
            if spectra.is_empty() {
                bail!("no spectra could be loaded");
            }

            plot_stacked(&plot, &spectra, &lines, &config.plot)
                .with_context(|| format!("drawing {}", plot.display()))
        }

        Commands::Compare {
            source,
            plot,
            normalize,
            lines,
            continuum,
        } => {
            continuum.apply(&mut config);
            let lines = lines.load().context("reading line list")?;

            let mut spectra = source.load()?.load_available();
            if normalize {
                spectra = normalize_all(spectra, &config.continuum);
            }
            if spectra.is_empty() {
                bail!("no spectra could be loaded");
            }

            plot_comparison(&plot, &spectra, &lines, &config.plot)
                .with_context(|| format!("drawing {}", plot.display()))
        }

        Commands::List { dir } => run_list(dir),

        Commands::Show {
            dir,
            index,
            plot,
            lines,
        } => {
            let set = StarSet::from_directory(&dir)
                .with_context(|| format!("listing {}", dir.display()))?;
            let star = set.get(index)?;
            let spectrum = star
                .load()
                .with_context(|| format!("reading {}", star.path.display()))?;
            let lines = lines.load().context("reading line list")?;

            plot_spectrum(&plot, &spectrum, &lines, &config.plot)
                .with_context(|| format!("drawing {}", plot.display()))
        }
    }
}
