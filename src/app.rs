//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - collects observations (interactively or from a manifest)
//! - fits the calibration line
//! - prints reports/plots
//! - writes optional exports

use std::io;
use std::path::Path;

use clap::Parser;

use crate::calibration::Calibration;
use crate::cli::{BatchArgs, CollectArgs, Command, DemoArgs, MeasureArgs, OutputArgs, PlotArgs};
use crate::data::{SyntheticConfig, write_standards};
use crate::domain::{CalibrationFit, ExtractionSettings};
use crate::error::{AppError, EXIT_USAGE};
use crate::extract::FsImageDecoder;
use crate::io::{CalibrationFile, read_calibration_json, write_calibration_json};

pub mod pipeline;

/// Entry point for the `colorcal` binary.
pub fn run() -> Result<(), AppError> {
    // ROI settings may come from a `.env` file; a missing file is fine.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Collect(args) => handle_collect(args),
        Command::Batch(args) => handle_batch(args),
        Command::Measure(args) => handle_measure(args),
        Command::Plot(args) => handle_plot(args),
        Command::Demo(args) => handle_demo(args),
    }
}

/// How a run without a usable fit ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FitFailure {
    /// Print the reason and exit normally (interactive sessions).
    Report,
    /// Return the error so the process exits non-zero.
    Fail,
}

fn handle_collect(args: CollectArgs) -> Result<(), AppError> {
    let settings = args.roi.settings();
    log::info!(
        "collecting with region {} on the {} channel",
        settings.roi,
        settings.channel.display_name()
    );

    let mut calibration = Calibration::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    crate::cli::session::run_session(
        &mut stdin.lock(),
        &mut stdout.lock(),
        &FsImageDecoder,
        &settings,
        &mut calibration,
    )?;

    finish(&calibration, &settings, &args.output, FitFailure::Report)
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let settings = args.roi.settings();
    let manifest = crate::io::load_manifest(&args.manifest)?;

    let mut calibration = Calibration::new();
    let outcome = pipeline::run_batch(&FsImageDecoder, &manifest, &settings, &mut calibration);

    println!(
        "Analyzed {} image(s) from '{}'.",
        outcome.added.len(),
        args.manifest.display()
    );
    if !outcome.skipped.is_empty() {
        println!("{}", crate::report::format_skipped(&outcome.skipped));
    }

    finish(&calibration, &settings, &args.output, FitFailure::Fail)
}

/// Fit the collected observations and produce every requested output.
fn finish(
    calibration: &Calibration,
    settings: &ExtractionSettings,
    output: &OutputArgs,
    on_failure: FitFailure,
) -> Result<(), AppError> {
    let fit = match calibration.fit() {
        Ok(fit) => fit,
        Err(err) => {
            return match on_failure {
                FitFailure::Report => {
                    println!("{err}");
                    Ok(())
                }
                FitFailure::Fail => Err(err.into()),
            };
        }
    };

    println!("{}", crate::report::format_fit_summary(&fit, settings));
    println!("{}", crate::report::format_observations(&fit));
    if !output.no_plot {
        let plot = crate::plot::render_ascii_plot(
            &fit,
            &settings.channel.axis_label(),
            output.width,
            output.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &output.export_json {
        let file = CalibrationFile::new(settings, calibration, &fit);
        write_calibration_json(path, &file)?;
        println!("Saved calibration to '{}'.", path.display());
    }
    if let Some(path) = &output.export_csv {
        crate::io::write_observations_csv(path, &fit)?;
        println!("Exported observations to '{}'.", path.display());
    }

    render_charts(&fit, settings, output.svg.as_deref(), output.view)
}

/// SVG file and interactive viewer, both optional.
fn render_charts(
    fit: &CalibrationFit,
    settings: &ExtractionSettings,
    svg: Option<&Path>,
    view: bool,
) -> Result<(), AppError> {
    if let Some(path) = svg {
        crate::plot::write_svg_chart(path, fit, &settings.channel.axis_label())?;
        println!("Wrote chart to '{}'.", path.display());
    }
    if view {
        crate::tui::run_viewer(fit, settings)?;
    }
    Ok(())
}

fn handle_measure(args: MeasureArgs) -> Result<(), AppError> {
    let file = read_calibration_json(&args.calibration)?;
    let fit = file.calibration().fit()?;
    println!("Calibration: {}", fit.stats.equation());

    let mut measurements = Vec::new();
    let mut failures = 0usize;
    for result in pipeline::measure_unknowns(&FsImageDecoder, &args.images, &file.extraction, &fit)
    {
        match result {
            Ok(m) => measurements.push(m),
            Err(err) => {
                println!("{err}");
                failures += 1;
            }
        }
    }

    if !measurements.is_empty() {
        println!("{}", crate::report::format_measurements(&measurements));
    }
    if measurements.is_empty() {
        return Err(AppError::new(
            EXIT_USAGE,
            format!("None of the {failures} image(s) could be measured."),
        ));
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let file = read_calibration_json(&args.calibration)?;
    let fit = file.calibration().fit()?;
    let settings = file.extraction;

    println!("{}", crate::report::format_fit_summary(&fit, &settings));
    let plot = crate::plot::render_ascii_plot(
        &fit,
        &settings.channel.axis_label(),
        args.width,
        args.height,
    );
    println!("{plot}");

    render_charts(&fit, &settings, args.svg.as_deref(), args.view)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        count: args.count,
        seed: args.seed,
        concentration_max: args.max_concentration,
        pixel_noise: args.pixel_noise,
        ..SyntheticConfig::default()
    };
    let manifest = write_standards(&args.out, &config)?;

    println!(
        "Wrote {} synthetic standard(s) to '{}'.",
        config.count,
        args.out.display()
    );
    println!("Try: colorcal batch --manifest {}", manifest.display());
    Ok(())
}

/// Rewrite argv so `colorcal` defaults to `colorcal collect`.
///
/// Rules:
/// - `colorcal`                      -> `colorcal collect`
/// - `colorcal --roi-x 10 ...`       -> `colorcal collect --roi-x 10 ...`
/// - `colorcal --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("collect".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "collect" | "batch" | "measure" | "plot" | "demo"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "collect flags".
    if arg1.starts_with('-') {
        argv.insert(1, "collect".to_string());
        return argv;
    }

    argv
}
