//! Command-line parsing for the colorimetric calibration tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the extraction/regression code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Channel, DEFAULT_ROI, ExtractionSettings, Roi, RoiPolicy};

pub mod session;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "colorcal",
    version,
    about = "Colorimetric calibration: image intensity vs known concentration"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a calibration interactively (image path + known concentration per sample).
    ///
    /// This is the default when no subcommand is given.
    Collect(CollectArgs),
    /// Build a calibration from a `path,concentration` manifest CSV.
    Batch(BatchArgs),
    /// Predict concentrations of unknown samples from a saved calibration.
    Measure(MeasureArgs),
    /// Re-render a saved calibration.
    Plot(PlotArgs),
    /// Write synthetic calibration standards and a manifest.
    Demo(DemoArgs),
}

/// Region of interest and channel selection.
#[derive(Debug, Args, Clone)]
pub struct RoiArgs {
    /// Left edge of the region (pixels).
    #[arg(long, env = "COLORCAL_ROI_X", default_value_t = DEFAULT_ROI.x)]
    pub roi_x: u32,

    /// Top edge of the region (pixels).
    #[arg(long, env = "COLORCAL_ROI_Y", default_value_t = DEFAULT_ROI.y)]
    pub roi_y: u32,

    /// Region width (pixels).
    #[arg(long, env = "COLORCAL_ROI_WIDTH", default_value_t = DEFAULT_ROI.width)]
    pub roi_width: u32,

    /// Region height (pixels).
    #[arg(long, env = "COLORCAL_ROI_HEIGHT", default_value_t = DEFAULT_ROI.height)]
    pub roi_height: u32,

    /// Color channel used as the intensity proxy.
    #[arg(long, env = "COLORCAL_CHANNEL", value_enum, default_value_t = Channel::Blue)]
    pub channel: Channel,

    /// What to do when the region does not fit inside an image.
    #[arg(long, env = "COLORCAL_ROI_POLICY", value_enum, default_value_t = RoiPolicy::Truncate)]
    pub roi_policy: RoiPolicy,
}

impl RoiArgs {
    pub fn settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            roi: Roi::new(self.roi_x, self.roi_y, self.roi_width, self.roi_height),
            channel: self.channel,
            policy: self.roi_policy,
        }
    }
}

/// Rendering and export options shared by the commands that produce a fit.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Also render the chart to an SVG file.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Open the interactive chart viewer after fitting.
    #[arg(long)]
    pub view: bool,

    /// Save the calibration (settings, observations, fit) as JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Export the sorted observations with predictions and residuals to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,
}

/// Options for the interactive session.
#[derive(Debug, Args, Clone)]
pub struct CollectArgs {
    #[command(flatten)]
    pub roi: RoiArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options for manifest-driven calibration.
#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Manifest CSV with `path` and `concentration` columns.
    #[arg(short = 'm', long, value_name = "CSV")]
    pub manifest: PathBuf,

    #[command(flatten)]
    pub roi: RoiArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options for measuring unknown samples.
#[derive(Debug, Args, Clone)]
pub struct MeasureArgs {
    /// Calibration JSON produced by `--export-json`.
    #[arg(short = 'c', long, value_name = "JSON")]
    pub calibration: PathBuf,

    /// Images of the unknown samples.
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<PathBuf>,
}

/// Options for re-rendering a saved calibration.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Calibration JSON produced by `--export-json`.
    #[arg(short = 'c', long, value_name = "JSON")]
    pub calibration: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Render the chart to an SVG file.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Open the interactive chart viewer.
    #[arg(long)]
    pub view: bool,
}

/// Options for generating synthetic standards.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Output directory for the images and `manifest.csv`.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out: PathBuf,

    /// Number of standards.
    #[arg(short = 'n', long, default_value_t = 6)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Highest concentration (standards are evenly spaced from 0).
    #[arg(long, default_value_t = 10.0)]
    pub max_concentration: f64,

    /// Per-pixel noise (standard deviation, intensity levels).
    #[arg(long, default_value_t = 4.0)]
    pub pixel_noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_defaults_match_the_standard_region() {
        let cli = Cli::parse_from(["colorcal", "collect"]);
        let Command::Collect(args) = cli.command else {
            panic!("expected collect");
        };
        assert_eq!(args.roi.settings(), ExtractionSettings::default());
        assert!(!args.output.no_plot);
    }

    #[test]
    fn batch_accepts_roi_and_exports() {
        let cli = Cli::parse_from([
            "colorcal",
            "batch",
            "--manifest",
            "m.csv",
            "--roi-x",
            "10",
            "--channel",
            "green",
            "--roi-policy",
            "strict",
            "--export-json",
            "cal.json",
        ]);
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        let settings = args.roi.settings();
        assert_eq!(settings.roi, Roi::new(10, 50, 100, 100));
        assert_eq!(settings.channel, Channel::Green);
        assert_eq!(settings.policy, RoiPolicy::Strict);
        assert_eq!(args.output.export_json, Some(PathBuf::from("cal.json")));
    }

    #[test]
    fn measure_requires_images() {
        assert!(Cli::try_parse_from(["colorcal", "measure", "-c", "cal.json"]).is_err());
        let cli = Cli::try_parse_from(["colorcal", "measure", "-c", "cal.json", "a.png", "b.png"])
            .unwrap();
        let Command::Measure(args) = cli.command else {
            panic!("expected measure");
        };
        assert_eq!(args.images.len(), 2);
    }
}
