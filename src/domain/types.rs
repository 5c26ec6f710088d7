//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during collection and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or measuring unknown samples

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default region of interest: `(x, y, width, height) = (50, 50, 100, 100)`.
pub const DEFAULT_ROI: Roi = Roi {
    x: 50,
    y: 50,
    width: 100,
    height: 100,
};

/// Unit label used for concentrations in prompts, reports and charts.
pub const CONCENTRATION_UNIT: &str = "µg/mL";

/// Which color channel is measured.
///
/// Channels are addressed by name rather than by index, so the BGR/RGB storage
/// order of the decoder never leaks into the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Blue,
    Green,
    Red,
}

impl Channel {
    /// Index of this channel in an `image::Rgb<u8>` pixel.
    pub fn rgb_index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Channel::Blue => "Blue",
            Channel::Green => "Green",
            Channel::Red => "Red",
        }
    }

    /// X-axis label for charts, e.g. "Color Intensity (Blue Channel Mean)".
    pub fn axis_label(self) -> String {
        format!("Color Intensity ({} Channel Mean)", self.display_name())
    }
}

/// What to do when the region of interest does not fit inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoiPolicy {
    /// Clip the region to the image and average what remains (logs a warning).
    Truncate,
    /// Reject the image with `RegionOutOfBounds`.
    Strict,
}

/// Rectangular region of interest in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge (saturating, so huge regions never overflow).
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the whole region lies inside an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }

    /// Intersect the region with an image of the given size.
    ///
    /// Returns `None` when no pixel remains.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Roi> {
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(Roi {
            x: self.x,
            y: self.y,
            width: right - self.x,
            height: bottom - self.y,
        })
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={} y={} w={} h={}", self.x, self.y, self.width, self.height)
    }
}

/// Everything the extractor needs to turn an image into an intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSettings {
    pub roi: Roi,
    pub channel: Channel,
    pub policy: RoiPolicy,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            roi: DEFAULT_ROI,
            channel: Channel::Blue,
            policy: RoiPolicy::Truncate,
        }
    }
}

/// One calibration data point.
///
/// `source` is a display/export label (usually the image path); it never
/// participates in the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub intensity: f64,
    pub concentration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Observation {
    pub fn new(intensity: f64, concentration: f64) -> Self {
        Self {
            intensity,
            concentration,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Regression statistics of a calibration fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitStats {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub correlation: f64,
    /// Two-sided p-value for the null hypothesis of zero slope.
    pub p_value: f64,
    /// Standard error of the slope.
    pub standard_error: f64,
    pub intercept_stderr: f64,
    pub n: usize,
}

impl FitStats {
    pub fn r_squared(&self) -> f64 {
        self.correlation * self.correlation
    }

    /// Predicted concentration for a measured intensity.
    pub fn predict(&self, intensity: f64) -> f64 {
        self.slope * intensity + self.intercept
    }

    /// Legend-style equation, rounded for display.
    pub fn equation(&self) -> String {
        format!(
            "Concentration = {} * Intensity + {}",
            fmt_2dp(self.slope),
            fmt_2dp(self.intercept)
        )
    }
}

/// Two decimals, without the "-0.00" that tiny negative round-off produces.
fn fmt_2dp(v: f64) -> String {
    let s = format!("{v:.2}");
    if s == "-0.00" { "0.00".to_string() } else { s }
}

/// A fitted calibration curve over sorted observations.
///
/// `points` are sorted by intensity (stable, ties in insertion order) and
/// `predicted[i]` belongs to `points[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFit {
    pub stats: FitStats,
    pub points: Vec<Observation>,
    pub predicted: Vec<f64>,
}

impl CalibrationFit {
    pub fn predict(&self, intensity: f64) -> f64 {
        self.stats.predict(intensity)
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.intensity).collect()
    }

    pub fn concentrations(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.concentration).collect()
    }

    /// Intensity range covered by the calibration points.
    pub fn intensity_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.intensity, last.intensity))
    }

    /// Whether `intensity` lies inside the calibrated range (no extrapolation).
    pub fn in_range(&self, intensity: f64) -> bool {
        self.intensity_range()
            .map(|(lo, hi)| intensity >= lo && intensity <= hi)
            .unwrap_or(false)
    }

    pub fn residuals(&self) -> Vec<f64> {
        self.points
            .iter()
            .zip(self.predicted.iter())
            .map(|(p, y_fit)| p.concentration - y_fit)
            .collect()
    }
}
