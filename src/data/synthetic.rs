//! Synthetic calibration standards.
//!
//! Generates a reproducible set of images whose blue channel inside the
//! default region follows a known linear response to concentration, plus the
//! `manifest.csv` that `colorcal batch` reads. Handy for trying the tool or
//! checking a setup without a lab.
//!
//! Response model (per image `i`):
//!
//! ```text
//! level_i = base - sensitivity * c_i + N(0, image_noise)
//! pixel   = clamp(round(level_i + N(0, pixel_noise)), 0, 255)
//! ```
//!
//! Pixels outside the region carry a plain background so that a misplaced
//! region shows up as a bad fit.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CONCENTRATION_UNIT, Roi};
use crate::error::{AppError, EXIT_INTERNAL, EXIT_USAGE};

/// Background value outside the sample region.
const BACKGROUND: Rgb<u8> = Rgb([235, 235, 235]);

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub count: usize,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub roi: Roi,
    pub concentration_max: f64,
    /// Blue level at zero concentration.
    pub base_intensity: f64,
    /// Drop in blue level per concentration unit.
    pub sensitivity: f64,
    pub image_noise: f64,
    pub pixel_noise: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            count: 6,
            seed: 42,
            width: 200,
            height: 200,
            roi: crate::domain::DEFAULT_ROI,
            concentration_max: 10.0,
            base_intensity: 210.0,
            sensitivity: 12.0,
            image_noise: 1.5,
            pixel_noise: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSample {
    pub image: RgbImage,
    pub concentration: f64,
    /// Noise-free level the pixels were drawn around.
    pub expected_intensity: f64,
}

/// Generate the images in memory.
pub fn generate_standards(config: &SyntheticConfig) -> Result<Vec<SyntheticSample>, AppError> {
    if config.count < 2 {
        return Err(AppError::new(EXIT_USAGE, "Need at least two standards."));
    }
    if !config.roi.fits_within(config.width, config.height) {
        return Err(AppError::new(
            EXIT_USAGE,
            format!(
                "Region ({}) does not fit a {}x{} image.",
                config.roi, config.width, config.height
            ),
        ));
    }
    if !(config.concentration_max.is_finite() && config.concentration_max > 0.0) {
        return Err(AppError::new(EXIT_USAGE, "Maximum concentration must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let image_noise = Normal::new(0.0, config.image_noise.max(0.0))
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Noise distribution error: {e}")))?;
    let pixel_noise = Normal::new(0.0, config.pixel_noise.max(0.0))
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Noise distribution error: {e}")))?;

    let step = config.concentration_max / (config.count - 1) as f64;
    let mut out = Vec::with_capacity(config.count);

    for i in 0..config.count {
        let concentration = step * i as f64;
        let expected_intensity = config.base_intensity - config.sensitivity * concentration;
        let level = expected_intensity + image_noise.sample(&mut rng);

        let mut image = RgbImage::from_pixel(config.width, config.height, BACKGROUND);
        for y in config.roi.y..config.roi.bottom() {
            for x in config.roi.x..config.roi.right() {
                let blue = to_u8(level + pixel_noise.sample(&mut rng));
                // A slight yellow cast that deepens with concentration.
                let red = to_u8(180.0 + 2.0 * concentration);
                let green = to_u8(170.0 + 1.0 * concentration);
                image.put_pixel(x, y, Rgb([red, green, blue]));
            }
        }

        out.push(SyntheticSample {
            image,
            concentration,
            expected_intensity,
        });
    }

    Ok(out)
}

/// Generate the standards and write them to `dir` with a `manifest.csv`.
///
/// Returns the manifest path.
pub fn write_standards(dir: &Path, config: &SyntheticConfig) -> Result<PathBuf, AppError> {
    let samples = generate_standards(config)?;
    create_dir_all(dir).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create output directory '{}': {e}", dir.display()),
        )
    })?;

    let manifest_path = dir.join("manifest.csv");
    let mut manifest = File::create(&manifest_path)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to create manifest: {e}")))?;
    writeln!(manifest, "path,concentration")
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write manifest: {e}")))?;

    for (i, sample) in samples.iter().enumerate() {
        let name = format!("standard_{:02}.png", i + 1);
        sample.image.save(dir.join(&name)).map_err(|e| {
            AppError::new(EXIT_INTERNAL, format!("Failed to write image '{name}': {e}"))
        })?;
        writeln!(manifest, "{name},{}", sample.concentration)
            .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write manifest: {e}")))?;
        log::info!(
            "{name}: {} {CONCENTRATION_UNIT}, expected intensity {:.2}",
            sample.concentration,
            sample.expected_intensity
        );
    }

    Ok(manifest_path)
}

fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
