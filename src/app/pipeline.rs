//! Shared "measure and record" logic used by the interactive session, batch
//! mode and the `measure` command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! decode -> extract intensity -> (record observation | predict concentration)
//!
//! The front-ends can then focus on how they obtain inputs and report errors.

use std::path::{Path, PathBuf};

use crate::calibration::Calibration;
use crate::domain::{CalibrationFit, ExtractionSettings, Observation};
use crate::error::CalibrationError;
use crate::extract::{ImageDecoder, extract};
use crate::io::manifest::ManifestData;

/// Parse a user-supplied concentration.
///
/// Surrounding whitespace is ignored; anything that is not a finite number
/// (including `nan`/`inf`) is rejected.
pub fn parse_concentration(input: &str) -> Result<f64, CalibrationError> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CalibrationError::InvalidConcentrationInput {
            input: trimmed.to_string(),
        }),
    }
}

/// Decode `path` and measure its intensity.
///
/// Extraction is only attempted when decoding succeeded.
pub fn measure_image<D: ImageDecoder>(
    decoder: &D,
    path: &Path,
    settings: &ExtractionSettings,
) -> Result<f64, CalibrationError> {
    let image = decoder
        .decode(path)
        .ok_or_else(|| CalibrationError::ImageUnreadable {
            path: path.to_path_buf(),
        })?;
    extract(&image, settings)
}

/// Measure `path` and record it with its known concentration.
pub fn analyze_image<D: ImageDecoder>(
    decoder: &D,
    path: &Path,
    concentration: f64,
    settings: &ExtractionSettings,
    calibration: &mut Calibration,
) -> Result<Observation, CalibrationError> {
    let intensity = measure_image(decoder, path, settings)?;
    let observation =
        Observation::new(intensity, concentration).with_source(path.display().to_string());
    calibration.add_observation(observation.clone());
    log::info!(
        "recorded '{}': intensity={intensity:.4} concentration={concentration}",
        path.display()
    );
    Ok(observation)
}

/// One sample that could not be used, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedSample {
    pub line: Option<usize>,
    pub source: String,
    pub message: String,
}

/// Outcome of feeding a batch of samples into a calibration.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub added: Vec<Observation>,
    pub skipped: Vec<SkippedSample>,
}

/// Feed every manifest entry into `calibration`, skipping (and reporting)
/// bad rows and unusable images.
pub fn run_batch<D: ImageDecoder>(
    decoder: &D,
    manifest: &ManifestData,
    settings: &ExtractionSettings,
    calibration: &mut Calibration,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for row in &manifest.row_errors {
        outcome.skipped.push(SkippedSample {
            line: Some(row.line),
            source: row.source.clone().unwrap_or_default(),
            message: row.message.clone(),
        });
    }

    for entry in &manifest.entries {
        match analyze_image(decoder, &entry.path, entry.concentration, settings, calibration) {
            Ok(obs) => outcome.added.push(obs),
            Err(err) => {
                log::warn!("line {}: {err}", entry.line);
                outcome.skipped.push(SkippedSample {
                    line: Some(entry.line),
                    source: entry.path.display().to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    outcome
        .skipped
        .sort_by_key(|s| s.line.unwrap_or(usize::MAX));
    outcome
}

/// Concentration predicted for one unknown sample.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub path: PathBuf,
    pub intensity: f64,
    pub concentration: f64,
    /// The intensity lies outside the calibrated range.
    pub extrapolated: bool,
}

/// Measure unknown samples against a fitted calibration.
///
/// Unreadable images are returned as errors per path; they do not stop the
/// remaining measurements.
pub fn measure_unknowns<D: ImageDecoder>(
    decoder: &D,
    paths: &[PathBuf],
    settings: &ExtractionSettings,
    fit: &CalibrationFit,
) -> Vec<Result<Measurement, CalibrationError>> {
    paths
        .iter()
        .map(|path| {
            let intensity = measure_image(decoder, path, settings)?;
            let extrapolated = !fit.in_range(intensity);
            if extrapolated {
                log::warn!(
                    "'{}': intensity {intensity:.2} is outside the calibrated range; the concentration is extrapolated",
                    path.display()
                );
            }
            Ok(Measurement {
                path: path.clone(),
                intensity,
                concentration: fit.predict(intensity),
                extrapolated,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use image::{Rgb, RgbImage};

    use crate::extract::ImageDecoder;

    /// In-memory decoder: known paths map to solid-blue images.
    #[derive(Default)]
    pub struct FakeDecoder {
        images: HashMap<PathBuf, RgbImage>,
    }

    impl FakeDecoder {
        pub fn with_blue(mut self, path: &str, blue: u8) -> Self {
            self.images.insert(
                PathBuf::from(path),
                RgbImage::from_pixel(200, 200, Rgb([0, 0, blue])),
            );
            self
        }

        pub fn with_image(mut self, path: &str, image: RgbImage) -> Self {
            self.images.insert(PathBuf::from(path), image);
            self
        }
    }

    impl ImageDecoder for FakeDecoder {
        fn decode(&self, path: &Path) -> Option<RgbImage> {
            self.images.get(path).cloned()
        }
    }
}
