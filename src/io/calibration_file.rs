//! Read/write calibration JSON files.
//!
//! A calibration file is the portable representation of a run:
//! - the extraction settings (region, channel, policy) needed to measure
//!   unknown samples the same way
//! - the observations in insertion order
//! - the fit statistics and the sorted/predicted series for quick plotting
//!
//! Readers refit from `observations`; `fit` and `curve` are informational.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::domain::{CalibrationFit, ExtractionSettings, FitStats, Observation};
use crate::error::{AppError, EXIT_USAGE};

pub const TOOL_NAME: &str = "colorcal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveSeries {
    pub intensity: Vec<f64>,
    pub concentration: Vec<f64>,
    pub predicted: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFile {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub extraction: ExtractionSettings,
    pub observations: Vec<Observation>,
    pub fit: FitStats,
    pub curve: CurveSeries,
}

impl CalibrationFile {
    pub fn new(
        settings: &ExtractionSettings,
        calibration: &Calibration,
        fit: &CalibrationFit,
    ) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated: Local::now(),
            extraction: *settings,
            observations: calibration.observations().to_vec(),
            fit: fit.stats,
            curve: CurveSeries {
                intensity: fit.intensities(),
                concentration: fit.concentrations(),
                predicted: fit.predicted.clone(),
            },
        }
    }

    /// Rebuild the accumulator from the stored observations.
    pub fn calibration(&self) -> Calibration {
        Calibration::from_observations(self.observations.clone())
    }
}

/// Write a calibration JSON file.
pub fn write_calibration_json(path: &Path, file: &CalibrationFile) -> Result<(), AppError> {
    let out = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create calibration JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write calibration JSON: {e}")))?;
    log::info!("wrote calibration to '{}'", path.display());
    Ok(())
}

/// Read a calibration JSON file.
pub fn read_calibration_json(path: &Path) -> Result<CalibrationFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to open calibration JSON '{}': {e}", path.display()),
        )
    })?;
    let calibration: CalibrationFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Invalid calibration JSON: {e}")))?;
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, Roi, RoiPolicy};

    #[test]
    fn calibration_json_round_trips_and_refits() {
        let mut cal = Calibration::new();
        cal.add_observation(Observation::new(30.0, 3.0).with_source("c.png"));
        cal.add_observation(Observation::new(10.0, 1.0).with_source("a.png"));
        cal.add(2.0, 20.0);
        let fit = cal.fit().unwrap();
        let settings = ExtractionSettings {
            roi: Roi::new(5, 6, 7, 8),
            channel: Channel::Green,
            policy: RoiPolicy::Strict,
        };

        let dir = std::env::temp_dir().join(format!("colorcal-json-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cal.json");
        write_calibration_json(&path, &CalibrationFile::new(&settings, &cal, &fit)).unwrap();

        let loaded = read_calibration_json(&path).unwrap();
        assert_eq!(loaded.tool, TOOL_NAME);
        assert_eq!(loaded.extraction, settings);
        assert_eq!(loaded.observations, cal.observations());
        assert_eq!(loaded.curve.intensity, vec![10.0, 20.0, 30.0]);
        let refit = loaded.calibration().fit().unwrap();
        assert!((refit.stats.slope - fit.stats.slope).abs() < 1e-12);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn garbage_json_is_a_usage_error() {
        let dir = std::env::temp_dir().join(format!("colorcal-badjson-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_calibration_json(&path).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
