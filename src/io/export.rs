//! Export the fitted observations to CSV.
//!
//! Rows are in fit order (sorted by intensity), one per observation, so the
//! file is easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use serde::Serialize;

use crate::domain::CalibrationFit;
use crate::error::{AppError, EXIT_USAGE};

#[derive(Debug, Serialize)]
struct ObservationRow<'a> {
    source: &'a str,
    intensity: f64,
    concentration: f64,
    predicted: f64,
    residual: f64,
}

/// Write per-observation results to a CSV file.
pub fn write_observations_csv(path: &Path, fit: &CalibrationFit) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;

    for ((p, &predicted), residual) in fit.points.iter().zip(&fit.predicted).zip(fit.residuals()) {
        writer
            .serialize(ObservationRow {
                source: p.source.as_deref().unwrap_or(""),
                intensity: p.intensity,
                concentration: p.concentration,
                predicted,
                residual,
            })
            .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV: {e}")))?;
    log::info!("wrote {} rows to '{}'", fit.points.len(), path.display());
    Ok(())
}
