//! Batch manifest ingest.
//!
//! A manifest is a CSV listing calibration images and their known
//! concentrations:
//!
//! ```text
//! path,concentration
//! standards/std_0.png,0
//! standards/std_1.png,2.5
//! ```
//!
//! Design goals:
//! - **Strict schema** for the header (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - relative image paths resolve against the manifest's directory

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::app::pipeline::parse_concentration;
use crate::error::{AppError, EXIT_USAGE};

/// Accepted names for the image column.
const PATH_COLUMNS: [&str; 3] = ["path", "image", "file"];
const CONCENTRATION_COLUMN: &str = "concentration";

/// One usable manifest row.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub line: usize,
    pub path: PathBuf,
    pub concentration: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRowError {
    pub line: usize,
    pub source: Option<String>,
    pub message: String,
}

/// Ingest output: usable rows plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct ManifestData {
    pub entries: Vec<ManifestEntry>,
    pub row_errors: Vec<ManifestRowError>,
}

/// Load a manifest file.
pub fn load_manifest(path: &Path) -> Result<ManifestData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_USAGE,
            format!("Failed to open manifest '{}': {e}", path.display()),
        )
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_manifest(file, base_dir)
}

/// Parse manifest CSV from any reader, resolving relative paths against `base_dir`.
pub fn parse_manifest<R: Read>(reader: R, base_dir: &Path) -> Result<ManifestData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to read manifest header: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let path_col = PATH_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            AppError::new(
                EXIT_USAGE,
                format!(
                    "Manifest is missing an image column (one of: {}).",
                    PATH_COLUMNS.join(", ")
                ),
            )
        })?;
    let conc_col = header_map.get(CONCENTRATION_COLUMN).copied().ok_or_else(|| {
        AppError::new(
            EXIT_USAGE,
            format!("Manifest is missing the '{CONCENTRATION_COLUMN}' column."),
        )
    })?;

    let mut data = ManifestData::default();

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                data.row_errors.push(ManifestRowError {
                    line,
                    source: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let raw_path = record.get(path_col).unwrap_or("");
        if raw_path.is_empty() {
            data.row_errors.push(ManifestRowError {
                line,
                source: None,
                message: "Missing image path.".to_string(),
            });
            continue;
        }

        let concentration = match parse_concentration(record.get(conc_col).unwrap_or("")) {
            Ok(v) => v,
            Err(e) => {
                data.row_errors.push(ManifestRowError {
                    line,
                    source: Some(raw_path.to_string()),
                    message: e.to_string(),
                });
                continue;
            }
        };

        data.entries.push(ManifestEntry {
            line,
            path: resolve_path(base_dir, raw_path),
            concentration,
        });
    }

    for row in &data.row_errors {
        log::warn!("manifest line {}: {}", row.line, row.message);
    }

    Ok(data)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect()
}

fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let p = PathBuf::from(raw);
    if p.is_absolute() { p } else { base_dir.join(p) }
}
