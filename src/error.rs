//! Error types.
//!
//! - `CalibrationError`: the recoverable conditions of a calibration session.
//!   None of them ends an interactive run; the driver reports and moves on.
//! - `AppError`: what the binary reports before exiting (message + exit code).

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Roi;

/// Exit code for usage errors and unreadable input files.
pub const EXIT_USAGE: u8 = 2;
/// Exit code when a non-interactive run ends without a usable fit.
pub const EXIT_NO_FIT: u8 = 3;
/// Exit code for internal, rendering and terminal failures.
pub const EXIT_INTERNAL: u8 = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The decoder could not read the path or format.
    #[error("Error loading image '{}'. Please check the file path.", path.display())]
    ImageUnreadable { path: PathBuf },

    /// The concentration input is not a finite number.
    #[error("Invalid concentration value '{input}'. Please enter a numerical value.")]
    InvalidConcentrationInput { input: String },

    /// Fewer than two observations at fit time.
    #[error("Need at least two data points to plot the calibration curve (have {count}).")]
    InsufficientCalibrationData { count: usize },

    /// Every observation has the same intensity, so the slope is undefined.
    #[error("Cannot fit a calibration line: all {count} intensities are identical.")]
    ConstantIntensity { count: usize },

    /// The region of interest leaves the image (strict policy) or covers no pixel.
    #[error("Region of interest ({roi}) is outside the {width}x{height} image.")]
    RegionOutOfBounds { roi: Roi, width: u32, height: u32 },
}

impl CalibrationError {
    /// Whether the failed step's input should simply be skipped.
    pub fn skips_sample(&self) -> bool {
        matches!(
            self,
            CalibrationError::ImageUnreadable { .. }
                | CalibrationError::InvalidConcentrationInput { .. }
                | CalibrationError::RegionOutOfBounds { .. }
        )
    }

    /// Exit code when this error ends a non-interactive command.
    pub fn exit_code(&self) -> u8 {
        match self {
            CalibrationError::InsufficientCalibrationData { .. }
            | CalibrationError::ConstantIntensity { .. } => EXIT_NO_FIT,
            _ => EXIT_USAGE,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
