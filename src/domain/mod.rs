//! Domain types used throughout the tool.
//!
//! This module defines:
//!
//! - extraction configuration (`Roi`, `Channel`, `RoiPolicy`)
//! - calibration observations (`Observation`)
//! - fit outputs (`CalibrationFit`, `FitStats`)

pub mod types;

pub use types::*;
