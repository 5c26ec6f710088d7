//! Input/output helpers.
//!
//! - batch manifest ingest (`manifest`)
//! - observation CSV export (`export`)
//! - calibration JSON read/write (`calibration_file`)

pub mod calibration_file;
pub mod export;
pub mod manifest;

pub use calibration_file::*;
pub use export::*;
pub use manifest::*;
