//! `colorcal` library crate.
//!
//! The binary (`colorcal`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the extractor and calibration model are reusable outside the CLI
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod calibration;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
