//! Sample data sources.

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticSample, generate_standards, write_standards};
