//! Chart renderers: ASCII for the terminal, SVG for files.

pub mod ascii;
pub mod svg;

pub use ascii::render_ascii_plot;
pub use svg::{chart_bounds, write_svg_chart};
