//! SVG calibration chart rendered with Plotters.
//!
//! Data points are drawn as blue markers joined in intensity order, the fitted
//! line in red, with the fit equation in the legend.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::{CONCENTRATION_UNIT, CalibrationFit};
use crate::error::{AppError, EXIT_INTERNAL};
use crate::report::CHART_TITLE;

const SVG_SIZE: (u32, u32) = (800, 600);

/// Axis bounds with a small margin around the data.
pub fn chart_bounds(fit: &CalibrationFit) -> ([f64; 2], [f64; 2]) {
    let (mut x0, mut x1) = fit.intensity_range().unwrap_or((0.0, 255.0));
    if !(x0.is_finite() && x1.is_finite()) || x1 <= x0 {
        x0 = 0.0;
        x1 = 255.0;
    }
    let x_pad = (x1 - x0) * 0.05;

    let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
    for &y in fit.concentrations().iter().chain(&fit.predicted) {
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    if !(y0.is_finite() && y1.is_finite()) {
        y0 = 0.0;
        y1 = 1.0;
    }
    if y1 <= y0 {
        y0 -= 0.5;
        y1 += 0.5;
    }
    let y_pad = (y1 - y0) * 0.08;

    ([x0 - x_pad, x1 + x_pad], [y0 - y_pad, y1 + y_pad])
}

/// Render the chart to an SVG file.
pub fn write_svg_chart(path: &Path, fit: &CalibrationFit, x_label: &str) -> Result<(), AppError> {
    draw_chart(path, fit, x_label).map_err(|e| {
        AppError::new(
            EXIT_INTERNAL,
            format!("Failed to render chart '{}': {e}", path.display()),
        )
    })?;
    log::info!("wrote chart to '{}'", path.display());
    Ok(())
}

fn draw_chart(path: &Path, fit: &CalibrationFit, x_label: &str) -> Result<(), Box<dyn Error>> {
    let ([x0, x1], [y0, y1]) = chart_bounds(fit);
    let data: Vec<(f64, f64)> = fit
        .points
        .iter()
        .map(|p| (p.intensity, p.concentration))
        .collect();
    let fitted: Vec<(f64, f64)> = fit
        .points
        .iter()
        .zip(&fit.predicted)
        .map(|(p, &y)| (p.intensity, y))
        .collect();

    let root = SVGBackend::new(path, SVG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(CHART_TITLE, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(46)
        .y_label_area_size(64)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(format!("Concentration ({CONCENTRATION_UNIT})"))
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.iter().copied(), BLUE.stroke_width(1)))?
        .label("Calibration Data (Sorted)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart.draw_series(
        data.iter()
            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
    )?;

    chart
        .draw_series(LineSeries::new(fitted, RED.stroke_width(2)))?
        .label(format!("Fit: {}", fit.stats.equation()))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;

    fn fit() -> CalibrationFit {
        let mut cal = Calibration::new();
        cal.add(1.0, 100.0);
        cal.add(2.2, 140.0);
        cal.add(2.9, 180.0);
        cal.fit().unwrap()
    }

    #[test]
    fn bounds_cover_points_with_margin() {
        let ([x0, x1], [y0, y1]) = chart_bounds(&fit());
        assert!((x0 - 96.0).abs() < 1e-9);
        assert!((x1 - 184.0).abs() < 1e-9);
        assert!(y0 < 1.0 && y1 > 2.9);
    }

    #[test]
    fn svg_file_contains_title_and_labels() {
        let dir = std::env::temp_dir().join(format!("colorcal-svg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("chart.svg");

        write_svg_chart(&path, &fit(), "Color Intensity (Blue Channel Mean)").unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Monotonic Calibration Curve"));
        assert!(svg.contains("Color Intensity (Blue Channel Mean)"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
