//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks right after a collection session
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - calibration points: `o`
//! - fitted line: `-`

use crate::domain::{CONCENTRATION_UNIT, CalibrationFit};

/// Render the calibration points and fitted line.
pub fn render_ascii_plot(fit: &CalibrationFit, x_label: &str, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(fit).unwrap_or((0.0, 255.0));
    let line = sample_line(fit, x_min, x_max, width);
    let points: Vec<(f64, f64)> = fit
        .points
        .iter()
        .map(|p| (p.intensity, p.concentration))
        .collect();

    // Determine y-range from observed points and the line.
    let (y_min, y_max) = y_range(&points, &line).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw the line first so points overlay it.
    draw_polyline(&mut grid, &line, x_min, x_max, y_min, y_max);

    for &(x, y) in &points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: intensity=[{x_min:.2}, {x_max:.2}] | concentration=[{y_min:.2}, {y_max:.2}] {CONCENTRATION_UNIT}\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out.push_str(&format!(
        "x: {x_label} | y: Concentration ({CONCENTRATION_UNIT})\n"
    ));

    out
}

fn x_range(fit: &CalibrationFit) -> Option<(f64, f64)> {
    let (lo, hi) = fit.intensity_range()?;
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

fn sample_line(fit: &CalibrationFit, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, fit.predict(x))
        })
        .collect()
}

fn y_range(points: &[(f64, f64)], line: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in points.iter().chain(line) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() && max_y.is_finite() {
        // Flat response: give the line some room.
        Some((min_y - 0.5, max_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Highest concentration is row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(grid: &mut [Vec<char>], line: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if line.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in line {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_segment(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_segment(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;

    #[test]
    fn plot_golden_snapshot_small() {
        let mut cal = Calibration::new();
        cal.add(2.0, 20.0);
        cal.add(1.0, 10.0);
        let fit = cal.fit().unwrap();

        let txt = render_ascii_plot(&fit, "Color Intensity (Blue Channel Mean)", 10, 5);
        let expected = concat!(
            "Plot: intensity=[10.00, 20.00] | concentration=[0.95, 2.05] µg/mL\n",
            "         o\n",
            "      --- \n",
            "    --    \n",
            " ---      \n",
            "o         \n",
            "x: Color Intensity (Blue Channel Mean) | y: Concentration (µg/mL)\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn plot_respects_minimum_size() {
        let mut cal = Calibration::new();
        cal.add(1.0, 10.0);
        cal.add(1.5, 30.0);
        let fit = cal.fit().unwrap();
        let txt = render_ascii_plot(&fit, "x", 1, 1);
        // header + 5 rows + footer
        assert_eq!(txt.lines().count(), 7);
        assert!(txt.lines().skip(1).take(5).all(|l| l.chars().count() == 10));
    }
}
