//! Plotters-powered calibration chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct CalibrationChart<'a> {
    /// Fitted line, sampled across the intensity range.
    pub line: &'a [(f64, f64)],
    /// Observations in intensity order.
    pub points: &'a [(f64, f64)],
    /// The observation selected in the side list, if any.
    pub selected: Option<(f64, f64)>,
    pub show_line: bool,
    /// X bounds (intensity).
    pub x_bounds: [f64; 2],
    /// Y bounds (concentration).
    pub y_bounds: [f64; 2],
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for CalibrationChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart this small.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite())
            || x1 <= x0
            || y1 <= y0
        {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are clutter at terminal resolution; axes are enough.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let data_color = RGBColor(80, 160, 255);
            let line_color = RGBColor(255, 60, 60);
            let selected_color = RGBColor(255, 220, 0);

            // Data joined in intensity order, then the fitted line on top.
            chart.draw_series(LineSeries::new(self.points.iter().copied(), &data_color))?;
            if self.show_line {
                chart.draw_series(LineSeries::new(self.line.iter().copied(), &line_color))?;
            }

            // `Circle` radii come out far too large through this backend, so
            // markers are single pixels.
            chart.draw_series(
                self.points
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), WHITE)),
            )?;
            if let Some((x, y)) = self.selected {
                chart.draw_series(std::iter::once(Pixel::new((x, y), selected_color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
