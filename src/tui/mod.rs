//! Ratatui-based calibration viewer.
//!
//! Shows the fitted calibration line over the observations, the fit
//! statistics, and a list of observations with their residuals. The list
//! selection is highlighted in the chart.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::domain::{CONCENTRATION_UNIT, CalibrationFit, ExtractionSettings};
use crate::error::{AppError, EXIT_INTERNAL};
use crate::plot::chart_bounds;
use crate::report::CHART_TITLE;

mod plotters_chart;

use plotters_chart::CalibrationChart;

/// Open the viewer and block until the user quits.
pub fn run_viewer(fit: &CalibrationFit, settings: &ExtractionSettings) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to initialize terminal: {e}")))?;

    let mut viewer = Viewer::new(fit, settings);
    viewer.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode()
            .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(
                EXIT_INTERNAL,
                format!("Failed to enter alternate screen: {e}"),
            ));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct Viewer<'a> {
    fit: &'a CalibrationFit,
    settings: &'a ExtractionSettings,
    series: ChartSeries,
    selected: usize,
    show_line: bool,
    status: String,
}

impl<'a> Viewer<'a> {
    fn new(fit: &'a CalibrationFit, settings: &'a ExtractionSettings) -> Self {
        Self {
            fit,
            settings,
            series: chart_series(fit),
            selected: 0,
            show_line: true,
            status: format!("{} observations", fit.points.len()),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read()
                .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Event read error: {e}")))?
            {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the viewer should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let n = self.fit.points.len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected + 1 < n {
                    self.selected += 1;
                }
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = n.saturating_sub(1),
            KeyCode::Char('l') => {
                self.show_line = !self.show_line;
                self.status = if self.show_line {
                    "fitted line shown".to_string()
                } else {
                    "fitted line hidden".to_string()
                };
            }
            _ => {}
        }
        false
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let stats = &self.fit.stats;
        let lines = vec![
            Line::from(vec![
                Span::styled("colorcal", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" | {CHART_TITLE}")),
            ]),
            Line::from(Span::styled(
                format!(
                    "{} | r={:.4} | R²={:.4} | p={:.3e} | stderr={:.4} | n={}",
                    stats.equation(),
                    stats.correlation,
                    stats.r_squared(),
                    stats.p_value,
                    stats.standard_error,
                    stats.n,
                ),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                format!(
                    "region: {} | channel: {}",
                    self.settings.roi,
                    self.settings.channel.display_name()
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(44)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_observations(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Calibration").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = &self.series;
        let (chart_rect, insets) = chart_layout(inner);
        let widget = CalibrationChart {
            line: &series.line,
            points: &series.points,
            selected: series.points.get(self.selected).copied(),
            show_line: self.show_line,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            let labels = axis_labels(self.settings);
            draw_axis_ticks(frame, inner, chart_rect, insets, series, &labels);
        }
    }

    fn draw_observations(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let residuals = self.fit.residuals();
        let items: Vec<ListItem> = self
            .fit
            .points
            .iter()
            .zip(&residuals)
            .map(|(p, r)| {
                ListItem::new(format!(
                    "{:>8.2} {:>9.3} {:>+8.3}",
                    p.intensity, p.concentration, r
                ))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title("intensity     conc    resid")
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let source = self
            .fit
            .points
            .get(self.selected)
            .and_then(|p| p.source.as_deref())
            .unwrap_or("-");
        let help = "↑/↓ select  l toggle line  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(source, Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Precomputed chart data for the viewer.
#[derive(Debug, Clone)]
struct ChartSeries {
    line: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(fit: &CalibrationFit) -> ChartSeries {
    let (x_bounds, y_bounds) = chart_bounds(fit);
    let points = fit
        .points
        .iter()
        .map(|p| (p.intensity, p.concentration))
        .collect();

    // The line spans the calibrated range only.
    let (lo, hi) = fit.intensity_range().unwrap_or((x_bounds[0], x_bounds[1]));
    let n = 100usize;
    let line = (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = lo + u * (hi - lo);
            (x, fit.predict(x))
        })
        .collect();

    ChartSeries {
        line,
        points,
        x_bounds,
        y_bounds,
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.2}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

struct AxisLabels {
    x: String,
    y: String,
}

fn axis_labels(settings: &ExtractionSettings) -> AxisLabels {
    AxisLabels {
        x: settings.channel.axis_label(),
        y: format!("Concentration ({CONCENTRATION_UNIT})"),
    }
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    series: &ChartSeries,
    labels: &AxisLabels,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = series.x_bounds;
    let [y0, y1] = series.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_x(x0 + u * (x1 - x0));
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.clone()).style(style),
            Rect {
                x: start,
                y,
                width: label.len() as u16,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_y(y0 + u * (y1 - y0));
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.clone()).style(style),
            Rect {
                x: start,
                y,
                width: label.len() as u16,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(labels.x.as_str())
        .alignment(Alignment::Center)
        .style(style);
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(labels.y.as_str())
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: chart.width.min(inner.width),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;

    fn fit() -> CalibrationFit {
        let mut cal = Calibration::new();
        cal.add(3.0, 30.0);
        cal.add(1.0, 10.0);
        cal.add(2.0, 20.0);
        cal.fit().unwrap()
    }

    #[test]
    fn series_follow_sorted_points_and_fit() {
        let fit = fit();
        let s = chart_series(&fit);
        assert_eq!(s.points, vec![(10.0, 1.0), (20.0, 2.0), (30.0, 3.0)]);
        assert_eq!(s.line.len(), 100);
        let (x, y) = s.line[99];
        assert!((x - 30.0).abs() < 1e-9);
        assert!((y - 3.0).abs() < 1e-9);
        assert!(s.x_bounds[0] < 10.0 && s.x_bounds[1] > 30.0);
    }

    #[test]
    fn selection_stays_within_observations() {
        let fit = fit();
        let settings = ExtractionSettings::default();
        let mut viewer = Viewer::new(&fit, &settings);

        viewer.handle_key(KeyCode::Up);
        assert_eq!(viewer.selected, 0);
        for _ in 0..5 {
            viewer.handle_key(KeyCode::Down);
        }
        assert_eq!(viewer.selected, 2);
        viewer.handle_key(KeyCode::Home);
        assert_eq!(viewer.selected, 0);

        assert!(!viewer.handle_key(KeyCode::Char('l')));
        assert!(!viewer.show_line);
        assert!(viewer.handle_key(KeyCode::Char('q')));
        assert!(viewer.handle_key(KeyCode::Esc));
    }

    #[test]
    fn axis_labels_match_the_other_renderers() {
        let labels = axis_labels(&ExtractionSettings::default());
        assert_eq!(labels.x, "Color Intensity (Blue Channel Mean)");
        assert_eq!(labels.y, "Concentration (µg/mL)");
    }

    #[test]
    fn small_areas_skip_axis_insets() {
        let (rect, insets) = chart_layout(Rect::new(0, 0, 15, 6));
        assert_eq!(rect, Rect::new(0, 0, 15, 6));
        assert!(insets.is_none());
        let (rect, insets) = chart_layout(Rect::new(0, 0, 80, 30));
        assert!(insets.is_some());
        assert_eq!(rect, Rect::new(8, 1, 70, 27));
    }
}
