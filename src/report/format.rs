//! Formatted terminal output: fit summary, observation table, measurements.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{Measurement, SkippedSample};
use crate::domain::{CONCENTRATION_UNIT, CalibrationFit, ExtractionSettings, RoiPolicy};

pub const CHART_TITLE: &str = "Monotonic Calibration Curve: Intensity vs Concentration";

/// Format the run summary (settings + dataset ranges + fit statistics).
pub fn format_fit_summary(fit: &CalibrationFit, settings: &ExtractionSettings) -> String {
    let mut out = String::new();
    let s = &fit.stats;

    out.push_str(&format!("=== colorcal - {CHART_TITLE} ===\n"));
    out.push_str(&format!(
        "Region: {} | channel: {} | out-of-bounds: {}\n",
        settings.roi,
        settings.channel.display_name(),
        policy_label(settings.policy),
    ));

    let (i_min, i_max) = fit.intensity_range().unwrap_or((f64::NAN, f64::NAN));
    let (c_min, c_max) = min_max(&fit.concentrations()).unwrap_or((f64::NAN, f64::NAN));
    out.push_str(&format!(
        "Observations: n={} | intensity=[{i_min:.2}, {i_max:.2}] | concentration=[{c_min}, {c_max}] {CONCENTRATION_UNIT}\n",
        s.n,
    ));

    out.push_str("\nFit:\n");
    out.push_str(&format!("- {}\n", s.equation()));
    out.push_str(&format!(
        "- slope    : {:.6} (std err {:.6})\n",
        s.slope, s.standard_error
    ));
    out.push_str(&format!(
        "- intercept: {:.6} (std err {:.6})\n",
        s.intercept, s.intercept_stderr
    ));
    out.push_str(&format!(
        "- r        : {:.6} (r^2 = {:.6})\n",
        s.correlation,
        s.r_squared()
    ));
    out.push_str(&format!("- p-value  : {}\n", fmt_p(s.p_value)));

    out
}

/// Format the sorted observations with their predictions.
pub fn format_observations(fit: &CalibrationFit) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<28} {:>10} {:>14} {:>14} {:>12}",
            "source", "intensity", "concentration", "predicted", "residual"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<28} {:-<10} {:-<14} {:-<14} {:-<12}", "", "", "", "", ""),
    );

    for ((p, y_fit), residual) in fit.points.iter().zip(&fit.predicted).zip(fit.residuals()) {
        push_row(
            &mut out,
            format!(
                "{:<28} {:>10.2} {:>14.4} {:>14.4} {:>12.4}",
                truncate(p.source.as_deref().unwrap_or("-"), 28),
                p.intensity,
                p.concentration,
                y_fit,
                residual,
            ),
        );
    }

    out
}

/// Format predictions for unknown samples.
pub fn format_measurements(measurements: &[Measurement]) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<36} {:>10} {:>14} {:<12}",
            "image", "intensity", "concentration", "note"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<36} {:-<10} {:-<14} {:-<12}", "", "", "", ""),
    );
    for m in measurements {
        push_row(
            &mut out,
            format!(
                "{:<36} {:>10.2} {:>14.4} {:<12}",
                truncate(&m.path.display().to_string(), 36),
                m.intensity,
                m.concentration,
                if m.extrapolated { "extrapolated" } else { "" },
            ),
        );
    }
    out
}

/// Format samples that were skipped during a batch run.
pub fn format_skipped(skipped: &[SkippedSample]) -> String {
    let mut out = String::new();
    for s in skipped {
        let line = s
            .line
            .map(|l| format!("line {l}"))
            .unwrap_or_else(|| "-".to_string());
        let source = if s.source.is_empty() {
            String::new()
        } else {
            format!(" ({})", s.source)
        };
        out.push_str(&format!("  skipped {line}{source}: {}\n", s.message));
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn policy_label(policy: RoiPolicy) -> &'static str {
    match policy {
        RoiPolicy::Truncate => "truncate",
        RoiPolicy::Strict => "strict",
    }
}

fn fmt_p(p: f64) -> String {
    if p != 0.0 && p.abs() < 1e-4 {
        format!("{p:.3e}")
    } else {
        format!("{p:.4}")
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut it = values.iter().copied();
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    // Keep the tail: for paths the file name is the informative part.
    let skip = s.chars().count() + 1 - max;
    let mut out = String::from("…");
    out.extend(s.chars().skip(skip));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::domain::Observation;
    use std::path::PathBuf;

    fn simple_fit() -> CalibrationFit {
        let mut cal = Calibration::new();
        cal.add_observation(Observation::new(20.0, 2.0).with_source("std_2.png"));
        cal.add_observation(Observation::new(10.0, 1.0).with_source("std_1.png"));
        cal.fit().unwrap()
    }

    #[test]
    fn summary_contains_equation_and_ranges() {
        let txt = format_fit_summary(&simple_fit(), &ExtractionSettings::default());
        assert!(txt.contains("Concentration = 0.10 * Intensity + 0.00"));
        assert!(txt.contains("Region: x=50 y=50 w=100 h=100 | channel: Blue | out-of-bounds: truncate"));
        assert!(txt.contains("n=2 | intensity=[10.00, 20.00] | concentration=[1, 2] µg/mL"));
        assert!(txt.contains("- p-value  : 0.0000"));
    }

    #[test]
    fn observation_table_is_sorted() {
        let txt = format_observations(&simple_fit());
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("std_1.png"));
        assert!(lines[3].starts_with("std_2.png"));
    }

    #[test]
    fn measurement_table_flags_extrapolation() {
        let txt = format_measurements(&[Measurement {
            path: PathBuf::from("unknown.png"),
            intensity: 42.0,
            concentration: 4.2,
            extrapolated: true,
        }]);
        assert!(txt.lines().nth(2).unwrap().ends_with("extrapolated"));
    }

    #[test]
    fn truncate_keeps_the_file_name() {
        assert_eq!(truncate("abcdef", 4), "…def");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn tiny_p_values_use_scientific_notation() {
        assert_eq!(fmt_p(0.0), "0.0000");
        assert_eq!(fmt_p(0.0123), "0.0123");
        assert_eq!(fmt_p(1.5e-7), "1.500e-7");
    }
}
