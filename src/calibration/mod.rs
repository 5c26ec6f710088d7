//! Calibration accumulator and fit.
//!
//! [`Calibration`] owns the observations of one run. It is append-only: the
//! only transition is `Collecting -> Ready` on the second observation.
//! [`Calibration::fit`] never mutates, so it can be called any number of
//! times (e.g. to re-render after more samples were added).

use crate::domain::{CalibrationFit, FitStats, Observation};
use crate::error::CalibrationError;
use crate::math::linregress;

/// Minimum number of observations for a fit.
pub const MIN_OBSERVATIONS: usize = 2;

/// Whether the accumulator can produce a fit yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Collecting,
    Ready,
}

#[derive(Debug, Clone, Default)]
pub struct Calibration {
    observations: Vec<Observation>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an accumulator from previously exported observations.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Append an unlabelled observation. Always succeeds.
    pub fn add(&mut self, concentration: f64, intensity: f64) {
        self.observations.push(Observation::new(intensity, concentration));
    }

    /// Append a labelled observation (label is kept for display/export only).
    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Observations in insertion order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn state(&self) -> CalibrationState {
        if self.observations.len() >= MIN_OBSERVATIONS {
            CalibrationState::Ready
        } else {
            CalibrationState::Collecting
        }
    }

    /// Fit `concentration = slope * intensity + intercept` over the
    /// observations sorted by intensity.
    pub fn fit(&self) -> Result<CalibrationFit, CalibrationError> {
        let count = self.observations.len();
        if self.state() == CalibrationState::Collecting {
            return Err(CalibrationError::InsufficientCalibrationData { count });
        }

        // `sort_by` is stable: equal intensities keep insertion order.
        let mut points = self.observations.clone();
        points.sort_by(|a, b| a.intensity.total_cmp(&b.intensity));

        let x: Vec<f64> = points.iter().map(|p| p.intensity).collect();
        let y: Vec<f64> = points.iter().map(|p| p.concentration).collect();

        let res = linregress(&x, &y).ok_or(CalibrationError::ConstantIntensity { count })?;
        let stats = FitStats {
            slope: res.slope,
            intercept: res.intercept,
            correlation: res.r,
            p_value: res.p_value,
            standard_error: res.stderr,
            intercept_stderr: res.intercept_stderr,
            n: count,
        };

        let predicted = x.iter().map(|&xi| stats.predict(xi)).collect();
        log::debug!(
            "fitted {} observations: slope={:.6} intercept={:.6} r={:.6}",
            count,
            stats.slope,
            stats.intercept,
            stats.correlation
        );

        Ok(CalibrationFit {
            stats,
            points,
            predicted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_observation_is_insufficient() {
        let mut cal = Calibration::new();
        assert!(matches!(
            cal.fit(),
            Err(CalibrationError::InsufficientCalibrationData { count: 0 })
        ));
        cal.add(1.0, 10.0);
        assert_eq!(cal.state(), CalibrationState::Collecting);
        assert_eq!(
            cal.fit().unwrap_err(),
            CalibrationError::InsufficientCalibrationData { count: 1 }
        );
        cal.add(2.0, 20.0);
        assert_eq!(cal.state(), CalibrationState::Ready);
    }

    #[test]
    fn two_points_give_exact_line() {
        let mut cal = Calibration::new();
        cal.add(1.0, 10.0);
        cal.add(2.0, 20.0);
        let fit = cal.fit().unwrap();
        assert!((fit.stats.slope - 0.1).abs() < 1e-12);
        assert!(fit.stats.intercept.abs() < 1e-10);
        assert!((fit.stats.correlation - 1.0).abs() < 1e-12);
        assert!((fit.predicted[0] - 1.0).abs() < 1e-10);
        assert!((fit.predicted[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn fit_sorts_by_intensity_and_keeps_insertion_order() {
        let mut cal = Calibration::new();
        cal.add(3.0, 30.0);
        cal.add(1.0, 10.0);
        cal.add(2.0, 20.0);
        let fit = cal.fit().unwrap();
        assert_eq!(fit.intensities(), vec![10.0, 20.0, 30.0]);
        assert_eq!(fit.concentrations(), vec![1.0, 2.0, 3.0]);
        // The accumulator itself is untouched.
        let raw: Vec<f64> = cal.observations().iter().map(|o| o.intensity).collect();
        assert_eq!(raw, vec![30.0, 10.0, 20.0]);
    }

    #[test]
    fn fit_is_order_independent() {
        let pairs = [(12.0, 1.1), (40.5, 3.9), (25.0, 2.6), (33.3, 3.1), (18.2, 1.7)];
        let mut forward = Calibration::new();
        for &(i, c) in &pairs {
            forward.add(c, i);
        }
        let mut backward = Calibration::new();
        for &(i, c) in pairs.iter().rev() {
            backward.add(c, i);
        }
        let a = forward.fit().unwrap();
        let b = backward.fit().unwrap();
        assert_eq!(a.points, b.points);
        assert_eq!(a.stats, b.stats);
        assert_eq!(a.predicted, b.predicted);
    }

    #[test]
    fn fit_is_idempotent() {
        let mut cal = Calibration::new();
        cal.add(1.0, 11.0);
        cal.add(2.5, 19.0);
        cal.add(3.0, 31.0);
        assert_eq!(cal.fit().unwrap(), cal.fit().unwrap());
        assert_eq!(cal.len(), 3);
    }

    #[test]
    fn duplicate_intensities_are_stable_and_fit() {
        let mut cal = Calibration::new();
        cal.add_observation(Observation::new(20.0, 5.0).with_source("a"));
        cal.add_observation(Observation::new(10.0, 1.0).with_source("b"));
        cal.add_observation(Observation::new(20.0, 4.0).with_source("c"));
        let fit = cal.fit().unwrap();
        let sources: Vec<_> = fit.points.iter().map(|p| p.source.as_deref().unwrap()).collect();
        assert_eq!(sources, vec!["b", "a", "c"]);
        assert!(fit.stats.slope.is_finite());
        assert!(fit.stats.p_value.is_finite());
    }

    #[test]
    fn large_intensity_offset_still_fits() {
        let mut cal = Calibration::new();
        cal.add(1.0, 1e6);
        cal.add(2.0, 1e6 + 1.0);
        cal.add(3.0, 1e6 + 2.0);
        let fit = cal.fit().unwrap();
        assert!((fit.stats.slope - 1.0).abs() < 1e-9);
        assert!((fit.stats.correlation - 1.0).abs() < 1e-12);
        assert!((fit.predicted[0] - 1.0).abs() < 1e-6);
        assert!((fit.predicted[2] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn identical_intensities_cannot_be_fitted() {
        let mut cal = Calibration::new();
        cal.add(1.0, 50.0);
        cal.add(2.0, 50.0);
        assert_eq!(
            cal.fit().unwrap_err(),
            CalibrationError::ConstantIntensity { count: 2 }
        );
    }

    #[test]
    fn in_range_uses_sorted_extremes() {
        let mut cal = Calibration::new();
        cal.add(2.0, 40.0);
        cal.add(1.0, 10.0);
        let fit = cal.fit().unwrap();
        assert_eq!(fit.intensity_range(), Some((10.0, 40.0)));
        assert!(fit.in_range(25.0));
        assert!(!fit.in_range(41.0));
    }
}
