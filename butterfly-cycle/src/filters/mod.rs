//! Elevation smoothing
//!
//! Filters take `n` measurements and the `n - 1` planar distances between
//! consecutive samples, and return `n` smoothed values. They keep no state
//! between calls.

mod kalman;
mod mean;

pub use kalman::{Direction, KalmanFilter, ProcessNoise};
pub use mean::MeanFilter;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;

pub trait SmoothingFilter: Send + Sync {
    fn smooth(&self, measurements: &[f64], distances: &[f64]) -> Result<Vec<f64>>;
}

impl<T: SmoothingFilter + ?Sized> SmoothingFilter for Box<T> {
    fn smooth(&self, measurements: &[f64], distances: &[f64]) -> Result<Vec<f64>> {
        (**self).smooth(measurements, distances)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    KalmanForward,
    KalmanBackward,
    #[default]
    KalmanCombined,
    Mean,
}

/// Build the filter described by `config`.
///
/// For the Kalman variants the window is the distance that scales the
/// process noise; for the mean filter it is the averaging window.
pub fn build_filter(config: &FilterConfig) -> Box<dyn SmoothingFilter> {
    let noise = ProcessNoise::Distance {
        scale: config.window_m,
    };
    match config.kind {
        FilterKind::KalmanForward => Box::new(KalmanFilter::new(
            Direction::Forward,
            config.measurement_noise,
            noise,
        )),
        FilterKind::KalmanBackward => Box::new(KalmanFilter::new(
            Direction::Backward,
            config.measurement_noise,
            noise,
        )),
        FilterKind::KalmanCombined => Box::new(KalmanFilter::new(
            Direction::Combined,
            config.measurement_noise,
            noise,
        )),
        FilterKind::Mean => Box::new(MeanFilter::new(config.window_m)),
    }
}

/// Common input checks: at least one measurement, exactly one distance
/// between each pair of samples, nothing non-finite.
pub(crate) fn check_input(measurements: &[f64], distances: &[f64]) -> Result<()> {
    if measurements.is_empty() {
        return Err(Error::EmptyInput("measurements"));
    }
    if distances.len() + 1 != measurements.len() {
        return Err(Error::LengthMismatch {
            what: "distances",
            expected: measurements.len() - 1,
            actual: distances.len(),
        });
    }
    if measurements.iter().any(|m| !m.is_finite()) {
        return Err(Error::InvalidInput("non-finite measurement".to_string()));
    }
    if distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(Error::InvalidInput("negative or non-finite distance".to_string()));
    }
    Ok(())
}
