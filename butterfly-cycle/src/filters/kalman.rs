//! Scalar Kalman filter over an elevation series
//!
//! State is a single elevation with an identity transition. The series is
//! padded with one virtual sample on each side, seeded with the first and
//! last measurement and unit variance, so both directions start from a
//! known estimate.

use butterfly_common::Result;

use super::{check_input, SmoothingFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    /// Mean of an independent forward and backward pass.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessNoise {
    Constant(f64),
    /// `q_i = d_(i-1) / scale`, with `q_0 = 0`.
    Distance { scale: f64 },
}

impl ProcessNoise {
    #[inline]
    fn at(&self, index: usize, distances: &[f64]) -> f64 {
        match *self {
            ProcessNoise::Constant(q) => q,
            ProcessNoise::Distance { .. } if index == 0 => 0.0,
            ProcessNoise::Distance { scale } => distances[index - 1] / scale,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    direction: Direction,
    measurement_noise: f64,
    process_noise: ProcessNoise,
}

impl KalmanFilter {
    pub fn new(direction: Direction, measurement_noise: f64, process_noise: ProcessNoise) -> Self {
        Self {
            direction,
            measurement_noise,
            process_noise,
        }
    }

    fn pass(&self, measurements: &[f64], distances: &[f64], direction: Direction) -> Vec<f64> {
        let n = measurements.len();
        let mut estimates = vec![0.0; n + 2];
        let mut errors = vec![0.0; n + 2];
        estimates[0] = measurements[0];
        errors[0] = 1.0;
        estimates[n + 1] = measurements[n - 1];
        errors[n + 1] = 1.0;

        let mut step = |from: usize, to: usize, i: usize| {
            let prior = estimates[from];
            let prior_error = errors[from] + self.process_noise.at(i, distances);
            let gain = prior_error / (prior_error + self.measurement_noise);
            estimates[to] = prior + gain * (measurements[i] - prior);
            errors[to] = (1.0 - gain) * prior_error;
        };

        if direction == Direction::Backward {
            for i in (0..n).rev() {
                step(i + 2, i + 1, i);
            }
        } else {
            for i in 0..n {
                step(i, i + 1, i);
            }
        }

        estimates.truncate(n + 1);
        estimates.remove(0);
        estimates
    }
}

impl SmoothingFilter for KalmanFilter {
    fn smooth(&self, measurements: &[f64], distances: &[f64]) -> Result<Vec<f64>> {
        check_input(measurements, distances)?;

        let smoothed = match self.direction {
            Direction::Combined => {
                let forward = self.pass(measurements, distances, Direction::Forward);
                let backward = self.pass(measurements, distances, Direction::Backward);
                forward
                    .iter()
                    .zip(&backward)
                    .map(|(f, b)| (f + b) / 2.0)
                    .collect()
            }
            direction => self.pass(measurements, distances, direction),
        };
        Ok(smoothed)
    }
}
