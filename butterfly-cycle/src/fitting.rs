//! Weighted Levenberg-Marquardt fit of a falling sigmoid
//!
//! `f(x) = 1 - a / (1 + exp(-b (x - c)))`
//!
//! `x` is the slope in percent and `f(x)` the speed normalised by the class
//! max speed. Observed cells and synthetic priors are kept as two point sets
//! so that sparse observations cannot pull the curve somewhere implausible.

use butterfly_common::{Error, Result};
use nalgebra::{Matrix3, Vector3};

use crate::config::FitterConfig;

pub type Params = [f64; 3];

/// Starting point of every fit: `(a, b, c)`.
pub const INITIAL_GUESS: Params = [1.0, 0.5, -1.0];

/// Prior inclines in percent, `0..=12`.
const PRIOR_INCLINES: std::ops::RangeInclusive<u32> = 0..=12;

/// Prior declines in percent, `1..=11`.
const PRIOR_DECLINES: std::ops::RangeInclusive<u32> = 1..=11;

const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone, Copy, Default)]
pub struct SigmoidFunction;

impl SigmoidFunction {
    #[inline]
    fn logistic(x: f64, b: f64, c: f64) -> f64 {
        1.0 / (1.0 + (-b * (x - c)).exp())
    }

    pub fn value(x: f64, params: &Params) -> f64 {
        let [a, b, c] = *params;
        1.0 - a * Self::logistic(x, b, c)
    }

    /// Partial derivatives with respect to `a`, `b` and `c`.
    pub fn gradient(x: f64, params: &Params) -> [f64; 3] {
        let [a, b, c] = *params;
        let s = Self::logistic(x, b, c);
        let ds = s * (1.0 - s);
        [-s, -a * (x - c) * ds, a * b * ds]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FitPoints {
    observed: Vec<WeightedPoint>,
    priors: Vec<WeightedPoint>,
}

impl FitPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, x: f64, y: f64, weight: f64) {
        self.observed.push(WeightedPoint { x, y, weight });
    }

    pub fn prior(&mut self, x: f64, y: f64, weight: f64) {
        self.priors.push(WeightedPoint { x, y, weight });
    }

    /// Physics-based control points around zero slope for a class riding
    /// `base_speed` on the flat, normalised by `max_speed`.
    pub fn add_priors(&mut self, base_speed: f64, max_speed: f64, weight: f64) {
        for incline in PRIOR_INCLINES {
            let s = incline as f64 / 100.0;
            let speed = base_speed * (1.0 - 5.0 * s).powi(2);
            self.prior(incline as f64, speed / max_speed, weight);
        }
        for decline in PRIOR_DECLINES {
            let s = decline as f64 / 100.0;
            let speed = base_speed * (1.0 + 40.0 * s).cbrt();
            self.prior(-(decline as f64), speed / max_speed, weight);
        }
    }

    pub fn observed(&self) -> &[WeightedPoint] {
        &self.observed
    }

    pub fn priors(&self) -> &[WeightedPoint] {
        &self.priors
    }

    pub fn len(&self) -> usize {
        self.observed.len() + self.priors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> impl Iterator<Item = &WeightedPoint> {
        self.observed.iter().chain(self.priors.iter())
    }

    fn cost(&self, params: &Params) -> f64 {
        self.iter()
            .map(|p| {
                let r = p.y - SigmoidFunction::value(p.x, params);
                p.weight * r * r
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidFit {
    pub params: Params,
    /// Weighted sum of squared residuals.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl SigmoidFit {
    pub fn value(&self, x: f64) -> f64 {
        SigmoidFunction::value(x, &self.params)
    }
}

#[derive(Debug, Clone)]
pub struct SigmoidFitter {
    initial_guess: Params,
    max_iterations: usize,
    tolerance: f64,
}

impl Default for SigmoidFitter {
    fn default() -> Self {
        Self::from_config(&FitterConfig::default())
    }
}

impl SigmoidFitter {
    pub fn new(initial_guess: Params, max_iterations: usize, tolerance: f64) -> Self {
        Self {
            initial_guess,
            max_iterations,
            tolerance,
        }
    }

    pub fn from_config(config: &FitterConfig) -> Self {
        Self::new(INITIAL_GUESS, config.max_iterations, config.tolerance)
    }

    /// Deterministic for a fixed point set. If an iterate turns non-finite
    /// the best finite parameters seen so far are returned.
    pub fn fit(&self, points: &FitPoints) -> Result<SigmoidFit> {
        if points.is_empty() {
            return Err(Error::EmptyInput("fit points"));
        }
        if points.iter().any(|p| {
            !(p.x.is_finite() && p.y.is_finite() && p.weight.is_finite()) || p.weight < 0.0
        }) {
            return Err(Error::InvalidInput("non-finite fit point".to_string()));
        }

        let mut params = self.initial_guess;
        let mut cost = points.cost(&params);
        if !cost.is_finite() {
            return Err(Error::FitFailed(format!(
                "initial guess {:?} gives cost {}",
                params, cost
            )));
        }

        let mut lambda = 1e-3;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let (jtj, jtr) = normal_equations(points, &params);
            let mut step = None;

            while lambda <= MAX_DAMPING {
                let mut damped = jtj;
                for k in 0..3 {
                    damped[(k, k)] += lambda * (jtj[(k, k)] + f64::EPSILON);
                }

                let Some(inverse) = damped.try_inverse() else {
                    lambda *= 10.0;
                    continue;
                };
                let delta = inverse * jtr;
                let candidate = [
                    params[0] + delta[0],
                    params[1] + delta[1],
                    params[2] + delta[2],
                ];
                let candidate_cost = points.cost(&candidate);

                if candidate.iter().all(|v| v.is_finite())
                    && candidate_cost.is_finite()
                    && candidate_cost <= cost
                {
                    step = Some((candidate, candidate_cost, delta.norm()));
                    lambda = (lambda / 10.0).max(1e-12);
                    break;
                }
                lambda *= 10.0;
            }

            let Some((candidate, candidate_cost, step_norm)) = step else {
                // No damping produced an improvement: we are at a minimum
                converged = true;
                break;
            };

            let improvement = cost - candidate_cost;
            let scale = Vector3::from(params).norm();
            params = candidate;
            cost = candidate_cost;

            if improvement <= self.tolerance * cost.max(self.tolerance)
                || step_norm <= self.tolerance * (scale + self.tolerance)
            {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::debug!(
                iterations,
                cost,
                "Sigmoid fit stopped at the iteration limit"
            );
        }

        Ok(SigmoidFit {
            params,
            cost,
            iterations,
            converged,
        })
    }
}

/// `J^T W J` and `J^T W r` for residuals `r = y - f(x)`.
fn normal_equations(points: &FitPoints, params: &Params) -> (Matrix3<f64>, Vector3<f64>) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();
    for p in points.iter() {
        let j = Vector3::from(SigmoidFunction::gradient(p.x, params));
        let r = p.y - SigmoidFunction::value(p.x, params);
        jtj += p.weight * j * j.transpose();
        jtr += p.weight * r * j;
    }
    (jtj, jtr)
}
