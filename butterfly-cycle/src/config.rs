//! Cost model and learning pipeline settings
//!
//! Every table and field is optional in TOML; missing values take the
//! defaults below.
//!
//! ```toml
//! [weighting]
//! heading_penalty_s = 300.0
//!
//! [segmenter]
//! min_part_distance_m = 200.0
//!
//! [segmenter.filter]
//! kind = "kalman_combined"
//! window_m = 60.0
//! measurement_noise = 6.0
//!
//! [profile]
//! min_class_distance_m = 10000.0
//! min_class_cells = 5
//!
//! [fitter]
//! max_iterations = 200
//! tolerance = 1e-10
//! prior_weight = 40.0
//! ```

use std::fs;
use std::path::Path;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::filters::FilterKind;
use crate::weighting::DEFAULT_HEADING_PENALTY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub weighting: WeightingConfig,
    pub segmenter: SegmenterConfig,
    pub profile: ProfileConfig,
    pub fitter: FitterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Seconds added when an edge is unfavored at a route endpoint.
    pub heading_penalty_s: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            heading_penalty_s: DEFAULT_HEADING_PENALTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Planar length a track part must reach before it is closed.
    pub min_part_distance_m: f64,
    pub filter: FilterConfig,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_part_distance_m: 200.0,
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// Averaging window of the mean filter, process noise scale of the
    /// Kalman filters.
    pub window_m: f64,
    pub measurement_noise: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::default(),
            window_m: 60.0,
            measurement_noise: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// A class is well observed above this distance...
    pub min_class_distance_m: f64,
    /// ...and this many filled slope buckets.
    pub min_class_cells: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            min_class_distance_m: 10_000.0,
            min_class_cells: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Weight of each synthetic prior point.
    pub prior_weight: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
            prior_weight: 40.0,
        }
    }
}

impl CycleConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "Loaded cycle config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("{name} must be positive, got {value}")))
            }
        }

        if !(self.weighting.heading_penalty_s.is_finite() && self.weighting.heading_penalty_s >= 0.0)
        {
            return Err(Error::Config(format!(
                "weighting.heading_penalty_s must be non-negative, got {}",
                self.weighting.heading_penalty_s
            )));
        }
        positive(
            "segmenter.min_part_distance_m",
            self.segmenter.min_part_distance_m,
        )?;
        positive("segmenter.filter.window_m", self.segmenter.filter.window_m)?;
        positive(
            "segmenter.filter.measurement_noise",
            self.segmenter.filter.measurement_noise,
        )?;
        positive(
            "profile.min_class_distance_m",
            self.profile.min_class_distance_m,
        )?;
        positive("fitter.tolerance", self.fitter.tolerance)?;
        positive("fitter.prior_weight", self.fitter.prior_weight)?;
        if self.fitter.max_iterations == 0 {
            return Err(Error::Config(
                "fitter.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
