use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// One cell of the rider table: distance-weighted mean speed over all
/// track parts that fell into it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RidersEntry {
    speed: f64,
    distance: f64,
}

impl RidersEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speed in km/h.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Accumulated distance in metres.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Fold one more observation into the running mean.
    ///
    /// The entry is left untouched when the update is rejected.
    pub fn update(&mut self, speed: f64, distance: f64) -> Result<()> {
        if !distance.is_finite() || distance <= 0.0 {
            return Err(Error::ZeroDistance);
        }
        if !speed.is_finite() || speed < 0.0 {
            return Err(Error::InvalidInput(format!("speed {speed} km/h")));
        }

        let total = self.distance + distance;
        self.speed = (self.speed * self.distance + speed * distance) / total;
        self.distance = total;
        Ok(())
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.speed.is_finite()
            && self.speed >= 0.0
            && self.distance.is_finite()
            && self.distance > 0.0
    }
}
