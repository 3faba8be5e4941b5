//! Rider profile: observed speed per (way class, slope)
//!
//! A [`RidersProfile`] is the write side. Track parts are folded into it
//! during ingestion and the whole table is persisted through a
//! [`ProfileStore`]. At routing time it is frozen into a [`ProfileManager`],
//! which owns the fitted curves and never changes afterwards.

mod entry;
mod manager;
mod store;

pub use entry::RidersEntry;
pub use manager::ProfileManager;
pub use store::{FileProfileStore, ProfileStore, PROFILE_EXTENSION};

use std::fmt;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::segmenter::TracePoint;
use crate::way_class::{WayClass, WAY_TYPES};

/// Number of slope steps covered by the table (-30 % ..= +30 %).
pub const SLOPES: usize = 60;

/// Buckets per class, one per integer slope percent.
pub const SLOPE_BUCKETS: usize = SLOPES + 1;

/// Bucket index of a flat slope.
pub const SLOPE_OFFSET: usize = SLOPES / 2;

/// Bucket of an integer slope percent, clamped into the table.
#[inline]
pub fn slope_bucket(slope: i64) -> usize {
    let limit = SLOPE_OFFSET as i64;
    (slope.clamp(-limit, limit) + limit) as usize
}

/// A segmented piece of a GPS trace, ready to be learned from once map
/// matching assigned it a class.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPart {
    pub points: Vec<TracePoint>,
    /// 3-D length in metres.
    pub distance: f64,
    /// Average slope in percent.
    pub slope: f64,
    /// Average speed in km/h.
    pub speed: f64,
    /// Raw class code from map matching, `None` until matched.
    pub class: Option<u8>,
}

impl TrackPart {
    pub fn new(points: Vec<TracePoint>, distance: f64, slope: f64, speed: f64) -> Self {
        Self {
            points,
            distance,
            slope,
            speed,
            class: None,
        }
    }

    pub fn with_class(mut self, class: WayClass) -> Self {
        self.class = Some(class.code());
        self
    }

    pub fn way_class(&self) -> Result<WayClass> {
        self.class.ok_or(Error::Unclassified).and_then(WayClass::try_from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidersProfile {
    /// Row-major `WAY_TYPES x SLOPE_BUCKETS` table.
    cells: Vec<Option<RidersEntry>>,
    total_distance: f64,
}

impl Default for RidersProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl RidersProfile {
    pub fn new() -> Self {
        Self {
            cells: vec![None; WAY_TYPES * SLOPE_BUCKETS],
            total_distance: 0.0,
        }
    }

    #[inline]
    fn offset(class: WayClass, bucket: usize) -> usize {
        class.index() * SLOPE_BUCKETS + bucket
    }

    /// Cell for an integer slope percent in `-30..=30`.
    pub fn entry(&self, class: WayClass, slope: i64) -> Option<&RidersEntry> {
        if slope.unsigned_abs() > SLOPE_OFFSET as u64 {
            return None;
        }
        self.cells
            .get(Self::offset(class, slope_bucket(slope)))
            .and_then(Option::as_ref)
    }

    /// All buckets of one class, index 0 is -30 %. Empty when the table
    /// does not have the expected shape.
    pub fn entries(&self, class: WayClass) -> &[Option<RidersEntry>] {
        let start = Self::offset(class, 0);
        self.cells.get(start..start + SLOPE_BUCKETS).unwrap_or(&[])
    }

    pub fn speed(&self, class: WayClass, slope: i64) -> Option<f64> {
        self.entry(class, slope).map(RidersEntry::speed)
    }

    pub fn distance(&self, class: WayClass, slope: i64) -> f64 {
        self.entry(class, slope).map_or(0.0, RidersEntry::distance)
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Upper bound used to normalise a class curve: twice `reference`, or the
    /// fastest observation if that is higher.
    pub fn max_speed(&self, class: WayClass, reference: f64) -> f64 {
        self.entries(class)
            .iter()
            .flatten()
            .map(RidersEntry::speed)
            .fold(reference * 2.0, f64::max)
    }

    /// Fold a classified track part into its cell.
    ///
    /// The slope is truncated to whole percent and clamped into the table.
    /// On error the profile is unchanged.
    pub fn update(&mut self, part: &TrackPart) -> Result<()> {
        let class = part.way_class()?;
        if !part.slope.is_finite() {
            return Err(Error::InvalidInput(format!("slope {}", part.slope)));
        }

        let bucket = slope_bucket(part.slope.trunc() as i64);
        let cells = self.cells.len();
        let cell = self
            .cells
            .get_mut(Self::offset(class, bucket))
            .ok_or(Error::LengthMismatch {
                what: "profile cells",
                expected: WAY_TYPES * SLOPE_BUCKETS,
                actual: cells,
            })?;
        let mut entry = cell.unwrap_or_default();
        entry.update(part.speed, part.distance)?;

        *cell = Some(entry);
        self.total_distance += part.distance;
        Ok(())
    }

    /// Fold a batch, returning how many parts were skipped.
    pub fn update_all(&mut self, parts: &[TrackPart]) -> usize {
        let mut skipped = 0;
        for (i, part) in parts.iter().enumerate() {
            if let Err(e) = self.update(part) {
                tracing::debug!(part = i, error = %e, "Skipping track part");
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::info!(
                skipped,
                total = parts.len(),
                "Some track parts were not added to the profile"
            );
        }
        skipped
    }

    /// Check a deserialized table before it is used.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.cells.len() != WAY_TYPES * SLOPE_BUCKETS {
            return Err(format!(
                "expected {} cells, found {}",
                WAY_TYPES * SLOPE_BUCKETS,
                self.cells.len()
            ));
        }
        if let Some(i) = self
            .cells
            .iter()
            .position(|c| c.as_ref().is_some_and(|e| !e.is_valid()))
        {
            return Err(format!("cell {} holds an invalid entry", i));
        }
        if !self.total_distance.is_finite() || self.total_distance < 0.0 {
            return Err(format!("total distance {}", self.total_distance));
        }
        Ok(())
    }
}

impl fmt::Display for RidersProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for class in WayClass::all() {
            writeln!(f, "-----[ {} {} ]-----", class.code(), class)?;
            for (bucket, entry) in self.entries(*class).iter().enumerate() {
                if let Some(entry) = entry {
                    writeln!(
                        f,
                        "{:>4} %  {:>6.2} km/h  {:>10.1} m",
                        bucket as i64 - SLOPE_OFFSET as i64,
                        entry.speed(),
                        entry.distance()
                    )?;
                }
            }
        }
        write!(f, "total: {:.1} m", self.total_distance)
    }
}
