//! Slope import from edge geometry
//!
//! Each geometry step is attributed to the inclining or the declining part
//! of the edge by the sign of its elevation change. Incline and decline are
//! the average gradients over their own planar share, and the inclining
//! length share goes into the codec as a percentage.

use crate::codec::{EdgeAttributes, MAX_SLOPE};
use crate::geo::Located;
use crate::tags::TagSource;

/// Shortest geometry, in metres, that gets a slope at all.
const MIN_GEOMETRY_LENGTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint3 {
    pub lat: f64,
    pub lon: f64,
    /// Metres above sea level.
    pub ele: f64,
}

impl GeoPoint3 {
    pub fn new(lat: f64, lon: f64, ele: f64) -> Self {
        Self { lat, lon, ele }
    }
}

impl Located for GeoPoint3 {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Elevation lookup, e.g. backed by SRTM tiles.
pub trait ElevationProvider: Send + Sync {
    /// `None` where no elevation data is available.
    fn elevation_at(&self, lat: f64, lon: f64) -> Option<f64>;
}

/// Lift a `[lat, lon]` path to 3-D. Points without data sit at 0 m.
pub fn lift_geometry<E: ElevationProvider + ?Sized>(
    path: &[[f64; 2]],
    elevation: &E,
) -> Vec<GeoPoint3> {
    path.iter()
        .map(|&[lat, lon]| GeoPoint3::new(lat, lon, elevation.elevation_at(lat, lon).unwrap_or(0.0)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeSummary {
    /// Average incline in percent, capped at the codec maximum.
    pub incline: f64,
    /// Average decline in percent, capped at the codec maximum.
    pub decline: f64,
    /// Share of the planar length that inclines, in percent.
    pub incline_percent: f64,
}

impl Default for SlopeSummary {
    fn default() -> Self {
        Self::flat()
    }
}

impl SlopeSummary {
    pub fn flat() -> Self {
        Self {
            incline: 0.0,
            decline: 0.0,
            incline_percent: 100.0,
        }
    }

    pub fn from_geometry(points: &[GeoPoint3]) -> Self {
        let mut inc_ele = 0.0;
        let mut inc_dist = 0.0;
        let mut dec_ele = 0.0;
        let mut dec_dist = 0.0;
        let mut full_dist = 0.0;

        for pair in points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let dist = a.ground_distance(b);
            let ele_delta = b.ele - a.ele;
            if ele_delta >= 0.0 {
                inc_ele += ele_delta;
                inc_dist += dist;
            } else {
                dec_ele -= ele_delta;
                dec_dist += dist;
            }
            full_dist += dist;
        }

        if !full_dist.is_finite() || full_dist < MIN_GEOMETRY_LENGTH {
            return Self::flat();
        }

        let gradient = |ele: f64, dist: f64| {
            if dist > MIN_GEOMETRY_LENGTH {
                (ele / dist * 100.0).min(MAX_SLOPE as f64)
            } else {
                0.0
            }
        };

        Self {
            incline: gradient(inc_ele, inc_dist),
            decline: gradient(dec_ele, dec_dist),
            incline_percent: (inc_dist / full_dist * 100.0).clamp(0.0, 100.0),
        }
    }

    /// Tunnels, bridges and steps are treated as flat whatever the terrain
    /// model says under them.
    pub fn for_way<T: TagSource + ?Sized>(tags: &T, points: &[GeoPoint3]) -> Self {
        if tags.has_value("tunnel", "yes")
            || tags.has_value("bridge", "yes")
            || tags.has_value("highway", "steps")
        {
            return Self::flat();
        }
        Self::from_geometry(points)
    }

    pub fn is_flat(&self) -> bool {
        self.incline == 0.0 && self.decline == 0.0
    }

    pub fn apply(&self, attrs: &mut EdgeAttributes) {
        attrs.incline = self.incline;
        attrs.decline = self.decline;
        attrs.incline_percent = self.incline_percent;
    }
}
