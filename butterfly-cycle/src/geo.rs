//! Distances along traces and way geometries
//!
//! Ground distances are great-circle metres from the horizontal position
//! only. Elevation enters through [`slope_distance`], which the segmenter
//! uses for a part's length and the slope importer does not.

use geo::{HaversineDistance, Point};

/// A WGS84 position in degrees.
pub trait Located {
    fn lat(&self) -> f64;

    fn lon(&self) -> f64;

    fn position(&self) -> Point<f64> {
        Point::new(self.lon(), self.lat())
    }

    /// Great-circle distance over the ground in metres.
    fn ground_distance<L: Located + ?Sized>(&self, other: &L) -> f64 {
        self.position().haversine_distance(&other.position())
    }
}

/// Ground length of each leg between consecutive points; one shorter than
/// `points`.
pub fn leg_lengths<L: Located>(points: &[L]) -> Vec<f64> {
    points
        .windows(2)
        .map(|leg| leg[0].ground_distance(&leg[1]))
        .collect()
}

/// Length along a slope covering `ground` metres with a net `rise`.
#[inline]
pub fn slope_distance(ground: f64, rise: f64) -> f64 {
    ground.hypot(rise)
}
