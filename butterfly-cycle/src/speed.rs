//! Direction-aware travel speed
//!
//! Both providers read the same codec fields. The generic one adjusts the
//! encoded base speed with a slope model; the personalized one reads the
//! rider's fitted curves and falls back to the generic model whenever the
//! profile has nothing to say.

use std::sync::Arc;

use crate::codec::EdgeFlags;
use crate::profile::{ProfileManager, SLOPE_BUCKETS, SLOPE_OFFSET};
use crate::way_class::PUSHING_SECTION_SPEED;

/// Lower bound of any adjusted speed (km/h).
pub const MIN_SPEED: f64 = PUSHING_SECTION_SPEED / 2.0;

/// Upper bound of any adjusted speed (km/h).
pub const MAX_SPEED: f64 = 50.0;

/// Steepest decline that still adds speed (fraction).
const MAX_FASTER_DECLINE: f64 = 0.1;

/// Steepest incline that still removes speed (fraction).
const MAX_SLOWER_INCLINE: f64 = 0.2;

pub trait SpeedProvider: Send + Sync {
    /// Travel speed in km/h. Zero means the edge must not be traversed in
    /// this direction.
    fn speed(&self, flags: EdgeFlags, reverse: bool) -> f64;
}

impl<T: SpeedProvider + ?Sized> SpeedProvider for Box<T> {
    fn speed(&self, flags: EdgeFlags, reverse: bool) -> f64 {
        (**self).speed(flags, reverse)
    }
}

impl<T: SpeedProvider + ?Sized> SpeedProvider for Arc<T> {
    fn speed(&self, flags: EdgeFlags, reverse: bool) -> f64 {
        (**self).speed(flags, reverse)
    }
}

/// Slopes as seen in the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedSlope {
    /// Incline in percent.
    pub incline: u64,
    /// Decline in percent.
    pub decline: u64,
    /// Share of the length that inclines, in `0.0..=1.0`.
    pub incline_share: f64,
}

impl DirectedSlope {
    pub fn from_flags(flags: EdgeFlags, reverse: bool) -> Self {
        let share = (flags.incline_percent() as f64 / 100.0).clamp(0.0, 1.0);
        if reverse {
            Self {
                incline: flags.decline(),
                decline: flags.incline(),
                incline_share: 1.0 - share,
            }
        } else {
            Self {
                incline: flags.incline(),
                decline: flags.decline(),
                incline_share: share,
            }
        }
    }

    pub fn is_flat(&self) -> bool {
        self.incline == 0 && self.decline == 0
    }

    /// Blend an inclining and a declining value by the length split.
    #[inline]
    pub fn blend(&self, inclining: f64, declining: f64) -> f64 {
        inclining * self.incline_share + declining * (1.0 - self.incline_share)
    }
}

#[inline]
fn clamp_speed(speed: f64) -> f64 {
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

/// Physics-like slope adjustment of the encoded base speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSpeedProvider;

impl GenericSpeedProvider {
    pub fn new() -> Self {
        Self
    }

    /// Adjust `base` for the slopes of the edge in the direction of travel.
    pub fn adjust(base: f64, slope: &DirectedSlope) -> f64 {
        if slope.is_flat() {
            return base;
        }

        let decline = slope.decline as f64 / 100.0;
        let incline = slope.incline as f64 / 100.0;

        let faster = (1.0 + 30.0 * decline.clamp(0.0, MAX_FASTER_DECLINE)).sqrt();
        let slower = 1.0 - 5.0 * incline.clamp(0.0, MAX_SLOWER_INCLINE);
        let slower = slower * slower;

        clamp_speed(base * slope.blend(slower, faster))
    }
}

impl SpeedProvider for GenericSpeedProvider {
    fn speed(&self, flags: EdgeFlags, reverse: bool) -> f64 {
        let base = flags.base_speed();
        if base <= 0.0 || !flags.allows(reverse) {
            return 0.0;
        }
        Self::adjust(base, &DirectedSlope::from_flags(flags, reverse))
    }
}

/// Curve index for an incline in percent (`30..=60`).
#[inline]
pub fn incline_index(incline: u64) -> usize {
    if incline >= SLOPE_OFFSET as u64 {
        SLOPE_BUCKETS - 1
    } else {
        SLOPE_OFFSET + incline as usize
    }
}

/// Curve index for a decline in percent (`0..=30`).
#[inline]
pub fn decline_index(decline: u64) -> usize {
    if decline >= SLOPE_OFFSET as u64 {
        0
    } else {
        SLOPE_OFFSET - decline as usize
    }
}

/// Speeds from the rider's fitted per-class curves.
pub struct ProfileSpeedProvider {
    manager: Arc<ProfileManager>,
    fallback: GenericSpeedProvider,
}

impl ProfileSpeedProvider {
    pub fn new(manager: Arc<ProfileManager>) -> Self {
        Self {
            manager,
            fallback: GenericSpeedProvider,
        }
    }

    fn personal_speed(&self, flags: EdgeFlags, slope: &DirectedSlope) -> Option<f64> {
        if !self.manager.has_filtered_speeds() {
            return None;
        }

        let class = flags.class();
        let inclining = self
            .manager
            .speed_per_slope(class, incline_index(slope.incline))?;
        let declining = self
            .manager
            .speed_per_slope(class, decline_index(slope.decline))?;

        let speed = slope.blend(inclining, declining);
        speed.is_finite().then(|| clamp_speed(speed))
    }
}

impl SpeedProvider for ProfileSpeedProvider {
    fn speed(&self, flags: EdgeFlags, reverse: bool) -> f64 {
        if flags.base_speed() <= 0.0 || !flags.allows(reverse) {
            return 0.0;
        }

        let slope = DirectedSlope::from_flags(flags, reverse);
        match self.personal_speed(flags, &slope) {
            Some(speed) => speed,
            None => self.fallback.speed(flags, reverse),
        }
    }
}
