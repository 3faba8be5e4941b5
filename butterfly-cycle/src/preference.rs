//! Unitless desirability of an edge
//!
//! A preference is the sum of a class, a surface and a slope component,
//! clamped into [`MIN_PREFERENCE`]`..=`[`MAX_PREFERENCE`]. Higher is better.

use std::sync::Arc;

use crate::profile::ProfileManager;
use crate::way_class::WayClass;

pub const MIN_PREFERENCE: i32 = -4;
pub const MAX_PREFERENCE: i32 = 3;

/// Climbs and descents shorter than this (m) never lower the preference.
const SLOPE_MIN_DISTANCE: f64 = 10.0;

/// Climb that is unpleasant on any class (fraction).
const STEEP_SLOPE: f64 = 0.2;

/// Climb that is unpleasant on tracks and paths (fraction).
const ROUGH_CLIMB: f64 = 0.03;

pub trait PreferenceProvider: Send + Sync {
    fn class_preference(&self, class: WayClass) -> i32;

    fn surface_preference(&self, is_paved: bool) -> i32;

    /// Slopes are fractions, distances are metres of the respective share.
    fn slope_preference(
        &self,
        class: WayClass,
        inc_slope: f64,
        inc_dist: f64,
        dec_slope: f64,
        dec_dist: f64,
    ) -> i32 {
        generic_slope_preference(class, inc_slope, inc_dist, dec_slope, dec_dist)
    }

    fn preference(
        &self,
        class: WayClass,
        is_paved: bool,
        inc_slope: f64,
        inc_dist: f64,
        dec_slope: f64,
        dec_dist: f64,
    ) -> i32 {
        let sum = self.class_preference(class)
            + self.surface_preference(is_paved)
            + self.slope_preference(class, inc_slope, inc_dist, dec_slope, dec_dist);
        sum.clamp(MIN_PREFERENCE, MAX_PREFERENCE)
    }
}

impl<T: PreferenceProvider + ?Sized> PreferenceProvider for Box<T> {
    fn class_preference(&self, class: WayClass) -> i32 {
        (**self).class_preference(class)
    }

    fn surface_preference(&self, is_paved: bool) -> i32 {
        (**self).surface_preference(is_paved)
    }

    fn slope_preference(
        &self,
        class: WayClass,
        inc_slope: f64,
        inc_dist: f64,
        dec_slope: f64,
        dec_dist: f64,
    ) -> i32 {
        (**self).slope_preference(class, inc_slope, inc_dist, dec_slope, dec_dist)
    }
}

impl<T: PreferenceProvider + ?Sized> PreferenceProvider for Arc<T> {
    fn class_preference(&self, class: WayClass) -> i32 {
        (**self).class_preference(class)
    }

    fn surface_preference(&self, is_paved: bool) -> i32 {
        (**self).surface_preference(is_paved)
    }

    fn slope_preference(
        &self,
        class: WayClass,
        inc_slope: f64,
        inc_dist: f64,
        dec_slope: f64,
        dec_dist: f64,
    ) -> i32 {
        (**self).slope_preference(class, inc_slope, inc_dist, dec_slope, dec_dist)
    }
}

fn generic_slope_preference(
    class: WayClass,
    inc_slope: f64,
    inc_dist: f64,
    dec_slope: f64,
    dec_dist: f64,
) -> i32 {
    let long_climb = inc_dist > SLOPE_MIN_DISTANCE;
    let long_descent = dec_dist > SLOPE_MIN_DISTANCE;

    if long_climb && inc_slope > STEEP_SLOPE {
        return -2;
    }
    if class.is_rough()
        && ((long_climb && inc_slope > ROUGH_CLIMB) || (long_descent && dec_slope > STEEP_SLOPE))
    {
        return -2;
    }
    0
}

/// Fixed per-class table, used when no rider profile is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericPreferenceProvider;

impl GenericPreferenceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PreferenceProvider for GenericPreferenceProvider {
    fn class_preference(&self, class: WayClass) -> i32 {
        use WayClass::*;
        match class {
            Motorway | PushingSection => -4,
            Road | TrackEasy => 0,
            TertiaryRoad | UnclassifiedPaved | SmallWayPaved | UnclassifiedUnpaved
            | SmallWayUnpaved => 1,
            TrackMiddle | TrackHard | PathEasy => -1,
            PathMiddle | PathHard => -2,
            Cycleway | MtbCycleway => 3,
        }
    }

    fn surface_preference(&self, is_paved: bool) -> i32 {
        if is_paved {
            0
        } else {
            -2
        }
    }
}

/// Preferences derived from the rider's own class and surface history.
pub struct ProfilePreferenceProvider {
    manager: Arc<ProfileManager>,
    fallback: GenericPreferenceProvider,
}

impl ProfilePreferenceProvider {
    pub fn new(manager: Arc<ProfileManager>) -> Self {
        Self {
            manager,
            fallback: GenericPreferenceProvider,
        }
    }
}

impl PreferenceProvider for ProfilePreferenceProvider {
    fn class_preference(&self, class: WayClass) -> i32 {
        if !self.manager.has_observations() {
            return self.fallback.class_preference(class);
        }
        if class.is_nogo() {
            return MIN_PREFERENCE;
        }
        if class.is_cycle_infrastructure() {
            return MAX_PREFERENCE;
        }

        let share = self.manager.way_type_share(class);
        if share >= 0.5 {
            2
        } else if share >= 0.2 {
            1
        } else if share >= 0.05 {
            0
        } else {
            -1
        }
    }

    fn surface_preference(&self, is_paved: bool) -> i32 {
        if !self.manager.has_observations() {
            return self.fallback.surface_preference(is_paved);
        }
        if self.manager.prefers_paved() == is_paved {
            0
        } else {
            -2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_class_table() {
        let provider = GenericPreferenceProvider;
        let expected = [-4, 0, 1, 1, 1, 1, 1, 0, -1, -1, -1, -2, -2, 3, 3, -4];
        for (class, want) in WayClass::all().iter().zip(expected) {
            assert_eq!(provider.class_preference(*class), want, "{class}");
        }
    }

    #[test]
    fn test_steep_climb_penalized_everywhere() {
        let provider = GenericPreferenceProvider;
        assert_eq!(
            provider.slope_preference(WayClass::Road, 0.21, 50.0, 0.0, 0.0),
            -2
        );
        // Too short to matter
        assert_eq!(
            provider.slope_preference(WayClass::Road, 0.21, 5.0, 0.0, 0.0),
            0
        );
        assert_eq!(
            provider.slope_preference(WayClass::Road, 0.05, 50.0, 0.0, 0.0),
            0
        );
    }

    #[test]
    fn test_rough_class_slopes() {
        let provider = GenericPreferenceProvider;
        assert_eq!(
            provider.slope_preference(WayClass::TrackHard, 0.05, 50.0, 0.0, 0.0),
            -2
        );
        assert_eq!(
            provider.slope_preference(WayClass::PathMiddle, 0.0, 0.0, 0.25, 50.0),
            -2
        );
        assert_eq!(
            provider.slope_preference(WayClass::TrackEasy, 0.05, 50.0, 0.25, 50.0),
            0
        );
    }

    #[test]
    fn test_preference_is_clamped() {
        let provider = GenericPreferenceProvider;
        // -4 (class) - 2 (surface) - 2 (slope)
        let worst = provider.preference(WayClass::PushingSection, false, 0.3, 100.0, 0.0, 0.0);
        assert_eq!(worst, MIN_PREFERENCE);

        let best = provider.preference(WayClass::Cycleway, true, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(best, MAX_PREFERENCE);
    }

    fn manager_with(observations: &[(WayClass, f64)]) -> Arc<ProfileManager> {
        use crate::config::{FitterConfig, ProfileConfig};
        use crate::profile::{RidersProfile, TrackPart};

        let mut profile = RidersProfile::new();
        for &(class, distance) in observations {
            let part = TrackPart::new(Vec::new(), distance, 0.0, 15.0).with_class(class);
            profile.update(&part).unwrap();
        }
        Arc::new(ProfileManager::load(
            Some(&profile),
            &ProfileConfig::default(),
            &FitterConfig::default(),
        ))
    }

    #[test]
    fn test_personal_class_bands() {
        let provider = ProfilePreferenceProvider::new(manager_with(&[
            (WayClass::TrackEasy, 600.0),
            (WayClass::Road, 300.0),
            (WayClass::SmallWayPaved, 60.0),
            (WayClass::PathEasy, 40.0),
        ]));
        assert_eq!(provider.class_preference(WayClass::TrackEasy), 2);
        assert_eq!(provider.class_preference(WayClass::Road), 1);
        assert_eq!(provider.class_preference(WayClass::SmallWayPaved), 0);
        assert_eq!(provider.class_preference(WayClass::PathEasy), -1);
        assert_eq!(provider.class_preference(WayClass::TrackHard), -1);
        // Fixed whatever the rider did
        assert_eq!(provider.class_preference(WayClass::Cycleway), MAX_PREFERENCE);
        assert_eq!(provider.class_preference(WayClass::Motorway), MIN_PREFERENCE);
    }

    #[test]
    fn test_personal_surface_follows_majority() {
        let gravel_rider = ProfilePreferenceProvider::new(manager_with(&[
            (WayClass::TrackEasy, 700.0),
            (WayClass::Road, 300.0),
        ]));
        assert_eq!(gravel_rider.surface_preference(false), 0);
        assert_eq!(gravel_rider.surface_preference(true), -2);

        let road_rider = ProfilePreferenceProvider::new(manager_with(&[(WayClass::Road, 500.0)]));
        assert_eq!(road_rider.surface_preference(true), 0);
        assert_eq!(road_rider.surface_preference(false), -2);
    }

    #[test]
    fn test_profile_without_observations_is_generic() {
        let personal = ProfilePreferenceProvider::new(manager_with(&[]));
        let generic = GenericPreferenceProvider;
        for class in WayClass::all() {
            for paved in [true, false] {
                assert_eq!(
                    personal.preference(*class, paved, 0.08, 40.0, 0.22, 20.0),
                    generic.preference(*class, paved, 0.08, 40.0, 0.22, 20.0),
                    "{class}"
                );
            }
        }
    }
}
