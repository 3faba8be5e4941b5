use rayon::prelude::*;

use crate::codec::MAX_BASE_SPEED;
use crate::config::{FitterConfig, ProfileConfig};
use crate::fitting::{FitPoints, SigmoidFitter};
use crate::way_class::{WayClass, WAY_TYPES};

use super::{RidersProfile, SLOPE_BUCKETS, SLOPE_OFFSET};

pub type SpeedCurve = [f64; SLOPE_BUCKETS];

/// Read-only view of a rider profile with fitted per-class speed curves.
///
/// Built once by [`ProfileManager::load`]; the fits run before the value is
/// returned, so a manager is always complete.
#[derive(Debug, Clone)]
pub struct ProfileManager {
    has_profile: bool,
    total_distance: f64,
    counts: [usize; WAY_TYPES],
    distances: [f64; WAY_TYPES],
    well_observed: [bool; WAY_TYPES],
    curves: [Option<SpeedCurve>; WAY_TYPES],
    best_fit: Option<WayClass>,
    prefers_paved: bool,
}

impl ProfileManager {
    /// Manager without a rider; every query falls back to generic values.
    pub fn empty() -> Self {
        Self {
            has_profile: false,
            total_distance: 0.0,
            counts: [0; WAY_TYPES],
            distances: [0.0; WAY_TYPES],
            well_observed: [false; WAY_TYPES],
            curves: [None; WAY_TYPES],
            best_fit: None,
            prefers_paved: true,
        }
    }

    pub fn load(
        profile: Option<&RidersProfile>,
        profile_config: &ProfileConfig,
        fitter_config: &FitterConfig,
    ) -> Self {
        let Some(profile) = profile else {
            tracing::info!("No rider profile, using generic speeds");
            return Self::empty();
        };
        if let Err(reason) = profile.validate() {
            tracing::warn!(%reason, "Ignoring malformed rider profile, using generic speeds");
            return Self::empty();
        }

        let mut manager = Self::empty();
        manager.has_profile = true;

        for class in WayClass::all() {
            let i = class.index();
            for entry in profile.entries(*class).iter().flatten() {
                manager.counts[i] += 1;
                manager.distances[i] += entry.distance();
            }
            manager.total_distance += manager.distances[i];
            manager.well_observed[i] = manager.distances[i]
                > profile_config.min_class_distance_m
                && manager.counts[i] > profile_config.min_class_cells;
        }

        let paved: f64 = WayClass::all()
            .iter()
            .filter(|c| c.is_paved())
            .map(|c| manager.distances[c.index()])
            .sum();
        manager.prefers_paved =
            manager.total_distance <= 0.0 || paved * 2.0 >= manager.total_distance;

        let fitter = SigmoidFitter::from_config(fitter_config);
        let observed: Vec<WayClass> = WayClass::all()
            .iter()
            .copied()
            .filter(|c| manager.well_observed[c.index()])
            .collect();

        let fitted: Vec<(WayClass, Option<SpeedCurve>)> = observed
            .par_iter()
            .map(|&class| {
                let curve = fit_class(profile, class, &fitter, fitter_config.prior_weight);
                (class, curve)
            })
            .collect();

        let mut best_score = 0.0;
        for (class, curve) in fitted {
            let i = class.index();
            let Some(curve) = curve else {
                continue;
            };
            manager.curves[i] = Some(curve);

            let score = manager.counts[i] as f64 * manager.distances[i];
            if score > best_score {
                best_score = score;
                manager.best_fit = Some(class);
            }
        }

        for class in WayClass::all() {
            let i = class.index();
            if manager.curves[i].is_some() {
                tracing::debug!(
                    class = %class,
                    cells = manager.counts[i],
                    distance_m = manager.distances[i],
                    "Fitted personal speed curve"
                );
            } else if manager.counts[i] > 0 {
                tracing::debug!(
                    class = %class,
                    cells = manager.counts[i],
                    distance_m = manager.distances[i],
                    borrowed_from = ?manager.best_fit,
                    "Class not well observed"
                );
            }
        }

        tracing::info!(
            total_distance_m = manager.total_distance,
            fitted = manager.curves.iter().filter(|c| c.is_some()).count(),
            best_fit = ?manager.best_fit,
            prefers_paved = manager.prefers_paved,
            "Loaded rider profile"
        );

        manager
    }

    pub fn has_profile(&self) -> bool {
        self.has_profile
    }

    /// Whether the profile holds any observation at all.
    pub fn has_observations(&self) -> bool {
        self.has_profile && self.total_distance > 0.0
    }

    /// At least one class has a fitted curve to serve or lend.
    pub fn has_filtered_speeds(&self) -> bool {
        self.best_fit.is_some()
    }

    pub fn has_speed_profile(&self, class: WayClass) -> bool {
        self.well_observed[class.index()]
    }

    pub fn best_fit(&self) -> Option<WayClass> {
        self.best_fit
    }

    pub fn curve(&self, class: WayClass) -> Option<&SpeedCurve> {
        self.curves[class.index()].as_ref()
    }

    /// Personal speed for a curve index (`0` is -30 %, `60` is +30 %).
    ///
    /// Classes without their own curve borrow the best-fit curve, scaled by
    /// the ratio of generic base speeds. `None` means no personal data.
    pub fn speed_per_slope(&self, class: WayClass, index: usize) -> Option<f64> {
        if !self.has_profile || index >= SLOPE_BUCKETS {
            return None;
        }
        if let Some(curve) = self.curve(class) {
            return Some(curve[index]);
        }

        let best = self.best_fit?;
        let curve = self.curve(best)?;
        Some(curve[index] * class.base_speed() / best.base_speed())
    }

    /// Share of the rider's total distance ridden on `class`.
    pub fn way_type_share(&self, class: WayClass) -> f64 {
        if self.total_distance <= 0.0 {
            return 0.0;
        }
        self.distances[class.index()] / self.total_distance
    }

    /// At least half of the rider's distance is on paved classes.
    pub fn prefers_paved(&self) -> bool {
        self.prefers_paved
    }

    pub fn class_distance(&self, class: WayClass) -> f64 {
        self.distances[class.index()]
    }

    pub fn class_cells(&self, class: WayClass) -> usize {
        self.counts[class.index()]
    }
}

fn fit_class(
    profile: &RidersProfile,
    class: WayClass,
    fitter: &SigmoidFitter,
    prior_weight: f64,
) -> Option<SpeedCurve> {
    let max_speed = profile.max_speed(class, MAX_BASE_SPEED as f64);

    let mut points = FitPoints::new();
    for (bucket, entry) in profile.entries(class).iter().enumerate() {
        if let Some(entry) = entry {
            points.observe(
                bucket as f64 - SLOPE_OFFSET as f64,
                entry.speed() / max_speed,
                entry.distance(),
            );
        }
    }
    points.add_priors(class.base_speed(), max_speed, prior_weight);

    let fit = match fitter.fit(&points) {
        Ok(fit) => fit,
        Err(e) => {
            tracing::warn!(class = %class, error = %e, "Speed curve fit failed");
            return None;
        }
    };
    tracing::trace!(
        class = %class,
        a = fit.params[0],
        b = fit.params[1],
        c = fit.params[2],
        iterations = fit.iterations,
        converged = fit.converged,
        "Sigmoid fit"
    );

    let mut curve = [0.0; SLOPE_BUCKETS];
    for (bucket, value) in curve.iter_mut().enumerate() {
        *value = fit.value(bucket as f64 - SLOPE_OFFSET as f64) * max_speed;
    }
    if curve.iter().any(|v| !v.is_finite()) {
        tracing::warn!(class = %class, "Speed curve is not finite");
        return None;
    }
    Some(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TrackPart;

    fn observe(
        profile: &mut RidersProfile,
        class: WayClass,
        slope: f64,
        speed: f64,
        distance: f64,
    ) {
        let part = TrackPart::new(Vec::new(), distance, slope, speed).with_class(class);
        profile.update(&part).unwrap();
    }

    /// Eight cells of 2 km each on `class`, speeds following a plausible slope response.
    fn rich_class(profile: &mut RidersProfile, class: WayClass) {
        for slope in [-8, -5, -3, -1, 0, 2, 4, 7] {
            let speed = (18.0 - 1.6 * slope as f64).max(5.0);
            observe(profile, class, slope as f64, speed, 2_000.0);
        }
    }

    fn load(profile: &RidersProfile) -> ProfileManager {
        ProfileManager::load(
            Some(profile),
            &ProfileConfig::default(),
            &FitterConfig::default(),
        )
    }

    #[test]
    fn test_malformed_profile_is_ignored() {
        let mut profile = RidersProfile::new();
        rich_class(&mut profile, WayClass::Road);
        profile.cells.truncate(SLOPE_BUCKETS * 2);

        let manager = load(&profile);
        assert!(!manager.has_profile());
        assert!(!manager.has_observations());
        assert_eq!(manager.speed_per_slope(WayClass::Road, SLOPE_OFFSET), None);
    }

    #[test]
    fn test_no_profile() {
        let manager =
            ProfileManager::load(None, &ProfileConfig::default(), &FitterConfig::default());
        assert!(!manager.has_profile());
        assert!(!manager.has_filtered_speeds());
        assert_eq!(manager.speed_per_slope(WayClass::Road, 30), None);
    }

    #[test]
    fn test_empty_profile_has_no_data() {
        let manager = load(&RidersProfile::new());
        assert!(manager.has_profile());
        assert!(!manager.has_observations());
        for class in WayClass::all() {
            for index in [0, 30, 60] {
                assert_eq!(manager.speed_per_slope(*class, index), None);
            }
        }
    }

    #[test]
    fn test_well_observed_thresholds() {
        let mut profile = RidersProfile::new();
        // Six cells but only 6 km
        for slope in 0..6 {
            observe(&mut profile, WayClass::Road, slope as f64, 18.0, 1_000.0);
        }
        // Plenty of distance but only five cells
        for slope in 0..5 {
            observe(&mut profile, WayClass::Cycleway, slope as f64, 20.0, 5_000.0);
        }
        let manager = load(&profile);
        assert!(!manager.has_speed_profile(WayClass::Road));
        assert!(!manager.has_speed_profile(WayClass::Cycleway));
        assert!(!manager.has_filtered_speeds());
        assert_eq!(manager.speed_per_slope(WayClass::Road, 30), None);
    }

    #[test]
    fn test_fitted_curve_and_borrowing() {
        let mut profile = RidersProfile::new();
        rich_class(&mut profile, WayClass::Road);
        let manager = load(&profile);

        assert!(manager.has_speed_profile(WayClass::Road));
        assert_eq!(manager.best_fit(), Some(WayClass::Road));

        let flat = manager.speed_per_slope(WayClass::Road, 30).unwrap();
        let climb = manager.speed_per_slope(WayClass::Road, 40).unwrap();
        assert!(flat.is_finite() && climb.is_finite());
        assert!(climb < flat, "climb {climb} flat {flat}");

        // Track middle borrows the road curve scaled by 10 / 18
        let borrowed = manager.speed_per_slope(WayClass::TrackMiddle, 30).unwrap();
        assert!((borrowed - flat * 10.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_fit_maximises_cells_times_distance() {
        let mut profile = RidersProfile::new();
        rich_class(&mut profile, WayClass::Road);
        rich_class(&mut profile, WayClass::Cycleway);
        observe(&mut profile, WayClass::Cycleway, 10.0, 8.0, 2_000.0);

        let manager = load(&profile);
        assert_eq!(manager.best_fit(), Some(WayClass::Cycleway));
    }

    #[test]
    fn test_shares_and_paved_preference() {
        let mut profile = RidersProfile::new();
        observe(&mut profile, WayClass::TrackEasy, 0.0, 14.0, 600.0);
        observe(&mut profile, WayClass::Road, 0.0, 20.0, 400.0);

        let manager = load(&profile);
        assert!((manager.way_type_share(WayClass::TrackEasy) - 0.6).abs() < 1e-12);
        assert!((manager.way_type_share(WayClass::Road) - 0.4).abs() < 1e-12);
        assert!(!manager.prefers_paved());
    }
}
