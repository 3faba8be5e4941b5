//! Edge cost for the search engine
//!
//! `cost = (length / speed * 3.6 + heading penalty) / (0.5 + n^2)` where `n`
//! is the preference scaled into `-1..=1`. Costs are seconds scaled by the
//! preference divisor; an edge with speed zero costs `+inf`.

use std::sync::Arc;

use crate::codec::EdgeFlags;
use crate::config::WeightingConfig;
use crate::preference::{
    GenericPreferenceProvider, PreferenceProvider, ProfilePreferenceProvider, MAX_PREFERENCE,
};
use crate::profile::ProfileManager;
use crate::speed::{
    DirectedSlope, GenericSpeedProvider, ProfileSpeedProvider, SpeedProvider, MAX_SPEED,
};

/// km/h to m/s
pub const SPEED_CONV: f64 = 3.6;

pub const DEFAULT_HEADING_PENALTY: f64 = 300.0;

/// Smallest and largest value of `0.5 + n^2`.
const MIN_DIVISOR: f64 = 0.5;
const MAX_DIVISOR: f64 = 1.5;

/// What the search engine knows about the edge being expanded.
pub trait EdgeState {
    fn flags(&self) -> EdgeFlags;

    /// Planar length in metres.
    fn distance(&self) -> f64;

    /// Set on edges at route endpoints that point against the requested heading.
    fn is_unfavored(&self, _reverse: bool) -> bool {
        false
    }
}

/// Plain edge record, mostly useful for tools and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub flags: EdgeFlags,
    pub distance: f64,
    pub unfavored_forward: bool,
    pub unfavored_backward: bool,
}

impl Edge {
    pub fn new(flags: EdgeFlags, distance: f64) -> Self {
        Self {
            flags,
            distance,
            unfavored_forward: false,
            unfavored_backward: false,
        }
    }
}

impl EdgeState for Edge {
    fn flags(&self) -> EdgeFlags {
        self.flags
    }

    fn distance(&self) -> f64 {
        self.distance
    }

    fn is_unfavored(&self, reverse: bool) -> bool {
        if reverse {
            self.unfavored_backward
        } else {
            self.unfavored_forward
        }
    }
}

pub struct DynamicWeighting<S, P> {
    speed: S,
    preference: P,
    heading_penalty: f64,
}

impl<S: SpeedProvider, P: PreferenceProvider> DynamicWeighting<S, P> {
    pub fn new(speed: S, preference: P) -> Self {
        Self::with_heading_penalty(speed, preference, DEFAULT_HEADING_PENALTY)
    }

    pub fn with_heading_penalty(speed: S, preference: P, heading_penalty: f64) -> Self {
        Self {
            speed,
            preference,
            heading_penalty,
        }
    }

    pub fn speed_provider(&self) -> &S {
        &self.speed
    }

    pub fn preference_provider(&self) -> &P {
        &self.preference
    }

    /// Preference of the edge in the direction of travel.
    pub fn preference<E: EdgeState + ?Sized>(&self, edge: &E, reverse: bool) -> i32 {
        let flags = edge.flags();
        let class = flags.class();
        let slope = DirectedSlope::from_flags(flags, reverse);
        let distance = edge.distance().max(0.0);
        let inc_dist = distance * slope.incline_share;

        self.preference.preference(
            class,
            class.is_paved(),
            slope.incline as f64 / 100.0,
            inc_dist,
            slope.decline as f64 / 100.0,
            distance - inc_dist,
        )
    }

    pub fn cost<E: EdgeState + ?Sized>(&self, edge: &E, reverse: bool) -> f64 {
        let speed = self.speed.speed(edge.flags(), reverse);
        if speed <= 0.0 {
            return f64::INFINITY;
        }

        let mut time = edge.distance().max(0.0) / speed * SPEED_CONV;
        if edge.is_unfavored(reverse) {
            time += self.heading_penalty;
        }

        let n = (self.preference(edge, reverse) as f64 / MAX_PREFERENCE as f64).clamp(-1.0, 1.0);
        time / (MIN_DIVISOR + n * n)
    }

    /// Lower bound of [`Self::cost`] for an edge of `distance` metres.
    pub fn min_weight(&self, distance: f64) -> f64 {
        distance * SPEED_CONV / (MAX_SPEED * MAX_DIVISOR)
    }
}

pub type BoxedWeighting = DynamicWeighting<Box<dyn SpeedProvider>, Box<dyn PreferenceProvider>>;

/// Pick the provider variants once: personalized when a profile was loaded,
/// generic otherwise.
pub fn build_weighting(
    config: &WeightingConfig,
    manager: Option<Arc<ProfileManager>>,
) -> BoxedWeighting {
    let (speed, preference): (Box<dyn SpeedProvider>, Box<dyn PreferenceProvider>) = match manager
    {
        Some(manager) if manager.has_profile() => {
            tracing::info!(
                filtered = manager.has_filtered_speeds(),
                "Using personalized cycling weighting"
            );
            (
                Box::new(ProfileSpeedProvider::new(Arc::clone(&manager))),
                Box::new(ProfilePreferenceProvider::new(manager)),
            )
        }
        _ => {
            tracing::info!("Using generic cycling weighting");
            (
                Box::new(GenericSpeedProvider::new()),
                Box::new(GenericPreferenceProvider::new()),
            )
        }
    };

    DynamicWeighting::with_heading_penalty(speed, preference, config.heading_penalty_s)
}
