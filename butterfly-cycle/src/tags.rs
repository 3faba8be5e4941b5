//! OSM tag semantics for the cycling import
//!
//! Decides which ways a bicycle may use, sorts them into a [`WayClass`] and
//! derives the access and speed part of [`EdgeAttributes`]. Slopes are
//! filled in separately from the edge geometry, see [`crate::slope`].

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::codec::EdgeAttributes;
use crate::way_class::{NetworkCode, WayClass};

/// Read access to the tags of a way or relation.
pub trait TagSource {
    fn get_str(&self, key: &str) -> Option<&str>;

    fn has(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    fn has_value(&self, key: &str, value: &str) -> bool {
        self.get_str(key) == Some(value)
    }

    fn has_any(&self, key: &str, values: &[&str]) -> bool {
        self.get_str(key).is_some_and(|v| values.contains(&v))
    }
}

impl<S: BuildHasher> TagSource for HashMap<String, String, S> {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl<S: BuildHasher> TagSource for HashMap<&str, &str, S> {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).copied()
    }
}

const ACCEPTED_HIGHWAYS: &[&str] = &[
    "living_street",
    "steps",
    "cycleway",
    "path",
    "footway",
    "pedestrian",
    "track",
    "service",
    "residential",
    "unclassified",
    "road",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "trunk",
    "trunk_link",
    "motorway",
    "motorway_link",
];

const MOTOR_ROADS: &[&str] = &["motorway", "motorway_link", "trunk", "trunk_link"];

const PUSHING_SECTIONS: &[&str] = &["footway", "pedestrian", "steps"];

const INTENDED: &[&str] = &["yes", "designated", "official", "permissive"];

const RESTRICTIONS: &[&str] = &["bicycle", "access"];

const RESTRICTED: &[&str] = &["private", "no", "restricted", "military"];

const ONEWAYS: &[&str] = &["yes", "true", "1", "-1"];

const OPPOSITE_LANES: &[&str] = &["opposite", "opposite_lane", "opposite_track"];

const ALLOWED_SAC_SCALES: &[&str] = &["hiking", "mountain_hiking", "demanding_mountain_hiking"];

const PAVED_SURFACES: &[&str] = &[
    "paved",
    "asphalt",
    "metal",
    "concrete",
    "concrete:lanes",
    "concrete:plates",
];

const UNPAVED_SURFACES: &[&str] = &[
    "sett",
    "cobblestone",
    "cobblestone:flattened",
    "paving_stones",
    "paving_stones:30",
    "compacted",
    "grass_paver",
    "wood",
    "unpaved",
    "gravel",
    "ground",
    "dirt",
    "grass",
    "earth",
    "fine_gravel",
    "ice",
    "mud",
    "salt",
    "sand",
];

fn surface_speed_factor(surface: &str) -> Option<f64> {
    match surface {
        "concrete:lanes" | "concrete:plates" | "metal" => Some(0.9),
        "cobblestone" | "cobblestone:flattened" | "paving_stones" | "paving_stones:30"
        | "compacted" => Some(1.2),
        "dirt" | "earth" | "grass" | "grass_paver" | "salt" | "sand" => Some(0.8),
        "ice" => Some(0.5),
        "mud" => Some(0.6),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Rejected,
    Way,
    Ferry,
}

impl Acceptance {
    pub fn is_accepted(self) -> bool {
        self != Acceptance::Rejected
    }
}

/// Whether a bicycle may use the way at all.
pub fn accept_way<T: TagSource + ?Sized>(tags: &T) -> Acceptance {
    let Some(highway) = tags.get_str("highway") else {
        if tags.has_value("route", "ferry") {
            let bicycle = tags.get_str("bicycle");
            if (bicycle.is_none() && !tags.has("foot")) || bicycle == Some("yes") {
                return Acceptance::Ferry;
            }
        }
        if tags.has_value("railway", "platform") {
            return Acceptance::Way;
        }
        return Acceptance::Rejected;
    };

    if !ACCEPTED_HIGHWAYS.contains(&highway) {
        return Acceptance::Rejected;
    }

    // Explicitly tagged for bicycles wins over everything below
    if tags.has_any("bicycle", INTENDED) {
        return Acceptance::Way;
    }

    if MOTOR_ROADS.contains(&highway) || tags.has_value("motorroad", "yes") {
        return Acceptance::Rejected;
    }

    if highway == "ford" || tags.has("ford") {
        return Acceptance::Rejected;
    }

    if RESTRICTIONS
        .iter()
        .any(|key| tags.has_any(key, RESTRICTED))
    {
        return Acceptance::Rejected;
    }

    if tags.has("railway") && !tags.has_value("railway", "platform") {
        return Acceptance::Rejected;
    }

    if let Some(sac_scale) = tags.get_str("sac_scale") {
        if !ALLOWED_SAC_SCALES.contains(&sac_scale) {
            return Acceptance::Rejected;
        }
    }

    Acceptance::Way
}

/// Network code of a route relation, `None` for relations that are not
/// cycling or ferry routes.
pub fn relation_code<T: TagSource + ?Sized>(tags: &T) -> Option<NetworkCode> {
    if tags.has_value("route", "bicycle") {
        let Some(network) = tags.get_str("network") else {
            return Some(NetworkCode::Unclassified);
        };
        return match network.to_ascii_lowercase().as_str() {
            "icn" => Some(NetworkCode::International),
            "ncn" => Some(NetworkCode::National),
            "rcn" => Some(NetworkCode::Regional),
            "lcn" => Some(NetworkCode::Local),
            "deprecated" => Some(NetworkCode::Deprecated),
            _ => None,
        };
    }
    if tags.has_value("route", "mtb") {
        return Some(NetworkCode::MountainBike);
    }
    if tags.has_value("route", "ferry") {
        return Some(NetworkCode::Ferry);
    }
    None
}

fn is_unpaved<T: TagSource + ?Sized>(tags: &T) -> bool {
    let unpaved_surface = tags.has_any("surface", UNPAVED_SURFACES);
    let rough_track = tags
        .get_str("tracktype")
        .is_some_and(|grade| grade != "grade1");
    unpaved_surface || rough_track
}

fn is_pushing_section<T: TagSource + ?Sized>(tags: &T) -> bool {
    tags.has_any("highway", PUSHING_SECTIONS) || tags.has_value("railway", "platform")
}

/// Sort an accepted way into one of the sixteen classes.
///
/// `relation` is the network code of the strongest cycling route relation
/// the way is a member of.
pub fn classify_way<T: TagSource + ?Sized>(tags: &T, relation: Option<NetworkCode>) -> WayClass {
    let highway = tags.get_str("highway").unwrap_or_default();
    let surface = tags.get_str("surface");
    let paved_surface = surface.is_some_and(|s| PAVED_SURFACES.contains(&s));
    let on_cycle_route = relation.is_some_and(NetworkCode::is_cycle_route);
    let intended = tags.has_any("bicycle", INTENDED);

    let mut class = if (is_pushing_section(tags) && !on_cycle_route)
        || highway == "steps"
        || surface == Some("ice")
    {
        WayClass::PushingSection
    } else {
        match highway {
            "motorway" | "motorway_link" | "trunk" | "trunk_link" => WayClass::Motorway,
            "primary" | "primary_link" | "secondary" | "secondary_link" => WayClass::Road,
            "tertiary" | "tertiary_link" => WayClass::TertiaryRoad,
            "unclassified" if is_unpaved(tags) => WayClass::UnclassifiedUnpaved,
            "unclassified" => WayClass::UnclassifiedPaved,
            "residential" | "living_street" | "service" if is_unpaved(tags) => {
                WayClass::SmallWayUnpaved
            }
            "track" => classify_track(tags, surface, paved_surface, intended),
            "path" => classify_path(tags, paved_surface, intended),
            _ => WayClass::SmallWayPaved,
        }
    };

    if relation == Some(NetworkCode::MountainBike) {
        class = WayClass::MtbCycleway;
    } else if highway == "cycleway" || tags.has_value("bicycle", "designated") || on_cycle_route {
        class = WayClass::Cycleway;
    }
    class
}

fn classify_track<T: TagSource + ?Sized>(
    tags: &T,
    surface: Option<&str>,
    paved_surface: bool,
    intended: bool,
) -> WayClass {
    match tags.get_str("tracktype") {
        Some("grade4" | "grade5") if !paved_surface => WayClass::TrackHard,
        Some("grade2" | "grade3") if surface.is_none() || (!paved_surface && !intended) => {
            WayClass::TrackMiddle
        }
        _ => WayClass::TrackEasy,
    }
}

fn classify_path<T: TagSource + ?Sized>(tags: &T, paved_surface: bool, intended: bool) -> WayClass {
    let smoothness = tags.get_str("smoothness");
    let sac_scale = tags.get_str("sac_scale");
    let mtb_scale = tags.get_str("mtb:scale");

    let hard = matches!(smoothness, Some("horrible" | "very_horrible"))
        || matches!(sac_scale, Some("demanding_mountain_hiking" | "mountain_hiking"))
        || matches!(mtb_scale, Some("4" | "5"));
    if hard {
        return WayClass::PathHard;
    }

    let middle = matches!(smoothness, Some("bad" | "very_bad"))
        || sac_scale == Some("hiking")
        || mtb_scale == Some("1")
        || (mtb_scale == Some("3") && !paved_surface && !intended);
    if middle {
        WayClass::PathMiddle
    } else {
        WayClass::PathEasy
    }
}

/// Flat-ground speed in km/h: class speed scaled by the surface, halved on
/// living streets and steps.
pub fn base_speed<T: TagSource + ?Sized>(tags: &T, class: WayClass) -> f64 {
    let class_speed = class.base_speed();
    if tags.has_any("highway", &["living_street", "steps"]) {
        return (class_speed * 0.5).round();
    }
    match tags.get_str("surface").and_then(surface_speed_factor) {
        Some(factor) => (class_speed * factor).round(),
        None => class_speed,
    }
}

/// `(forward, backward)` access of a way for bicycles.
fn direction<T: TagSource + ?Sized>(tags: &T) -> (bool, bool) {
    let oneway = tags.has_any("oneway", ONEWAYS)
        || tags.has_any("oneway:bicycle", ONEWAYS)
        || tags.has("vehicle:backward")
        || tags.has("vehicle:forward")
        || tags.has("bicycle:forward");

    let restricted = (oneway || tags.has_value("junction", "roundabout"))
        && !tags.has_value("oneway:bicycle", "no")
        && !tags.has("bicycle:backward")
        && !tags.has_any("cycleway", OPPOSITE_LANES);
    if !restricted {
        return (true, true);
    }

    let backward = tags.has_value("oneway", "-1")
        || tags.has_value("oneway:bicycle", "-1")
        || tags.has_value("vehicle:forward", "no")
        || tags.has_value("bicycle:forward", "no");
    (!backward, backward)
}

/// Access, class and speed of a way. Slope fields stay flat.
///
/// Returns `None` for ways a bicycle may not use.
pub fn way_flags<T: TagSource + ?Sized>(
    tags: &T,
    relation: Option<NetworkCode>,
) -> Option<EdgeAttributes> {
    match accept_way(tags) {
        Acceptance::Rejected => None,
        Acceptance::Ferry => {
            Some(EdgeAttributes {
                forward: true,
                backward: true,
                ferry: true,
                class: WayClass::SmallWayPaved,
                speed_kmh: WayClass::SmallWayUnpaved.base_speed(),
                ..EdgeAttributes::default()
            })
        }
        Acceptance::Way => {
            let class = classify_way(tags, relation);
            let (forward, backward) = direction(tags);
            Some(EdgeAttributes {
                forward,
                backward,
                roundabout: tags.has_value("junction", "roundabout"),
                class,
                speed_kmh: base_speed(tags, class),
                ..EdgeAttributes::default()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_accept_way() {
        assert_eq!(accept_way(&tags(&[("highway", "residential")])), Acceptance::Way);
        assert_eq!(accept_way(&tags(&[("highway", "motorway")])), Acceptance::Rejected);
        assert_eq!(
            accept_way(&tags(&[("highway", "trunk"), ("bicycle", "yes")])),
            Acceptance::Way
        );
        assert_eq!(
            accept_way(&tags(&[("highway", "track"), ("access", "private")])),
            Acceptance::Rejected
        );
        assert_eq!(
            accept_way(&tags(&[("highway", "path"), ("sac_scale", "alpine_hiking")])),
            Acceptance::Rejected
        );
        assert_eq!(
            accept_way(&tags(&[("highway", "residential"), ("ford", "yes")])),
            Acceptance::Rejected
        );
        assert_eq!(accept_way(&tags(&[("highway", "bus_guideway")])), Acceptance::Rejected);
    }

    #[test]
    fn test_accept_ferry_and_platform() {
        assert_eq!(accept_way(&tags(&[("route", "ferry")])), Acceptance::Ferry);
        assert_eq!(
            accept_way(&tags(&[("route", "ferry"), ("foot", "yes")])),
            Acceptance::Rejected
        );
        assert_eq!(
            accept_way(&tags(&[("route", "ferry"), ("foot", "yes"), ("bicycle", "yes")])),
            Acceptance::Ferry
        );
        assert_eq!(accept_way(&tags(&[("railway", "platform")])), Acceptance::Way);
        assert_eq!(accept_way(&tags(&[("railway", "rail")])), Acceptance::Rejected);
    }

    #[test]
    fn test_relation_code() {
        let icn = tags(&[("route", "bicycle"), ("network", "ICN")]);
        assert_eq!(relation_code(&icn), Some(NetworkCode::International));
        assert_eq!(
            relation_code(&tags(&[("route", "bicycle")])),
            Some(NetworkCode::Unclassified)
        );
        assert_eq!(
            relation_code(&tags(&[("route", "mtb")])),
            Some(NetworkCode::MountainBike)
        );
        assert_eq!(relation_code(&tags(&[("route", "bus")])), None);
    }

    #[test]
    fn test_classify_roads() {
        assert_eq!(
            classify_way(&tags(&[("highway", "secondary")]), None),
            WayClass::Road
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "tertiary_link")]), None),
            WayClass::TertiaryRoad
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "unclassified"), ("surface", "gravel")]), None),
            WayClass::UnclassifiedUnpaved
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "residential")]), None),
            WayClass::SmallWayPaved
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "service"), ("tracktype", "grade3")]), None),
            WayClass::SmallWayUnpaved
        );
    }

    #[test]
    fn test_classify_tracks_and_paths() {
        assert_eq!(
            classify_way(&tags(&[("highway", "track"), ("tracktype", "grade5")]), None),
            WayClass::TrackHard
        );
        assert_eq!(
            classify_way(
                &tags(&[("highway", "track"), ("tracktype", "grade4"), ("surface", "asphalt")]),
                None
            ),
            WayClass::TrackEasy
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "track"), ("tracktype", "grade2")]), None),
            WayClass::TrackMiddle
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "path"), ("mtb:scale", "4")]), None),
            WayClass::PathHard
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "path"), ("smoothness", "bad")]), None),
            WayClass::PathMiddle
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "path")]), None),
            WayClass::PathEasy
        );
    }

    #[test]
    fn test_pushing_sections_and_overrides() {
        let footway = tags(&[("highway", "footway")]);
        assert_eq!(classify_way(&footway, None), WayClass::PushingSection);
        // A footway on a signposted route is ridden, and becomes a cycleway
        assert_eq!(
            classify_way(&footway, Some(NetworkCode::Regional)),
            WayClass::Cycleway
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "steps")]), Some(NetworkCode::Local)),
            WayClass::Cycleway
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "track")]), Some(NetworkCode::MountainBike)),
            WayClass::MtbCycleway
        );
        assert_eq!(
            classify_way(&tags(&[("highway", "residential"), ("surface", "ice")]), None),
            WayClass::PushingSection
        );
    }

    #[test]
    fn test_base_speed() {
        let plain = tags(&[("highway", "residential")]);
        assert_eq!(base_speed(&plain, WayClass::SmallWayPaved), 16.0);

        let sand = tags(&[("highway", "track"), ("surface", "sand")]);
        assert_eq!(base_speed(&sand, WayClass::TrackEasy), 10.0);

        let living = tags(&[("highway", "living_street")]);
        assert_eq!(base_speed(&living, WayClass::SmallWayPaved), 8.0);
    }

    #[test]
    fn test_oneway_handling() {
        let oneway = way_flags(&tags(&[("highway", "residential"), ("oneway", "yes")]), None)
            .unwrap();
        assert!(oneway.forward && !oneway.backward);

        let reversed = way_flags(&tags(&[("highway", "residential"), ("oneway", "-1")]), None)
            .unwrap();
        assert!(!reversed.forward && reversed.backward);

        let contraflow = way_flags(
            &tags(&[
                ("highway", "residential"),
                ("oneway", "yes"),
                ("cycleway", "opposite_lane"),
            ]),
            None,
        )
        .unwrap();
        assert!(contraflow.forward && contraflow.backward);

        let roundabout = way_flags(
            &tags(&[("highway", "tertiary"), ("junction", "roundabout")]),
            None,
        )
        .unwrap();
        assert!(roundabout.roundabout && roundabout.forward && !roundabout.backward);
    }

    #[test]
    fn test_ferry_flags() {
        let ferry = way_flags(&tags(&[("route", "ferry")]), None).unwrap();
        assert!(ferry.ferry && ferry.forward && ferry.backward);
        assert!(way_flags(&tags(&[("highway", "motorway")]), None).is_none());
    }
}
