//! Bicycle way classification
//!
//! Sixteen classes, stored as a 4-bit code in [`crate::codec::EdgeFlags`].
//! The code values are part of the persisted layout and of rider profiles,
//! so they must never be renumbered.

use std::fmt;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of way classes (size of the 4-bit class field).
pub const WAY_TYPES: usize = 16;

/// Speed of a section where the bike has to be pushed (km/h).
pub const PUSHING_SECTION_SPEED: f64 = 4.0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WayClass {
    Motorway = 0,
    Road = 1,
    TertiaryRoad = 2,
    UnclassifiedPaved = 3,
    SmallWayPaved = 4,
    UnclassifiedUnpaved = 5,
    SmallWayUnpaved = 6,
    TrackEasy = 7,
    TrackMiddle = 8,
    TrackHard = 9,
    PathEasy = 10,
    PathMiddle = 11,
    PathHard = 12,
    Cycleway = 13,
    MtbCycleway = 14,
    PushingSection = 15,
}

impl WayClass {
    pub fn all() -> &'static [WayClass; WAY_TYPES] {
        use WayClass::*;
        &[
            Motorway,
            Road,
            TertiaryRoad,
            UnclassifiedPaved,
            SmallWayPaved,
            UnclassifiedUnpaved,
            SmallWayUnpaved,
            TrackEasy,
            TrackMiddle,
            TrackHard,
            PathEasy,
            PathMiddle,
            PathHard,
            Cycleway,
            MtbCycleway,
            PushingSection,
        ]
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Generic travel speed on flat ground in km/h.
    pub fn base_speed(self) -> f64 {
        use WayClass::*;
        match self {
            Motorway | Road | TertiaryRoad => 18.0,
            UnclassifiedPaved | SmallWayPaved => 16.0,
            UnclassifiedUnpaved => 12.0,
            SmallWayUnpaved => 10.0,
            TrackEasy => 12.0,
            TrackMiddle => 10.0,
            TrackHard => 8.0,
            PathEasy => 8.0,
            PathMiddle => 6.0,
            PathHard => PUSHING_SECTION_SPEED,
            Cycleway => 18.0,
            MtbCycleway => 14.0,
            PushingSection => PUSHING_SECTION_SPEED,
        }
    }

    /// Classes whose surface counts as paved when deriving surface preferences.
    pub fn is_paved(self) -> bool {
        use WayClass::*;
        matches!(
            self,
            Motorway | Road | TertiaryRoad | UnclassifiedPaved | SmallWayPaved | Cycleway
        )
    }

    /// Classes a cyclist should never choose voluntarily.
    pub fn is_nogo(self) -> bool {
        matches!(self, WayClass::Motorway | WayClass::PushingSection)
    }

    /// Dedicated cycle infrastructure.
    pub fn is_cycle_infrastructure(self) -> bool {
        matches!(self, WayClass::Cycleway | WayClass::MtbCycleway)
    }

    /// Tracks and paths where steep slopes make riding unpleasant.
    pub fn is_rough(self) -> bool {
        (WayClass::TrackMiddle.code()..=WayClass::PathHard.code()).contains(&self.code())
    }

    pub fn name(self) -> &'static str {
        use WayClass::*;
        match self {
            Motorway => "motorway",
            Road => "road",
            TertiaryRoad => "tertiary_road",
            UnclassifiedPaved => "unclassified_paved",
            SmallWayPaved => "small_way_paved",
            UnclassifiedUnpaved => "unclassified_unpaved",
            SmallWayUnpaved => "small_way_unpaved",
            TrackEasy => "track_easy",
            TrackMiddle => "track_middle",
            TrackHard => "track_hard",
            PathEasy => "path_easy",
            PathMiddle => "path_middle",
            PathHard => "path_hard",
            Cycleway => "cycleway",
            MtbCycleway => "mtb_cycleway",
            PushingSection => "pushing_section",
        }
    }
}

impl TryFrom<u8> for WayClass {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        WayClass::all()
            .get(code as usize)
            .copied()
            .ok_or(Error::ClassOutOfRange(code as u32))
    }
}

impl TryFrom<u32> for WayClass {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        u8::try_from(code)
            .map_err(|_| Error::ClassOutOfRange(code))
            .and_then(WayClass::try_from)
    }
}

impl fmt::Display for WayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Network code of a bicycle route relation a way belongs to.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NetworkCode {
    Unclassified = 0,
    Deprecated = 1,
    Ferry = 2,
    International = 3,
    National = 4,
    Regional = 5,
    Local = 6,
    MountainBike = 7,
}

impl NetworkCode {
    /// Signposted cycling route (anything above ferry).
    pub fn is_cycle_route(self) -> bool {
        self > NetworkCode::Ferry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense() {
        for (i, class) in WayClass::all().iter().enumerate() {
            assert_eq!(class.index(), i);
            assert_eq!(WayClass::try_from(i as u8).unwrap(), *class);
        }
    }

    #[test]
    fn test_out_of_range_code() {
        assert!(matches!(
            WayClass::try_from(16u8),
            Err(Error::ClassOutOfRange(16))
        ));
        assert!(matches!(
            WayClass::try_from(300u32),
            Err(Error::ClassOutOfRange(300))
        ));
    }

    #[test]
    fn test_slowest_class() {
        let slowest = WayClass::all()
            .iter()
            .map(|c| c.base_speed())
            .fold(f64::INFINITY, f64::min);
        assert_eq!(slowest, PUSHING_SECTION_SPEED);
    }

    #[test]
    fn test_rough_range() {
        assert!(!WayClass::TrackEasy.is_rough());
        assert!(WayClass::TrackMiddle.is_rough());
        assert!(WayClass::PathHard.is_rough());
        assert!(!WayClass::Cycleway.is_rough());
    }

    #[test]
    fn test_network_code_order() {
        assert!(NetworkCode::Local.is_cycle_route());
        assert!(!NetworkCode::Ferry.is_cycle_route());
        assert!(!NetworkCode::Unclassified.is_cycle_route());
    }
}
