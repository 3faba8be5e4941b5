//! # Butterfly-cycle Library
//!
//! Personalized, slope-aware bicycle cost model for butterfly-osm.
//!
//! ## Features
//!
//! - **Edge codec**: access, class, base speed and slope packed in one `u64`
//! - **Generic weighting**: physics-style slope adjustment and a fixed class preference table
//! - **Personal weighting**: speeds and preferences learned from a rider's GPS history
//! - **Learning pipeline**: elevation smoothing, trace segmentation and sigmoid curve fitting
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use butterfly_cycle::{
//!     build_weighting, encode, CycleConfig, Edge, EdgeAttributes, FileProfileStore,
//!     ProfileManager, ProfileStore, WayClass,
//! };
//!
//! fn main() -> butterfly_cycle::Result<()> {
//!     let config = CycleConfig::from_file("cycle.toml")?;
//!     let store = FileProfileStore::new("profiles");
//!     let profile = store.load("alice")?;
//!     let manager = ProfileManager::load(profile.as_ref(), &config.profile, &config.fitter);
//!     let weighting = build_weighting(&config.weighting, Some(Arc::new(manager)));
//!
//!     let flags = encode(&EdgeAttributes {
//!         class: WayClass::Cycleway,
//!         speed_kmh: 18.0,
//!         incline: 4.0,
//!         ..EdgeAttributes::default()
//!     });
//!     let edge = Edge::new(flags, 250.0);
//!     println!("uphill {:.1}, downhill {:.1}", weighting.cost(&edge, false), weighting.cost(&edge, true));
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod filters;
pub mod fitting;
pub mod geo;
pub mod matching;
pub mod preference;
pub mod profile;
pub mod segmenter;
pub mod slope;
pub mod speed;
pub mod tags;
pub mod way_class;
pub mod weighting;

pub use butterfly_common::{Error, Result};
pub use codec::{encode, reverse, EdgeAttributes, EdgeFlags, Field};
pub use config::CycleConfig;
pub use filters::{build_filter, KalmanFilter, MeanFilter, SmoothingFilter};
pub use fitting::{SigmoidFit, SigmoidFitter};
pub use matching::{classify_track_parts, MapMatcher};
pub use preference::{GenericPreferenceProvider, PreferenceProvider, ProfilePreferenceProvider};
pub use profile::{
    FileProfileStore, ProfileManager, ProfileStore, RidersEntry, RidersProfile, TrackPart,
};
pub use segmenter::{TracePoint, TraceSegmenter};
pub use slope::{ElevationProvider, GeoPoint3, SlopeSummary};
pub use speed::{GenericSpeedProvider, ProfileSpeedProvider, SpeedProvider};
pub use tags::{accept_way, classify_way, way_flags, TagSource};
pub use way_class::{NetworkCode, WayClass};
pub use weighting::{build_weighting, DynamicWeighting, Edge, EdgeState};
