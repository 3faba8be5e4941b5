//! Map matching seam
//!
//! The road network lives outside this crate. A [`MapMatcher`] snaps the
//! points of a track part onto edges and hands back their flags; the part
//! takes the class of the last matched edge.

use butterfly_common::Result;

use crate::codec::EdgeFlags;
use crate::profile::TrackPart;
use crate::segmenter::TracePoint;

pub trait MapMatcher: Send + Sync {
    /// Flags of the edges the points were matched to, in travel order.
    fn match_points(&self, points: &[TracePoint]) -> Result<Vec<EdgeFlags>>;
}

/// Assign a class to every part the matcher can place. Returns how many
/// parts stayed unclassified.
pub fn classify_track_parts<M: MapMatcher + ?Sized>(parts: &mut [TrackPart], matcher: &M) -> usize {
    let mut unmatched = 0;
    for (index, part) in parts.iter_mut().enumerate() {
        match matcher.match_points(&part.points) {
            Ok(edges) => match edges.last() {
                Some(flags) => part.class = Some(flags.class().code()),
                None => {
                    tracing::debug!(index, "Map matching found no edges, skipping part");
                    unmatched += 1;
                }
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "Map matching failed, skipping part");
                unmatched += 1;
            }
        }
    }
    unmatched
}
