//! GPS trace segmentation
//!
//! A trace is cut into consecutive track parts of at least
//! `min_part_distance` planar metres. Neighbouring parts share their
//! boundary point. Elevations are smoothed over the whole trace first, so a
//! part's slope is the difference of two smoothed values over its 3-D
//! length.

use butterfly_common::{Error, Result};
use chrono::{DateTime, Utc};

use crate::config::SegmenterConfig;
use crate::filters::{build_filter, SmoothingFilter};
use crate::geo::{leg_lengths, slope_distance, Located};
use crate::profile::TrackPart;

#[derive(Debug, Clone, PartialEq)]
pub struct TracePoint {
    pub lat: f64,
    pub lon: f64,
    /// Metres, raw from the device until segmentation smooths it.
    pub elevation: f64,
    pub time: DateTime<Utc>,
}

impl TracePoint {
    pub fn new(lat: f64, lon: f64, elevation: f64, time: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            elevation,
            time,
        }
    }
}

impl Located for TracePoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

pub struct TraceSegmenter {
    filter: Box<dyn SmoothingFilter>,
    min_part_distance: f64,
}

impl TraceSegmenter {
    pub fn new(filter: Box<dyn SmoothingFilter>, min_part_distance: f64) -> Self {
        Self {
            filter,
            min_part_distance,
        }
    }

    pub fn from_config(config: &SegmenterConfig) -> Self {
        Self::new(build_filter(&config.filter), config.min_part_distance_m)
    }

    pub fn min_part_distance(&self) -> f64 {
        self.min_part_distance
    }

    /// Split a trace into track parts. Parts without elapsed time or
    /// length are dropped.
    pub fn segment(&self, trace: &[TracePoint]) -> Result<Vec<TrackPart>> {
        if trace.len() < 2 {
            return Err(Error::EmptyInput("trace"));
        }

        let distances = leg_lengths(trace);
        let raw: Vec<f64> = trace.iter().map(|p| p.elevation).collect();
        let smoothed = self.filter.smooth(&raw, &distances)?;

        let mut parts = Vec::new();
        let mut start = 0;
        while start + 1 < trace.len() {
            let mut end = start;
            let mut planar = 0.0;
            while planar < self.min_part_distance && end + 1 < trace.len() {
                planar += distances[end];
                end += 1;
            }

            if let Some(part) = build_part(trace, &smoothed, start, end, planar) {
                parts.push(part);
            }
            start = end;
        }

        tracing::debug!(
            points = trace.len(),
            parts = parts.len(),
            "Segmented trace"
        );
        Ok(parts)
    }
}

fn build_part(
    trace: &[TracePoint],
    smoothed: &[f64],
    start: usize,
    end: usize,
    planar: f64,
) -> Option<TrackPart> {
    let elevation = smoothed[end] - smoothed[start];
    let distance = slope_distance(planar, elevation);
    let duration = (trace[end].time - trace[start].time).num_milliseconds() as f64 / 1000.0;

    if !(distance.is_finite() && duration.is_finite()) || distance <= 0.0 || duration <= 0.0 {
        tracing::debug!(
            start,
            end,
            distance,
            duration,
            "Dropping track part without length or elapsed time"
        );
        return None;
    }

    let points = (start..=end)
        .map(|i| TracePoint {
            elevation: smoothed[i],
            ..trace[i].clone()
        })
        .collect();

    Some(TrackPart::new(
        points,
        distance,
        elevation / distance * 100.0,
        distance / duration * 3.6,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::filters::{FilterKind, MeanFilter};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn point(lon: f64, ele: f64, secs: i64) -> TracePoint {
        TracePoint::new(0.0, lon, ele, t0() + Duration::seconds(secs))
    }

    #[test]
    fn test_single_part_over_short_trace() {
        let trace = [
            point(0.0, 100.0, 0),
            point(0.001, 105.0, 60),
            point(0.002, 95.0, 130),
        ];
        let config = SegmenterConfig::default();
        let segmenter = TraceSegmenter::from_config(&config);
        let parts = segmenter.segment(&trace).unwrap();
        assert_eq!(parts.len(), 1);

        let part = &parts[0];
        assert_eq!(part.points.len(), 3);
        assert_eq!(part.class, None);

        let distances = leg_lengths(&trace);
        let smoothed = build_filter(&config.filter)
            .smooth(&[100.0, 105.0, 95.0], &distances)
            .unwrap();
        for (p, s) in part.points.iter().zip(&smoothed) {
            assert_eq!(p.elevation, *s);
        }

        let rise = smoothed[2] - smoothed[0];
        let planar: f64 = distances.iter().sum();
        let distance = planar.hypot(rise);
        assert!((part.distance - distance).abs() < 1e-9);
        assert!((part.slope - rise / distance * 100.0).abs() < 1e-9);
        assert!((part.speed - distance / 130.0 * 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_parts_share_boundaries() {
        // Ten points 111 m apart, mean filter with a window too small to mix
        let trace: Vec<TracePoint> = (0..10)
            .map(|i| point(i as f64 * 0.001, 100.0 + i as f64, i * 30))
            .collect();
        let segmenter = TraceSegmenter::new(Box::new(MeanFilter::new(1.0)), 200.0);
        let parts = segmenter.segment(&trace).unwrap();

        // Groups [0,2] [2,4] [4,6] [6,8] [8,9]
        assert_eq!(parts.len(), 5);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].points.last(), pair[1].points.first());
        }
        assert_eq!(parts[4].points.len(), 2);
        assert!(parts.iter().all(|p| p.slope > 0.0));
    }

    #[test]
    fn test_zero_duration_is_dropped() {
        let trace = [point(0.0, 100.0, 0), point(0.003, 100.0, 0)];
        let segmenter = TraceSegmenter::new(Box::new(MeanFilter::new(1.0)), 200.0);
        assert!(segmenter.segment(&trace).unwrap().is_empty());
    }

    #[test]
    fn test_too_short_trace() {
        let segmenter = TraceSegmenter::from_config(&SegmenterConfig::default());
        assert!(matches!(
            segmenter.segment(&[point(0.0, 1.0, 0)]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_from_config_uses_threshold() {
        let config = SegmenterConfig {
            min_part_distance_m: 50.0,
            filter: FilterConfig {
                kind: FilterKind::Mean,
                ..FilterConfig::default()
            },
        };
        let segmenter = TraceSegmenter::from_config(&config);
        assert_eq!(segmenter.min_part_distance(), 50.0);

        let trace = [
            point(0.0, 100.0, 0),
            point(0.001, 100.0, 30),
            point(0.002, 100.0, 60),
        ];
        assert_eq!(segmenter.segment(&trace).unwrap().len(), 2);
    }
}
