//! Percent-grade estimation for path segments.

use serde::{Deserialize, Serialize};

use crate::elevation::ElevationSource;
use crate::error::{Error, Result};
use crate::models::{Coordinate, PathSegment};
use crate::projection::{ProjectionCache, UtmZone};

/// Horizontal runs shorter than this are treated as zero-length.
const MIN_RUN_M: f64 = 1e-6;

/// What to report for a segment whose endpoints coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateSegmentPolicy {
    /// Grade the segment as flat (0%).
    #[default]
    Flat,
    /// Abort the path with [`Error::DegenerateSegment`].
    Fail,
}

/// Grades segments against one elevation surface.
///
/// Holds the per-zone projection memo for a single estimation pass; create a
/// fresh estimator per path so no state leaks between calls.
#[derive(Debug, Default)]
pub struct SlopeEstimator {
    policy: DegenerateSegmentPolicy,
    projections: ProjectionCache,
}

impl SlopeEstimator {
    pub fn new(policy: DegenerateSegmentPolicy) -> Self {
        Self {
            policy,
            projections: ProjectionCache::new(),
        }
    }

    /// Slopes for every segment, in order. Fails on the first segment without elevation data.
    pub fn compute(
        &mut self,
        segments: &[PathSegment],
        source: &dyn ElevationSource,
    ) -> Result<Vec<f64>> {
        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| self.segment_slope(index, segment, source))
            .collect()
    }

    /// Percent grade of one segment, positive when climbing in traversal order.
    pub fn segment_slope(
        &mut self,
        index: usize,
        segment: &PathSegment,
        source: &dyn ElevationSource,
    ) -> Result<f64> {
        let zone = UtmZone::for_coordinate(segment.start);
        let projection = self.projections.projection(zone);
        let (x1, y1) = projection.forward(segment.start);
        let (x2, y2) = projection.forward(segment.end);
        let run = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();

        let z1 = self.elevation(index, segment.start, source)?;
        let z2 = self.elevation(index, segment.end, source)?;
        let rise = z2 - z1;

        if run < MIN_RUN_M {
            return match self.policy {
                DegenerateSegmentPolicy::Flat => {
                    tracing::debug!("Segment {} has no horizontal run, grading as flat", index);
                    Ok(0.0)
                }
                DegenerateSegmentPolicy::Fail => Err(Error::DegenerateSegment { index }),
            };
        }

        Ok(rise / run * 100.0)
    }

    fn elevation(
        &mut self,
        index: usize,
        point: Coordinate,
        source: &dyn ElevationSource,
    ) -> Result<f64> {
        let (x, y) = self.projections.to_crs(point, source.crs());
        source.sample(x, y).ok_or_else(|| {
            Error::ElevationUnavailable(format!(
                "segment {} point ({:.6}, {:.6}) is outside {} coverage",
                index,
                point.longitude,
                point.latitude,
                source.crs()
            ))
        })
    }

    /// Number of distinct zone projections built so far.
    pub fn cached_projections(&self) -> usize {
        self.projections.len()
    }
}

/// Grade every segment against `source`; output length equals input length.
pub fn compute_slopes(
    segments: &[PathSegment],
    source: &dyn ElevationSource,
    policy: DegenerateSegmentPolicy,
) -> Result<Vec<f64>> {
    SlopeEstimator::new(policy).compute(segments, source)
}
