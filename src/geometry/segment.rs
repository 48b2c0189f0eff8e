//! Obstacle line segments, endpoint representation.
//!
//! Obstacle polylines are decomposed into directed segments connecting
//! consecutive vertices. Endpoints only, no parametric form: transforms are
//! two point rotations and the extent is implicit.

use super::point::Point2D;
use serde::{Deserialize, Serialize};

/// A directed line segment between two world points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment2D {
    /// Start point.
    pub start: Point2D,
    /// End point.
    pub end: Point2D,
}

impl Segment2D {
    /// Create a segment from two endpoints.
    #[inline]
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    /// Direction vector from start to end (not normalized).
    #[inline]
    pub fn direction(&self) -> Point2D {
        self.end - self.start
    }

    /// Segment length in meters.
    #[inline]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }
}

/// Decompose an open polyline into its `N - 1` consecutive segments.
///
/// No implicit closure: the caller supplies the closing vertex when the
/// outline should be a loop.
pub fn polyline_segments(vertices: &[Point2D]) -> Vec<Segment2D> {
    vertices
        .windows(2)
        .map(|pair| Segment2D::new(pair[0], pair[1]))
        .collect()
}
