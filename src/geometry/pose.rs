//! Vehicle pose representation and angle helpers.
//!
//! Headings are radians, CCW positive from +X, and are kept normalized to
//! `(-pi, pi]` wherever a pose is stored.

use super::point::Point2D;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A planar pose: position in meters plus heading in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters.
    pub x: f64,
    /// Y position in meters.
    pub y: f64,
    /// Heading in radians, CCW positive from +X.
    pub phi: f64,
}

impl Pose2D {
    /// Create a new pose.
    #[inline]
    pub fn new(x: f64, y: f64, phi: f64) -> Self {
        Self { x, y, phi }
    }

    /// Position component.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Unit vector along the heading.
    #[inline]
    pub fn forward(&self) -> Point2D {
        Point2D::new(self.phi.cos(), self.phi.sin())
    }

    /// Euclidean distance to another pose, ignoring heading.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f64 {
        self.position().distance(&other.position())
    }

    /// True when all three components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.phi.is_finite()
    }
}

/// Normalize an angle to `(-pi, pi]`.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular distance from `from` to `to`, in `(-pi, pi]`.
#[inline]
pub fn angle_diff(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Interpolate a heading along the shortest arc.
#[inline]
pub fn interpolate_angle(a: f64, b: f64, t: f64) -> f64 {
    normalize_angle(a + angle_diff(a, b) * t)
}
