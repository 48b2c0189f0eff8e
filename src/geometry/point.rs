//! Planar point / vector type used throughout the planner.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A point (or free vector) in world coordinates, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters.
    pub x: f64,
    /// Y coordinate in meters.
    pub y: f64,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin.
    pub const ZERO: Point2D = Point2D { x: 0.0, y: 0.0 };

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f64 {
        (*self - *other).norm()
    }

    /// Vector length.
    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared vector length (avoids the sqrt).
    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product (signed parallelogram area).
    #[inline]
    pub fn cross(&self, other: &Point2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Angle of this vector, CCW from +X, in radians.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Rotate this vector CCW by `theta` radians.
    #[inline]
    pub fn rotated(&self, theta: f64) -> Point2D {
        let (sin_t, cos_t) = theta.sin_cos();
        Point2D::new(
            self.x * cos_t - self.y * sin_t,
            self.x * sin_t + self.y * cos_t,
        )
    }

    /// True when both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Point2D;

    #[inline]
    fn add(self, other: Point2D) -> Point2D {
        Point2D::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    #[inline]
    fn sub(self, other: Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    #[inline]
    fn mul(self, scale: f64) -> Point2D {
        Point2D::new(self.x * scale, self.y * scale)
    }
}

impl Neg for Point2D {
    type Output = Point2D;

    #[inline]
    fn neg(self) -> Point2D {
        Point2D::new(-self.x, -self.y)
    }
}
