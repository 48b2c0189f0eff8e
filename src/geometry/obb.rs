//! Oriented bounding box for the vehicle footprint.

use super::point::Point2D;
use super::segment::Segment2D;

/// An oriented rectangle: center, heading, full length and width.
#[derive(Clone, Copy, Debug)]
pub struct OrientedBox {
    /// Geometric center in world coordinates.
    pub center: Point2D,
    /// Heading of the long axis, radians CCW from +X.
    pub heading: f64,
    /// Extent along the heading, meters.
    pub length: f64,
    /// Extent across the heading, meters.
    pub width: f64,
}

impl OrientedBox {
    /// Create a box from its center pose and dimensions.
    #[inline]
    pub fn new(center: Point2D, heading: f64, length: f64, width: f64) -> Self {
        Self {
            center,
            heading,
            length,
            width,
        }
    }

    /// The four corners, CCW starting at front-left.
    pub fn corners(&self) -> [Point2D; 4] {
        let half_l = 0.5 * self.length;
        let half_w = 0.5 * self.width;
        let axis = Point2D::new(self.heading.cos(), self.heading.sin());
        let ortho = Point2D::new(-axis.y, axis.x);
        [
            self.center + axis * half_l + ortho * half_w,
            self.center - axis * half_l + ortho * half_w,
            self.center - axis * half_l - ortho * half_w,
            self.center + axis * half_l - ortho * half_w,
        ]
    }

    /// Whether the box overlaps (touches or crosses) a line segment.
    ///
    /// The segment is rotated into the box frame and clipped against the
    /// centered axis-aligned rectangle.
    pub fn overlaps_segment(&self, segment: &Segment2D) -> bool {
        let local_start = (segment.start - self.center).rotated(-self.heading);
        let local_end = (segment.end - self.center).rotated(-self.heading);
        let half_l = 0.5 * self.length;
        let half_w = 0.5 * self.width;
        segment_intersects_aabb(
            local_start,
            local_end,
            Point2D::new(-half_l, -half_w),
            Point2D::new(half_l, half_w),
        )
    }
}

/// Liang–Barsky clip: does the segment `[p0, p1]` intersect the axis-aligned
/// rectangle `[min, max]`? Touching counts as intersecting.
pub fn segment_intersects_aabb(p0: Point2D, p1: Point2D, min: Point2D, max: Point2D) -> bool {
    let d = p1 - p0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    // (p, q) pairs for the four slab boundaries.
    let checks = [
        (-d.x, p0.x - min.x),
        (d.x, max.x - p0.x),
        (-d.y, p0.y - min.y),
        (d.y, max.y - p0.y),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false; // parallel and outside this slab
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    t0 <= t1
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_segment_crossing_box() {
        let bbox = OrientedBox::new(Point2D::ZERO, 0.0, 4.0, 2.0);
        let crossing = Segment2D::new(Point2D::new(-5.0, 0.0), Point2D::new(5.0, 0.0));
        assert!(bbox.overlaps_segment(&crossing));
    }

    #[test]
    fn test_segment_outside_box() {
        let bbox = OrientedBox::new(Point2D::ZERO, 0.0, 4.0, 2.0);
        let above = Segment2D::new(Point2D::new(-5.0, 2.0), Point2D::new(5.0, 2.0));
        assert!(!bbox.overlaps_segment(&above));
    }

    #[test]
    fn test_rotated_box_reaches_further() {
        // A box rotated 45 degrees sticks out past its unrotated width.
        let bbox = OrientedBox::new(Point2D::ZERO, FRAC_PI_4, 4.0, 2.0);
        let probe = Segment2D::new(Point2D::new(1.2, 1.2), Point2D::new(1.3, 1.3));
        assert!(bbox.overlaps_segment(&probe));

        let flat = OrientedBox::new(Point2D::ZERO, 0.0, 4.0, 2.0);
        assert!(!flat.overlaps_segment(&probe));
    }

    #[test]
    fn test_segment_fully_inside() {
        let bbox = OrientedBox::new(Point2D::new(1.0, 1.0), 0.0, 4.0, 4.0);
        let inner = Segment2D::new(Point2D::new(0.5, 0.5), Point2D::new(1.5, 1.5));
        assert!(bbox.overlaps_segment(&inner));
    }

    #[test]
    fn test_aabb_corner_touch() {
        let p0 = Point2D::new(-1.0, 0.0);
        let p1 = Point2D::new(0.0, -1.0);
        // The chord touches the unit square exactly at (-0.5, -0.5).
        assert!(segment_intersects_aabb(
            p0,
            p1,
            Point2D::new(-0.5, -0.5),
            Point2D::new(0.5, 0.5)
        ));
    }
}
