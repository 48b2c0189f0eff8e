//! Footprint validity checking against workspace bounds and obstacles.

use super::node::PoseNode;
use crate::config::VehicleConfig;
use crate::geometry::{OrientedBox, Point2D, Pose2D, Segment2D, Workspace};

/// Checks traversed pose sequences for workspace containment and
/// obstacle-segment overlap. Built once per plan invocation; holds the
/// obstacle segments by value for its duration.
pub struct CollisionChecker {
    workspace: Workspace,
    segments: Vec<Segment2D>,
    body_length: f64,
    body_width: f64,
    /// Offset from the rear-axle reference to the geometric center, in the
    /// vehicle frame.
    center_offset: Point2D,
}

impl CollisionChecker {
    pub fn new(vehicle: &VehicleConfig, workspace: Workspace, segments: Vec<Segment2D>) -> Self {
        Self {
            workspace,
            segments,
            body_length: vehicle.length(),
            body_width: vehicle.width(),
            center_offset: Point2D::new(
                0.5 * (vehicle.front_edge_to_center - vehicle.back_edge_to_center),
                0.5 * (vehicle.left_edge_to_center - vehicle.right_edge_to_center),
            ),
        }
    }

    /// The oriented body rectangle with the vehicle reference at `pose`.
    pub fn footprint_at(&self, pose: &Pose2D) -> OrientedBox {
        let center = pose.position() + self.center_offset.rotated(pose.phi);
        OrientedBox::new(center, pose.phi, self.body_length, self.body_width)
    }

    /// Validate every pose a node traverses.
    ///
    /// Single-pose nodes (start and goal seeds) are checked from index 0;
    /// expansion results skip index 0 because the boundary pose was already
    /// validated as the parent's terminal pose.
    pub fn validate(&self, node: &PoseNode) -> bool {
        if self.segments.is_empty() {
            return true;
        }

        let check_start = if node.step_count() == 1 { 0 } else { 1 };

        for pose in &node.traversed[check_start..] {
            if !self.workspace.contains(pose.x, pose.y) {
                return false;
            }
            let footprint = self.footprint_at(pose);
            for segment in &self.segments {
                if footprint.overlaps_segment(segment) {
                    tracing::trace!(
                        x = pose.x,
                        y = pose.y,
                        phi = pose.phi,
                        "footprint overlaps obstacle segment"
                    );
                    return false;
                }
            }
        }
        true
    }

    #[inline]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[inline]
    pub fn segments(&self) -> &[Segment2D] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::node::PoseNode;

    fn test_vehicle() -> VehicleConfig {
        VehicleConfig {
            wheel_base: 2.8,
            front_edge_to_center: 3.9,
            back_edge_to_center: 1.0,
            left_edge_to_center: 1.05,
            right_edge_to_center: 1.05,
            max_steer_angle: 0.5,
        }
    }

    fn seed(x: f64, y: f64, phi: f64) -> PoseNode {
        PoseNode::from_pose(Pose2D::new(x, y, phi), 0.3, 0.2)
    }

    #[test]
    fn test_no_obstacles_is_always_valid() {
        let checker = CollisionChecker::new(
            &test_vehicle(),
            Workspace::new(-10.0, 10.0, -10.0, 10.0),
            Vec::new(),
        );
        assert!(checker.validate(&seed(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_footprint_center_offset() {
        let checker = CollisionChecker::new(
            &test_vehicle(),
            Workspace::new(-10.0, 10.0, -10.0, 10.0),
            Vec::new(),
        );
        let footprint = checker.footprint_at(&Pose2D::new(0.0, 0.0, 0.0));
        // Geometric center sits ahead of the rear axle by (front - back) / 2.
        assert!((footprint.center.x - 1.45).abs() < 1e-12);
        assert!(footprint.center.y.abs() < 1e-12);
        assert!((footprint.length - 4.9).abs() < 1e-12);
        assert!((footprint.width - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_segment_through_body_rejected() {
        let wall = Segment2D::new(Point2D::new(2.0, -5.0), Point2D::new(2.0, 5.0));
        let checker = CollisionChecker::new(
            &test_vehicle(),
            Workspace::new(-10.0, 10.0, -10.0, 10.0),
            vec![wall],
        );
        // Nose reaches x = 3.9, so a wall at x = 2 cuts through the body.
        assert!(!checker.validate(&seed(0.0, 0.0, 0.0)));
        // Far from the wall the same pose heading is fine.
        assert!(checker.validate(&seed(-4.0, 0.0, 0.0)));
    }

    #[test]
    fn test_pose_outside_workspace_rejected() {
        let wall = Segment2D::new(Point2D::new(50.0, -1.0), Point2D::new(50.0, 1.0));
        let checker = CollisionChecker::new(
            &test_vehicle(),
            Workspace::new(-10.0, 10.0, -10.0, 10.0),
            vec![wall],
        );
        assert!(!checker.validate(&seed(11.0, 0.0, 0.0)));
    }

    #[test]
    fn test_expansion_node_skips_boundary_pose() {
        // The first traversed pose belongs to the parent; a wall touching
        // only that pose must not invalidate the child.
        let wall = Segment2D::new(Point2D::new(3.0, -3.0), Point2D::new(3.0, 3.0));
        let checker = CollisionChecker::new(
            &test_vehicle(),
            Workspace::new(-20.0, 20.0, -20.0, 20.0),
            vec![wall],
        );
        let child = PoseNode::from_traversed(
            vec![
                Pose2D::new(0.0, 0.0, 0.0),   // boundary: nose at 3.9 overlaps
                Pose2D::new(-2.0, 0.0, 0.0),  // clear
                Pose2D::new(-4.0, 0.0, 0.0),  // clear
            ],
            0.3,
            0.2,
        );
        assert!(checker.validate(&child));
    }
}
