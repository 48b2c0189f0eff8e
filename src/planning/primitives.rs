//! Motion-primitive expansion.
//!
//! Children of a search node come from forward-simulating a kinematic
//! bicycle model while holding one of a fixed fan of steering angles, in
//! both driving directions. One primitive is sized to move the vehicle at
//! least one grid diagonal so consecutive nodes land in distinct cells.

use super::node::PoseNode;
use crate::config::PlannerConfig;
use crate::geometry::{normalize_angle, Pose2D, Workspace};

/// Generator for the fixed fan of motion primitives.
#[derive(Clone, Debug)]
pub struct MotionPrimitives {
    next_node_num: usize,
    max_steer: f64,
    wheel_base: f64,
    step_size: f64,
    arc_length: f64,
    xy_resolution: f64,
    phi_resolution: f64,
}

impl MotionPrimitives {
    /// Size the primitive fan from the planner configuration.
    pub fn new(config: &PlannerConfig) -> Self {
        let next_node_num = config.search.next_node_num;
        let max_steer = config.effective_max_steer();
        let wheel_base = config.vehicle.wheel_base;
        let xy_resolution = config.search.xy_grid_resolution;
        let phi_resolution = config.search.phi_grid_resolution;

        // Arc length that advances one heading cell at the coarsest steering
        // step, but never less than one grid diagonal.
        let steer_gap = max_steer * 2.0 / (next_node_num as f64 / 2.0 - 1.0);
        let mut arc_length = phi_resolution * wheel_base / steer_gap.tan();
        let diagonal = std::f64::consts::SQRT_2 * xy_resolution;
        if arc_length < diagonal {
            arc_length = diagonal;
        }

        Self {
            next_node_num,
            max_steer,
            wheel_base,
            step_size: config.search.step_size,
            arc_length,
            xy_resolution,
            phi_resolution,
        }
    }

    /// Total branching factor.
    #[inline]
    pub fn branching_factor(&self) -> usize {
        self.next_node_num
    }

    /// Arc length covered by one primitive, meters.
    #[inline]
    pub fn arc_length(&self) -> f64 {
        self.arc_length
    }

    /// Expand child `index` of `parent`.
    ///
    /// Children `0..N/2` drive forward, the rest reverse; within each half
    /// the steering sweeps linearly across `[-max_steer, +max_steer]`.
    /// Returns `None` when the final pose exits the workspace.
    pub fn expand(
        &self,
        parent: &PoseNode,
        index: usize,
        workspace: &Workspace,
    ) -> Option<PoseNode> {
        debug_assert!(index < self.next_node_num);

        let half = self.next_node_num / 2;
        let forward = index < half;
        let travel = if forward {
            self.step_size
        } else {
            -self.step_size
        };
        let steer_step = 2.0 * self.max_steer / (half as f64 - 1.0);
        let steering = -self.max_steer + steer_step * ((index % half) as f64);

        let start = parent.pose();
        let substeps = (self.arc_length / self.step_size).floor() as usize;
        let traversed = integrate_primitive(
            start,
            travel,
            steering,
            self.wheel_base,
            substeps,
        );

        let terminal = *traversed.last().expect("primitive has at least the seed pose");
        if !workspace.contains(terminal.x, terminal.y) {
            return None;
        }

        let mut node = PoseNode::from_traversed(traversed, self.xy_resolution, self.phi_resolution);
        node.direction = forward;
        node.steering = steering;
        Some(node)
    }
}

/// Integrate the bicycle model from `start` for `substeps` steps of signed
/// arc increment `travel` at constant `steering`.
///
/// The running heading stays unnormalized between substeps so the midpoint
/// heading never sees a wrap; stored headings are normalized.
pub fn integrate_primitive(
    start: Pose2D,
    travel: f64,
    steering: f64,
    wheel_base: f64,
    substeps: usize,
) -> Vec<Pose2D> {
    let mut traversed = Vec::with_capacity(substeps + 1);
    traversed.push(start);

    let mut last_x = start.x;
    let mut last_y = start.y;
    let mut last_phi = start.phi;

    for _ in 0..substeps {
        let next_phi = last_phi + travel / wheel_base * steering.tan();
        let mid_phi = 0.5 * (last_phi + next_phi);
        let next_x = last_x + travel * mid_phi.cos();
        let next_y = last_y + travel * mid_phi.sin();
        traversed.push(Pose2D::new(next_x, next_y, normalize_angle(next_phi)));
        last_x = next_x;
        last_y = next_y;
        last_phi = next_phi;
    }

    traversed
}
