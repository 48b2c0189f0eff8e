//! Hybrid A* search engine and planner entry point.
//!
//! Best-first search over a grid-discretized pose lattice whose successor
//! states come from forward-simulated motion primitives. Every expanded
//! node first attempts an analytic Reeds–Shepp shortcut to the goal; the
//! cheapest collision-free shortcut terminates the search. The winning
//! node chain is stitched back into a geometric path and handed to the
//! speed profiler.

use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::geometry::{polyline_segments, Point2D, Pose2D, Segment2D, Workspace};
use crate::speed::SpeedProfiler;
use crate::trajectory::CoarseTrajectory;

use super::collision::CollisionChecker;
use super::grid_heuristic::GridHeuristic;
use super::node::{NodeArena, NodeId, OpenEntry, PoseNode};
use super::primitives::MotionPrimitives;
use super::reeds_shepp::ReedsShepp;

/// Upper bound on the open queue before the search aborts.
const MAX_OPEN_QUEUE: usize = 200_000;

/// Coarse trajectory planner for car-like vehicles in unstructured space.
pub struct HybridAStarPlanner {
    config: PlannerConfig,
    primitives: MotionPrimitives,
    reeds_shepp: ReedsShepp,
    profiler: SpeedProfiler,
}

impl HybridAStarPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let primitives = MotionPrimitives::new(&config);
        let reeds_shepp = ReedsShepp::new(config.max_curvature(), config.search.step_size);
        let profiler = SpeedProfiler::new(&config);
        Self {
            config,
            primitives,
            reeds_shepp,
            profiler,
        }
    }

    #[inline]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a collision-free coarse trajectory from `start` to `goal`.
    ///
    /// `obstacles` are open polylines: `N` vertices produce `N - 1`
    /// segments, with no implicit closure. `soft_boundaries` are accepted
    /// for diagnostics only and never enter the collision set.
    /// `reeds_shepp_last_straight` asks the shortcut generator, best
    /// effort, for curves ending in a straight segment.
    ///
    /// All search state lives and dies inside this call.
    pub fn plan(
        &mut self,
        start: Pose2D,
        goal: Pose2D,
        workspace: &Workspace,
        obstacles: &[Vec<Point2D>],
        soft_boundaries: &[Vec<Point2D>],
        reeds_shepp_last_straight: bool,
    ) -> Result<CoarseTrajectory> {
        let plan_start = Instant::now();
        self.validate_inputs(&start, &goal, workspace, obstacles)?;
        self.reeds_shepp.last_straight = reeds_shepp_last_straight;

        if !soft_boundaries.is_empty() {
            tracing::debug!(
                polygons = soft_boundaries.len(),
                vertices = soft_boundaries.iter().map(Vec::len).sum::<usize>(),
                "soft boundary polygons accepted (advisory only)"
            );
        }

        let segments: Vec<Segment2D> = obstacles
            .iter()
            .flat_map(|vertices| polyline_segments(vertices))
            .collect();
        let checker = CollisionChecker::new(&self.config.vehicle, *workspace, segments);

        let xy_res = self.config.search.xy_grid_resolution;
        let phi_res = self.config.search.phi_grid_resolution;
        let start_node = PoseNode::from_pose(start, xy_res, phi_res);
        let goal_node = PoseNode::from_pose(goal, xy_res, phi_res);

        if !checker.validate(&start_node) {
            tracing::warn!(x = start.x, y = start.y, phi = start.phi, "start pose in collision");
            return Err(PlannerError::EndpointInCollision(format!(
                "start pose ({:.3}, {:.3}, {:.3})",
                start.x, start.y, start.phi
            )));
        }
        if !checker.validate(&goal_node) {
            tracing::warn!(x = goal.x, y = goal.y, phi = goal.phi, "goal pose in collision");
            return Err(PlannerError::EndpointInCollision(format!(
                "goal pose ({:.3}, {:.3}, {:.3})",
                goal.x, goal.y, goal.phi
            )));
        }

        let heuristic_start = Instant::now();
        let heuristic = GridHeuristic::generate(
            goal.position(),
            workspace,
            checker.segments(),
            xy_res,
        );
        tracing::debug!(
            elapsed_ms = heuristic_start.elapsed().as_secs_f64() * 1e3,
            "grid heuristic generated"
        );

        let goal_pose = goal_node.pose();
        let terminal =
            self.search(start_node, &goal_pose, &checker, &heuristic, plan_start)?;
        let (arena, terminal_id) = terminal;

        let geometry = assemble_geometry(&arena, terminal_id)?;
        let trajectory = self.profiler.temporal_profile(&geometry)?;

        tracing::debug!(
            points = trajectory.len(),
            length_m = trajectory.accumulated_s.last().copied().unwrap_or(0.0),
            elapsed_ms = plan_start.elapsed().as_secs_f64() * 1e3,
            "plan complete"
        );
        Ok(trajectory)
    }

    fn validate_inputs(
        &self,
        start: &Pose2D,
        goal: &Pose2D,
        workspace: &Workspace,
        obstacles: &[Vec<Point2D>],
    ) -> Result<()> {
        self.config.validate()?;
        if !start.is_finite() || !goal.is_finite() {
            return Err(PlannerError::InvalidInput(
                "start or goal pose is not finite".to_string(),
            ));
        }
        if !workspace.is_valid() {
            return Err(PlannerError::InvalidInput(format!(
                "degenerate workspace [{}, {}] x [{}, {}]",
                workspace.x_min, workspace.x_max, workspace.y_min, workspace.y_max
            )));
        }
        if !workspace.contains(start.x, start.y) || !workspace.contains(goal.x, goal.y) {
            return Err(PlannerError::InvalidInput(
                "start or goal pose outside workspace".to_string(),
            ));
        }
        for (index, polygon) in obstacles.iter().enumerate() {
            if polygon.len() < 2 {
                return Err(PlannerError::InvalidInput(format!(
                    "obstacle polygon {} has fewer than 2 vertices",
                    index
                )));
            }
            if polygon.iter().any(|v| !v.is_finite()) {
                return Err(PlannerError::InvalidInput(format!(
                    "obstacle polygon {} has nonfinite vertices",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Run the best-first loop. Returns the node arena and the cheapest
    /// analytic terminal node.
    fn search(
        &self,
        start_node: PoseNode,
        goal: &Pose2D,
        checker: &CollisionChecker,
        heuristic: &GridHeuristic,
        search_start: Instant,
    ) -> Result<(NodeArena, NodeId)> {
        let search_config = &self.config.search;
        let max_explored = search_config.max_explored_num;
        let desired_results = search_config.desired_explored_num.min(max_explored);
        let time_budget = search_config.astar_max_search_time;

        let mut arena = NodeArena::new();
        let mut open_pq: BinaryHeap<OpenEntry> = BinaryHeap::new();
        let mut open_set = HashSet::new();
        let mut closed_set = HashSet::new();
        let mut sequence = 0_u64;

        let start_id = arena.insert(start_node);
        open_set.insert(arena.get(start_id).grid_index);
        open_pq.push(OpenEntry {
            id: start_id,
            cost: arena.get(start_id).cost(),
            sequence,
        });

        let mut best_final: Option<NodeId> = None;
        let mut explored_node_num = 0_usize;
        let mut available_result_num = 0_usize;

        while !open_pq.is_empty()
            && open_pq.len() < MAX_OPEN_QUEUE
            && available_result_num < desired_results
            && explored_node_num < max_explored
        {
            let entry = open_pq.pop().expect("queue checked non-empty");
            let current_id = entry.id;
            let current_grid = arena.get(current_id).grid_index;

            // Tombstone: a superseded entry for an already-expanded cell.
            if closed_set.contains(&current_grid) {
                continue;
            }

            if let Some(final_id) = self.analytic_expansion(&mut arena, current_id, goal, checker)
            {
                let better = match best_final {
                    None => true,
                    Some(best) => arena.get(final_id).traj_cost < arena.get(best).traj_cost,
                };
                if better {
                    best_final = Some(final_id);
                }
                available_result_num += 1;
            }
            explored_node_num += 1;
            closed_set.insert(current_grid);

            if search_start.elapsed().as_secs_f64() > time_budget && available_result_num > 0 {
                tracing::debug!(
                    explored = explored_node_num,
                    "search time budget exhausted with a candidate in hand"
                );
                break;
            }

            let mut newly_opened = Vec::new();
            for index in 0..self.primitives.branching_factor() {
                let Some(mut child) =
                    self.primitives.expand(arena.get(current_id), index, checker.workspace())
                else {
                    continue;
                };
                if closed_set.contains(&child.grid_index) {
                    continue;
                }
                if open_set.contains(&child.grid_index) {
                    continue;
                }
                if !checker.validate(&child) {
                    continue;
                }

                let current = arena.get(current_id);
                child.traj_cost = current.traj_cost + self.edge_cost(current, &child);
                child.heuristic_cost = {
                    let pose = child.pose();
                    heuristic.lookup(pose.x, pose.y)
                };
                child.predecessor = Some(current_id);

                newly_opened.push(child.grid_index);
                let cost = child.cost();
                let child_id = arena.insert(child);
                sequence += 1;
                open_pq.push(OpenEntry {
                    id: child_id,
                    cost,
                    sequence,
                });
            }
            open_set.extend(newly_opened);
        }

        tracing::debug!(
            explored = explored_node_num,
            candidates = available_result_num,
            open = open_pq.len(),
            elapsed_ms = search_start.elapsed().as_secs_f64() * 1e3,
            "search finished"
        );

        match best_final {
            Some(id) => Ok((arena, id)),
            None => {
                tracing::warn!(
                    explored = explored_node_num,
                    "search exhausted without reaching the goal"
                );
                Err(PlannerError::SearchExhausted(format!(
                    "no analytic candidate after {} expansions",
                    explored_node_num
                )))
            }
        }
    }

    /// Try to splice a Reeds–Shepp shortcut from `current` to the goal.
    fn analytic_expansion(
        &self,
        arena: &mut NodeArena,
        current_id: NodeId,
        goal: &Pose2D,
        checker: &CollisionChecker,
    ) -> Option<NodeId> {
        let current_pose = arena.get(current_id).pose();
        let rs_path = self.reeds_shepp.shortest_path(&current_pose, goal)?;
        if rs_path.poses.len() < 2 {
            return None;
        }

        let mut node = PoseNode::from_traversed(
            rs_path.poses,
            self.config.search.xy_grid_resolution,
            self.config.search.phi_grid_resolution,
        );
        if !checker.validate(&node) {
            return None;
        }

        node.traj_cost = arena.get(current_id).traj_cost + rs_path.cost;
        node.predecessor = Some(current_id);
        Some(arena.insert(node))
    }

    /// Cost of the primitive edge from `current` into `next`.
    fn edge_cost(&self, current: &PoseNode, next: &PoseNode) -> f64 {
        let search = &self.config.search;
        let travel = (next.step_count() - 1) as f64 * search.step_size;
        let mut cost = travel
            * if next.direction {
                search.traj_forward_penalty
            } else {
                search.traj_back_penalty
            };
        if current.direction != next.direction {
            cost += search.traj_gear_switch_penalty;
        }
        cost += search.traj_steer_penalty * next.steering.abs();
        cost += search.traj_steer_change_penalty * (next.steering - current.steering).abs();
        cost
    }
}

/// Walk predecessor links from the terminal node to the start and stitch
/// the traversed pose sequences into one start-to-goal geometry.
fn assemble_geometry(arena: &NodeArena, terminal: NodeId) -> Result<CoarseTrajectory> {
    let mut geometry = CoarseTrajectory::default();
    let mut current = terminal;

    loop {
        let node = arena.get(current);
        match node.predecessor {
            Some(predecessor) => {
                if node.traversed.len() < 2 {
                    return Err(PlannerError::AssemblyInvariantViolated(format!(
                        "intermediate node with {} traversed poses",
                        node.traversed.len()
                    )));
                }
                // Goal-to-start order, dropping the pose shared with the
                // parent so no boundary state is duplicated.
                for pose in node.traversed.iter().skip(1).rev() {
                    geometry.x.push(pose.x);
                    geometry.y.push(pose.y);
                    geometry.phi.push(pose.phi);
                }
                current = predecessor;
            }
            None => {
                let pose = node.pose();
                geometry.x.push(pose.x);
                geometry.y.push(pose.y);
                geometry.phi.push(pose.phi);
                break;
            }
        }
    }

    geometry.x.reverse();
    geometry.y.reverse();
    geometry.phi.reverse();
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::normalize_angle;
    use crate::planning::node::GridIndex;

    fn planner() -> HybridAStarPlanner {
        HybridAStarPlanner::new(PlannerConfig::default())
    }

    #[test]
    fn test_assemble_geometry_orders_start_to_goal() {
        let mut arena = NodeArena::new();
        let root = arena.insert(PoseNode::from_pose(Pose2D::new(0.0, 0.0, 0.0), 0.3, 0.2));
        let mut child = PoseNode::from_traversed(
            vec![
                Pose2D::new(0.0, 0.0, 0.0),
                Pose2D::new(0.5, 0.0, 0.0),
                Pose2D::new(1.0, 0.0, 0.0),
            ],
            0.3,
            0.2,
        );
        child.predecessor = Some(root);
        let child_id = arena.insert(child);

        let geometry = assemble_geometry(&arena, child_id).unwrap();
        assert_eq!(geometry.x, vec![0.0, 0.5, 1.0]);
        // No duplicated boundary pose.
        assert_eq!(geometry.x.len(), 3);
    }

    #[test]
    fn test_edge_cost_terms() {
        let planner = planner();
        let search = &planner.config.search;

        let current = PoseNode::from_pose(Pose2D::default(), 0.3, 0.2);
        let mut next = PoseNode::from_traversed(
            vec![Pose2D::default(); 5],
            0.3,
            0.2,
        );
        next.direction = true;
        next.steering = 0.25;

        let cost = planner.edge_cost(&current, &next);
        let expected = 4.0 * search.step_size * search.traj_forward_penalty
            + search.traj_steer_penalty * 0.25
            + search.traj_steer_change_penalty * 0.25;
        assert!((cost - expected).abs() < 1e-12);

        // Reverse edge adds the gear-switch penalty.
        next.direction = false;
        let cost = planner.edge_cost(&current, &next);
        let expected = 4.0 * search.step_size * search.traj_back_penalty
            + search.traj_gear_switch_penalty
            + search.traj_steer_penalty * 0.25
            + search.traj_steer_change_penalty * 0.25;
        assert!((cost - expected).abs() < 1e-12);
    }

    #[test]
    fn test_plan_rejects_nonfinite_start() {
        let mut planner = planner();
        let workspace = Workspace::new(-5.0, 5.0, -5.0, 5.0);
        let result = planner.plan(
            Pose2D::new(f64::NAN, 0.0, 0.0),
            Pose2D::new(1.0, 0.0, 0.0),
            &workspace,
            &[],
            &[],
            false,
        );
        assert!(matches!(result, Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn test_plan_rejects_single_vertex_obstacle() {
        let mut planner = planner();
        let workspace = Workspace::new(-5.0, 5.0, -5.0, 5.0);
        let result = planner.plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(1.0, 0.0, 0.0),
            &workspace,
            &[vec![Point2D::new(1.0, 1.0)]],
            &[],
            false,
        );
        assert!(matches!(result, Err(PlannerError::InvalidInput(_))));
    }

    #[test]
    fn test_plan_straight_line_no_obstacles() {
        let mut planner = planner();
        let workspace = Workspace::new(-2.0, 15.0, -3.0, 3.0);
        let trajectory = planner
            .plan(
                Pose2D::new(0.0, 0.0, 0.0),
                Pose2D::new(10.0, 0.0, 0.0),
                &workspace,
                &[],
                &[],
                false,
            )
            .unwrap();

        trajectory.check_invariants().unwrap();
        let last = trajectory.len() - 1;
        assert!((trajectory.x[last] - 10.0).abs() < 0.3);
        assert!(trajectory.y[last].abs() < 0.3);
        assert!(normalize_angle(trajectory.phi[last]).abs() < 0.2);
    }

    #[test]
    fn test_grid_index_identity_shared_between_nodes() {
        // Two nodes landing in the same cell are equivalent for the search.
        let a = PoseNode::from_pose(Pose2D::new(0.01, 0.01, 0.01), 0.3, 0.2);
        let b = PoseNode::from_pose(Pose2D::new(0.29, 0.29, 0.19), 0.3, 0.2);
        assert_eq!(a.grid_index, b.grid_index);
        assert_eq!(a.grid_index, GridIndex(0, 0, 0));
    }
}
