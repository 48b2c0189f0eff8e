//! End-to-end planner scenarios.
//!
//! Exercises the full pipeline (heuristic, search, analytic shortcut,
//! assembly, speed profiling) on synthetic workspaces:
//! - open-space straight shot and right-angle turn
//! - parallel parking between two blocks
//! - unreachable and colliding endpoints
//! - wall-clock budget exit
//!
//! Run with: `cargo test --test planner_scenarios`

use approx::assert_abs_diff_eq;
use sarathi::geometry::polyline_segments;
use sarathi::planning::{CollisionChecker, PoseNode};
use sarathi::{
    CoarseTrajectory, HybridAStarPlanner, PlannerConfig, PlannerError, Point2D, Pose2D, Workspace,
};
use std::f64::consts::{FRAC_PI_2, PI};

// ============================================================================
// Test Configuration
// ============================================================================

/// Planner tuned like the scenarios expect: 10-way branching on a 0.3 m /
/// 0.2 rad lattice, 2.8 m wheel base, 0.5 rad steering limit.
fn scenario_config() -> PlannerConfig {
    let mut config = PlannerConfig::default();
    config.search.next_node_num = 10;
    config.search.xy_grid_resolution = 0.3;
    config.search.phi_grid_resolution = 0.2;
    config.search.step_size = 0.5;
    config.vehicle.wheel_base = 2.8;
    config.vehicle.max_steer_angle = 0.5;
    // Compact symmetric footprint (2.0 x 1.0) around the rear axle.
    config.vehicle.front_edge_to_center = 1.0;
    config.vehicle.back_edge_to_center = 1.0;
    config.vehicle.left_edge_to_center = 0.5;
    config.vehicle.right_edge_to_center = 0.5;
    config
}

fn polygon(vertices: &[(f64, f64)]) -> Vec<Point2D> {
    vertices.iter().map(|&(x, y)| Point2D::new(x, y)).collect()
}

// ============================================================================
// Shared Assertions
// ============================================================================

/// Result invariants that hold for every successful plan.
fn assert_core_invariants(trajectory: &CoarseTrajectory, workspace: &Workspace) {
    let n = trajectory.x.len();
    assert_eq!(trajectory.y.len(), n);
    assert_eq!(trajectory.phi.len(), n);
    assert_eq!(trajectory.v.len(), n);
    assert_eq!(trajectory.a.len(), n - 1);
    assert_eq!(trajectory.steer.len(), n - 1);
    assert_eq!(trajectory.accumulated_s.len(), n);

    assert_eq!(trajectory.accumulated_s[0], 0.0);
    for pair in trajectory.accumulated_s.windows(2) {
        assert!(pair[1] >= pair[0], "accumulated_s must be nondecreasing");
    }

    for i in 0..n {
        assert!(
            workspace.contains(trajectory.x[i], trajectory.y[i]),
            "pose {} outside workspace",
            i
        );
        assert!(trajectory.phi[i].abs() <= PI + 1e-9, "heading not normalized");
    }

    assert!(trajectory.v.first().unwrap().abs() < 1e-6);
    assert!(trajectory.v.last().unwrap().abs() < 1e-6);
}

/// Count forward/reverse transitions from the signs of the velocities.
/// Zero-velocity samples (segment boundaries) do not end a run.
fn gear_switch_count(trajectory: &CoarseTrajectory) -> usize {
    let signs: Vec<i8> = trajectory
        .v
        .iter()
        .filter(|v| v.abs() > 1e-9)
        .map(|v| if *v > 0.0 { 1 } else { -1 })
        .collect();
    signs.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

/// Re-check footprint clearance of every pose against the obstacle set.
fn assert_collision_free(
    trajectory: &CoarseTrajectory,
    config: &PlannerConfig,
    workspace: &Workspace,
    obstacles: &[Vec<Point2D>],
) {
    let segments = obstacles
        .iter()
        .flat_map(|polygon| polyline_segments(polygon))
        .collect();
    let checker = CollisionChecker::new(&config.vehicle, *workspace, segments);
    for i in 0..trajectory.x.len() {
        let pose = Pose2D::new(trajectory.x[i], trajectory.y[i], trajectory.phi[i]);
        let node = PoseNode::from_pose(pose, 0.3, 0.2);
        assert!(
            checker.validate(&node),
            "pose {} at ({:.2}, {:.2}, {:.2}) collides",
            i,
            pose.x,
            pose.y,
            pose.phi
        );
    }
}

// ============================================================================
// Open-Space Scenarios
// ============================================================================

#[test]
fn test_straight_shot_empty_workspace() {
    let workspace = Workspace::new(-2.0, 12.0, -2.0, 2.0);
    let mut planner = HybridAStarPlanner::new(scenario_config());

    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(10.0, 0.0, 0.0),
            &workspace,
            &[],
            &[],
            false,
        )
        .expect("straight shot must succeed");

    assert_core_invariants(&trajectory, &workspace);
    let last = trajectory.x.len() - 1;
    assert_abs_diff_eq!(trajectory.x[last], 10.0, epsilon = 0.3);
    assert_abs_diff_eq!(trajectory.y[last], 0.0, epsilon = 0.3);
    assert!(trajectory.v.iter().all(|&v| v >= -1e-9), "no reverse motion");
    assert_eq!(gear_switch_count(&trajectory), 0);
}

#[test]
fn test_right_angle_turn() {
    let workspace = Workspace::new(-2.0, 12.0, -2.0, 12.0);
    let mut planner = HybridAStarPlanner::new(scenario_config());

    // A quarter turn reachable by a single forward arc within the
    // steering limit (arc radius 6 m > minimum 5.13 m).
    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(6.0, 6.0, FRAC_PI_2),
            &workspace,
            &[],
            &[],
            false,
        )
        .expect("right-angle turn must succeed");

    assert_core_invariants(&trajectory, &workspace);
    let last = trajectory.x.len() - 1;
    assert_abs_diff_eq!(trajectory.x[last], 6.0, epsilon = 0.3);
    assert_abs_diff_eq!(trajectory.y[last], 6.0, epsilon = 0.3);
    assert!(gear_switch_count(&trajectory) <= 1);
}

// ============================================================================
// Parking
// ============================================================================

#[test]
fn test_parallel_parking_between_blocks() {
    let workspace = Workspace::new(-8.0, 8.0, -2.0, 6.0);
    let mut config = scenario_config();
    config.search.max_explored_num = 20_000;
    config.search.desired_explored_num = 1;
    let obstacles = vec![
        polygon(&[(-5.0, -1.0), (-5.0, 1.0), (-2.3, 1.0), (-2.3, -1.0)]),
        polygon(&[(2.3, -1.0), (2.3, 1.0), (5.0, 1.0), (5.0, -1.0)]),
    ];
    let mut planner = HybridAStarPlanner::new(config.clone());

    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 3.5, 0.0),
            Pose2D::new(0.0, 0.0, 0.0),
            &workspace,
            &obstacles,
            &[],
            false,
        )
        .expect("parking maneuver must succeed");

    assert_core_invariants(&trajectory, &workspace);
    assert_collision_free(&trajectory, &config, &workspace, &obstacles);
    assert!(gear_switch_count(&trajectory) >= 1, "parking needs a cusp");

    let last = trajectory.x.len() - 1;
    assert!(trajectory.x[last].abs() < 1e-3);
    assert!(trajectory.y[last].abs() < 1e-3);
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_unreachable_goal_exhausts_search() {
    let workspace = Workspace::new(-8.0, 8.0, -8.0, 8.0);
    let mut config = scenario_config();
    config.search.max_explored_num = 300;
    config.search.astar_max_search_time = 30.0;
    // Closed square ring around the goal; the footprint cannot penetrate.
    let ring = vec![polygon(&[
        (1.6, 1.6),
        (-1.6, 1.6),
        (-1.6, -1.6),
        (1.6, -1.6),
        (1.6, 1.6),
    ])];
    let mut planner = HybridAStarPlanner::new(config);

    let result = planner.plan(
        Pose2D::new(4.0, 0.0, 0.0),
        Pose2D::new(0.0, 0.0, 0.0),
        &workspace,
        &ring,
        &[],
        false,
    );

    match result {
        Err(PlannerError::SearchExhausted(_)) => {}
        other => panic!("expected SearchExhausted, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_start_in_collision_fails_fast() {
    let workspace = Workspace::new(-8.0, 8.0, -8.0, 8.0);
    let wall = vec![polygon(&[(0.5, -2.0), (0.5, 2.0)])];
    let mut planner = HybridAStarPlanner::new(scenario_config());

    let result = planner.plan(
        Pose2D::new(0.0, 0.0, 0.0),
        Pose2D::new(5.0, 0.0, 0.0),
        &workspace,
        &wall,
        &[],
        false,
    );

    match result {
        Err(PlannerError::EndpointInCollision(message)) => {
            assert!(message.contains("start"));
        }
        other => panic!("expected EndpointInCollision, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_goal_in_collision_fails_fast() {
    let workspace = Workspace::new(-8.0, 8.0, -8.0, 8.0);
    let wall = vec![polygon(&[(5.5, -2.0), (5.5, 2.0)])];
    let mut planner = HybridAStarPlanner::new(scenario_config());

    let result = planner.plan(
        Pose2D::new(0.0, 0.0, 0.0),
        Pose2D::new(5.0, 0.0, 0.0),
        &workspace,
        &wall,
        &[],
        false,
    );

    match result {
        Err(PlannerError::EndpointInCollision(message)) => {
            assert!(message.contains("goal"));
        }
        other => panic!("expected EndpointInCollision, got {:?}", other.map(|t| t.len())),
    }
}

// ============================================================================
// Budget Exit
// ============================================================================

#[test]
fn test_time_budget_exit_keeps_candidate() {
    let workspace = Workspace::new(-2.0, 12.0, -2.0, 12.0);
    let mut config = scenario_config();
    // Budget exhausted immediately, but the exit only fires once a
    // candidate exists, so the plan still succeeds.
    config.search.astar_max_search_time = 0.0;
    config.search.desired_explored_num = 10_000;
    config.search.max_explored_num = 10_000;
    let mut planner = HybridAStarPlanner::new(config);

    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(6.0, 6.0, FRAC_PI_2),
            &workspace,
            &[],
            &[],
            false,
        )
        .expect("budget exit with candidate is a success");

    assert_core_invariants(&trajectory, &workspace);
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn test_s_curve_mode_straight_shot() {
    let workspace = Workspace::new(-2.0, 12.0, -2.0, 2.0);
    let mut config = scenario_config();
    config.speed.use_s_curve_speed_smooth = true;
    let mut planner = HybridAStarPlanner::new(config.clone());

    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(10.0, 0.0, 0.0),
            &workspace,
            &[],
            &[],
            false,
        )
        .expect("optimized profile must succeed");

    assert_core_invariants(&trajectory, &workspace);
    for &v in &trajectory.v {
        assert!(v >= -1e-9);
        assert!(v <= config.speed.max_forward_v + 1e-3);
    }
    // Ends at the goal, at rest.
    let last = trajectory.x.len() - 1;
    assert!((trajectory.x[last] - 10.0).abs() < 0.3);
}

#[test]
fn test_soft_boundaries_do_not_block() {
    // A soft boundary crossing the straight path must not affect success.
    let workspace = Workspace::new(-2.0, 12.0, -2.0, 2.0);
    let soft = vec![polygon(&[(5.0, -2.0), (5.0, 2.0)])];
    let mut planner = HybridAStarPlanner::new(scenario_config());

    let trajectory = planner
        .plan(
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(10.0, 0.0, 0.0),
            &workspace,
            &[],
            &soft,
            false,
        )
        .expect("soft boundaries are advisory");
    assert_core_invariants(&trajectory, &workspace);
}
