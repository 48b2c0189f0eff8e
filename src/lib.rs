//! # Sarathi: Coarse Trajectory Generation for Car-Like Vehicles
//!
//! A Hybrid A* trajectory planner for non-holonomic vehicles in
//! unstructured open space: parking lots, pull-over maneuvers, loading
//! yards. Given a start pose, a goal pose, a rectangular workspace and
//! polygonal obstacles, it produces a kinematically feasible,
//! collision-free trajectory with a full temporal profile, partitioned
//! internally at forward/reverse gear changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use sarathi::{HybridAStarPlanner, PlannerConfig, Pose2D, Workspace};
//!
//! let mut planner = HybridAStarPlanner::new(PlannerConfig::default());
//! let workspace = Workspace::new(-5.0, 20.0, -5.0, 5.0);
//! let trajectory = planner
//!     .plan(
//!         Pose2D::new(0.0, 0.0, 0.0),
//!         Pose2D::new(12.0, 0.0, 0.0),
//!         &workspace,
//!         &[], // obstacle polylines
//!         &[], // soft boundaries (advisory)
//!         false,
//!     )
//!     .expect("open workspace is plannable");
//! assert_eq!(trajectory.x.len(), trajectory.v.len());
//! ```
//!
//! ## Architecture
//!
//! - [`geometry`]: poses, segments, footprint boxes, workspace bounds
//! - [`planning`]: the Hybrid A* engine — search nodes, 2D Dijkstra
//!   heuristic, bicycle-model motion primitives, collision checking, and
//!   Reeds–Shepp analytic shortcuts
//! - [`speed`]: gear partitioning and temporal profiling, including the
//!   piecewise-jerk convex speed optimizer
//! - [`config`]: TOML-backed configuration with per-field defaults
//!
//! The planner runs synchronously on the calling thread; one `plan` call
//! owns all of its search state and shares nothing with the next call.
//!
//! ## Coordinate Frame
//!
//! World frame, meters and radians: X east, Y north, headings CCW from +X
//! normalized to `(-pi, pi]`. Vehicle poses are referenced to the
//! rear-axle center.

pub mod config;
pub mod error;
pub mod geometry;
pub mod planning;
pub mod speed;
pub mod trajectory;

pub use config::{PlannerConfig, SearchConfig, SpeedConfig, VehicleConfig};
pub use error::{PlannerError, Result};
pub use geometry::{Point2D, Pose2D, Workspace};
pub use planning::HybridAStarPlanner;
pub use trajectory::CoarseTrajectory;
