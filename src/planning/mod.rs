//! Hybrid A* planning: search nodes, heuristic, primitives, collision
//! checking, Reeds–Shepp shortcuts, and the search engine itself.

mod collision;
mod grid_heuristic;
mod hybrid_astar;
pub mod node;
mod primitives;
mod reeds_shepp;

pub use collision::CollisionChecker;
pub use grid_heuristic::GridHeuristic;
pub use hybrid_astar::HybridAStarPlanner;
pub use node::{GridIndex, PoseNode};
pub use primitives::MotionPrimitives;
pub use reeds_shepp::{ReedsShepp, RsPath, RsSegmentType};
