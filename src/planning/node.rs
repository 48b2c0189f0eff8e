//! Search-tree nodes for the lattice search.
//!
//! A node's identity in the open/closed sets is its quantized grid index;
//! its payload is the continuous pose sequence traversed on the edge that
//! produced it. Nodes live in an arena and refer to their predecessor by
//! index, so reconstruction is a lookup relation rather than ownership.

use crate::geometry::{normalize_angle, Pose2D};
use std::cmp::Ordering;

/// Quantized cell identity of a pose: `(gx, gy, gphi)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridIndex(pub i32, pub i32, pub i32);

impl GridIndex {
    /// Quantize a pose onto the search lattice.
    ///
    /// Headings are normalized before quantization so equal poses always
    /// map to equal indices.
    pub fn from_pose(pose: &Pose2D, xy_resolution: f64, phi_resolution: f64) -> Self {
        GridIndex(
            (pose.x / xy_resolution).floor() as i32,
            (pose.y / xy_resolution).floor() as i32,
            (normalize_angle(pose.phi) / phi_resolution).floor() as i32,
        )
    }

    /// The 2D cell part, used by the grid heuristic.
    #[inline]
    pub fn cell(&self) -> (i32, i32) {
        (self.0, self.1)
    }
}

/// Arena handle for a [`PoseNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(pub usize);

/// A node of the hybrid search tree.
#[derive(Clone, Debug)]
pub struct PoseNode {
    /// Every intermediate pose on the incoming edge, parent-boundary pose
    /// first, this node's terminal pose last. Length >= 1.
    pub traversed: Vec<Pose2D>,
    /// Quantized identity of the terminal pose.
    pub grid_index: GridIndex,
    /// Accumulated path cost from the start node (g).
    pub traj_cost: f64,
    /// Estimated cost to the goal (h).
    pub heuristic_cost: f64,
    /// True when the incoming edge drives forward.
    pub direction: bool,
    /// Steering angle held on the incoming edge, radians, signed.
    pub steering: f64,
    /// Predecessor in the search tree; `None` only for the start seed.
    pub predecessor: Option<NodeId>,
}

impl PoseNode {
    /// Seed node from a single pose (start and goal anchors).
    pub fn from_pose(pose: Pose2D, xy_resolution: f64, phi_resolution: f64) -> Self {
        let pose = Pose2D::new(pose.x, pose.y, normalize_angle(pose.phi));
        Self {
            grid_index: GridIndex::from_pose(&pose, xy_resolution, phi_resolution),
            traversed: vec![pose],
            traj_cost: 0.0,
            heuristic_cost: 0.0,
            direction: true,
            steering: 0.0,
            predecessor: None,
        }
    }

    /// Node from a traversed sequence produced by an expansion.
    ///
    /// The sequence must be non-empty; its last element becomes the
    /// terminal pose that defines the grid identity.
    pub fn from_traversed(
        traversed: Vec<Pose2D>,
        xy_resolution: f64,
        phi_resolution: f64,
    ) -> Self {
        debug_assert!(!traversed.is_empty());
        let terminal = *traversed.last().expect("traversed sequence is non-empty");
        Self {
            grid_index: GridIndex::from_pose(&terminal, xy_resolution, phi_resolution),
            traversed,
            traj_cost: 0.0,
            heuristic_cost: 0.0,
            direction: true,
            steering: 0.0,
            predecessor: None,
        }
    }

    /// Terminal pose of the node.
    #[inline]
    pub fn pose(&self) -> Pose2D {
        *self.traversed.last().expect("traversed sequence is non-empty")
    }

    /// Number of poses on the incoming edge.
    #[inline]
    pub fn step_count(&self) -> usize {
        self.traversed.len()
    }

    /// Priority-ordering key: total estimated cost.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.traj_cost + self.heuristic_cost
    }
}

/// Flat storage for all nodes of one plan invocation.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<PoseNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Store a node and return its handle.
    pub fn insert(&mut self, node: PoseNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &PoseNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut PoseNode {
        &mut self.nodes[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Entry in the open priority queue.
///
/// Ordered by smallest total cost first; equal costs pop in insertion order
/// so replanning on identical input reproduces identical trajectories.
#[derive(Clone, Copy, Debug)]
pub struct OpenEntry {
    pub id: NodeId,
    pub cost: f64,
    pub sequence: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.sequence == other.sequence
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for a min-heap on cost, FIFO on ties.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;
    use std::f64::consts::PI;

    #[test]
    fn test_grid_index_is_pure_quantization() {
        let pose = Pose2D::new(1.25, -0.8, 0.45);
        let a = GridIndex::from_pose(&pose, 0.3, 0.2);
        let b = GridIndex::from_pose(&pose, 0.3, 0.2);
        assert_eq!(a, b);
        assert_eq!(a, GridIndex(4, -3, 2));
    }

    #[test]
    fn test_grid_index_quantization_idempotent() {
        // Mapping an index back to a representative pose and re-quantizing
        // must return the same index.
        let (xy_res, phi_res) = (0.3, 0.2);
        for &(x, y, phi) in &[(0.0, 0.0, 0.0), (3.7, -2.2, 1.9), (-5.01, 9.99, -3.0)] {
            let idx = GridIndex::from_pose(&Pose2D::new(x, y, phi), xy_res, phi_res);
            let representative = Pose2D::new(
                (idx.0 as f64 + 0.5) * xy_res,
                (idx.1 as f64 + 0.5) * xy_res,
                (idx.2 as f64 + 0.5) * phi_res,
            );
            assert_eq!(
                GridIndex::from_pose(&representative, xy_res, phi_res),
                idx
            );
        }
    }

    #[test]
    fn test_heading_normalized_before_quantization() {
        let wrapped = Pose2D::new(0.0, 0.0, 2.0 * PI + 0.1);
        let plain = Pose2D::new(0.0, 0.0, 0.1);
        assert_eq!(
            GridIndex::from_pose(&wrapped, 0.3, 0.2),
            GridIndex::from_pose(&plain, 0.3, 0.2)
        );
    }

    #[test]
    fn test_open_entry_fifo_tie_break() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenEntry {
            id: NodeId(0),
            cost: 1.0,
            sequence: 0,
        });
        heap.push(OpenEntry {
            id: NodeId(1),
            cost: 1.0,
            sequence: 1,
        });
        heap.push(OpenEntry {
            id: NodeId(2),
            cost: 0.5,
            sequence: 2,
        });
        assert_eq!(heap.pop().unwrap().id, NodeId(2));
        assert_eq!(heap.pop().unwrap().id, NodeId(0));
        assert_eq!(heap.pop().unwrap().id, NodeId(1));
    }

    #[test]
    fn test_terminal_pose_matches_traversed_tail() {
        let traversed = vec![
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(0.5, 0.0, 0.1),
            Pose2D::new(1.0, 0.1, 0.2),
        ];
        let node = PoseNode::from_traversed(traversed.clone(), 0.3, 0.2);
        assert_eq!(node.pose(), traversed[2]);
        assert_eq!(node.step_count(), 3);
    }
}
