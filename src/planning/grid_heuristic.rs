//! Holonomic-with-obstacles cost-to-go map.
//!
//! A 2D Dijkstra sweep from the goal cell over an 8-connected grid at the
//! search's xy resolution. The search consults it as its heuristic: it
//! estimates the remaining travel distance around obstacles while ignoring
//! heading and curvature limits.

use crate::geometry::{segment_intersects_aabb, Point2D, Segment2D, Workspace};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Cost-to-goal map over 2D grid cells.
pub struct GridHeuristic {
    xy_resolution: f64,
    cost_map: HashMap<(i32, i32), f64>,
}

/// Heap entry for the Dijkstra sweep: min-cost first, FIFO on ties.
#[derive(Clone, Copy, Debug)]
struct CellEntry {
    cell: (i32, i32),
    cost: f64,
    sequence: u64,
}

impl PartialEq for CellEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.sequence == other.sequence
    }
}

impl Eq for CellEntry {}

impl Ord for CellEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for CellEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl GridHeuristic {
    /// Build the cost-to-go map keyed at `goal`.
    ///
    /// Cells whose footprint intersects any obstacle segment are blocked;
    /// cells the sweep never reaches stay at infinite cost.
    pub fn generate(
        goal: Point2D,
        workspace: &Workspace,
        obstacle_segments: &[Segment2D],
        xy_resolution: f64,
    ) -> Self {
        let cell_range = CellRange::covering(workspace, xy_resolution);
        let blocked = blocked_cells(obstacle_segments, &cell_range, xy_resolution);

        let goal_cell = cell_of(goal.x, goal.y, xy_resolution);
        let mut cost_map: HashMap<(i32, i32), f64> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let mut sequence = 0_u64;

        if cell_range.contains(goal_cell) && !blocked.contains(&goal_cell) {
            cost_map.insert(goal_cell, 0.0);
            heap.push(CellEntry {
                cell: goal_cell,
                cost: 0.0,
                sequence,
            });
        }

        let straight = xy_resolution;
        let diagonal = SQRT_2 * xy_resolution;
        let neighbors = [
            (1, 0, straight),
            (-1, 0, straight),
            (0, 1, straight),
            (0, -1, straight),
            (1, 1, diagonal),
            (1, -1, diagonal),
            (-1, 1, diagonal),
            (-1, -1, diagonal),
        ];

        while let Some(entry) = heap.pop() {
            // Stale heap entries are superseded reinsertions.
            if entry.cost > *cost_map.get(&entry.cell).unwrap_or(&f64::INFINITY) {
                continue;
            }

            for &(dx, dy, step_cost) in &neighbors {
                let next = (entry.cell.0 + dx, entry.cell.1 + dy);
                if !cell_range.contains(next) || blocked.contains(&next) {
                    continue;
                }
                let next_cost = entry.cost + step_cost;
                if next_cost < *cost_map.get(&next).unwrap_or(&f64::INFINITY) {
                    cost_map.insert(next, next_cost);
                    sequence += 1;
                    heap.push(CellEntry {
                        cell: next,
                        cost: next_cost,
                        sequence,
                    });
                }
            }
        }

        Self {
            xy_resolution,
            cost_map,
        }
    }

    /// Cost-to-goal of the cell containing `(x, y)`.
    ///
    /// Returns infinity for cells outside the swept region or unreachable
    /// from the goal.
    pub fn lookup(&self, x: f64, y: f64) -> f64 {
        let cell = cell_of(x, y, self.xy_resolution);
        *self.cost_map.get(&cell).unwrap_or(&f64::INFINITY)
    }
}

#[inline]
fn cell_of(x: f64, y: f64, xy_resolution: f64) -> (i32, i32) {
    (
        (x / xy_resolution).floor() as i32,
        (y / xy_resolution).floor() as i32,
    )
}

/// Inclusive cell index range covering the workspace.
struct CellRange {
    gx_min: i32,
    gx_max: i32,
    gy_min: i32,
    gy_max: i32,
}

impl CellRange {
    fn covering(workspace: &Workspace, xy_resolution: f64) -> Self {
        Self {
            gx_min: (workspace.x_min / xy_resolution).floor() as i32,
            gx_max: (workspace.x_max / xy_resolution).floor() as i32,
            gy_min: (workspace.y_min / xy_resolution).floor() as i32,
            gy_max: (workspace.y_max / xy_resolution).floor() as i32,
        }
    }

    #[inline]
    fn contains(&self, cell: (i32, i32)) -> bool {
        cell.0 >= self.gx_min
            && cell.0 <= self.gx_max
            && cell.1 >= self.gy_min
            && cell.1 <= self.gy_max
    }
}

/// Mark every cell whose square footprint touches an obstacle segment.
///
/// Walks each segment's cell-aligned bounding box rather than testing the
/// whole grid against every segment.
fn blocked_cells(
    segments: &[Segment2D],
    cell_range: &CellRange,
    xy_resolution: f64,
) -> HashSet<(i32, i32)> {
    let mut blocked = HashSet::new();

    for segment in segments {
        let (sx, sy) = (segment.start.x, segment.start.y);
        let (ex, ey) = (segment.end.x, segment.end.y);
        let gx_lo = (sx.min(ex) / xy_resolution).floor() as i32;
        let gx_hi = (sx.max(ex) / xy_resolution).floor() as i32;
        let gy_lo = (sy.min(ey) / xy_resolution).floor() as i32;
        let gy_hi = (sy.max(ey) / xy_resolution).floor() as i32;

        for gx in gx_lo..=gx_hi {
            for gy in gy_lo..=gy_hi {
                if !cell_range.contains((gx, gy)) || blocked.contains(&(gx, gy)) {
                    continue;
                }
                let min = Point2D::new(gx as f64 * xy_resolution, gy as f64 * xy_resolution);
                let max = Point2D::new(min.x + xy_resolution, min.y + xy_resolution);
                if segment_intersects_aabb(segment.start, segment.end, min, max) {
                    blocked.insert((gx, gy));
                }
            }
        }
    }

    blocked
}
