//! Shortest Reeds–Shepp curves between planar poses.
//!
//! A Reeds–Shepp curve is the shortest path between two poses for a vehicle
//! of bounded turning radius that may drive forward and backward. The
//! generator enumerates the twelve base curve families together with their
//! timeflip and reflect variants, keeps the admissible candidates, and
//! densely samples the winner at the planner's step size.
//!
//! The search uses this as its analytic expansion: it only ever asks for
//! the shortest curve from a node to the goal and collision-checks the
//! sampled sequence.

use crate::geometry::{normalize_angle, Pose2D};
use std::f64::consts::{FRAC_PI_2, PI};

/// Steering mode of one curve segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsSegmentType {
    Left,
    Straight,
    Right,
}

use RsSegmentType::{Left, Right, Straight};

/// A densely sampled Reeds–Shepp curve.
#[derive(Clone, Debug)]
pub struct RsPath {
    /// Sampled poses from the query start (inclusive) to the goal.
    pub poses: Vec<Pose2D>,
    /// Per-sample gear: true = forward.
    pub gears: Vec<bool>,
    /// Segment steering modes of the winning candidate.
    pub segment_types: Vec<RsSegmentType>,
    /// Signed segment lengths in meters (negative = reverse).
    pub segment_lengths: Vec<f64>,
    /// Total curve length in meters; the analytic-expansion edge cost.
    pub cost: f64,
}

/// Candidate curve in curvature-scaled units.
#[derive(Clone, Debug)]
struct RsCandidate {
    lengths: Vec<f64>,
    types: Vec<RsSegmentType>,
    total: f64,
}

/// Shortest-curve generator for a fixed maximum curvature.
#[derive(Clone, Debug)]
pub struct ReedsShepp {
    max_curvature: f64,
    step_size: f64,
    /// Best-effort request that the selected curve end with a straight
    /// segment.
    pub last_straight: bool,
}

impl ReedsShepp {
    pub fn new(max_curvature: f64, step_size: f64) -> Self {
        Self {
            max_curvature,
            step_size,
            last_straight: false,
        }
    }

    /// Shortest Reeds–Shepp curve from `from` to `to`.
    ///
    /// Returns `None` when no family admits the displacement (in practice
    /// only for degenerate queries shorter than the sampling step).
    pub fn shortest_path(&self, from: &Pose2D, to: &Pose2D) -> Option<RsPath> {
        let candidates = self.candidates(from, to);
        if candidates.is_empty() {
            return None;
        }

        let shortest = |paths: &[&RsCandidate]| -> Option<RsCandidate> {
            paths
                .iter()
                .min_by(|a, b| {
                    a.total
                        .partial_cmp(&b.total)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|c| (*c).clone())
        };

        let best = if self.last_straight {
            let straight_tailed: Vec<&RsCandidate> = candidates
                .iter()
                .filter(|c| c.types.last() == Some(&Straight))
                .collect();
            match shortest(&straight_tailed) {
                Some(candidate) => candidate,
                None => shortest(&candidates.iter().collect::<Vec<_>>())?,
            }
        } else {
            shortest(&candidates.iter().collect::<Vec<_>>())?
        };

        Some(self.sample(from, &best))
    }

    /// All admissible candidates, in curvature-scaled units.
    fn candidates(&self, from: &Pose2D, to: &Pose2D) -> Vec<RsCandidate> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let dphi = normalize_angle(to.phi - from.phi);
        let (sin_s, cos_s) = from.phi.sin_cos();

        // Displacement in the start frame, scaled to unit turning radius.
        let x = (cos_s * dx + sin_s * dy) * self.max_curvature;
        let y = (-sin_s * dx + cos_s * dy) * self.max_curvature;
        let scaled_step = self.step_size * self.max_curvature;

        let families: &[fn(f64, f64, f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)>] = &[
            left_straight_left,
            left_straight_right,
            left_turn_right_turn_left,
            left_turn_right_left,
            left_right_turn_left,
            left_right_turn_left_right,
            left_turn_right_left_turn_right,
            left_turn_right90_straight_left,
            left_turn_right90_straight_right,
            left_straight_right90_turn_left,
            left_straight_left90_turn_right,
            left_turn_right90_straight_left90_turn_right,
        ];

        let mut candidates: Vec<RsCandidate> = Vec::new();
        for family in families {
            // Base, timeflip, reflect, and both together.
            if let Some((lengths, types)) = family(x, y, dphi) {
                push_candidate(&mut candidates, lengths, types, scaled_step);
            }
            if let Some((lengths, types)) = family(-x, y, -dphi) {
                push_candidate(&mut candidates, timeflip(lengths), types, scaled_step);
            }
            if let Some((lengths, types)) = family(x, -y, -dphi) {
                push_candidate(&mut candidates, lengths, reflect(types), scaled_step);
            }
            if let Some((lengths, types)) = family(-x, -y, dphi) {
                push_candidate(&mut candidates, timeflip(lengths), reflect(types), scaled_step);
            }
        }

        candidates
    }

    /// Sample a candidate into a dense pose sequence in world coordinates.
    fn sample(&self, from: &Pose2D, candidate: &RsCandidate) -> RsPath {
        let scaled_step = self.step_size * self.max_curvature;
        let first_gear = candidate
            .lengths
            .iter()
            .find(|l| l.abs() > NEGLIGIBLE_SEGMENT)
            .map_or(true, |&l| l > 0.0);
        let mut local = vec![(0.0_f64, 0.0_f64, 0.0_f64)];
        let mut gears = vec![first_gear];

        let mut origin = (0.0_f64, 0.0_f64, 0.0_f64);
        for (&length, &mode) in candidate.lengths.iter().zip(&candidate.types) {
            if length.abs() <= NEGLIGIBLE_SEGMENT {
                continue;
            }
            let forward = length > 0.0;
            let increment = if forward { scaled_step } else { -scaled_step };

            let mut dist = increment;
            while dist.abs() < length.abs() {
                local.push(interpolate(dist, mode, self.max_curvature, origin));
                gears.push(forward);
                dist += increment;
            }
            let end = interpolate(length, mode, self.max_curvature, origin);
            local.push(end);
            gears.push(forward);
            origin = end;
        }

        // Rotate the local course into the world frame.
        let (sin_s, cos_s) = from.phi.sin_cos();
        let poses = local
            .iter()
            .map(|&(lx, ly, lyaw)| {
                Pose2D::new(
                    cos_s * lx - sin_s * ly + from.x,
                    sin_s * lx + cos_s * ly + from.y,
                    normalize_angle(lyaw + from.phi),
                )
            })
            .collect();

        RsPath {
            poses,
            gears,
            segment_types: candidate.types.clone(),
            segment_lengths: candidate
                .lengths
                .iter()
                .map(|l| l / self.max_curvature)
                .collect(),
            cost: candidate.total / self.max_curvature,
        }
    }
}

/// One sampling step along a segment, in the local frame of the curve.
///
/// `dist` is the signed curvature-scaled arc position within the segment;
/// `origin` is the segment's starting configuration.
fn interpolate(dist: f64, mode: RsSegmentType, max_curvature: f64, origin: (f64, f64, f64)) -> (f64, f64, f64) {
    let (ox, oy, oyaw) = origin;
    let (ldx, ldy, yaw) = match mode {
        Straight => (
            dist / max_curvature * oyaw.cos(),
            dist / max_curvature * oyaw.sin(),
            oyaw,
        ),
        Left => (dist.sin() / max_curvature, (1.0 - dist.cos()) / max_curvature, oyaw + dist),
        Right => (
            dist.sin() / max_curvature,
            (1.0 - dist.cos()) / -max_curvature,
            oyaw - dist,
        ),
    };

    match mode {
        Straight => (ox + ldx, oy + ldy, yaw),
        Left | Right => {
            // Rotate the arc displacement out of the segment frame.
            let (sin_o, cos_o) = (-oyaw).sin_cos();
            (ox + cos_o * ldx + sin_o * ldy, oy - sin_o * ldx + cos_o * ldy, yaw)
        }
    }
}

fn timeflip(lengths: Vec<f64>) -> Vec<f64> {
    lengths.iter().map(|l| -l).collect()
}

fn reflect(types: Vec<RsSegmentType>) -> Vec<RsSegmentType> {
    types
        .iter()
        .map(|t| match t {
            Left => Right,
            Right => Left,
            Straight => Straight,
        })
        .collect()
}

/// Curvature-scaled length below which a segment is treated as absent.
const NEGLIGIBLE_SEGMENT: f64 = 1e-9;

/// Keep a candidate unless it is degenerate or duplicates a kept one.
///
/// Zero-length segments (a family collapsing to a simpler shape, e.g. LSL
/// with no final arc) are dropped so the stored segment list is canonical.
fn push_candidate(
    candidates: &mut Vec<RsCandidate>,
    lengths: Vec<f64>,
    types: Vec<RsSegmentType>,
    scaled_step: f64,
) {
    let (lengths, types): (Vec<f64>, Vec<RsSegmentType>) = lengths
        .into_iter()
        .zip(types)
        .filter(|(l, _)| l.abs() > NEGLIGIBLE_SEGMENT)
        .unzip();

    let total: f64 = lengths.iter().map(|l| l.abs()).sum();
    if total <= scaled_step {
        return;
    }

    for existing in candidates.iter() {
        if existing.types == types && (existing.total - total).abs() <= scaled_step {
            return;
        }
    }

    candidates.push(RsCandidate {
        lengths,
        types,
        total,
    });
}

#[inline]
fn polar(x: f64, y: f64) -> (f64, f64) {
    (x.hypot(y), y.atan2(x))
}

/// Wrap to `[-pi, pi)` the way the curve formulas expect.
#[inline]
fn mod2pi(angle: f64) -> f64 {
    let v = angle % (2.0 * PI);
    if v < -PI {
        v + 2.0 * PI
    } else if v > PI {
        v - 2.0 * PI
    } else {
        v
    }
}

// The twelve base families. Each takes the goal displacement `(x, y, phi)`
// in the start frame at unit turning radius and returns segment lengths
// (signed, curvature-scaled) and steering modes, or `None` when the family
// does not admit the displacement.

fn left_straight_left(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u, t) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if (0.0..=PI).contains(&t) {
        let v = mod2pi(phi - t);
        if (0.0..=PI).contains(&v) {
            return Some((vec![t, u, v], vec![Left, Straight, Left]));
        }
    }
    None
}

fn left_straight_right(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, t1) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    let u1_sq = u1 * u1;
    if u1_sq >= 4.0 {
        let u = (u1_sq - 4.0).sqrt();
        let theta = 2.0_f64.atan2(u);
        let t = mod2pi(t1 + theta);
        let v = mod2pi(t - phi);
        if t >= 0.0 && v >= 0.0 {
            return Some((vec![t, u, v], vec![Left, Straight, Right]));
        }
    }
    None
}

fn left_turn_right_turn_left(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if u1 <= 4.0 {
        let a = (0.25 * u1).acos();
        let t = mod2pi(a + theta + FRAC_PI_2);
        let u = mod2pi(PI - 2.0 * a);
        let v = mod2pi(phi - t - u);
        return Some((vec![t, -u, v], vec![Left, Right, Left]));
    }
    None
}

fn left_turn_right_left(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if u1 <= 4.0 {
        let a = (0.25 * u1).acos();
        let t = mod2pi(a + theta + FRAC_PI_2);
        let u = mod2pi(PI - 2.0 * a);
        let v = mod2pi(-phi + t + u);
        return Some((vec![t, -u, -v], vec![Left, Right, Left]));
    }
    None
}

fn left_right_turn_left(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if u1 <= 4.0 {
        let u = (1.0 - u1 * u1 * 0.125).acos();
        if !u.is_finite() {
            return None;
        }
        let a = (2.0 * u.sin() / u1).asin();
        if !a.is_finite() {
            return None;
        }
        let t = mod2pi(-a + theta + FRAC_PI_2);
        let v = mod2pi(t - u - phi);
        return Some((vec![t, u, -v], vec![Left, Right, Left]));
    }
    None
}

fn left_right_turn_left_right(x: f64, y: f64, phi: f64) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    if u1 <= 2.0 {
        let a = ((u1 + 2.0) * 0.25).acos();
        let t = mod2pi(theta + a + FRAC_PI_2);
        let u = mod2pi(a);
        let v = mod2pi(phi - t + 2.0 * u);
        if t >= 0.0 && u >= 0.0 && v >= 0.0 {
            return Some((vec![t, u, -u, -v], vec![Left, Right, Left, Right]));
        }
    }
    None
}

fn left_turn_right_left_turn_right(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    let u2 = (20.0 - u1 * u1) / 16.0;
    if (0.0..=1.0).contains(&u2) {
        let u = u2.acos();
        let a = (2.0 * u.sin() / u1).asin();
        if !a.is_finite() {
            return None;
        }
        let t = mod2pi(theta + a + FRAC_PI_2);
        let v = mod2pi(t - phi);
        if t >= 0.0 && v >= 0.0 {
            return Some((vec![t, -u, -u, v], vec![Left, Right, Left, Right]));
        }
    }
    None
}

fn left_turn_right90_straight_left(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if u1 >= 2.0 {
        let u = (u1 * u1 - 4.0).sqrt() - 2.0;
        let a = 2.0_f64.atan2((u1 * u1 - 4.0).sqrt());
        let t = mod2pi(theta + a + FRAC_PI_2);
        let v = mod2pi(t - phi + FRAC_PI_2);
        if t >= 0.0 && v >= 0.0 {
            return Some((
                vec![t, -FRAC_PI_2, -u, -v],
                vec![Left, Right, Straight, Left],
            ));
        }
    }
    None
}

fn left_turn_right90_straight_right(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    if u1 >= 2.0 {
        let t = mod2pi(theta + FRAC_PI_2);
        let u = u1 - 2.0;
        let v = mod2pi(phi - t - FRAC_PI_2);
        if t >= 0.0 && v >= 0.0 {
            return Some((
                vec![t, -FRAC_PI_2, -u, -v],
                vec![Left, Right, Straight, Right],
            ));
        }
    }
    None
}

fn left_straight_right90_turn_left(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x - phi.sin(), y - 1.0 + phi.cos());
    if u1 >= 2.0 {
        let u = (u1 * u1 - 4.0).sqrt() - 2.0;
        let a = (u1 * u1 - 4.0).sqrt().atan2(2.0);
        let t = mod2pi(theta - a + FRAC_PI_2);
        let v = mod2pi(t - phi - FRAC_PI_2);
        if t >= 0.0 && v >= 0.0 {
            return Some((
                vec![t, u, FRAC_PI_2, -v],
                vec![Left, Straight, Right, Left],
            ));
        }
    }
    None
}

fn left_straight_left90_turn_right(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    if u1 >= 2.0 {
        let t = mod2pi(theta);
        let u = u1 - 2.0;
        let v = mod2pi(phi - t - FRAC_PI_2);
        if t >= 0.0 && v >= 0.0 {
            return Some((
                vec![t, u, FRAC_PI_2, -v],
                vec![Left, Straight, Left, Right],
            ));
        }
    }
    None
}

fn left_turn_right90_straight_left90_turn_right(
    x: f64,
    y: f64,
    phi: f64,
) -> Option<(Vec<f64>, Vec<RsSegmentType>)> {
    let (u1, theta) = polar(x + phi.sin(), y - 1.0 - phi.cos());
    if u1 >= 4.0 {
        let u = (u1 * u1 - 4.0).sqrt() - 4.0;
        let a = 2.0_f64.atan2((u1 * u1 - 4.0).sqrt());
        let t = mod2pi(theta + a + FRAC_PI_2);
        let v = mod2pi(t - phi);
        if t >= 0.0 && v >= 0.0 {
            return Some((
                vec![t, -FRAC_PI_2, -u, -FRAC_PI_2, v],
                vec![Left, Right, Straight, Left, Right],
            ));
        }
    }
    None
}
