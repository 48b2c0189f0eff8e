//! Temporal profiling of assembled geometric paths.
//!
//! The stitched search path is partitioned at gear transitions; every
//! segment then gets its own speed profile, either by finite differences
//! or by the piecewise-jerk speed optimizer, and the segments are stitched
//! back together.

use super::piecewise_jerk::PiecewiseJerkSpeedProblem;
use super::sampling::{DiscretizedPath, SpeedData};
use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::geometry::normalize_angle;
use crate::trajectory::CoarseTrajectory;
use std::f64::consts::FRAC_PI_2;

/// Dense output spacing of the optimized profile, seconds.
const DENSE_TIME_RESOLUTION: f64 = 0.5;

/// Duplicate-s guard when reading the optimizer output.
const S_EPSILON: f64 = 1e-6;

/// Produces the temporal profile for a geometric trajectory.
pub struct SpeedProfiler {
    delta_t: f64,
    use_s_curve: bool,
    wheel_base: f64,
    step_size: f64,
    acc_weight: f64,
    jerk_weight: f64,
    ref_s_weight: f64,
    ref_v_weight: f64,
    max_forward_v: f64,
    max_reverse_v: f64,
    max_forward_acc: f64,
    max_reverse_acc: f64,
    max_acc_jerk: f64,
}

impl SpeedProfiler {
    pub fn new(config: &PlannerConfig) -> Self {
        let speed = &config.speed;
        Self {
            delta_t: speed.delta_t,
            use_s_curve: speed.use_s_curve_speed_smooth,
            wheel_base: config.vehicle.wheel_base,
            step_size: config.search.step_size,
            acc_weight: speed.acc_weight,
            jerk_weight: speed.jerk_weight,
            ref_s_weight: speed.ref_s_weight,
            ref_v_weight: speed.ref_v_weight,
            max_forward_v: speed.max_forward_v,
            max_reverse_v: speed.max_reverse_v,
            max_forward_acc: speed.max_forward_acc,
            max_reverse_acc: speed.max_reverse_acc,
            max_acc_jerk: speed.max_acc_jerk,
        }
    }

    /// Partition, profile each segment, stitch, and restore the global
    /// arc-length column.
    pub fn temporal_profile(&self, geometry: &CoarseTrajectory) -> Result<CoarseTrajectory> {
        let mut segments = partition_at_gear_switches(geometry)?;
        tracing::debug!(segments = segments.len(), "trajectory partitioned");

        for segment in &mut segments {
            if self.use_s_curve {
                self.generate_s_curve_profile(segment)?;
            } else {
                self.generate_speed_acceleration(segment)?;
            }
        }

        let mut stitched = stitch_segments(&segments)?;
        stitched.recompute_accumulated_s();
        stitched.check_invariants()?;
        Ok(stitched)
    }

    /// Finite-difference profile: zero endpoint velocities, sign-aware
    /// interior speeds from the heading-projected position differences.
    fn generate_speed_acceleration(&self, segment: &mut CoarseTrajectory) -> Result<()> {
        let n = segment.x.len();
        if n < 2 || segment.y.len() != n || segment.phi.len() != n {
            return Err(PlannerError::AssemblyInvariantViolated(format!(
                "segment too short or inconsistent for speed generation: {} points",
                n
            )));
        }
        let dt = self.delta_t;

        segment.v.clear();
        segment.v.push(0.0);
        for i in 1..n - 1 {
            let (sin_phi, cos_phi) = segment.phi[i].sin_cos();
            let discrete_v = (((segment.x[i + 1] - segment.x[i]) / dt) * cos_phi
                + ((segment.x[i] - segment.x[i - 1]) / dt) * cos_phi)
                / 2.0
                + (((segment.y[i + 1] - segment.y[i]) / dt) * sin_phi
                    + ((segment.y[i] - segment.y[i - 1]) / dt) * sin_phi)
                    / 2.0;
            segment.v.push(discrete_v);
        }
        segment.v.push(0.0);

        segment.a.clear();
        for i in 0..n - 1 {
            segment.a.push((segment.v[i + 1] - segment.v[i]) / dt);
        }

        segment.steer.clear();
        for i in 0..n - 1 {
            let ratio = normalize_angle(segment.phi[i + 1] - segment.phi[i]) * self.wheel_base
                / self.step_size;
            let steer = if segment.v[i] > 0.0 {
                ratio.atan()
            } else {
                (-ratio).atan()
            };
            segment.steer.push(steer);
        }
        Ok(())
    }

    /// Optimized profile: solve the piecewise-jerk speed QP over the
    /// segment arc length, then resample densely and evaluate the geometry
    /// by arc length.
    fn generate_s_curve_profile(&self, segment: &mut CoarseTrajectory) -> Result<()> {
        let n = segment.x.len();
        if n < 2 || segment.y.len() != n || segment.phi.len() != n {
            return Err(PlannerError::AssemblyInvariantViolated(format!(
                "segment too short or inconsistent for speed smoothing: {} points",
                n
            )));
        }

        // Gear of the whole segment, from the first tracking vector.
        let init_heading = segment.phi[0];
        let tracking_angle =
            (segment.y[1] - segment.y[0]).atan2(segment.x[1] - segment.x[0]);
        let gear = normalize_angle(tracking_angle - init_heading).abs() < FRAC_PI_2;

        // Per-segment arc length.
        let mut accumulated_s = Vec::with_capacity(n);
        let mut s = 0.0;
        let mut last = (segment.x[0], segment.y[0]);
        for i in 0..n {
            s += (segment.x[i] - last.0).hypot(segment.y[i] - last.1);
            accumulated_s.push(s);
            last = (segment.x[i], segment.y[i]);
        }
        let path_length = s;

        let (max_v, max_acc) = if gear {
            (self.max_forward_v, self.max_forward_acc)
        } else {
            (self.max_reverse_v, self.max_reverse_acc)
        };

        // Static initial state; time horizon generous enough to reach the
        // far end at cruise speed, never under ten seconds.
        let init_v = 0.0_f64;
        let init_a = 0.0_f64;
        let total_t = (1.5 * (max_v * max_v + path_length * max_acc) / (max_acc * max_v)).max(10.0);
        let knots_estimate = total_t / self.delta_t;
        if !knots_estimate.is_finite() || knots_estimate >= usize::MAX as f64 {
            return Err(PlannerError::NumericOverflow(format!(
                "knot count overflow: total_t {} delta_t {}",
                total_t, self.delta_t
            )));
        }
        let num_knots = knots_estimate as usize + 1;

        let mut problem = PiecewiseJerkSpeedProblem::new(
            num_knots,
            self.delta_t,
            [0.0, init_v.abs(), init_a.abs()],
        );

        let upper_dx = max_v.max(init_v.abs());
        let mut x_bounds = vec![(0.0, path_length); num_knots];
        let mut dx_bounds = vec![(0.0, upper_dx); num_knots];
        let mut ddx_bounds = vec![(-max_acc, max_acc); num_knots];
        x_bounds[num_knots - 1] = (path_length, path_length);
        dx_bounds[num_knots - 1] = (0.0, 0.0);
        ddx_bounds[num_knots - 1] = (0.0, 0.0);
        problem.set_x_bounds(x_bounds);
        problem.set_dx_bounds(dx_bounds);
        problem.set_ddx_bounds(ddx_bounds);
        problem.set_dddx_bound(self.max_acc_jerk);
        problem.set_x_ref(self.ref_s_weight, vec![path_length; num_knots]);
        problem.set_dx_ref(self.ref_v_weight, max_v * 0.8);
        problem.set_weight_ddx(self.acc_weight);
        problem.set_weight_dddx(self.jerk_weight);

        let solution = problem.optimize().ok_or_else(|| {
            PlannerError::OptimizerFailure(format!(
                "piecewise-jerk speed optimization did not converge ({} knots, s_end {:.3})",
                num_knots, path_length
            ))
        })?;

        // Read the knots into a speed table, guarding against duplicate or
        // regressing arc positions.
        let mut speed_data = SpeedData::new();
        speed_data.append(solution.s[0], 0.0, solution.ds[0], solution.dds[0], 0.0);
        for i in 1..num_knots {
            if solution.s[i - 1] - solution.s[i] > S_EPSILON {
                tracing::debug!(
                    knot = i,
                    "unexpected decreasing s in speed smoothing"
                );
                break;
            }
            speed_data.append(
                solution.s[i],
                self.delta_t * i as f64,
                solution.ds[i],
                solution.dds[i],
                (solution.dds[i] - solution.dds[i - 1]) / self.delta_t,
            );
            if path_length - solution.s[i] < S_EPSILON {
                break;
            }
        }

        let path_data = DiscretizedPath::new(&segment.x, &segment.y, &segment.phi, &accumulated_s);
        if path_data.is_empty() {
            return Err(PlannerError::AssemblyInvariantViolated(
                "empty path data in speed smoothing".to_string(),
            ));
        }

        // Dense resample over time, then evaluate the geometry by arc
        // length; signs follow the segment gear.
        let mut profiled = CoarseTrajectory::default();
        let time_horizon = speed_data.total_time() + DENSE_TIME_RESOLUTION * 1.0e-6;
        let mut relative_time = 0.0;
        while relative_time < time_horizon {
            let speed_point = speed_data.evaluate_by_time(relative_time).ok_or_else(|| {
                PlannerError::OptimizerFailure(format!(
                    "failed to evaluate speed profile at t {:.3}",
                    relative_time
                ))
            })?;
            if speed_point.s > path_data.length() {
                break;
            }
            let path_point = path_data.evaluate(speed_point.s);
            profiled.x.push(path_point.x);
            profiled.y.push(path_point.y);
            profiled.phi.push(path_point.phi);
            profiled.accumulated_s.push(path_point.s);
            if gear {
                profiled.v.push(speed_point.v);
                profiled.a.push(speed_point.a);
            } else {
                profiled.v.push(-speed_point.v);
                profiled.a.push(-speed_point.a);
            }
            relative_time += DENSE_TIME_RESOLUTION;
        }
        if profiled.x.len() < 2 {
            return Err(PlannerError::OptimizerFailure(
                "speed smoothing produced a degenerate profile".to_string(),
            ));
        }

        // The dense grid may stop short of the terminal knot; the segment
        // must still end at rest on its final pose.
        if path_length - profiled.accumulated_s.last().unwrap() > S_EPSILON {
            let terminal = path_data.evaluate(path_length);
            profiled.x.push(terminal.x);
            profiled.y.push(terminal.y);
            profiled.phi.push(terminal.phi);
            profiled.accumulated_s.push(terminal.s);
            profiled.v.push(0.0);
            profiled.a.push(0.0);
        }
        *profiled.v.first_mut().unwrap() = 0.0;
        *profiled.v.last_mut().unwrap() = 0.0;
        profiled.a.pop();

        // Steering from resampled headings and arc-length increments.
        let point_count = profiled.x.len();
        for i in 0..point_count - 1 {
            let ds = profiled.accumulated_s[i + 1] - profiled.accumulated_s[i];
            let steer = if ds.abs() < 1e-9 {
                0.0
            } else {
                let ratio = normalize_angle(profiled.phi[i + 1] - profiled.phi[i])
                    * self.wheel_base
                    / ds;
                if gear {
                    ratio.atan()
                } else {
                    (-ratio).atan()
                }
            };
            profiled.steer.push(steer);
        }

        *segment = profiled;
        Ok(())
    }
}

/// Split a geometric trajectory at every gear transition.
///
/// The transition pose closes one segment and opens the next, so it appears
/// on both sides of the cut.
pub fn partition_at_gear_switches(
    trajectory: &CoarseTrajectory,
) -> Result<Vec<CoarseTrajectory>> {
    let x = &trajectory.x;
    let y = &trajectory.y;
    let phi = &trajectory.phi;
    let horizon = x.len();
    if horizon < 2 || y.len() != horizon || phi.len() != horizon {
        return Err(PlannerError::AssemblyInvariantViolated(format!(
            "cannot partition trajectory with {} points",
            horizon
        )));
    }

    let mut segments = vec![CoarseTrajectory::default()];

    let mut current_gear = {
        let tracking_angle = (y[1] - y[0]).atan2(x[1] - x[0]);
        normalize_angle(tracking_angle - phi[0]).abs() < FRAC_PI_2
    };

    for i in 0..horizon - 1 {
        let tracking_angle = (y[i + 1] - y[i]).atan2(x[i + 1] - x[i]);
        let gear = normalize_angle(tracking_angle - phi[i]).abs() < FRAC_PI_2;
        if gear != current_gear {
            let segment = segments.last_mut().expect("at least one segment");
            segment.x.push(x[i]);
            segment.y.push(y[i]);
            segment.phi.push(phi[i]);
            segments.push(CoarseTrajectory::default());
            current_gear = gear;
        }
        let segment = segments.last_mut().expect("at least one segment");
        segment.x.push(x[i]);
        segment.y.push(y[i]);
        segment.phi.push(phi[i]);
    }
    let segment = segments.last_mut().expect("at least one segment");
    segment.x.push(x[horizon - 1]);
    segment.y.push(y[horizon - 1]);
    segment.phi.push(phi[horizon - 1]);

    Ok(segments)
}

/// Concatenate profiled segments, dropping the duplicated boundary state of
/// every segment except the last. Controls concatenate in full, restoring
/// the one-fewer-controls-than-states invariant.
pub fn stitch_segments(segments: &[CoarseTrajectory]) -> Result<CoarseTrajectory> {
    let last_segment = segments
        .last()
        .ok_or_else(|| PlannerError::AssemblyInvariantViolated("no segments".to_string()))?;

    let mut stitched = CoarseTrajectory::default();
    for segment in segments {
        if segment.x.is_empty() {
            return Err(PlannerError::AssemblyInvariantViolated(
                "empty segment while stitching".to_string(),
            ));
        }
        let keep = segment.x.len() - 1;
        stitched.x.extend_from_slice(&segment.x[..keep]);
        stitched.y.extend_from_slice(&segment.y[..keep]);
        stitched.phi.extend_from_slice(&segment.phi[..keep]);
        stitched.v.extend_from_slice(&segment.v[..keep]);
        stitched.a.extend_from_slice(&segment.a);
        stitched.steer.extend_from_slice(&segment.steer);
    }
    stitched.x.push(*last_segment.x.last().unwrap());
    stitched.y.push(*last_segment.y.last().unwrap());
    stitched.phi.push(*last_segment.phi.last().unwrap());
    stitched
        .v
        .push(*last_segment.v.last().ok_or_else(|| {
            PlannerError::AssemblyInvariantViolated("segment missing velocities".to_string())
        })?);

    Ok(stitched)
}
