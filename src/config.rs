//! Configuration for the planner.

use crate::error::{PlannerError, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level planner configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
}

/// Vehicle geometry, referenced to the rear-axle center.
#[derive(Clone, Debug, Deserialize)]
pub struct VehicleConfig {
    /// Distance between front and rear axles in meters.
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f64,

    /// Distance from the rear-axle reference to the front bumper (meters).
    #[serde(default = "default_front_edge_to_center")]
    pub front_edge_to_center: f64,

    /// Distance from the rear-axle reference to the rear bumper (meters).
    #[serde(default = "default_back_edge_to_center")]
    pub back_edge_to_center: f64,

    /// Distance from the reference to the left body edge (meters).
    #[serde(default = "default_left_edge_to_center")]
    pub left_edge_to_center: f64,

    /// Distance from the reference to the right body edge (meters).
    #[serde(default = "default_right_edge_to_center")]
    pub right_edge_to_center: f64,

    /// Maximum front-wheel steering angle in radians.
    #[serde(default = "default_max_steer_angle")]
    pub max_steer_angle: f64,
}

impl VehicleConfig {
    /// Overall body length.
    #[inline]
    pub fn length(&self) -> f64 {
        self.front_edge_to_center + self.back_edge_to_center
    }

    /// Overall body width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.left_edge_to_center + self.right_edge_to_center
    }
}

/// Hybrid A* search parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct SearchConfig {
    /// Motion-primitive branching factor. Must be even and at least 4:
    /// the first half of the fan drives forward, the second half reverses.
    #[serde(default = "default_next_node_num")]
    pub next_node_num: usize,

    /// Grid quantization for x/y and for the heuristic cells (meters).
    #[serde(default = "default_xy_grid_resolution")]
    pub xy_grid_resolution: f64,

    /// Grid quantization for heading (radians).
    #[serde(default = "default_phi_grid_resolution")]
    pub phi_grid_resolution: f64,

    /// Integration substep for motion primitives (meters).
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Cost per meter of forward travel.
    #[serde(default = "default_traj_forward_penalty")]
    pub traj_forward_penalty: f64,

    /// Cost per meter of reverse travel.
    #[serde(default = "default_traj_back_penalty")]
    pub traj_back_penalty: f64,

    /// Flat cost for switching between forward and reverse.
    #[serde(default = "default_traj_gear_switch_penalty")]
    pub traj_gear_switch_penalty: f64,

    /// Cost per radian of applied steering.
    #[serde(default = "default_traj_steer_penalty")]
    pub traj_steer_penalty: f64,

    /// Cost per radian of steering change between consecutive edges.
    #[serde(default = "default_traj_steer_change_penalty")]
    pub traj_steer_change_penalty: f64,

    /// Scales the usable fraction of the maximum steering angle.
    #[serde(default = "default_traj_kappa_constraint_ratio")]
    pub traj_kappa_constraint_ratio: f64,

    /// Hard cap on expanded nodes before the search gives up.
    #[serde(default = "default_max_explored_num")]
    pub max_explored_num: usize,

    /// Number of analytic candidates that ends the search early.
    #[serde(default = "default_desired_explored_num")]
    pub desired_explored_num: usize,

    /// Wall-clock budget in seconds; honored once a candidate exists.
    #[serde(default = "default_astar_max_search_time")]
    pub astar_max_search_time: f64,
}

/// Speed-profile generation parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct SpeedConfig {
    /// Time step for speed profiling (seconds).
    #[serde(default = "default_delta_t")]
    pub delta_t: f64,

    /// Use the piecewise-jerk speed optimizer instead of finite differences.
    #[serde(default = "default_use_s_curve_speed_smooth")]
    pub use_s_curve_speed_smooth: bool,

    /// Weight on squared acceleration in the QP objective.
    #[serde(default = "default_acc_weight")]
    pub acc_weight: f64,

    /// Weight on squared jerk in the QP objective.
    #[serde(default = "default_jerk_weight")]
    pub jerk_weight: f64,

    /// Weight on curvature penalties in downstream smoothing.
    #[serde(default = "default_kappa_penalty_weight")]
    pub kappa_penalty_weight: f64,

    /// Weight pulling each knot toward the terminal arc length.
    #[serde(default = "default_ref_s_weight")]
    pub ref_s_weight: f64,

    /// Weight pulling each knot velocity toward the cruise reference.
    #[serde(default = "default_ref_v_weight")]
    pub ref_v_weight: f64,

    /// Speed limit for forward segments (m/s).
    #[serde(default = "default_max_forward_v")]
    pub max_forward_v: f64,

    /// Speed limit for reverse segments (m/s).
    #[serde(default = "default_max_reverse_v")]
    pub max_reverse_v: f64,

    /// Acceleration limit for forward segments (m/s^2).
    #[serde(default = "default_max_forward_acc")]
    pub max_forward_acc: f64,

    /// Acceleration limit for reverse segments (m/s^2).
    #[serde(default = "default_max_reverse_acc")]
    pub max_reverse_acc: f64,

    /// Jerk limit (m/s^3).
    #[serde(default = "default_max_acc_jerk")]
    pub max_acc_jerk: f64,
}

// Vehicle defaults: a compact car referenced to the rear axle.
fn default_wheel_base() -> f64 {
    2.8
}
fn default_front_edge_to_center() -> f64 {
    3.9
}
fn default_back_edge_to_center() -> f64 {
    1.0
}
fn default_left_edge_to_center() -> f64 {
    1.05
}
fn default_right_edge_to_center() -> f64 {
    1.05
}
fn default_max_steer_angle() -> f64 {
    0.5
}

// Search defaults.
fn default_next_node_num() -> usize {
    10
}
fn default_xy_grid_resolution() -> f64 {
    0.3
}
fn default_phi_grid_resolution() -> f64 {
    0.2
}
fn default_step_size() -> f64 {
    0.5
}
fn default_traj_forward_penalty() -> f64 {
    1.0
}
fn default_traj_back_penalty() -> f64 {
    2.0
}
fn default_traj_gear_switch_penalty() -> f64 {
    10.0
}
fn default_traj_steer_penalty() -> f64 {
    1.0
}
fn default_traj_steer_change_penalty() -> f64 {
    2.0
}
fn default_traj_kappa_constraint_ratio() -> f64 {
    1.0
}
fn default_max_explored_num() -> usize {
    10_000
}
fn default_desired_explored_num() -> usize {
    1
}
fn default_astar_max_search_time() -> f64 {
    10.0
}

// Speed defaults.
fn default_delta_t() -> f64 {
    0.5
}
fn default_use_s_curve_speed_smooth() -> bool {
    false
}
fn default_acc_weight() -> f64 {
    1.0
}
fn default_jerk_weight() -> f64 {
    1.0
}
fn default_kappa_penalty_weight() -> f64 {
    100.0
}
fn default_ref_s_weight() -> f64 {
    10.0
}
fn default_ref_v_weight() -> f64 {
    1.0
}
fn default_max_forward_v() -> f64 {
    2.0
}
fn default_max_reverse_v() -> f64 {
    1.0
}
fn default_max_forward_acc() -> f64 {
    2.0
}
fn default_max_reverse_acc() -> f64 {
    1.0
}
fn default_max_acc_jerk() -> f64 {
    4.0
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            wheel_base: default_wheel_base(),
            front_edge_to_center: default_front_edge_to_center(),
            back_edge_to_center: default_back_edge_to_center(),
            left_edge_to_center: default_left_edge_to_center(),
            right_edge_to_center: default_right_edge_to_center(),
            max_steer_angle: default_max_steer_angle(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            next_node_num: default_next_node_num(),
            xy_grid_resolution: default_xy_grid_resolution(),
            phi_grid_resolution: default_phi_grid_resolution(),
            step_size: default_step_size(),
            traj_forward_penalty: default_traj_forward_penalty(),
            traj_back_penalty: default_traj_back_penalty(),
            traj_gear_switch_penalty: default_traj_gear_switch_penalty(),
            traj_steer_penalty: default_traj_steer_penalty(),
            traj_steer_change_penalty: default_traj_steer_change_penalty(),
            traj_kappa_constraint_ratio: default_traj_kappa_constraint_ratio(),
            max_explored_num: default_max_explored_num(),
            desired_explored_num: default_desired_explored_num(),
            astar_max_search_time: default_astar_max_search_time(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            delta_t: default_delta_t(),
            use_s_curve_speed_smooth: default_use_s_curve_speed_smooth(),
            acc_weight: default_acc_weight(),
            jerk_weight: default_jerk_weight(),
            kappa_penalty_weight: default_kappa_penalty_weight(),
            ref_s_weight: default_ref_s_weight(),
            ref_v_weight: default_ref_v_weight(),
            max_forward_v: default_max_forward_v(),
            max_reverse_v: default_max_reverse_v(),
            max_forward_acc: default_max_forward_acc(),
            max_reverse_acc: default_max_reverse_acc(),
            max_acc_jerk: default_max_acc_jerk(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleConfig::default(),
            search: SearchConfig::default(),
            speed: SpeedConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::Config(format!("failed to read config file: {}", e)))?;
        let config: PlannerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.search.next_node_num < 4 || self.search.next_node_num % 2 != 0 {
            return Err(PlannerError::InvalidInput(format!(
                "next_node_num must be even and >= 4, got {}",
                self.search.next_node_num
            )));
        }
        if self.search.xy_grid_resolution <= 0.0
            || self.search.phi_grid_resolution <= 0.0
            || self.search.step_size <= 0.0
        {
            return Err(PlannerError::InvalidInput(
                "grid resolutions and step_size must be positive".to_string(),
            ));
        }
        if self.speed.delta_t <= 0.0 {
            return Err(PlannerError::InvalidInput(
                "delta_t must be positive".to_string(),
            ));
        }
        if self.search.max_explored_num == 0 || self.search.desired_explored_num == 0 {
            return Err(PlannerError::InvalidInput(
                "exploration budgets must be at least 1".to_string(),
            ));
        }
        if self.vehicle.wheel_base <= 0.0 || self.vehicle.max_steer_angle <= 0.0 {
            return Err(PlannerError::InvalidInput(
                "wheel_base and max_steer_angle must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Usable steering limit after the curvature margin is applied.
    #[inline]
    pub fn effective_max_steer(&self) -> f64 {
        self.vehicle.max_steer_angle * self.search.traj_kappa_constraint_ratio
    }

    /// Maximum path curvature the vehicle may command.
    #[inline]
    pub fn max_curvature(&self) -> f64 {
        self.effective_max_steer().tan() / self.vehicle.wheel_base
    }
}
