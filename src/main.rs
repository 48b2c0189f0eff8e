//! Sarathi demo runner.
//!
//! Plans a single coarse trajectory for a scenario described in a TOML
//! file and prints a short summary. With no arguments a built-in pull-over
//! scenario is used.
//!
//! ```text
//! sarathi [scenario.toml]
//! ```

use sarathi::error::{PlannerError, Result};
use sarathi::{HybridAStarPlanner, PlannerConfig, Point2D, Pose2D, Workspace};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// A self-contained planning scenario.
#[derive(Debug, Deserialize)]
struct Scenario {
    /// Start pose `[x, y, phi]`.
    start: [f64; 3],
    /// Goal pose `[x, y, phi]`.
    goal: [f64; 3],
    /// Workspace `[x_min, x_max, y_min, y_max]`.
    workspace: [f64; 4],
    /// Obstacle polylines as vertex lists.
    #[serde(default)]
    obstacles: Vec<Vec<[f64; 2]>>,
    /// Forward the last-straight request to the shortcut generator.
    #[serde(default)]
    reeds_shepp_last_straight: bool,
    /// Planner configuration overrides.
    #[serde(default)]
    planner: PlannerConfig,
}

impl Scenario {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::Config(format!("failed to read scenario file: {}", e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// A pull-over next to two parked vehicles.
    fn builtin() -> Self {
        Self {
            start: [-8.0, 4.0, 0.0],
            goal: [0.0, 0.0, 0.0],
            workspace: [-16.0, 16.0, -2.0, 10.0],
            obstacles: vec![
                vec![[-10.0, -1.0], [-10.0, 1.0], [-4.5, 1.0], [-4.5, -1.0]],
                vec![[4.5, -1.0], [4.5, 1.0], [10.0, 1.0], [10.0, -1.0]],
            ],
            reeds_shepp_last_straight: false,
            planner: PlannerConfig::default(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sarathi=info".parse().expect("static directive parses")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let scenario = if let Some(path) = args.get(1) {
        info!("loading scenario from {}", path);
        Scenario::load(Path::new(path))?
    } else {
        info!("using built-in pull-over scenario");
        Scenario::builtin()
    };

    let workspace = Workspace::new(
        scenario.workspace[0],
        scenario.workspace[1],
        scenario.workspace[2],
        scenario.workspace[3],
    );
    let obstacles: Vec<Vec<Point2D>> = scenario
        .obstacles
        .iter()
        .map(|polygon| polygon.iter().map(|v| Point2D::new(v[0], v[1])).collect())
        .collect();

    let mut planner = HybridAStarPlanner::new(scenario.planner.clone());
    let trajectory = planner.plan(
        Pose2D::new(scenario.start[0], scenario.start[1], scenario.start[2]),
        Pose2D::new(scenario.goal[0], scenario.goal[1], scenario.goal[2]),
        &workspace,
        &obstacles,
        &[],
        scenario.reeds_shepp_last_straight,
    )?;

    let length = trajectory.accumulated_s.last().copied().unwrap_or(0.0);
    let gear_switches = trajectory
        .v
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count();
    info!(
        points = trajectory.len(),
        length_m = length,
        gear_switches,
        "trajectory planned"
    );

    println!("      x       y     phi       v");
    for i in (0..trajectory.len()).step_by(trajectory.len().max(20) / 20) {
        println!(
            "{:7.2} {:7.2} {:7.3} {:7.3}",
            trajectory.x[i], trajectory.y[i], trajectory.phi[i], trajectory.v[i]
        );
    }
    Ok(())
}
