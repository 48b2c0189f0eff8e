//! Error types for the planner.

use thiserror::Error;

/// Planner error type.
///
/// Out-of-bounds or colliding child nodes during expansion are not errors;
/// they are skipped silently as part of the search. Everything below is
/// fatal to the current plan invocation.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Malformed caller input: nonfinite poses, empty polygons, degenerate
    /// workspace, inconsistent configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The start or goal footprint is outside the workspace or overlaps an
    /// obstacle segment.
    #[error("endpoint in collision: {0}")]
    EndpointInCollision(String),

    /// The search ran out of nodes or hit its budget without producing a
    /// single analytic candidate.
    #[error("search exhausted: {0}")]
    SearchExhausted(String),

    /// Parallel result arrays lost their length invariants while stitching.
    /// Indicates a bug, not a property of the input.
    #[error("assembly invariant violated: {0}")]
    AssemblyInvariantViolated(String),

    /// The piecewise-jerk speed optimizer did not converge.
    #[error("speed optimizer failure: {0}")]
    OptimizerFailure(String),

    /// A knot count or horizon would overflow size arithmetic.
    #[error("numeric overflow: {0}")]
    NumericOverflow(String),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PlannerError {
    fn from(e: toml::de::Error) -> Self {
        PlannerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
