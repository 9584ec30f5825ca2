//! Error types
//!
//! Routine data anomalies (empty trajectories, unknown events, bad trigger
//! times) are never errors on the poll path; they degrade to absent values or
//! always-false conditions. These types cover construction, configuration and
//! lifecycle misuse.

use crate::lifecycle::State;
use thiserror::Error;

/// Structural problems found while assembling a [`Trajectory`](crate::control::trajectory::Trajectory)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("sample {index} at t={timestamp} precedes the previous sample at t={previous}")]
    UnsortedSamples {
        index: usize,
        timestamp: f64,
        previous: f64,
    },

    #[error("split index {index} is out of bounds for {len} samples")]
    SplitOutOfBounds { index: usize, len: usize },

    #[error("split indices must be strictly increasing ({previous} then {index})")]
    UnsortedSplits { previous: usize, index: usize },
}

/// Failure reported by a [`TrajectoryLoader`](crate::control::trajectory::cache::TrajectoryLoader)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("trajectory {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Invalid(#[from] TrajectoryError),
}

/// Rejected configuration parameter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("unknown parameter {0:?}")]
    UnknownParameter(String),
}

/// A lifecycle callback was invoked from a state that does not allow it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} while {state:?}")]
pub struct LifecycleError {
    pub action: &'static str,
    pub state: State,
}
