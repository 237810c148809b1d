//! Error handling for planning.

use std::io;

/// Unified error for planner construction and planning failures. Inner-loop
/// failures surface here without retry; `Timeout`, `Cancelled` and
/// `PlannerFailed` carry the outer iteration at which planning stopped.
#[derive(Debug)]
pub enum PlanError {
    /// No options bundle was supplied at construction.
    NoPlannerOptions,
    /// The supplied options failed validation.
    InvalidOptions(String),
    /// The external cancellation signal fired.
    Cancelled { iteration: usize },
    /// The wall-clock budget elapsed.
    Timeout { iteration: usize },
    /// The iteration budget was exhausted without connecting the trees.
    PlannerFailed { iteration: usize },
    /// A frame-system interpolation failed.
    Interpolation(String),
    /// Flattening or unflattening a configuration failed.
    Linearization(String),
    /// The IK solver reported an error.
    Solver(String),
    IoError(io::Error),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::NoPlannerOptions => write!(f, "no planner options provided"),
            PlanError::InvalidOptions(msg) => write!(f, "invalid planner options: {}", msg),
            PlanError::Cancelled { iteration } => {
                write!(f, "planning cancelled after {} iterations", iteration)
            }
            PlanError::Timeout { iteration } => {
                write!(f, "planning timed out after {} iterations", iteration)
            }
            PlanError::PlannerFailed { iteration } => {
                write!(f, "planner failed to find a solution in {} iterations", iteration)
            }
            PlanError::Interpolation(msg) => write!(f, "interpolation failure: {}", msg),
            PlanError::Linearization(msg) => write!(f, "linearization failure: {}", msg),
            PlanError::Solver(msg) => write!(f, "solver failure: {}", msg),
            PlanError::IoError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PlanError {
    fn from(err: io::Error) -> Self {
        PlanError::IoError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_iteration() {
        let err = PlanError::PlannerFailed { iteration: 42 };
        assert_eq!(
            format!("{}", err),
            "planner failed to find a solution in 42 iterations"
        );
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: PlanError = io_err.into();
        assert!(matches!(err, PlanError::IoError(_)));
    }
}
