use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of [`System::solve`](crate::System::solve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Every SubSystem converged below the tolerance.
    Success,
    /// Residuals are small (within 10x tolerance) but not below it.
    ConvergedToLocalMinimum,
    /// Iteration budget exhausted, or no further progress possible.
    NotConverged,
    /// A SubSystem hit a structurally unsolvable step; the solve was aborted.
    Failed,
}

impl SolveStatus {
    /// Success or the soft-success local-minimum outcome.
    pub fn is_solved(self) -> bool {
        matches!(self, SolveStatus::Success | SolveStatus::ConvergedToLocalMinimum)
    }
}

/// API misuse. Numerical trouble is never reported through this type.
#[derive(Debug, Error)]
pub enum GcsError {
    #[error("Unknown constraint handle")]
    UnknownConstraint,
    #[error("Unknown parameter handle")]
    UnknownParameter,
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Numerical failure of a single solver run.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Residuals or parameters became non-finite at iteration {iteration}")]
    NonFinite { iteration: usize },
}
