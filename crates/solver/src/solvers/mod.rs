//! Nonlinear least-squares solvers.
//!
//! Each solver drives a [`Problem`] from its current values towards zero
//! residual. Trial points are written through [`Problem::set_values`]; on
//! return the problem holds the best point found.

mod bfgs;
mod dog_leg;
mod levenberg_marquardt;
mod line_search;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::linalg::all_finite;

pub use line_search::LineSearchOptions;

/// Residual and Jacobian callbacks over a flat parameter vector.
pub trait Problem {
    fn param_count(&self) -> usize;
    fn residual_count(&self) -> usize;
    fn values(&self) -> DVector<f64>;
    fn set_values(&mut self, x: &DVector<f64>);
    fn residuals(&self) -> DVector<f64>;
    fn jacobian(&self) -> DMatrix<f64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Bfgs,
    LevenbergMarquardt,
    #[default]
    DogLeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BfgsOptions {
    /// Stop when the objective gradient norm falls below this.
    pub gradient_tolerance: f64,
    pub line_search: LineSearchOptions,
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            gradient_tolerance: 1e-20,
            line_search: LineSearchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardtOptions {
    /// Initial damping is this times the largest diagonal entry of JᵀJ.
    pub initial_damping_factor: f64,
    pub gradient_tolerance: f64,
    /// Relative step length below which the iteration stops.
    pub step_tolerance: f64,
}

impl Default for LevenbergMarquardtOptions {
    fn default() -> Self {
        Self {
            initial_damping_factor: 1e-3,
            gradient_tolerance: 1e-80,
            step_tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DogLegOptions {
    pub initial_radius: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub gradient_tolerance: f64,
}

impl Default for DogLegOptions {
    fn default() -> Self {
        Self {
            initial_radius: 1.0,
            min_radius: 1e-12,
            max_radius: 1e10,
            gradient_tolerance: 1e-80,
        }
    }
}

/// Configuration for a [`System::solve`](crate::System::solve) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParameters {
    pub algorithm: Algorithm,
    pub max_iterations: usize,
    /// A SubSystem has converged when its largest |residual| is below this.
    pub convergence_tolerance: f64,
    pub rescale_constraints: bool,
    /// Emit per-iteration `debug!` events from the solvers.
    pub debug_mode: bool,
    /// Multiply `max_iterations` by the SubSystem's parameter count.
    pub scale_iterations_with_size: bool,
    /// Relative cut-off for the QR rank probe in diagnostics.
    pub qr_pivot_threshold: f64,
    pub bfgs: BfgsOptions,
    pub levenberg_marquardt: LevenbergMarquardtOptions,
    pub dog_leg: DogLegOptions,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::DogLeg,
            max_iterations: 100,
            convergence_tolerance: 1e-10,
            rescale_constraints: false,
            debug_mode: false,
            scale_iterations_with_size: false,
            qr_pivot_threshold: 1e-13,
            bfgs: BfgsOptions::default(),
            levenberg_marquardt: LevenbergMarquardtOptions::default(),
            dog_leg: DogLegOptions::default(),
        }
    }
}

impl SolverParameters {
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Iteration budget for a problem with `param_count` unknowns.
    pub fn iteration_budget(&self, param_count: usize) -> usize {
        if self.scale_iterations_with_size {
            self.max_iterations.saturating_mul(param_count.max(1))
        } else {
            self.max_iterations
        }
    }
}

/// Outcome of one solver run.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub params: DVector<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub max_error: f64,
}

/// Run the configured algorithm on `problem`.
pub fn run<P: Problem>(
    problem: &mut P,
    config: &SolverParameters,
) -> Result<SolverResult, SolverError> {
    match config.algorithm {
        Algorithm::Bfgs => bfgs::solve(problem, config),
        Algorithm::LevenbergMarquardt => levenberg_marquardt::solve(problem, config),
        Algorithm::DogLeg => dog_leg::solve(problem, config),
    }
}

fn ensure_finite(v: &DVector<f64>, iteration: usize) -> Result<(), SolverError> {
    if all_finite(v) {
        Ok(())
    } else {
        Err(SolverError::NonFinite { iteration })
    }
}
