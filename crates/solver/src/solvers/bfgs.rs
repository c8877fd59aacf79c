//! Quasi-Newton minimization of ½‖r‖² with an inverse-Hessian BFGS update.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, instrument};

use super::line_search::{self, Trial};
use super::{ensure_finite, Problem, SolverParameters, SolverResult};
use crate::error::SolverError;
use crate::linalg::max_abs;

#[instrument(skip_all, fields(params = problem.param_count(), residuals = problem.residual_count()))]
pub(crate) fn solve<P: Problem>(
    problem: &mut P,
    config: &SolverParameters,
) -> Result<SolverResult, SolverError> {
    let opts = &config.bfgs;
    let tol = config.convergence_tolerance;
    let max_iterations = config.iteration_budget(problem.param_count());
    let n = problem.param_count();

    let mut here: Trial = line_search::current(problem);
    ensure_finite(&here.residuals, 0)?;
    ensure_finite(&here.gradient, 0)?;

    let mut h = DMatrix::<f64>::identity(n, n);
    let mut h_is_identity = true;
    let mut iterations = 0;
    let mut converged = max_abs(&here.residuals) < tol;

    while !converged && iterations < max_iterations {
        if here.gradient.norm() <= opts.gradient_tolerance {
            // Stationary point that is not a solution.
            break;
        }
        iterations += 1;

        let mut direction: DVector<f64> = -(&h * &here.gradient);
        if direction.dot(&here.gradient) >= 0.0 {
            h.fill_with_identity();
            h_is_identity = true;
            direction = -here.gradient.clone();
        }
        here.alpha = 0.0;
        here.slope = here.gradient.dot(&direction);

        let next = line_search::search(problem, &here, &direction, &opts.line_search, iterations)?
            .filter(|t| t.f < here.f);
        let Some(next) = next else {
            problem.set_values(&here.x);
            if h_is_identity {
                break;
            }
            h.fill_with_identity();
            h_is_identity = true;
            continue;
        };

        let s = &next.x - &here.x;
        let y = &next.gradient - &here.gradient;
        let sy = s.dot(&y);
        if sy > f64::EPSILON * s.norm() * y.norm() {
            // H+ = H + (sᵀy + yᵀHy) ssᵀ / (sᵀy)² − (Hy sᵀ + s yᵀH) / sᵀy
            let hy = &h * &y;
            let yhy = y.dot(&hy);
            h += (&s * s.transpose()) * ((sy + yhy) / (sy * sy));
            h -= (&hy * s.transpose() + &s * hy.transpose()) / sy;
            h_is_identity = false;
        }

        here = next;
        converged = max_abs(&here.residuals) < tol;

        if config.debug_mode {
            debug!(
                iteration = iterations,
                max_error = max_abs(&here.residuals),
                step = here.alpha,
                "bfgs step"
            );
        }
    }

    problem.set_values(&here.x);
    Ok(SolverResult {
        max_error: max_abs(&here.residuals),
        params: here.x,
        converged,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_problems::*;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_bowl() {
        // r = (x - 1, 2 (y + 3))
        let mut p = FnProblem {
            x: DVector::from_vec(vec![5.0, 5.0]),
            rows: 2,
            f: |x: &DVector<f64>| DVector::from_vec(vec![x[0] - 1.0, 2.0 * (x[1] + 3.0)]),
        };
        let result = solve(&mut p, &SolverParameters::default()).unwrap();
        assert!(result.converged);
        assert_relative_eq!(p.x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.x[1], -3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stationary_non_solution_stops_early() {
        let mut p = contradictory();
        let result = solve(&mut p, &SolverParameters::default()).unwrap();
        assert!(!result.converged);
        assert!(result.iterations < 10);
    }
}
