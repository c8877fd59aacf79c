//! Damped Gauss-Newton with Nielsen's damping update.

use tracing::{debug, instrument};

use super::{ensure_finite, Problem, SolverParameters, SolverResult};
use crate::error::SolverError;
use crate::linalg::{max_abs, solve_linear};

/// Damping beyond this means the model has stopped being useful.
const MAX_DAMPING: f64 = 1e150;

#[instrument(skip_all, fields(params = problem.param_count(), residuals = problem.residual_count()))]
pub(crate) fn solve<P: Problem>(
    problem: &mut P,
    config: &SolverParameters,
) -> Result<SolverResult, SolverError> {
    let opts = &config.levenberg_marquardt;
    let tol = config.convergence_tolerance;
    let max_iterations = config.iteration_budget(problem.param_count());
    let n = problem.param_count();

    let mut x = problem.values();
    let mut r = problem.residuals();
    ensure_finite(&r, 0)?;
    let mut err = r.norm_squared();

    let mut mu = 0.0;
    let mut nu = 2.0;
    let mut iterations = 0;
    let mut converged = max_abs(&r) < tol;

    while !converged && iterations < max_iterations {
        let j = problem.jacobian();
        if !j.iter().all(|v| v.is_finite()) {
            return Err(SolverError::NonFinite {
                iteration: iterations,
            });
        }
        let a = j.transpose() * &j;
        let g = -(j.transpose() * &r);
        if max_abs(&g) <= opts.gradient_tolerance {
            break;
        }
        if iterations == 0 {
            let diag_max = a.diagonal().max();
            mu = opts.initial_damping_factor * if diag_max > 0.0 { diag_max } else { 1.0 };
        }
        iterations += 1;

        let mut damped = a.clone();
        for i in 0..n {
            damped[(i, i)] += mu;
        }
        let Some(h) = solve_linear(&damped, &g) else {
            mu *= nu;
            nu *= 2.0;
            continue;
        };
        let x_new = &x + &h;
        problem.set_values(&x_new);
        let r_new = problem.residuals();
        ensure_finite(&r_new, iterations)?;
        let err_new = r_new.norm_squared();

        // Predicted decrease of ‖r‖² under the linear model.
        let predicted = h.dot(&(&h * mu + &g));
        let rho = if predicted > 0.0 {
            (err - err_new) / predicted
        } else {
            -1.0
        };

        if rho > 0.0 {
            x = x_new;
            r = r_new;
            err = err_new;
            mu *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;
        } else {
            problem.set_values(&x);
            // A tiny step only ends the run once it is rejected.
            if h.norm() <= opts.step_tolerance * (x.norm() + opts.step_tolerance) {
                break;
            }
            mu *= nu;
            nu *= 2.0;
        }
        converged = max_abs(&r) < tol;

        if config.debug_mode {
            debug!(
                iteration = iterations,
                max_error = max_abs(&r),
                damping = mu,
                rho,
                "levenberg-marquardt step"
            );
        }
        if mu > MAX_DAMPING {
            break;
        }
    }

    problem.set_values(&x);
    Ok(SolverResult {
        max_error: max_abs(&r),
        params: x,
        converged,
        iterations,
    })
}
