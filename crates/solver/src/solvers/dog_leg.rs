//! Powell's dog-leg trust region method.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, instrument};

use super::{ensure_finite, Problem, SolverParameters, SolverResult};
use crate::error::SolverError;
use crate::linalg::{max_abs, solve_least_squares};

/// Relative singular value cut-off for the Gauss-Newton step.
const PSEUDO_INVERSE_EPS: f64 = 1e-12;

/// Minimum-norm Gauss-Newton step solving `J h = -r`.
fn gauss_newton_step(j: &DMatrix<f64>, r: &DVector<f64>) -> Option<DVector<f64>> {
    solve_least_squares(j, &(-r), PSEUDO_INVERSE_EPS)
}

/// Point on the dog-leg path from 0 through `sd` to `gn` at length `radius`.
pub(crate) fn dog_leg_step(sd: &DVector<f64>, gn: &DVector<f64>, radius: f64) -> DVector<f64> {
    let gn_norm = gn.norm();
    if gn_norm <= radius {
        return gn.clone();
    }
    let sd_norm = sd.norm();
    if sd_norm == 0.0 {
        return gn * (radius / gn_norm);
    }
    if sd_norm >= radius {
        return sd * (radius / sd_norm);
    }
    // Solve ‖sd + beta (gn - sd)‖ = radius for beta in [0, 1].
    let diff = gn - sd;
    let a = diff.norm_squared();
    let b = sd.dot(&diff);
    let c = sd_norm * sd_norm - radius * radius;
    let disc = (b * b - a * c).max(0.0).sqrt();
    let beta = if b <= 0.0 {
        (disc - b) / a
    } else {
        -c / (b + disc)
    };
    sd + diff * beta.clamp(0.0, 1.0)
}

#[instrument(skip_all, fields(params = problem.param_count(), residuals = problem.residual_count()))]
pub(crate) fn solve<P: Problem>(
    problem: &mut P,
    config: &SolverParameters,
) -> Result<SolverResult, SolverError> {
    let opts = &config.dog_leg;
    let tol = config.convergence_tolerance;
    let max_iterations = config.iteration_budget(problem.param_count());

    let mut x = problem.values();
    let mut r = problem.residuals();
    ensure_finite(&r, 0)?;
    let mut err = r.norm_squared();

    let mut radius = opts.initial_radius.clamp(opts.min_radius, opts.max_radius);
    let mut nu = 2.0;
    let mut iterations = 0;
    let mut converged = max_abs(&r) < tol;

    while !converged && iterations < max_iterations {
        let j = problem.jacobian();
        let g = j.transpose() * &r;
        ensure_finite(&g, iterations)?;
        if max_abs(&g) <= opts.gradient_tolerance || radius < opts.min_radius {
            break;
        }
        iterations += 1;

        // Cauchy point along steepest descent.
        let jg = &j * &g;
        let jg_sq = jg.norm_squared();
        let alpha = if jg_sq > 0.0 {
            g.norm_squared() / jg_sq
        } else {
            0.0
        };
        let sd = &g * -alpha;
        let gn = gauss_newton_step(&j, &r).unwrap_or_else(|| sd.clone());
        let h = dog_leg_step(&sd, &gn, radius);
        let h_norm = h.norm();
        if h_norm <= f64::EPSILON * (x.norm() + f64::EPSILON) {
            break;
        }

        let x_new = &x + &h;
        problem.set_values(&x_new);
        let r_new = problem.residuals();
        ensure_finite(&r_new, iterations)?;
        let err_new = r_new.norm_squared();

        let predicted = err - (&r + &j * &h).norm_squared();
        let rho = if predicted > 0.0 {
            (err - err_new) / predicted
        } else {
            -1.0
        };

        if rho > 0.0 {
            x = x_new;
            r = r_new;
            err = err_new;
        } else {
            problem.set_values(&x);
        }

        if rho > 0.75 {
            radius = radius.max(3.0 * h_norm);
            nu = 2.0;
        } else if rho < 0.25 {
            radius /= nu;
            nu *= 2.0;
        }
        radius = radius.min(opts.max_radius);
        converged = max_abs(&r) < tol;

        if config.debug_mode {
            debug!(
                iteration = iterations,
                max_error = max_abs(&r),
                radius,
                rho,
                "dog-leg step"
            );
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

#[cfg(test)]
mod tests {
    use super::super::test_problems::*;
    use super::*;
    use approx::assert_relative_eq;

    fn v(values: &[f64]) -> DVector<f64> {
        DVector::from_row_slice(values)
    }

    #[test]
    fn test_full_gauss_newton_inside_region() {
        let h = dog_leg_step(&v(&[0.1, 0.0]), &v(&[0.5, 0.5]), 1.0);
        assert_eq!(h, v(&[0.5, 0.5]));
    }

    #[test]
    fn test_truncated_steepest_descent() {
        let h = dog_leg_step(&v(&[3.0, 4.0]), &v(&[10.0, 0.0]), 1.0);
        assert_relative_eq!(h[0], 0.6);
        assert_relative_eq!(h[1], 0.8);
    }

    #[test]
    fn test_blend_lands_on_boundary() {
        let sd = v(&[0.5, 0.0]);
        let gn = v(&[2.0, 2.0]);
        let h = dog_leg_step(&sd, &gn, 1.0);
        assert_relative_eq!(h.norm(), 1.0, epsilon = 1e-12);
        // On the segment from sd to gn.
        let t = (h[0] - 0.5) / 1.5;
        assert_relative_eq!(h[1], 2.0 * t, epsilon = 1e-12);
    }

    #[test]
    fn test_rank_deficient_jacobian_uses_min_norm_step() {
        // One equation, two unknowns: x + y = 2 from the origin.
        let mut p = FnProblem {
            x: DVector::from_vec(vec![0.0, 0.0]),
            rows: 1,
            f: |x: &DVector<f64>| DVector::from_vec(vec![x[0] + x[1] - 2.0]),
        };
        let mut config = SolverParameters::default();
        config.dog_leg.initial_radius = 10.0;
        let result = solve(&mut p, &config).unwrap();
        assert!(result.converged);
        assert_relative_eq!(p.x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.x[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_radius_floor_stops_iteration() {
        let mut p = contradictory();
        let mut config = SolverParameters::default();
        config.max_iterations = 1000;
        let result = solve(&mut p, &config).unwrap();
        assert!(!result.converged);
        assert!(result.iterations < 1000);
    }
}
