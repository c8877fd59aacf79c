//! Strong-Wolfe line search on f(x) = ½‖r(x)‖².

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{ensure_finite, Problem};
use crate::error::SolverError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSearchOptions {
    /// Armijo constant c1.
    pub sufficient_decrease: f64,
    /// Curvature constant c2, with c1 < c2 < 1.
    pub curvature: f64,
    pub initial_step: f64,
    /// Total number of trial evaluations per search.
    pub max_steps: usize,
}

impl Default for LineSearchOptions {
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            curvature: 0.9,
            initial_step: 1.0,
            max_steps: 40,
        }
    }
}

/// An evaluated point along the search direction.
#[derive(Debug, Clone)]
pub(crate) struct Trial {
    pub alpha: f64,
    pub x: DVector<f64>,
    pub residuals: DVector<f64>,
    pub f: f64,
    pub gradient: DVector<f64>,
    /// Directional derivative gradient · direction.
    pub slope: f64,
}

/// Objective value and gradient at the problem's current point.
pub(crate) fn objective<P: Problem>(problem: &P) -> (DVector<f64>, f64, DVector<f64>) {
    let r = problem.residuals();
    let f = 0.5 * r.norm_squared();
    let g = problem.jacobian().transpose() * &r;
    (r, f, g)
}

fn evaluate<P: Problem>(
    problem: &mut P,
    x0: &DVector<f64>,
    direction: &DVector<f64>,
    alpha: f64,
    iteration: usize,
) -> Result<Trial, SolverError> {
    let x = x0 + direction * alpha;
    problem.set_values(&x);
    let (residuals, f, gradient) = objective(problem);
    ensure_finite(&residuals, iteration)?;
    ensure_finite(&gradient, iteration)?;
    let slope = gradient.dot(direction);
    Ok(Trial {
        alpha,
        x,
        residuals,
        f,
        gradient,
        slope,
    })
}

/// Minimizer of the quadratic through (lo, f_lo) with slope `slope_lo` and
/// (hi, f_hi), kept away from the bracket ends. Falls back to bisection.
fn interpolate(lo: &Trial, hi: &Trial) -> f64 {
    let width = hi.alpha - lo.alpha;
    let denom = 2.0 * (hi.f - lo.f - lo.slope * width);
    let mid = lo.alpha + 0.5 * width;
    if denom <= 0.0 || !denom.is_finite() {
        return mid;
    }
    let candidate = lo.alpha - lo.slope * width * width / denom;
    let (a, b) = if lo.alpha < hi.alpha {
        (lo.alpha, hi.alpha)
    } else {
        (hi.alpha, lo.alpha)
    };
    let margin = 0.01 * (b - a);
    if candidate.is_finite() && candidate > a + margin && candidate < b - margin {
        candidate
    } else {
        mid
    }
}

/// Search along `direction` from `start` (evaluated at alpha = 0).
///
/// Returns the accepted trial with the problem left at that point, or `None`
/// when no decrease was found; the problem is then reset to `start.x`.
pub(crate) fn search<P: Problem>(
    problem: &mut P,
    start: &Trial,
    direction: &DVector<f64>,
    opts: &LineSearchOptions,
    iteration: usize,
) -> Result<Option<Trial>, SolverError> {
    let c1 = opts.sufficient_decrease;
    let c2 = opts.curvature;
    let f0 = start.f;
    let slope0 = start.slope;
    let armijo = |t: &Trial| t.f <= f0 + c1 * t.alpha * slope0;
    let curvature_ok = |t: &Trial| t.slope.abs() <= -c2 * slope0;

    let mut budget = opts.max_steps.max(1);
    // The bracket's left end sits at alpha = 0 whatever step led to `start`.
    let start = &Trial {
        alpha: 0.0,
        ..start.clone()
    };
    let mut prev = start.clone();
    let mut alpha = opts.initial_step;

    // Bracketing phase.
    let (mut lo, mut hi) = loop {
        if budget == 0 {
            return Ok(finish(problem, start, prev));
        }
        budget -= 1;
        let t = evaluate(problem, &start.x, direction, alpha, iteration)?;
        if !armijo(&t) || (prev.alpha > 0.0 && t.f >= prev.f) {
            break (prev, t);
        }
        if curvature_ok(&t) {
            return Ok(Some(t));
        }
        if t.slope >= 0.0 {
            break (t, prev);
        }
        alpha = 2.0 * t.alpha;
        prev = t;
    };

    // Zoom phase: `lo` always satisfies Armijo and has the lowest f so far.
    while budget > 0 {
        budget -= 1;
        let alpha = interpolate(&lo, &hi);
        let t = evaluate(problem, &start.x, direction, alpha, iteration)?;
        if !armijo(&t) || t.f >= lo.f {
            hi = t;
        } else {
            if curvature_ok(&t) {
                return Ok(Some(t));
            }
            if t.slope * (hi.alpha - lo.alpha) >= 0.0 {
                hi = lo;
            }
            lo = t;
        }
        if (hi.alpha - lo.alpha).abs() <= f64::EPSILON * lo.alpha.abs().max(1.0) {
            break;
        }
    }
    Ok(finish(problem, start, lo))
}

/// Accept `best` if it decreased the objective at all.
fn finish<P: Problem>(problem: &mut P, start: &Trial, best: Trial) -> Option<Trial> {
    if best.alpha > 0.0 && best.f < start.f {
        problem.set_values(&best.x);
        Some(best)
    } else {
        problem.set_values(&start.x);
        None
    }
}

/// Trial record for the problem's current point. The slope is left at zero
/// until a direction is chosen.
pub(crate) fn current<P: Problem>(problem: &P) -> Trial {
    let (residuals, f, gradient) = objective(problem);
    Trial {
        alpha: 0.0,
        x: problem.values(),
        residuals,
        f,
        gradient,
        slope: 0.0,
    }
}
