//! Rational B-spline curves.
//!
//! Control points, weights and knots are all parameters. Basis functions are
//! evaluated in [`Dual`] arithmetic, so derivatives with respect to the curve
//! parameter, the poles, the weights and the knots all come out of the same
//! evaluation. Knots are normally created fixed.

use serde::{Deserialize, Serialize};

use super::{Curve, Eval, Point};
use crate::dual::{Dual, DualVec2};
use crate::error::GcsError;
use crate::param::{ParamId, ParamStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSpline {
    pub degree: usize,
    pub poles: Vec<Point>,
    pub weights: Vec<ParamId>,
    /// Full knot vector, `poles.len() + degree + 1` entries.
    pub knots: Vec<ParamId>,
}

impl BSpline {
    pub fn new(
        degree: usize,
        poles: Vec<Point>,
        weights: Vec<ParamId>,
        knots: Vec<ParamId>,
    ) -> Result<Self, GcsError> {
        if degree == 0 || poles.len() <= degree {
            return Err(GcsError::InvalidGeometry(format!(
                "b-spline of degree {} needs more than {} poles, got {}",
                degree,
                degree,
                poles.len()
            )));
        }
        if weights.len() != poles.len() {
            return Err(GcsError::InvalidGeometry(format!(
                "b-spline has {} poles but {} weights",
                poles.len(),
                weights.len()
            )));
        }
        if knots.len() != poles.len() + degree + 1 {
            return Err(GcsError::InvalidGeometry(format!(
                "knot vector length must be n + p + 1 = {}, got {}",
                poles.len() + degree + 1,
                knots.len()
            )));
        }
        Ok(Self {
            degree,
            poles,
            weights,
            knots,
        })
    }

    /// Clamped uniform knot values on [0, 1] for `n` poles.
    pub fn clamped_knots(n: usize, degree: usize) -> Vec<f64> {
        let inner = n.saturating_sub(degree);
        let mut knots = vec![0.0; degree + 1];
        for i in 1..inner {
            knots.push(i as f64 / inner as f64);
        }
        knots.extend(std::iter::repeat(1.0).take(degree + 1));
        knots
    }

    pub fn params(&self) -> Vec<ParamId> {
        let mut params = Vec::with_capacity(self.poles.len() * 3 + self.knots.len());
        for p in &self.poles {
            params.push(p.x);
            params.push(p.y);
        }
        params.extend(self.weights.iter().copied());
        params.extend(self.knots.iter().copied());
        params
    }

    /// Parameter range `[t_p, t_n]`.
    pub fn domain(&self, store: &ParamStore) -> (f64, f64) {
        let n = self.poles.len();
        (
            store.value(self.knots[self.degree]),
            store.value(self.knots[n]),
        )
    }

    /// Knot span index `i` with `t_i <= u < t_{i+1}`, restricted to
    /// `degree..n`. The domain end maps to the last non-empty span.
    fn find_span(&self, store: &ParamStore, u: f64) -> usize {
        let n = self.poles.len();
        let p = self.degree;
        let knot = |i: usize| store.value(self.knots[i]);

        if u >= knot(n) {
            let mut span = n - 1;
            while span > p && knot(span) >= knot(span + 1) {
                span -= 1;
            }
            return span;
        }
        if u <= knot(p) {
            return p;
        }
        (p..n)
            .find(|&i| knot(i) <= u && u < knot(i + 1))
            .unwrap_or(n - 1)
    }

    /// The `degree + 1` non-zero basis functions at `u`, for poles
    /// `span - degree ..= span`.
    fn basis(&self, ev: &Eval, u: Dual) -> (usize, Vec<Dual>) {
        let p = self.degree;
        let span = self.find_span(ev.store(), u.v);
        let knot = |i: usize| ev.var(self.knots[i]);

        let mut n = vec![Dual::constant(0.0); p + 1];
        let mut left = vec![Dual::constant(0.0); p + 1];
        let mut right = vec![Dual::constant(0.0); p + 1];
        n[0] = Dual::constant(1.0);
        for j in 1..=p {
            left[j] = u - knot(span + 1 - j);
            right[j] = knot(span + j) - u;
            let mut saved = Dual::constant(0.0);
            for r in 0..j {
                let den = right[r + 1] + left[j - r];
                let temp = if den.v.abs() < 1e-300 {
                    Dual::constant(0.0)
                } else {
                    n[r] / den
                };
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        (span, n)
    }

    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let (span, basis) = self.basis(ev, u);
        let first = span - self.degree;
        let mut num = DualVec2::constant(0.0, 0.0);
        let mut den = Dual::constant(0.0);
        for (r, b) in basis.iter().enumerate() {
            let w = ev.var(self.weights[first + r]) * *b;
            num = num + ev.point(&self.poles[first + r]).scale(w);
            den = den + w;
        }
        let den = den.floored();
        DualVec2::new(num.x / den, num.y / den)
    }

    /// Central-difference tangent at `u`; keeps the parameter derivative.
    fn tangent_dual(&self, ev: &Eval, u: f64) -> DualVec2 {
        let (lo, hi) = self.domain(ev.store());
        let h = 1e-6 * (hi - lo).abs().max(1e-6);
        let a = (u - h).max(lo);
        let b = (u + h).min(hi);
        let step = (b - a).max(1e-300);
        (self.value(ev, Dual::constant(b)) - self.value(ev, Dual::constant(a))) * (1.0 / step)
    }

    /// Normal at the foot point of `p`. The foot parameter is held constant,
    /// which is exact to first order because the foot minimises the distance.
    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        let u = Curve::BSpline(self.clone()).project(ev.store(), p.value());
        self.tangent_dual(ev, u).rot90ccw()
    }

    /// Signed distance from the curve along the normal at the foot point.
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        let u = Curve::BSpline(self.clone()).project(ev.store(), p.value());
        let foot = self.value(ev, Dual::constant(u));
        let normal = self.tangent_dual(ev, u).rot90ccw().normalized();
        (*p - foot).dot(&normal)
    }
}
