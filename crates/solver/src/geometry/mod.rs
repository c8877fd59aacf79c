//! 2D geometric primitives expressed through shared parameters.
//!
//! Curves hold [`ParamId`] handles rather than values. All evaluation goes
//! through an [`Eval`] context, which reads values from a [`ParamStore`] and
//! tracks the derivative with respect to at most one parameter.

pub mod bspline;
pub mod conics;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::dual::{Dual, DualVec2};
use crate::param::{ParamId, ParamStore};

pub use bspline::BSpline;
pub use conics::{Arc, ArcOfEllipse, ArcOfHyperbola, Circle, Ellipse, Hyperbola, Parabola};

/// Parameter-evaluation context: values from a store, derivatives with
/// respect to `wrt` (or none).
#[derive(Debug, Clone, Copy)]
pub struct Eval<'a> {
    store: &'a ParamStore,
    wrt: Option<ParamId>,
}

impl<'a> Eval<'a> {
    pub fn new(store: &'a ParamStore, wrt: Option<ParamId>) -> Self {
        Self { store, wrt }
    }

    /// Plain value evaluation; every derivative is zero.
    pub fn values(store: &'a ParamStore) -> Self {
        Self::new(store, None)
    }

    pub fn store(&self) -> &'a ParamStore {
        self.store
    }

    pub fn var(&self, id: ParamId) -> Dual {
        let d = if self.wrt == Some(id) { 1.0 } else { 0.0 };
        Dual::new(self.store.value(id), d)
    }

    pub fn point(&self, p: &Point) -> DualVec2 {
        DualVec2::new(self.var(p.x), self.var(p.y))
    }
}

/// A point: one parameter per coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: ParamId,
    pub y: ParamId,
}

impl Point {
    pub fn new(x: ParamId, y: ParamId) -> Self {
        Self { x, y }
    }

    pub fn params(&self) -> [ParamId; 2] {
        [self.x, self.y]
    }
}

/// A line through two points. Parametrised as `p1 + u (p2 - p1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![self.p1.x, self.p1.y, self.p2.x, self.p2.y]
    }

    pub fn direction(&self, ev: &Eval) -> DualVec2 {
        ev.point(&self.p2) - ev.point(&self.p1)
    }

    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let p1 = ev.point(&self.p1);
        p1 + self.direction(ev).scale(u)
    }

    /// Signed distance of `p` from the line, positive to the left of p1 -> p2.
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        let d = self.direction(ev);
        d.cross(&(*p - ev.point(&self.p1))) / d.length().floored()
    }

    pub fn normal_at(&self, ev: &Eval) -> DualVec2 {
        self.direction(ev).rot90ccw()
    }
}

/// Closed set of curve kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Line(Line),
    Circle(Circle),
    Arc(Arc),
    Ellipse(Ellipse),
    ArcOfEllipse(ArcOfEllipse),
    Hyperbola(Hyperbola),
    ArcOfHyperbola(ArcOfHyperbola),
    Parabola(Parabola),
    BSpline(BSpline),
}

impl Curve {
    /// Defining parameters in a fixed order.
    pub fn params(&self) -> Vec<ParamId> {
        match self {
            Curve::Line(l) => l.params(),
            Curve::Circle(c) => c.params(),
            Curve::Arc(a) => a.params(),
            Curve::Ellipse(e) => e.params(),
            Curve::ArcOfEllipse(a) => a.params(),
            Curve::Hyperbola(h) => h.params(),
            Curve::ArcOfHyperbola(a) => a.params(),
            Curve::Parabola(p) => p.params(),
            Curve::BSpline(b) => b.params(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Curve::Line(_) => "line",
            Curve::Circle(_) => "circle",
            Curve::Arc(_) => "arc",
            Curve::Ellipse(_) => "ellipse",
            Curve::ArcOfEllipse(_) => "arc of ellipse",
            Curve::Hyperbola(_) => "hyperbola",
            Curve::ArcOfHyperbola(_) => "arc of hyperbola",
            Curve::Parabola(_) => "parabola",
            Curve::BSpline(_) => "b-spline",
        }
    }

    /// Position at curve parameter `u`. `u` may itself carry a derivative.
    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        match self {
            Curve::Line(l) => l.value(ev, u),
            Curve::Circle(c) => c.value(ev, u),
            Curve::Arc(a) => a.circle().value(ev, u),
            Curve::Ellipse(e) => e.value(ev, u),
            Curve::ArcOfEllipse(a) => a.ellipse.value(ev, u),
            Curve::Hyperbola(h) => h.value(ev, u),
            Curve::ArcOfHyperbola(a) => a.hyperbola.value(ev, u),
            Curve::Parabola(p) => p.value(ev, u),
            Curve::BSpline(b) => b.value(ev, u),
        }
    }

    /// Position and first derivative with respect to `u`.
    pub fn evaluate(&self, store: &ParamStore, u: f64) -> (Vector2<f64>, Vector2<f64>) {
        let v = self.value(&Eval::values(store), Dual::new(u, 1.0));
        (v.value(), v.derivative())
    }

    /// Unit tangent at `u`; a vanishing derivative falls back to (1, 0).
    pub fn tangent(&self, store: &ParamStore, u: f64) -> Vector2<f64> {
        let (_, d) = self.evaluate(store, u);
        let n = d.norm();
        if n < crate::dual::LENGTH_FLOOR {
            Vector2::new(1.0, 0.0)
        } else {
            d / n
        }
    }

    /// Unit normal at `u`: the tangent rotated counter-clockwise.
    pub fn normal(&self, store: &ParamStore, u: f64) -> Vector2<f64> {
        let t = self.tangent(store, u);
        Vector2::new(-t.y, t.x)
    }

    /// Normal direction (not normalised) of the curve at a point lying on or
    /// near it.
    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        match self {
            Curve::Line(l) => l.normal_at(ev),
            Curve::Circle(c) => c.normal_at(ev, p),
            Curve::Arc(a) => a.circle().normal_at(ev, p),
            Curve::Ellipse(e) => e.normal_at(ev, p),
            Curve::ArcOfEllipse(a) => a.ellipse.normal_at(ev, p),
            Curve::Hyperbola(h) => h.normal_at(ev, p),
            Curve::ArcOfHyperbola(a) => a.hyperbola.normal_at(ev, p),
            Curve::Parabola(pb) => pb.normal_at(ev, p),
            Curve::BSpline(b) => b.normal_at(ev, p),
        }
    }

    /// Residual that vanishes when `p` lies on the curve (the full conic for
    /// arc variants).
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        match self {
            Curve::Line(l) => l.point_residual(ev, p),
            Curve::Circle(c) => c.point_residual(ev, p),
            Curve::Arc(a) => a.circle().point_residual(ev, p),
            Curve::Ellipse(e) => e.point_residual(ev, p),
            Curve::ArcOfEllipse(a) => a.ellipse.point_residual(ev, p),
            Curve::Hyperbola(h) => h.point_residual(ev, p),
            Curve::ArcOfHyperbola(a) => a.hyperbola.point_residual(ev, p),
            Curve::Parabola(pb) => pb.point_residual(ev, p),
            Curve::BSpline(b) => b.point_residual(ev, p),
        }
    }

    /// Parameter range used for projection. Unbounded curves report a window
    /// wide enough to reach `near`.
    pub fn domain(&self, store: &ParamStore, near: Vector2<f64>) -> (f64, f64) {
        use std::f64::consts::PI;
        match self {
            Curve::Line(l) => {
                let (x1, y1) = store.point(&l.p1);
                let (x2, y2) = store.point(&l.p2);
                let len = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt().max(1e-10);
                let reach = ((near.x - x1).powi(2) + (near.y - y1).powi(2)).sqrt() / len;
                (-reach - 1.0, reach + 1.0)
            }
            Curve::Circle(_) | Curve::Ellipse(_) => (-PI, PI),
            Curve::Arc(a) => (store.value(a.start_angle), store.value(a.end_angle)),
            Curve::ArcOfEllipse(a) => (store.value(a.start_angle), store.value(a.end_angle)),
            Curve::ArcOfHyperbola(a) => (store.value(a.start_angle), store.value(a.end_angle)),
            Curve::Hyperbola(_) => (-6.0, 6.0),
            Curve::Parabola(pb) => {
                let (vx, vy) = store.point(&pb.vertex);
                let reach = ((near.x - vx).powi(2) + (near.y - vy).powi(2)).sqrt();
                (-2.0 * reach - 1.0, 2.0 * reach + 1.0)
            }
            Curve::BSpline(b) => b.domain(store),
        }
    }

    /// Curve parameter of the point on the curve closest to `p`, searched by
    /// sampling the domain and refining with Gauss-Newton steps.
    pub fn project(&self, store: &ParamStore, p: Vector2<f64>) -> f64 {
        const SAMPLES: usize = 64;
        const REFINE_STEPS: usize = 50;

        let (lo, hi) = self.domain(store, p);
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let dist2 = |u: f64| (self.evaluate(store, u).0 - p).norm_squared();

        let mut best_u = lo;
        let mut best_d = dist2(lo);
        for i in 1..=SAMPLES {
            let u = lo + (hi - lo) * i as f64 / SAMPLES as f64;
            let d = dist2(u);
            if d < best_d {
                best_d = d;
                best_u = u;
            }
        }

        let mut u = best_u;
        for _ in 0..REFINE_STEPS {
            let (c, dc) = self.evaluate(store, u);
            let denom = dc.norm_squared();
            if denom < 1e-24 {
                break;
            }
            let step = (c - p).dot(&dc) / denom;
            let next = (u - step).clamp(lo, hi);
            if (next - u).abs() < 1e-14 * (1.0 + u.abs()) {
                u = next;
                break;
            }
            u = next;
        }
        u
    }
}

impl From<Line> for Curve {
    fn from(l: Line) -> Self {
        Curve::Line(l)
    }
}

impl From<Circle> for Curve {
    fn from(c: Circle) -> Self {
        Curve::Circle(c)
    }
}

impl From<Arc> for Curve {
    fn from(a: Arc) -> Self {
        Curve::Arc(a)
    }
}

impl From<Ellipse> for Curve {
    fn from(e: Ellipse) -> Self {
        Curve::Ellipse(e)
    }
}

impl From<ArcOfEllipse> for Curve {
    fn from(a: ArcOfEllipse) -> Self {
        Curve::ArcOfEllipse(a)
    }
}

impl From<Hyperbola> for Curve {
    fn from(h: Hyperbola) -> Self {
        Curve::Hyperbola(h)
    }
}

impl From<ArcOfHyperbola> for Curve {
    fn from(a: ArcOfHyperbola) -> Self {
        Curve::ArcOfHyperbola(a)
    }
}

impl From<Parabola> for Curve {
    fn from(p: Parabola) -> Self {
        Curve::Parabola(p)
    }
}

impl From<BSpline> for Curve {
    fn from(b: BSpline) -> Self {
        Curve::BSpline(b)
    }
}
