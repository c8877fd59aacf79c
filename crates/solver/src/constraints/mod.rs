//! Geometric constraints.
//!
//! A [`Constraint`] is a closed [`ConstraintKind`] plus a scale factor. Its
//! residual is `scale * raw`, where `raw` vanishes exactly when the
//! relationship holds. Gradients are exact: each partial derivative comes from
//! one forward-mode evaluation of the raw residual.

mod basic;
mod curves;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::dual::Dual;
use crate::geometry::{Circle, Curve, Ellipse, Eval, Hyperbola, Line, Parabola, Point};
use crate::param::{ParamId, ParamStore};

new_key_type! {
    pub struct ConstraintId;
}

/// Coordinate selector for [`ConstraintKind::CurveValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// `a = ratio * b`.
    Equal { a: ParamId, b: ParamId, ratio: f64 },
    /// `b - a = difference`.
    Difference {
        a: ParamId,
        b: ParamId,
        difference: f64,
    },
    P2PDistance { p1: Point, p2: Point, distance: f64 },
    /// Direction of `p1 -> p2` measured from the +x axis.
    P2PAngle { p1: Point, p2: Point, angle: f64 },
    P2LDistance {
        point: Point,
        line: Line,
        distance: f64,
    },
    PointOnLine { point: Point, line: Line },
    PointOnPerpBisector { point: Point, line: Line },
    Parallel { l1: Line, l2: Line },
    Perpendicular { l1: Line, l2: Line },
    /// Signed angle from `l1` to `l2`.
    L2LAngle { l1: Line, l2: Line, angle: f64 },
    /// Midpoint of `l1` lies on `l2`.
    MidpointOnLine { l1: Line, l2: Line },
    EqualLength { l1: Line, l2: Line },
    TangentCircumf {
        c1: Circle,
        c2: Circle,
        internal: bool,
    },
    TangentLineCircle { line: Line, circle: Circle },
    PointOnCircle { point: Point, circle: Circle },
    PointOnEllipse { point: Point, ellipse: Ellipse },
    PointOnHyperbola { point: Point, hyperbola: Hyperbola },
    PointOnParabola { point: Point, parabola: Parabola },
    PointOnCurve { point: Point, curve: Curve },
    /// One coordinate of `point` equals the same coordinate of `curve(u)`.
    CurveValue {
        point: Point,
        curve: Curve,
        u: ParamId,
        axis: Axis,
    },
    /// Angle between the normals of two curves at a shared point.
    AngleViaPoint {
        crv1: Curve,
        crv2: Curve,
        point: Point,
        angle: f64,
    },
    /// Refraction law at `point` between two rays crossing `boundary`.
    Snell {
        ray1: Curve,
        ray2: Curve,
        boundary: Curve,
        point: Point,
        n1: f64,
        n2: f64,
        flip1: bool,
        flip2: bool,
    },
}

/// A constraint instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    /// Residual multiplier, set by [`Constraint::rescale`].
    pub scale: f64,
    /// Caller-defined tag carried through diagnostics.
    pub tag: i32,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            scale: 1.0,
            tag: 0,
        }
    }

    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }

    // ── Constructors ────────────────────────────────────────────────────

    pub fn equal(a: ParamId, b: ParamId) -> Self {
        Self::new(ConstraintKind::Equal { a, b, ratio: 1.0 })
    }

    pub fn proportional(a: ParamId, b: ParamId, ratio: f64) -> Self {
        Self::new(ConstraintKind::Equal { a, b, ratio })
    }

    pub fn difference(a: ParamId, b: ParamId, difference: f64) -> Self {
        Self::new(ConstraintKind::Difference { a, b, difference })
    }

    /// Both endpoints share a y coordinate.
    pub fn horizontal(line: &Line) -> Self {
        Self::equal(line.p1.y, line.p2.y)
    }

    /// Both endpoints share an x coordinate.
    pub fn vertical(line: &Line) -> Self {
        Self::equal(line.p1.x, line.p2.x)
    }

    /// Two points at the same location, as a pair of Equal constraints.
    pub fn coincident(p1: &Point, p2: &Point) -> [Self; 2] {
        [Self::equal(p1.x, p2.x), Self::equal(p1.y, p2.y)]
    }

    pub fn p2p_distance(p1: Point, p2: Point, distance: f64) -> Self {
        Self::new(ConstraintKind::P2PDistance { p1, p2, distance })
    }

    pub fn p2p_angle(p1: Point, p2: Point, angle: f64) -> Self {
        Self::new(ConstraintKind::P2PAngle { p1, p2, angle })
    }

    pub fn p2l_distance(point: Point, line: Line, distance: f64) -> Self {
        Self::new(ConstraintKind::P2LDistance {
            point,
            line,
            distance,
        })
    }

    pub fn point_on_line(point: Point, line: Line) -> Self {
        Self::new(ConstraintKind::PointOnLine { point, line })
    }

    pub fn point_on_perp_bisector(point: Point, line: Line) -> Self {
        Self::new(ConstraintKind::PointOnPerpBisector { point, line })
    }

    pub fn parallel(l1: Line, l2: Line) -> Self {
        Self::new(ConstraintKind::Parallel { l1, l2 })
    }

    pub fn perpendicular(l1: Line, l2: Line) -> Self {
        Self::new(ConstraintKind::Perpendicular { l1, l2 })
    }

    pub fn l2l_angle(l1: Line, l2: Line, angle: f64) -> Self {
        Self::new(ConstraintKind::L2LAngle { l1, l2, angle })
    }

    pub fn midpoint_on_line(l1: Line, l2: Line) -> Self {
        Self::new(ConstraintKind::MidpointOnLine { l1, l2 })
    }

    pub fn equal_length(l1: Line, l2: Line) -> Self {
        Self::new(ConstraintKind::EqualLength { l1, l2 })
    }

    pub fn tangent_circumf(c1: Circle, c2: Circle, internal: bool) -> Self {
        Self::new(ConstraintKind::TangentCircumf { c1, c2, internal })
    }

    pub fn tangent_line_circle(line: Line, circle: Circle) -> Self {
        Self::new(ConstraintKind::TangentLineCircle { line, circle })
    }

    pub fn point_on_circle(point: Point, circle: Circle) -> Self {
        Self::new(ConstraintKind::PointOnCircle { point, circle })
    }

    pub fn point_on_ellipse(point: Point, ellipse: Ellipse) -> Self {
        Self::new(ConstraintKind::PointOnEllipse { point, ellipse })
    }

    pub fn point_on_hyperbola(point: Point, hyperbola: Hyperbola) -> Self {
        Self::new(ConstraintKind::PointOnHyperbola { point, hyperbola })
    }

    pub fn point_on_parabola(point: Point, parabola: Parabola) -> Self {
        Self::new(ConstraintKind::PointOnParabola { point, parabola })
    }

    pub fn point_on_curve(point: Point, curve: impl Into<Curve>) -> Self {
        Self::new(ConstraintKind::PointOnCurve {
            point,
            curve: curve.into(),
        })
    }

    pub fn curve_value(point: Point, curve: impl Into<Curve>, u: ParamId, axis: Axis) -> Self {
        Self::new(ConstraintKind::CurveValue {
            point,
            curve: curve.into(),
            u,
            axis,
        })
    }

    pub fn angle_via_point(
        crv1: impl Into<Curve>,
        crv2: impl Into<Curve>,
        point: Point,
        angle: f64,
    ) -> Self {
        Self::new(ConstraintKind::AngleViaPoint {
            crv1: crv1.into(),
            crv2: crv2.into(),
            point,
            angle,
        })
    }

    /// Refraction at `point`; `n1`/`n2` are the refractive indices on the
    /// `ray1`/`ray2` sides. The flips reverse a ray's direction.
    #[allow(clippy::too_many_arguments)]
    pub fn snell(
        ray1: impl Into<Curve>,
        ray2: impl Into<Curve>,
        boundary: impl Into<Curve>,
        point: Point,
        n1: f64,
        n2: f64,
        flip1: bool,
        flip2: bool,
    ) -> Self {
        Self::new(ConstraintKind::Snell {
            ray1: ray1.into(),
            ray2: ray2.into(),
            boundary: boundary.into(),
            point,
            n1,
            n2,
            flip1,
            flip2,
        })
    }

    // ── Evaluation ──────────────────────────────────────────────────────

    pub fn name(&self) -> &'static str {
        match &self.kind {
            ConstraintKind::Equal { .. } => "Equal",
            ConstraintKind::Difference { .. } => "Difference",
            ConstraintKind::P2PDistance { .. } => "P2PDistance",
            ConstraintKind::P2PAngle { .. } => "P2PAngle",
            ConstraintKind::P2LDistance { .. } => "P2LDistance",
            ConstraintKind::PointOnLine { .. } => "PointOnLine",
            ConstraintKind::PointOnPerpBisector { .. } => "PointOnPerpBisector",
            ConstraintKind::Parallel { .. } => "Parallel",
            ConstraintKind::Perpendicular { .. } => "Perpendicular",
            ConstraintKind::L2LAngle { .. } => "L2LAngle",
            ConstraintKind::MidpointOnLine { .. } => "MidpointOnLine",
            ConstraintKind::EqualLength { .. } => "EqualLength",
            ConstraintKind::TangentCircumf { .. } => "TangentCircumf",
            ConstraintKind::TangentLineCircle { .. } => "TangentLineCircle",
            ConstraintKind::PointOnCircle { .. } => "PointOnCircle",
            ConstraintKind::PointOnEllipse { .. } => "PointOnEllipse",
            ConstraintKind::PointOnHyperbola { .. } => "PointOnHyperbola",
            ConstraintKind::PointOnParabola { .. } => "PointOnParabola",
            ConstraintKind::PointOnCurve { .. } => "PointOnCurve",
            ConstraintKind::CurveValue { .. } => "CurveValue",
            ConstraintKind::AngleViaPoint { .. } => "AngleViaPoint",
            ConstraintKind::Snell { .. } => "Snell",
        }
    }

    /// Parameters the residual depends on, deduplicated, in a fixed order
    /// matching [`Constraint::gradient`].
    pub fn parameters(&self) -> Vec<ParamId> {
        let mut raw = Vec::new();
        match &self.kind {
            ConstraintKind::Equal { a, b, .. } | ConstraintKind::Difference { a, b, .. } => {
                raw.extend([*a, *b]);
            }
            ConstraintKind::P2PDistance { p1, p2, .. } | ConstraintKind::P2PAngle { p1, p2, .. } => {
                raw.extend(p1.params());
                raw.extend(p2.params());
            }
            ConstraintKind::P2LDistance { point, line, .. }
            | ConstraintKind::PointOnLine { point, line }
            | ConstraintKind::PointOnPerpBisector { point, line } => {
                raw.extend(point.params());
                raw.extend(line.params());
            }
            ConstraintKind::Parallel { l1, l2 }
            | ConstraintKind::Perpendicular { l1, l2 }
            | ConstraintKind::L2LAngle { l1, l2, .. }
            | ConstraintKind::MidpointOnLine { l1, l2 }
            | ConstraintKind::EqualLength { l1, l2 } => {
                raw.extend(l1.params());
                raw.extend(l2.params());
            }
            ConstraintKind::TangentCircumf { c1, c2, .. } => {
                raw.extend(c1.params());
                raw.extend(c2.params());
            }
            ConstraintKind::TangentLineCircle { line, circle } => {
                raw.extend(line.params());
                raw.extend(circle.params());
            }
            ConstraintKind::PointOnCircle { point, circle } => {
                raw.extend(point.params());
                raw.extend(circle.params());
            }
            ConstraintKind::PointOnEllipse { point, ellipse } => {
                raw.extend(point.params());
                raw.extend(ellipse.params());
            }
            ConstraintKind::PointOnHyperbola { point, hyperbola } => {
                raw.extend(point.params());
                raw.extend(hyperbola.params());
            }
            ConstraintKind::PointOnParabola { point, parabola } => {
                raw.extend(point.params());
                raw.extend(parabola.params());
            }
            ConstraintKind::PointOnCurve { point, curve } => {
                raw.extend(point.params());
                raw.extend(curve.params());
            }
            ConstraintKind::CurveValue { point, curve, u, .. } => {
                raw.extend(point.params());
                raw.extend(curve.params());
                raw.push(*u);
            }
            ConstraintKind::AngleViaPoint {
                crv1, crv2, point, ..
            } => {
                raw.extend(crv1.params());
                raw.extend(crv2.params());
                raw.extend(point.params());
            }
            ConstraintKind::Snell {
                ray1,
                ray2,
                boundary,
                point,
                ..
            } => {
                raw.extend(ray1.params());
                raw.extend(ray2.params());
                raw.extend(boundary.params());
                raw.extend(point.params());
            }
        }

        let mut params = Vec::with_capacity(raw.len());
        for p in raw {
            if !params.contains(&p) {
                params.push(p);
            }
        }
        params
    }

    fn raw(&self, ev: &Eval) -> Dual {
        match &self.kind {
            ConstraintKind::Equal { a, b, ratio } => basic::equal(ev, *a, *b, *ratio),
            ConstraintKind::Difference { a, b, difference } => {
                basic::difference(ev, *a, *b, *difference)
            }
            ConstraintKind::P2PDistance { p1, p2, distance } => {
                basic::p2p_distance(ev, p1, p2, *distance)
            }
            ConstraintKind::P2PAngle { p1, p2, angle } => basic::p2p_angle(ev, p1, p2, *angle),
            ConstraintKind::P2LDistance {
                point,
                line,
                distance,
            } => basic::p2l_distance(ev, point, line, *distance),
            ConstraintKind::PointOnLine { point, line } => basic::point_on_line(ev, point, line),
            ConstraintKind::PointOnPerpBisector { point, line } => {
                basic::point_on_perp_bisector(ev, point, line)
            }
            ConstraintKind::Parallel { l1, l2 } => basic::parallel(ev, l1, l2),
            ConstraintKind::Perpendicular { l1, l2 } => basic::perpendicular(ev, l1, l2),
            ConstraintKind::L2LAngle { l1, l2, angle } => basic::l2l_angle(ev, l1, l2, *angle),
            ConstraintKind::MidpointOnLine { l1, l2 } => basic::midpoint_on_line(ev, l1, l2),
            ConstraintKind::EqualLength { l1, l2 } => basic::equal_length(ev, l1, l2),
            ConstraintKind::TangentCircumf { c1, c2, internal } => {
                basic::tangent_circumf(ev, c1, c2, *internal)
            }
            ConstraintKind::TangentLineCircle { line, circle } => {
                basic::tangent_line_circle(ev, line, circle)
            }
            ConstraintKind::PointOnCircle { point, circle } => {
                curves::point_on_circle(ev, point, circle)
            }
            ConstraintKind::PointOnEllipse { point, ellipse } => {
                curves::point_on_ellipse(ev, point, ellipse)
            }
            ConstraintKind::PointOnHyperbola { point, hyperbola } => {
                curves::point_on_hyperbola(ev, point, hyperbola)
            }
            ConstraintKind::PointOnParabola { point, parabola } => {
                curves::point_on_parabola(ev, point, parabola)
            }
            ConstraintKind::PointOnCurve { point, curve } => {
                curves::point_on_curve(ev, point, curve)
            }
            ConstraintKind::CurveValue {
                point,
                curve,
                u,
                axis,
            } => curves::curve_value(ev, point, curve, *u, *axis),
            ConstraintKind::AngleViaPoint {
                crv1,
                crv2,
                point,
                angle,
            } => curves::angle_via_point(ev, crv1, crv2, point, *angle),
            ConstraintKind::Snell {
                ray1,
                ray2,
                boundary,
                point,
                n1,
                n2,
                flip1,
                flip2,
            } => curves::snell(ev, ray1, ray2, boundary, point, *n1, *n2, *flip1, *flip2),
        }
    }

    /// Scaled residual; zero when the relationship holds.
    pub fn error(&self, store: &ParamStore) -> f64 {
        self.scale * self.raw(&Eval::values(store)).v
    }

    /// Partial derivative of [`Constraint::error`] with respect to `param`.
    pub fn grad(&self, store: &ParamStore, param: ParamId) -> f64 {
        self.scale * self.raw(&Eval::new(store, Some(param))).d
    }

    /// Partial derivatives in [`Constraint::parameters`] order.
    pub fn gradient(&self, store: &ParamStore) -> Vec<f64> {
        self.parameters()
            .into_iter()
            .map(|p| self.grad(store, p))
            .collect()
    }

    /// Recompute the scale factor from the current geometry. Depends only on
    /// parameter values and `coef`, so repeated calls agree.
    pub fn rescale(&mut self, store: &ParamStore, coef: f64) {
        let ev = Eval::values(store);
        let k = match &self.kind {
            ConstraintKind::PointOnLine { line, .. }
            | ConstraintKind::PointOnPerpBisector { line, .. } => basic::inverse_length(&ev, line),
            ConstraintKind::MidpointOnLine { l2, .. } => basic::inverse_length(&ev, l2),
            ConstraintKind::Parallel { l1, l2 } | ConstraintKind::Perpendicular { l1, l2 } => {
                basic::inverse_length(&ev, l1) * basic::inverse_length(&ev, l2)
            }
            _ => 1.0,
        };
        self.scale = coef * k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BSpline;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Central finite difference of `error` with respect to each parameter.
    fn numeric_gradient(c: &Constraint, store: &mut ParamStore) -> Vec<f64> {
        let h = 1e-6;
        c.parameters()
            .into_iter()
            .map(|p| {
                let v = store.value(p);
                store.set_value(p, v + h);
                let plus = c.error(store);
                store.set_value(p, v - h);
                let minus = c.error(store);
                store.set_value(p, v);
                (plus - minus) / (2.0 * h)
            })
            .collect()
    }

    fn assert_gradient_matches(c: &Constraint, store: &mut ParamStore) {
        let analytic = c.gradient(store);
        let numeric = numeric_gradient(c, store);
        assert_eq!(analytic.len(), c.parameters().len());
        for (i, (a, n)) in analytic.iter().zip(&numeric).enumerate() {
            assert!(
                (a - n).abs() < 1e-5 * (1.0 + n.abs()),
                "{} gradient[{}]: analytic {} vs numeric {}",
                c.name(),
                i,
                a,
                n
            );
        }
    }

    struct Fixture {
        store: ParamStore,
        a: Point,
        b: Point,
        c: Point,
        d: Point,
        e: Point,
    }

    fn fixture() -> Fixture {
        let mut store = ParamStore::new();
        let a = store.add_point(0.3, -0.2);
        let b = store.add_point(4.1, 1.7);
        let c = store.add_point(-1.2, 2.9);
        let d = store.add_point(2.2, 5.3);
        let e = store.add_point(1.4, 0.8);
        Fixture {
            store,
            a,
            b,
            c,
            d,
            e,
        }
    }

    #[test]
    fn test_equal_error_and_gradient() {
        let mut store = ParamStore::new();
        let a = store.add(3.0);
        let b = store.add(1.0);
        let c = Constraint::equal(a, b);
        assert_relative_eq!(c.error(&store), 2.0);
        assert_eq!(c.gradient(&store), vec![1.0, -1.0]);
    }

    #[test]
    fn test_equal_same_param_is_deduplicated() {
        let mut store = ParamStore::new();
        let a = store.add(3.0);
        let c = Constraint::proportional(a, a, 2.0);
        assert_eq!(c.parameters(), vec![a]);
        assert_relative_eq!(c.gradient(&store)[0], -1.0);
    }

    #[test]
    fn test_p2p_distance_error() {
        let mut store = ParamStore::new();
        let p1 = store.add_point(0.0, 0.0);
        let p2 = store.add_point(3.0, 4.0);
        let c = Constraint::p2p_distance(p1, p2, 5.0);
        assert_relative_eq!(c.error(&store), 0.0);
        let g = c.gradient(&store);
        assert_relative_eq!(g[0], -0.6);
        assert_relative_eq!(g[3], 0.8);
    }

    #[test]
    fn test_p2p_distance_degenerate_gradient_is_finite() {
        let mut store = ParamStore::new();
        let p1 = store.add_point(1.0, 1.0);
        let p2 = store.add_point(1.0, 1.0);
        let c = Constraint::p2p_distance(p1, p2, 2.0);
        let g = c.gradient(&store);
        assert!(g.iter().all(|v| v.is_finite()));
        assert_eq!(g, vec![-1.0, 0.0, 1.0, 0.0]);
        assert_relative_eq!(c.error(&store), -2.0);
    }

    #[test]
    fn test_parallel_and_perpendicular_errors() {
        let f = fixture();
        let l1 = Line::new(f.a, f.b);
        let par = Constraint::parallel(l1, l1);
        assert_relative_eq!(par.error(&f.store), 0.0);
        let mut store = ParamStore::new();
        let h = Line::new(store.add_point(0.0, 0.0), store.add_point(2.0, 0.0));
        let v = Line::new(store.add_point(5.0, 5.0), store.add_point(5.0, 9.0));
        assert_relative_eq!(Constraint::perpendicular(h, v).error(&store), 0.0);
        assert_relative_eq!(Constraint::parallel(h, v).error(&store), 8.0);
    }

    #[test]
    fn test_rescale_is_idempotent() {
        let mut store = ParamStore::new();
        let h = Line::new(store.add_point(0.0, 0.0), store.add_point(2.0, 0.0));
        let v = Line::new(store.add_point(5.0, 5.0), store.add_point(5.0, 9.0));
        let mut c = Constraint::parallel(h, v);
        c.rescale(&store, 1.0);
        let first = c.scale;
        c.rescale(&store, 1.0);
        assert_relative_eq!(c.scale, first);
        assert_relative_eq!(c.scale, 1.0 / 8.0);
        // rescaled cross product is the sine of the angle
        assert_relative_eq!(c.error(&store), 1.0);
    }

    #[test]
    fn test_gradients_match_finite_differences_for_point_line_kinds() {
        let mut f = fixture();
        let l1 = Line::new(f.a, f.b);
        let l2 = Line::new(f.c, f.d);
        let constraints = [
            Constraint::difference(f.a.x, f.b.y, 0.7),
            Constraint::p2p_distance(f.a, f.b, 2.0),
            Constraint::p2p_angle(f.a, f.b, 0.3),
            Constraint::p2l_distance(f.e, l1, 0.5),
            Constraint::point_on_line(f.e, l2),
            Constraint::point_on_perp_bisector(f.e, l1),
            Constraint::parallel(l1, l2),
            Constraint::perpendicular(l1, l2),
            Constraint::l2l_angle(l1, l2, PI / 3.0),
            Constraint::midpoint_on_line(l1, l2),
            Constraint::equal_length(l1, l2),
        ];
        for c in &constraints {
            assert_gradient_matches(c, &mut f.store);
        }
    }

    #[test]
    fn test_gradients_match_finite_differences_for_curve_kinds() {
        let mut f = fixture();
        let r1 = f.store.add(1.5);
        let r2 = f.store.add(0.7);
        let b = f.store.add(1.1);
        let u = f.store.add(0.4);
        let c1 = Circle::new(f.a, r1);
        let c2 = Circle::new(f.c, r2);
        let ellipse = Ellipse::new(f.a, f.e, b);
        let hyperbola = Hyperbola::new(f.a, f.b, b);
        let parabola = Parabola::new(f.c, f.e);
        let l1 = Line::new(f.a, f.b);
        let constraints = [
            Constraint::tangent_circumf(c1, c2, false),
            Constraint::tangent_circumf(c1, c2, true),
            Constraint::tangent_line_circle(l1, c2),
            Constraint::point_on_circle(f.d, c1),
            Constraint::point_on_ellipse(f.d, ellipse),
            Constraint::point_on_hyperbola(f.d, hyperbola),
            Constraint::point_on_parabola(f.d, parabola),
            Constraint::curve_value(f.d, ellipse, u, Axis::X),
            Constraint::curve_value(f.d, hyperbola, u, Axis::Y),
            Constraint::curve_value(f.d, parabola, u, Axis::Y),
            Constraint::angle_via_point(c1, l1, f.d, 0.2),
            Constraint::angle_via_point(ellipse, parabola, f.d, 1.0),
            Constraint::snell(l1, Line::new(f.b, f.c), c2, f.b, 1.0, 1.3, false, true),
        ];
        for c in &constraints {
            assert_gradient_matches(c, &mut f.store);
        }
    }

    #[test]
    fn test_bspline_curve_value_gradient() {
        let mut store = ParamStore::new();
        let poles = vec![
            store.add_point(0.0, 0.0),
            store.add_point(1.0, 2.0),
            store.add_point(3.0, 2.5),
            store.add_point(4.0, 0.0),
        ];
        let weights = vec![store.add(1.0), store.add(1.5), store.add(0.8), store.add(1.0)];
        let knots = BSpline::clamped_knots(4, 2)
            .into_iter()
            .map(|k| store.add_fixed(k))
            .collect();
        let spline = BSpline::new(2, poles, weights, knots).unwrap();
        let p = store.add_point(2.0, 1.0);
        let u = store.add(0.3);
        let c = Constraint::curve_value(p, spline.clone(), u, Axis::Y);
        assert_gradient_matches(&c, &mut store);
        let on = Constraint::point_on_curve(p, spline);
        assert!(on.gradient(&store).iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_coincident_and_axis_helpers() {
        let mut store = ParamStore::new();
        let p1 = store.add_point(1.0, 2.0);
        let p2 = store.add_point(1.0, 5.0);
        let [cx, cy] = Constraint::coincident(&p1, &p2);
        assert_relative_eq!(cx.error(&store), 0.0);
        assert_relative_eq!(cy.error(&store), -3.0);
        let line = Line::new(p1, p2);
        assert_relative_eq!(Constraint::vertical(&line).error(&store), 0.0);
        assert_relative_eq!(Constraint::horizontal(&line).error(&store), -3.0);
    }
}
