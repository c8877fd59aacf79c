//! Residuals of constraints that involve curves.

use super::Axis;
use crate::dual::Dual;
use crate::geometry::{Circle, Curve, Ellipse, Eval, Hyperbola, Parabola, Point};
use crate::param::ParamId;

pub(crate) fn point_on_circle(ev: &Eval, p: &Point, circle: &Circle) -> Dual {
    circle.point_residual(ev, &ev.point(p))
}

pub(crate) fn point_on_ellipse(ev: &Eval, p: &Point, ellipse: &Ellipse) -> Dual {
    ellipse.point_residual(ev, &ev.point(p))
}

pub(crate) fn point_on_hyperbola(ev: &Eval, p: &Point, hyperbola: &Hyperbola) -> Dual {
    hyperbola.point_residual(ev, &ev.point(p))
}

pub(crate) fn point_on_parabola(ev: &Eval, p: &Point, parabola: &Parabola) -> Dual {
    parabola.point_residual(ev, &ev.point(p))
}

pub(crate) fn point_on_curve(ev: &Eval, p: &Point, curve: &Curve) -> Dual {
    curve.point_residual(ev, &ev.point(p))
}

pub(crate) fn curve_value(ev: &Eval, p: &Point, curve: &Curve, u: ParamId, axis: Axis) -> Dual {
    let on_curve = curve.value(ev, ev.var(u));
    let pos = ev.point(p);
    match axis {
        Axis::X => pos.x - on_curve.x,
        Axis::Y => pos.y - on_curve.y,
    }
}

/// Angle between the two curve normals at `p`, minus the target.
pub(crate) fn angle_via_point(ev: &Eval, crv1: &Curve, crv2: &Curve, p: &Point, angle: f64) -> Dual {
    let at = ev.point(p);
    let n1 = crv1.normal_at(ev, &at);
    let n2 = crv2.normal_at(ev, &at);
    (n1.cross(&n2).atan2(n1.dot(&n2)) - angle).wrap_angle()
}

/// Refraction law `n1 sin(theta1) = n2 sin(theta2)` at `p`, with both angles
/// measured between the ray tangents and the boundary normal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn snell(
    ev: &Eval,
    ray1: &Curve,
    ray2: &Curve,
    boundary: &Curve,
    p: &Point,
    n1: f64,
    n2: f64,
    flip1: bool,
    flip2: bool,
) -> Dual {
    let at = ev.point(p);
    let mut t1 = ray1.normal_at(ev, &at).rot90cw().normalized();
    let mut t2 = ray2.normal_at(ev, &at).rot90cw().normalized();
    if flip1 {
        t1 = -t1;
    }
    if flip2 {
        t2 = -t2;
    }
    let nb = boundary.normal_at(ev, &at).normalized();
    let sin1 = nb.cross(&t1);
    let sin2 = nb.cross(&t2);
    sin1 * n1 - sin2 * n2
}
