//! Residuals of the scalar, point and line constraints.

use crate::dual::Dual;
use crate::geometry::{Circle, Eval, Line, Point};
use crate::param::ParamId;

pub(crate) fn equal(ev: &Eval, a: ParamId, b: ParamId, ratio: f64) -> Dual {
    ev.var(a) - ev.var(b) * ratio
}

pub(crate) fn difference(ev: &Eval, a: ParamId, b: ParamId, difference: f64) -> Dual {
    ev.var(b) - ev.var(a) - difference
}

pub(crate) fn p2p_distance(ev: &Eval, p1: &Point, p2: &Point, distance: f64) -> Dual {
    (ev.point(p2) - ev.point(p1)).length() - distance
}

pub(crate) fn p2p_angle(ev: &Eval, p1: &Point, p2: &Point, angle: f64) -> Dual {
    let d = ev.point(p2) - ev.point(p1);
    (d.y.atan2(d.x) - angle).wrap_angle()
}

pub(crate) fn p2l_distance(ev: &Eval, p: &Point, line: &Line, distance: f64) -> Dual {
    line.point_residual(ev, &ev.point(p)).abs() - distance
}

/// Twice the signed triangle area; rescaling divides by the line length.
pub(crate) fn point_on_line(ev: &Eval, p: &Point, line: &Line) -> Dual {
    line.direction(ev).cross(&(ev.point(p) - ev.point(&line.p1)))
}

pub(crate) fn point_on_perp_bisector(ev: &Eval, p: &Point, line: &Line) -> Dual {
    let a = ev.point(&line.p1);
    let b = ev.point(&line.p2);
    let mid = (a + b) * 0.5;
    (ev.point(p) - mid).dot(&(b - a))
}

pub(crate) fn parallel(ev: &Eval, l1: &Line, l2: &Line) -> Dual {
    l1.direction(ev).cross(&l2.direction(ev))
}

pub(crate) fn perpendicular(ev: &Eval, l1: &Line, l2: &Line) -> Dual {
    l1.direction(ev).dot(&l2.direction(ev))
}

pub(crate) fn l2l_angle(ev: &Eval, l1: &Line, l2: &Line, angle: f64) -> Dual {
    let d1 = l1.direction(ev);
    let d2 = l2.direction(ev);
    (d1.cross(&d2).atan2(d1.dot(&d2)) - angle).wrap_angle()
}

pub(crate) fn midpoint_on_line(ev: &Eval, l1: &Line, l2: &Line) -> Dual {
    let mid = (ev.point(&l1.p1) + ev.point(&l1.p2)) * 0.5;
    l2.direction(ev).cross(&(mid - ev.point(&l2.p1)))
}

pub(crate) fn equal_length(ev: &Eval, l1: &Line, l2: &Line) -> Dual {
    l1.direction(ev).length() - l2.direction(ev).length()
}

pub(crate) fn tangent_circumf(ev: &Eval, c1: &Circle, c2: &Circle, internal: bool) -> Dual {
    let dist = (ev.point(&c2.center) - ev.point(&c1.center)).length();
    let r1 = ev.var(c1.radius);
    let r2 = ev.var(c2.radius);
    if internal {
        dist - (r1 - r2).abs()
    } else {
        dist - (r1 + r2)
    }
}

pub(crate) fn tangent_line_circle(ev: &Eval, line: &Line, circle: &Circle) -> Dual {
    line.point_residual(ev, &ev.point(&circle.center)).abs() - ev.var(circle.radius)
}

/// Scale that turns a line-length-weighted residual into a distance.
pub(crate) fn inverse_length(ev: &Eval, line: &Line) -> f64 {
    1.0 / line.direction(ev).length().floored().v
}
