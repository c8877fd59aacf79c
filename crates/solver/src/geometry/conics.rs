//! Circles, arcs and the other conic sections.
//!
//! Ellipses and hyperbolas are defined by their center, one focus and the
//! minor radius; the second focus is the reflection of the first through the
//! center. Parabolas are defined by vertex and focus.

use serde::{Deserialize, Serialize};

use super::{Eval, Point};
use crate::dual::{Dual, DualVec2};
use crate::param::ParamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: ParamId,
}

impl Circle {
    pub fn new(center: Point, radius: ParamId) -> Self {
        Self { center, radius }
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![self.center.x, self.center.y, self.radius]
    }

    /// `center + r (cos u, sin u)`.
    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let c = ev.point(&self.center);
        let r = ev.var(self.radius);
        c + DualVec2::new(u.cos(), u.sin()).scale(r)
    }

    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        (*p - ev.point(&self.center)).length() - ev.var(self.radius)
    }

    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        *p - ev.point(&self.center)
    }
}

/// Circular arc running counter-clockwise from `start_angle` to `end_angle`.
/// The endpoint points are tied to the angles by arc-rule constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point,
    pub radius: ParamId,
    pub start: Point,
    pub end: Point,
    pub start_angle: ParamId,
    pub end_angle: ParamId,
}

impl Arc {
    pub fn circle(&self) -> Circle {
        Circle::new(self.center, self.radius)
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![
            self.center.x,
            self.center.y,
            self.radius,
            self.start.x,
            self.start.y,
            self.end.x,
            self.end.y,
            self.start_angle,
            self.end_angle,
        ]
    }
}

/// Major-axis frame shared by ellipses and hyperbolas.
struct FocalFrame {
    center: DualVec2,
    focus1: DualVec2,
    focus2: DualVec2,
    /// Unit vector from the center toward focus1.
    major: DualVec2,
    /// Center-to-focus distance.
    focal: Dual,
    minor_radius: Dual,
}

impl FocalFrame {
    fn new(ev: &Eval, center: &Point, focus1: &Point, radmin: ParamId) -> Self {
        let c = ev.point(center);
        let f1 = ev.point(focus1);
        let cf = f1 - c;
        Self {
            center: c,
            focus1: f1,
            focus2: c - cf,
            major: cf.normalized(),
            focal: cf.length(),
            minor_radius: ev.var(radmin),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point,
    pub focus1: Point,
    pub radmin: ParamId,
}

impl Ellipse {
    pub fn new(center: Point, focus1: Point, radmin: ParamId) -> Self {
        Self {
            center,
            focus1,
            radmin,
        }
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![
            self.center.x,
            self.center.y,
            self.focus1.x,
            self.focus1.y,
            self.radmin,
        ]
    }

    /// Major radius `sqrt(b^2 + c^2)`.
    pub fn major_radius(&self, ev: &Eval) -> Dual {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        (f.minor_radius.square() + f.focal.square()).sqrt()
    }

    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        let a = (f.minor_radius.square() + f.focal.square()).sqrt();
        let minor = f.major.rot90ccw();
        f.center + f.major.scale(a * u.cos()) + minor.scale(f.minor_radius * u.sin())
    }

    /// `|p - f1| + |p - f2| - 2a`.
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        let a = (f.minor_radius.square() + f.focal.square()).sqrt();
        (*p - f.focus1).length() + (*p - f.focus2).length() - a * 2.0
    }

    /// Gradient of the focal-distance sum; points outward.
    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        (*p - f.focus1).normalized() + (*p - f.focus2).normalized()
    }
}

/// Elliptical arc over the eccentric-anomaly range `[start_angle, end_angle]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcOfEllipse {
    pub ellipse: Ellipse,
    pub start: Point,
    pub end: Point,
    pub start_angle: ParamId,
    pub end_angle: ParamId,
}

impl ArcOfEllipse {
    pub fn params(&self) -> Vec<ParamId> {
        let mut params = self.ellipse.params();
        params.extend([
            self.start.x,
            self.start.y,
            self.end.x,
            self.end.y,
            self.start_angle,
            self.end_angle,
        ]);
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hyperbola {
    pub center: Point,
    pub focus1: Point,
    pub radmin: ParamId,
}

impl Hyperbola {
    pub fn new(center: Point, focus1: Point, radmin: ParamId) -> Self {
        Self {
            center,
            focus1,
            radmin,
        }
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![
            self.center.x,
            self.center.y,
            self.focus1.x,
            self.focus1.y,
            self.radmin,
        ]
    }

    /// Major radius `sqrt(c^2 - b^2)`, zero when the focus is too close.
    pub fn major_radius(&self, ev: &Eval) -> Dual {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        (f.focal.square() - f.minor_radius.square()).sqrt()
    }

    /// Branch on the focus1 side: `c + a cosh(u) e + b sinh(u) n`.
    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        let a = (f.focal.square() - f.minor_radius.square()).sqrt();
        let minor = f.major.rot90ccw();
        f.center + f.major.scale(a * u.cosh()) + minor.scale(f.minor_radius * u.sinh())
    }

    /// `|p - f2| - |p - f1| - 2a`, zero on the branch nearest focus1.
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        let a = (f.focal.square() - f.minor_radius.square()).sqrt();
        (*p - f.focus2).length() - (*p - f.focus1).length() - a * 2.0
    }

    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        let f = FocalFrame::new(ev, &self.center, &self.focus1, self.radmin);
        (*p - f.focus2).normalized() - (*p - f.focus1).normalized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArcOfHyperbola {
    pub hyperbola: Hyperbola,
    pub start: Point,
    pub end: Point,
    pub start_angle: ParamId,
    pub end_angle: ParamId,
}

impl ArcOfHyperbola {
    pub fn params(&self) -> Vec<ParamId> {
        let mut params = self.hyperbola.params();
        params.extend([
            self.start.x,
            self.start.y,
            self.end.x,
            self.end.y,
            self.start_angle,
            self.end_angle,
        ]);
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parabola {
    pub vertex: Point,
    pub focus1: Point,
}

impl Parabola {
    pub fn new(vertex: Point, focus1: Point) -> Self {
        Self { vertex, focus1 }
    }

    pub fn params(&self) -> Vec<ParamId> {
        vec![self.vertex.x, self.vertex.y, self.focus1.x, self.focus1.y]
    }

    /// Unit axis (vertex toward focus) and focal length.
    fn axis(&self, ev: &Eval) -> (DualVec2, Dual) {
        let vf = ev.point(&self.focus1) - ev.point(&self.vertex);
        (vf.normalized(), vf.length().floored())
    }

    /// `vertex + u^2 / (4 f) e + u n`.
    pub fn value(&self, ev: &Eval, u: Dual) -> DualVec2 {
        let (e, focal) = self.axis(ev);
        let v = ev.point(&self.vertex);
        v + e.scale(u.square() / (focal * 4.0)) + e.rot90ccw().scale(u)
    }

    /// Distance to the focus minus distance to the directrix.
    pub fn point_residual(&self, ev: &Eval, p: &DualVec2) -> Dual {
        let (e, focal) = self.axis(ev);
        let v = ev.point(&self.vertex);
        let f = ev.point(&self.focus1);
        (*p - f).length() - ((*p - v).dot(&e) + focal)
    }

    pub fn normal_at(&self, ev: &Eval, p: &DualVec2) -> DualVec2 {
        let (e, _) = self.axis(ev);
        (*p - ev.point(&self.focus1)).normalized() - e
    }
}
