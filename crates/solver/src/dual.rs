//! Forward-mode derivative numbers.
//!
//! Residuals are evaluated on [`Dual`] values that carry the derivative with
//! respect to one chosen parameter alongside the value. Evaluating a
//! constraint once per parameter yields its exact gradient row.

use std::f64::consts::PI;
use std::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::Vector2;

/// Lengths below this are treated as degenerate.
pub const LENGTH_FLOOR: f64 = 1e-10;

/// A value together with its derivative with respect to one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dual {
    pub v: f64,
    pub d: f64,
}

impl Dual {
    pub const fn new(v: f64, d: f64) -> Self {
        Self { v, d }
    }

    pub const fn constant(v: f64) -> Self {
        Self { v, d: 0.0 }
    }

    pub fn sqrt(self) -> Self {
        if self.v <= LENGTH_FLOOR * LENGTH_FLOOR {
            return Self::new(self.v.max(0.0).sqrt(), 0.0);
        }
        let s = self.v.sqrt();
        Self::new(s, self.d / (2.0 * s))
    }

    pub fn sin(self) -> Self {
        Self::new(self.v.sin(), self.d * self.v.cos())
    }

    pub fn cos(self) -> Self {
        Self::new(self.v.cos(), -self.d * self.v.sin())
    }

    pub fn sinh(self) -> Self {
        Self::new(self.v.sinh(), self.d * self.v.cosh())
    }

    pub fn cosh(self) -> Self {
        Self::new(self.v.cosh(), self.d * self.v.sinh())
    }

    /// `atan2(self, x)`; the origin maps to angle 0 with zero derivative.
    pub fn atan2(self, x: Dual) -> Self {
        let r2 = self.v * self.v + x.v * x.v;
        if r2 < LENGTH_FLOOR * LENGTH_FLOOR {
            return Self::constant(0.0);
        }
        Self::new(self.v.atan2(x.v), (x.v * self.d - self.v * x.d) / r2)
    }

    /// Absolute value; zero takes the positive branch.
    pub fn abs(self) -> Self {
        if self.v < 0.0 { -self } else { self }
    }

    pub fn square(self) -> Self {
        self * self
    }

    /// Clamp the magnitude away from zero so the value can be divided by.
    pub fn floored(self) -> Self {
        if self.v.abs() >= LENGTH_FLOOR {
            self
        } else if self.v < 0.0 {
            Self::new(-LENGTH_FLOOR, self.d)
        } else {
            Self::new(LENGTH_FLOOR, self.d)
        }
    }

    /// Wrap the value into (-pi, pi]; the derivative is unaffected.
    pub fn wrap_angle(self) -> Self {
        let mut v = self.v % (2.0 * PI);
        if v > PI {
            v -= 2.0 * PI;
        } else if v <= -PI {
            v += 2.0 * PI;
        }
        Self::new(v, self.d)
    }
}

impl From<f64> for Dual {
    fn from(v: f64) -> Self {
        Self::constant(v)
    }
}

impl Add for Dual {
    type Output = Dual;
    fn add(self, rhs: Dual) -> Dual {
        Dual::new(self.v + rhs.v, self.d + rhs.d)
    }
}

impl Sub for Dual {
    type Output = Dual;
    fn sub(self, rhs: Dual) -> Dual {
        Dual::new(self.v - rhs.v, self.d - rhs.d)
    }
}

impl Mul for Dual {
    type Output = Dual;
    fn mul(self, rhs: Dual) -> Dual {
        Dual::new(self.v * rhs.v, self.d * rhs.v + self.v * rhs.d)
    }
}

impl Div for Dual {
    type Output = Dual;
    fn div(self, rhs: Dual) -> Dual {
        Dual::new(
            self.v / rhs.v,
            (self.d * rhs.v - self.v * rhs.d) / (rhs.v * rhs.v),
        )
    }
}

impl Add<f64> for Dual {
    type Output = Dual;
    fn add(self, rhs: f64) -> Dual {
        Dual::new(self.v + rhs, self.d)
    }
}

impl Sub<f64> for Dual {
    type Output = Dual;
    fn sub(self, rhs: f64) -> Dual {
        Dual::new(self.v - rhs, self.d)
    }
}

impl Mul<f64> for Dual {
    type Output = Dual;
    fn mul(self, rhs: f64) -> Dual {
        Dual::new(self.v * rhs, self.d * rhs)
    }
}

impl Div<f64> for Dual {
    type Output = Dual;
    fn div(self, rhs: f64) -> Dual {
        Dual::new(self.v / rhs, self.d / rhs)
    }
}

impl Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        Dual::new(-self.v, -self.d)
    }
}

/// A 2D vector of [`Dual`] coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DualVec2 {
    pub x: Dual,
    pub y: Dual,
}

impl DualVec2 {
    pub const fn new(x: Dual, y: Dual) -> Self {
        Self { x, y }
    }

    pub const fn constant(x: f64, y: f64) -> Self {
        Self::new(Dual::constant(x), Dual::constant(y))
    }

    pub fn dot(&self, other: &DualVec2) -> Dual {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(&self, other: &DualVec2) -> Dual {
        self.x * other.y - self.y * other.x
    }

    /// Euclidean length. Near-zero vectors report their derivative along the
    /// fixed fallback direction (1, 0).
    pub fn length(&self) -> Dual {
        let sq = self.dot(self);
        if sq.v > LENGTH_FLOOR * LENGTH_FLOOR {
            sq.sqrt()
        } else {
            Dual::new(sq.v.max(0.0).sqrt(), self.x.d)
        }
    }

    /// Unit vector; degenerate vectors normalize to (1, 0).
    pub fn normalized(&self) -> DualVec2 {
        let len = self.length();
        if len.v < LENGTH_FLOOR {
            return DualVec2::constant(1.0, 0.0);
        }
        DualVec2::new(self.x / len, self.y / len)
    }

    pub fn scale(&self, s: Dual) -> DualVec2 {
        DualVec2::new(self.x * s, self.y * s)
    }

    pub fn rot90ccw(&self) -> DualVec2 {
        DualVec2::new(-self.y, self.x)
    }

    pub fn rot90cw(&self) -> DualVec2 {
        DualVec2::new(self.y, -self.x)
    }

    pub fn value(&self) -> Vector2<f64> {
        Vector2::new(self.x.v, self.y.v)
    }

    pub fn derivative(&self) -> Vector2<f64> {
        Vector2::new(self.x.d, self.y.d)
    }
}

impl Add for DualVec2 {
    type Output = DualVec2;
    fn add(self, rhs: DualVec2) -> DualVec2 {
        DualVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for DualVec2 {
    type Output = DualVec2;
    fn sub(self, rhs: DualVec2) -> DualVec2 {
        DualVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for DualVec2 {
    type Output = DualVec2;
    fn mul(self, rhs: f64) -> DualVec2 {
        DualVec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for DualVec2 {
    type Output = DualVec2;
    fn neg(self) -> DualVec2 {
        DualVec2::new(-self.x, -self.y)
    }
}
