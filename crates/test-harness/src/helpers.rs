//! Helper functions: error type and planar vector math.

use gcs_solver::{GcsError, SolveStatus};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("corner not found: {name}")]
    CornerNotFound { name: String },

    #[error("wall not found: {name}")]
    WallNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("room needs at least {needed} corners, has {found}")]
    TooFewCorners { needed: usize, found: usize },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("solve ended with {status:?}")]
    Solve { status: SolveStatus },

    #[error(transparent)]
    Gcs(#[from] GcsError),
}

// ── Planar Math ─────────────────────────────────────────────────────────────

pub fn sub(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    (a.0 - b.0, a.1 - b.1)
}

pub fn length(v: (f64, f64)) -> f64 {
    v.0.hypot(v.1)
}

/// Sine of the angle between two vectors; 0 when either is degenerate.
pub fn sin_between(a: (f64, f64), b: (f64, f64)) -> f64 {
    let n = length(a) * length(b);
    if n == 0.0 {
        0.0
    } else {
        (a.0 * b.1 - a.1 * b.0) / n
    }
}

/// Cosine of the angle between two vectors; 0 when either is degenerate.
pub fn cos_between(a: (f64, f64), b: (f64, f64)) -> f64 {
    let n = length(a) * length(b);
    if n == 0.0 {
        0.0
    } else {
        (a.0 * b.0 + a.1 * b.1) / n
    }
}
