//! Rich assertion helpers with diagnostic output.
//!
//! Every failure includes the context label, expected vs actual values, and
//! the solve status so a failing scenario reads without a debugger.

use crate::helpers::{cos_between, sin_between, HarnessError};
use crate::workflow::SolvedRoom;

fn fail(ctx: &str, room: &SolvedRoom, detail: String) -> HarnessError {
    HarnessError::AssertionFailed {
        detail: format!(
            "[{}] {} (status {:?}, max error {:.3e}, {} iterations)",
            ctx, detail, room.status, room.max_error, room.iterations,
        ),
    }
}

/// Assert the solve ended in `Success` or `ConvergedToLocalMinimum`.
pub fn assert_status_solved(room: &SolvedRoom, ctx: &str) -> Result<(), HarnessError> {
    if room.status.is_solved() {
        Ok(())
    } else {
        Err(fail(ctx, room, "expected a solved room".to_string()))
    }
}

/// Assert a wall's length within tolerance.
pub fn assert_wall_length(
    room: &SolvedRoom,
    wall: &str,
    expected: f64,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let actual = room.wall_length(wall)?;
    if (actual - expected).abs() <= tol {
        Ok(())
    } else {
        Err(fail(
            ctx,
            room,
            format!("wall {wall}: expected length {expected:.6}, got {actual:.6} (tol={tol})"),
        ))
    }
}

/// Assert a wall runs along the x or y axis.
pub fn assert_axis_aligned(
    room: &SolvedRoom,
    wall: &str,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (dx, dy) = room.wall_vector(wall)?;
    if dx.abs() <= tol || dy.abs() <= tol {
        Ok(())
    } else {
        Err(fail(
            ctx,
            room,
            format!("wall {wall} is not axis aligned: direction ({dx:.6}, {dy:.6})"),
        ))
    }
}

/// Assert two walls meet at a right angle (|cos| within tolerance).
pub fn assert_perpendicular(
    room: &SolvedRoom,
    a: &str,
    b: &str,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let cos = cos_between(room.wall_vector(a)?, room.wall_vector(b)?);
    if cos.abs() <= tol {
        Ok(())
    } else {
        Err(fail(
            ctx,
            room,
            format!("walls {a} and {b}: cos = {cos:.3e}, expected 0 (tol={tol})"),
        ))
    }
}

/// Assert two walls are parallel (|sin| within tolerance).
pub fn assert_parallel(
    room: &SolvedRoom,
    a: &str,
    b: &str,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let sin = sin_between(room.wall_vector(a)?, room.wall_vector(b)?);
    if sin.abs() <= tol {
        Ok(())
    } else {
        Err(fail(
            ctx,
            room,
            format!("walls {a} and {b}: sin = {sin:.3e}, expected 0 (tol={tol})"),
        ))
    }
}

/// Assert a corner's coordinates within tolerance.
pub fn assert_corner_near(
    room: &SolvedRoom,
    corner: &str,
    expected: (f64, f64),
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let (x, y) = room.corner(corner)?;
    if (x - expected.0).abs() <= tol && (y - expected.1).abs() <= tol {
        Ok(())
    } else {
        Err(fail(
            ctx,
            room,
            format!(
                "corner {corner} = ({x:.4}, {y:.4}), expected ({:.4}, {:.4}), tol={tol}",
                expected.0, expected.1,
            ),
        ))
    }
}
