//! RoomBuilder: fluent API for scripting floor-plan sketches in tests.
//!
//! Mirrors how a floor-plan editor drives the solver: one parameter pair per
//! corner, one constraint per drawn relationship, then solve and read the
//! corner coordinates back. All methods take names instead of handles.

use std::collections::HashMap;

use gcs_solver::{
    Algorithm, Constraint, ConstraintId, DiagnosticResult, Line, Point, SolveStatus,
    SolverParameters, System,
};

use crate::helpers::*;
use crate::report::SystemReport;

/// A wall between two named corners.
#[derive(Debug, Clone)]
pub struct Wall {
    pub name: String,
    pub from: String,
    pub to: String,
    pub line: Line,
}

/// A fluent builder over a [`System`] for room-shaped sketches.
pub struct RoomBuilder {
    pub system: System,
    corners: HashMap<String, Point>,
    corner_order: Vec<String>,
    walls: Vec<Wall>,
    history: Vec<(String, String)>,
}

impl Default for RoomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomBuilder {
    pub fn new() -> Self {
        Self::with_parameters(SolverParameters::default())
    }

    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self::with_parameters(SolverParameters::with_algorithm(algorithm))
    }

    pub fn with_parameters(config: SolverParameters) -> Self {
        Self {
            system: System::with_parameters(config),
            corners: HashMap::new(),
            corner_order: Vec::new(),
            walls: Vec::new(),
            history: Vec::new(),
        }
    }

    // ── Geometry ────────────────────────────────────────────────────────

    /// Add a corner at its measured (rough) position.
    pub fn corner(&mut self, name: &str, x: f64, y: f64) -> Result<Point, HarnessError> {
        if self.corners.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        let p = self.system.add_point(x, y);
        self.corners.insert(name.to_string(), p);
        self.corner_order.push(name.to_string());
        self.record("corner", format!("{name} at ({x:.3}, {y:.3})"));
        Ok(p)
    }

    /// Add a wall from one corner to another.
    pub fn wall(&mut self, name: &str, from: &str, to: &str) -> Result<Line, HarnessError> {
        if self.walls.iter().any(|w| w.name == name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        let line = Line::new(self.corner_point(from)?, self.corner_point(to)?);
        self.walls.push(Wall {
            name: name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            line,
        });
        self.record("wall", format!("{name}: {from} -> {to}"));
        Ok(line)
    }

    /// Walls between consecutive corners, closing back to the first one.
    /// Wall names are `"{from}-{to}"`.
    pub fn close(&mut self) -> Result<Vec<String>, HarnessError> {
        let n = self.corner_order.len();
        if n < 3 {
            return Err(HarnessError::TooFewCorners {
                needed: 3,
                found: n,
            });
        }
        let order = self.corner_order.clone();
        let mut names = Vec::with_capacity(n);
        for i in 0..n {
            let (from, to) = (&order[i], &order[(i + 1) % n]);
            let name = format!("{from}-{to}");
            self.wall(&name, from, to)?;
            names.push(name);
        }
        Ok(names)
    }

    // ── Constraints ─────────────────────────────────────────────────────

    pub fn horizontal(&mut self, wall: &str) -> Result<ConstraintId, HarnessError> {
        let c = Constraint::horizontal(&self.wall_line(wall)?);
        self.constrain("horizontal", wall.to_string(), c)
    }

    pub fn vertical(&mut self, wall: &str) -> Result<ConstraintId, HarnessError> {
        let c = Constraint::vertical(&self.wall_line(wall)?);
        self.constrain("vertical", wall.to_string(), c)
    }

    pub fn length(&mut self, wall: &str, length: f64) -> Result<ConstraintId, HarnessError> {
        let line = self.wall_line(wall)?;
        let c = Constraint::p2p_distance(line.p1, line.p2, length);
        self.constrain("length", format!("{wall} = {length}"), c)
    }

    pub fn perpendicular(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let c = Constraint::perpendicular(self.wall_line(a)?, self.wall_line(b)?);
        self.constrain("perpendicular", format!("{a} _|_ {b}"), c)
    }

    pub fn parallel(&mut self, a: &str, b: &str) -> Result<ConstraintId, HarnessError> {
        let c = Constraint::parallel(self.wall_line(a)?, self.wall_line(b)?);
        self.constrain("parallel", format!("{a} || {b}"), c)
    }

    pub fn corner_on_wall(&mut self, corner: &str, wall: &str) -> Result<ConstraintId, HarnessError> {
        let c = Constraint::point_on_line(self.corner_point(corner)?, self.wall_line(wall)?);
        self.constrain("corner_on_wall", format!("{corner} on {wall}"), c)
    }

    pub fn coincident(&mut self, a: &str, b: &str) -> Result<Vec<ConstraintId>, HarnessError> {
        let [cx, cy] = Constraint::coincident(&self.corner_point(a)?, &self.corner_point(b)?);
        Ok(vec![
            self.constrain("coincident", format!("{a} == {b} (x)"), cx)?,
            self.constrain("coincident", format!("{a} == {b} (y)"), cy)?,
        ])
    }

    /// Pin a corner at its current position.
    pub fn anchor(&mut self, corner: &str) -> Result<(), HarnessError> {
        let p = self.corner_point(corner)?;
        self.system.set_fixed(p.x, true)?;
        self.system.set_fixed(p.y, true)?;
        self.record("anchor", corner.to_string());
        Ok(())
    }

    fn constrain(
        &mut self,
        op: &str,
        detail: String,
        c: Constraint,
    ) -> Result<ConstraintId, HarnessError> {
        let tag = self.system.constraint_count() as i32;
        let id = self.system.add_constraint(c.with_tag(tag))?;
        self.record(op, detail);
        Ok(id)
    }

    fn record(&mut self, op: &str, detail: String) {
        self.history.push((op.to_string(), detail));
    }

    // ── Solve and Query ─────────────────────────────────────────────────

    /// Solve and read every corner back.
    pub fn solve(&mut self) -> SolvedRoom {
        let status = self.system.solve();
        self.record("solve", format!("{status:?}"));
        self.snapshot(status)
    }

    /// Solve, turning anything but a (soft) success into an error.
    pub fn try_solve(&mut self) -> Result<SolvedRoom, HarnessError> {
        let room = self.solve();
        if room.status.is_solved() {
            Ok(room)
        } else {
            Err(HarnessError::Solve {
                status: room.status,
            })
        }
    }

    /// Partition first, then solve.
    pub fn solve_partitioned(&mut self) -> SolvedRoom {
        self.system.partition_constraints();
        self.solve()
    }

    pub fn diagnose(&self) -> DiagnosticResult {
        self.system.diagnose()
    }

    pub fn dof(&self) -> i64 {
        self.system.dof()
    }

    pub fn report(&self) -> SystemReport {
        SystemReport::from_system(&self.system)
    }

    pub fn corner_point(&self, name: &str) -> Result<Point, HarnessError> {
        self.corners
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::CornerNotFound {
                name: name.to_string(),
            })
    }

    pub fn wall_line(&self, name: &str) -> Result<Line, HarnessError> {
        self.walls
            .iter()
            .find(|w| w.name == name)
            .map(|w| w.line)
            .ok_or_else(|| HarnessError::WallNotFound {
                name: name.to_string(),
            })
    }

    pub fn corner_count(&self) -> usize {
        self.corner_order.len()
    }

    /// Operation log as (operation, detail) pairs.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    fn snapshot(&self, status: SolveStatus) -> SolvedRoom {
        let corners = self
            .corner_order
            .iter()
            .map(|name| (name.clone(), self.system.point(&self.corners[name])))
            .collect();
        SolvedRoom {
            status,
            iterations: self.system.last_iterations(),
            dof: self.system.dof(),
            max_error: self.system.max_error(),
            corners,
            walls: self.walls.clone(),
        }
    }
}

/// Corner coordinates read back after a solve.
#[derive(Debug, Clone)]
pub struct SolvedRoom {
    pub status: SolveStatus,
    pub iterations: usize,
    pub dof: i64,
    pub max_error: f64,
    /// Corners in creation order.
    pub corners: Vec<(String, (f64, f64))>,
    pub walls: Vec<Wall>,
}

impl SolvedRoom {
    pub fn corner(&self, name: &str) -> Result<(f64, f64), HarnessError> {
        self.corners
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, xy)| *xy)
            .ok_or_else(|| HarnessError::CornerNotFound {
                name: name.to_string(),
            })
    }

    /// Vector from a wall's first corner to its second.
    pub fn wall_vector(&self, name: &str) -> Result<(f64, f64), HarnessError> {
        let wall = self
            .walls
            .iter()
            .find(|w| w.name == name)
            .ok_or_else(|| HarnessError::WallNotFound {
                name: name.to_string(),
            })?;
        Ok(sub(self.corner(&wall.to)?, self.corner(&wall.from)?))
    }

    pub fn wall_length(&self, name: &str) -> Result<f64, HarnessError> {
        Ok(length(self.wall_vector(name)?))
    }
}
