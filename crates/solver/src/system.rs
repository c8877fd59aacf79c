//! The solver façade: owns parameters and constraints, partitions them into
//! independent SubSystems and drives the configured solver over each one.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::constraints::{Axis, Constraint, ConstraintId};
use crate::error::{GcsError, SolveStatus};
use crate::geometry::{
    Arc, ArcOfEllipse, ArcOfHyperbola, BSpline, Circle, Curve, Ellipse, Hyperbola, Line,
    Parabola, Point,
};
use crate::param::{ParamId, ParamStore};
use crate::solvers::{self, SolverParameters};
use crate::subsystem::{ConstraintSet, SubSystem};

/// Observable lifecycle of a [`System`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemState {
    #[default]
    Empty,
    /// Constraints present, no valid partition.
    Configured,
    Partitioned,
    Solved(SolveStatus),
}

#[derive(Debug, Clone, Default)]
pub struct System {
    pub(crate) params: ParamStore,
    pub(crate) constraints: ConstraintSet,
    /// Insertion order of live constraints.
    pub(crate) order: Vec<ConstraintId>,
    subsystems: Vec<SubSystem>,
    partitioned: bool,
    pub(crate) config: SolverParameters,
    state: SystemState,
    last_iterations: usize,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(config: SolverParameters) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // ── Parameters and Geometry ──────────────────────────────────────────

    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    pub fn add_param(&mut self, value: f64) -> ParamId {
        self.params.add(value)
    }

    pub fn add_named_param(&mut self, name: &str, value: f64) -> ParamId {
        self.params.add_named(name, value)
    }

    pub fn add_fixed_param(&mut self, value: f64) -> ParamId {
        self.params.add_fixed(value)
    }

    pub fn value(&self, id: ParamId) -> f64 {
        self.params.value(id)
    }

    pub fn set_value(&mut self, id: ParamId, value: f64) -> Result<(), GcsError> {
        if self.params.set_value(id, value) {
            Ok(())
        } else {
            Err(GcsError::UnknownParameter)
        }
    }

    /// Fix or release a parameter. Changes connectivity, so any partition is
    /// dropped.
    pub fn set_fixed(&mut self, id: ParamId, fixed: bool) -> Result<(), GcsError> {
        if !self.params.set_fixed(id, fixed) {
            return Err(GcsError::UnknownParameter);
        }
        self.invalidate();
        Ok(())
    }

    pub fn add_point(&mut self, x: f64, y: f64) -> Point {
        self.params.add_point(x, y)
    }

    pub fn add_fixed_point(&mut self, x: f64, y: f64) -> Point {
        Point::new(self.params.add_fixed(x), self.params.add_fixed(y))
    }

    pub fn point(&self, p: &Point) -> (f64, f64) {
        self.params.point(p)
    }

    pub fn add_circle(&mut self, center: Point, radius: f64) -> Circle {
        Circle::new(center, self.params.add(radius))
    }

    /// Arc of a new circle, with end points placed on the circle at the given
    /// angles. Pair with [`System::add_arc_rules`] to keep them there.
    pub fn add_arc(&mut self, center: Point, radius: f64, start_angle: f64, end_angle: f64) -> Arc {
        let circle = self.add_circle(center, radius);
        let (start, end) = self.place_ends(&Curve::Circle(circle), start_angle, end_angle);
        Arc {
            center,
            radius: circle.radius,
            start,
            end,
            start_angle: self.params.add(start_angle),
            end_angle: self.params.add(end_angle),
        }
    }

    pub fn add_ellipse(&mut self, center: Point, focus1: Point, minor_radius: f64) -> Ellipse {
        Ellipse::new(center, focus1, self.params.add(minor_radius))
    }

    pub fn add_arc_of_ellipse(
        &mut self,
        ellipse: Ellipse,
        start_angle: f64,
        end_angle: f64,
    ) -> ArcOfEllipse {
        let (start, end) = self.place_ends(&Curve::Ellipse(ellipse), start_angle, end_angle);
        ArcOfEllipse {
            ellipse,
            start,
            end,
            start_angle: self.params.add(start_angle),
            end_angle: self.params.add(end_angle),
        }
    }

    pub fn add_hyperbola(&mut self, center: Point, focus1: Point, minor_radius: f64) -> Hyperbola {
        Hyperbola::new(center, focus1, self.params.add(minor_radius))
    }

    pub fn add_arc_of_hyperbola(
        &mut self,
        hyperbola: Hyperbola,
        start_param: f64,
        end_param: f64,
    ) -> ArcOfHyperbola {
        let (start, end) =
            self.place_ends(&Curve::Hyperbola(hyperbola), start_param, end_param);
        ArcOfHyperbola {
            hyperbola,
            start,
            end,
            start_angle: self.params.add(start_param),
            end_angle: self.params.add(end_param),
        }
    }

    pub fn add_parabola(&mut self, vertex: Point, focus1: Point) -> Parabola {
        Parabola::new(vertex, focus1)
    }

    /// Clamped B-spline through free poles. Knots are fixed; weights are free
    /// and default to 1.
    pub fn add_bspline(
        &mut self,
        degree: usize,
        poles: &[(f64, f64)],
        weights: Option<&[f64]>,
    ) -> Result<BSpline, GcsError> {
        if let Some(w) = weights {
            if w.len() != poles.len() {
                return Err(GcsError::InvalidGeometry(format!(
                    "b-spline has {} poles but {} weights",
                    poles.len(),
                    w.len()
                )));
            }
        }
        let pole_points: Vec<Point> = poles.iter().map(|&(x, y)| self.add_point(x, y)).collect();
        let weight_ids = (0..poles.len())
            .map(|i| self.params.add(weights.map_or(1.0, |w| w[i])))
            .collect();
        let knots = BSpline::clamped_knots(poles.len(), degree)
            .into_iter()
            .map(|k| self.params.add_fixed(k))
            .collect();
        BSpline::new(degree, pole_points, weight_ids, knots)
    }

    fn place_ends(&mut self, base: &Curve, start: f64, end: f64) -> (Point, Point) {
        let (s, _) = base.evaluate(&self.params, start);
        let (e, _) = base.evaluate(&self.params, end);
        (self.add_point(s.x, s.y), self.add_point(e.x, e.y))
    }

    // ── Constraints ──────────────────────────────────────────────────────

    /// Register a constraint. Every parameter it references must exist.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, GcsError> {
        if constraint
            .parameters()
            .iter()
            .any(|&p| !self.params.contains(p))
        {
            return Err(GcsError::UnknownParameter);
        }
        let id = self.constraints.insert(constraint);
        self.order.push(id);
        self.invalidate();
        Ok(id)
    }

    pub fn add_constraints(
        &mut self,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> Result<Vec<ConstraintId>, GcsError> {
        constraints
            .into_iter()
            .map(|c| self.add_constraint(c))
            .collect()
    }

    /// Tie an arc's end points to its angle parameters with four
    /// [`CurveValue`](crate::ConstraintKind::CurveValue) constraints.
    pub fn add_arc_rules(&mut self, curve: &Curve) -> Result<Vec<ConstraintId>, GcsError> {
        let (start, end, start_angle, end_angle) = match curve {
            Curve::Arc(a) => (a.start, a.end, a.start_angle, a.end_angle),
            Curve::ArcOfEllipse(a) => (a.start, a.end, a.start_angle, a.end_angle),
            Curve::ArcOfHyperbola(a) => (a.start, a.end, a.start_angle, a.end_angle),
            other => {
                return Err(GcsError::InvalidGeometry(format!(
                    "arc rules need an arc, got {}",
                    other.kind_name()
                )));
            }
        };
        let rules = [
            (start, start_angle, Axis::X),
            (start, start_angle, Axis::Y),
            (end, end_angle, Axis::X),
            (end, end_angle, Axis::Y),
        ]
        .map(|(p, u, axis)| Constraint::curve_value(p, curve.clone(), u, axis));
        self.add_constraints(rules)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<Constraint, GcsError> {
        let removed = self
            .constraints
            .remove(id)
            .ok_or(GcsError::UnknownConstraint)?;
        self.order.retain(|&c| c != id);
        self.invalidate();
        Ok(removed)
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
        self.order.clear();
        self.invalidate();
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    /// Constraint handles in insertion order.
    pub fn constraint_ids(&self) -> &[ConstraintId] {
        &self.order
    }

    pub fn constraint_count(&self) -> usize {
        self.order.len()
    }

    fn invalidate(&mut self) {
        self.subsystems.clear();
        self.partitioned = false;
        self.state = if self.order.is_empty() {
            SystemState::Empty
        } else {
            SystemState::Configured
        };
    }

    // ── Configuration and State ──────────────────────────────────────────

    pub fn solver_parameters(&self) -> &SolverParameters {
        &self.config
    }

    /// Replace the configuration. Turning `rescale_constraints` off drops
    /// the scales the previous solves computed.
    pub fn set_solver_parameters(&mut self, config: SolverParameters) {
        if self.config.rescale_constraints && !config.rescale_constraints {
            for c in self.constraints.values_mut() {
                c.scale = 1.0;
            }
        }
        self.config = config;
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned
    }

    /// Iterations spent by the last [`System::solve`], summed over SubSystems.
    pub fn last_iterations(&self) -> usize {
        self.last_iterations
    }

    // ── Partitioning ─────────────────────────────────────────────────────

    /// Split the constraints into connected components of the
    /// constraint/free-parameter incidence graph. Components are discovered
    /// breadth-first in constraint insertion order.
    pub fn partition_constraints(&mut self) {
        let free: Vec<Vec<ParamId>> = self
            .order
            .iter()
            .map(|&id| {
                self.constraints[id]
                    .parameters()
                    .into_iter()
                    .filter(|&p| !self.params.is_fixed(p))
                    .collect()
            })
            .collect();

        let mut incidence: HashMap<ParamId, Vec<usize>> = HashMap::new();
        for (i, params) in free.iter().enumerate() {
            for &p in params {
                incidence.entry(p).or_default().push(i);
            }
        }

        let mut visited = vec![false; self.order.len()];
        let mut subsystems = Vec::new();
        for seed in 0..self.order.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            let mut queue = VecDeque::from([seed]);
            let mut component = Vec::new();
            while let Some(i) = queue.pop_front() {
                component.push(i);
                for p in &free[i] {
                    for &j in &incidence[p] {
                        if !visited[j] {
                            visited[j] = true;
                            queue.push_back(j);
                        }
                    }
                }
            }
            component.sort_unstable();
            let ids: Vec<ConstraintId> = component.iter().map(|&i| self.order[i]).collect();
            subsystems.push(SubSystem::new(&ids, &self.constraints, &self.params));
        }

        debug!(
            constraints = self.order.len(),
            subsystems = subsystems.len(),
            "partitioned constraints"
        );
        self.subsystems = subsystems;
        self.partitioned = true;
        if !self.order.is_empty() {
            self.state = SystemState::Partitioned;
        }
    }

    /// The partition if one exists, otherwise a single SubSystem holding
    /// every constraint.
    pub fn subsystems(&self) -> Vec<SubSystem> {
        if self.partitioned {
            self.subsystems.clone()
        } else if self.order.is_empty() {
            Vec::new()
        } else {
            vec![SubSystem::new(&self.order, &self.constraints, &self.params)]
        }
    }

    // ── Solve ────────────────────────────────────────────────────────────

    #[instrument(skip(self), fields(constraints = self.order.len(), algorithm = ?self.config.algorithm))]
    pub fn solve(&mut self) -> SolveStatus {
        self.last_iterations = 0;
        if self.order.is_empty() {
            self.state = SystemState::Solved(SolveStatus::Success);
            return SolveStatus::Success;
        }

        if self.config.rescale_constraints {
            for c in self.constraints.values_mut() {
                c.rescale(&self.params, 1.0);
            }
        }

        let subsystems = self.subsystems();
        let mut all_converged = true;
        for (index, sub) in subsystems.iter().enumerate() {
            if sub.is_empty() {
                continue;
            }
            let initial = sub.parameter_values(&self.params);
            let mut problem = sub.problem(&self.constraints, &mut self.params);
            match solvers::run(&mut problem, &self.config) {
                Ok(result) => {
                    self.last_iterations += result.iterations;
                    all_converged &= result.converged;
                    debug!(
                        subsystem = index,
                        params = sub.param_count(),
                        constraints = sub.constraint_count(),
                        iterations = result.iterations,
                        max_error = result.max_error,
                        converged = result.converged,
                        "subsystem solved"
                    );
                }
                Err(err) => {
                    sub.set_parameter_values(&mut self.params, &initial);
                    warn!(subsystem = index, %err, "solve failed");
                    self.state = SystemState::Solved(SolveStatus::Failed);
                    return SolveStatus::Failed;
                }
            }
        }

        let max_error = self.max_error();
        let status = if all_converged {
            SolveStatus::Success
        } else if max_error <= 10.0 * self.config.convergence_tolerance {
            SolveStatus::ConvergedToLocalMinimum
        } else {
            SolveStatus::NotConverged
        };
        info!(
            ?status,
            subsystems = subsystems.len(),
            iterations = self.last_iterations,
            max_error,
            "solve finished"
        );
        self.state = SystemState::Solved(status);
        status
    }

    // ── Aggregates ───────────────────────────────────────────────────────

    /// Free parameters minus constraints, summed over SubSystems.
    pub fn dof(&self) -> i64 {
        self.subsystems().iter().map(SubSystem::dof).sum()
    }

    pub fn max_error(&self) -> f64 {
        self.subsystems()
            .iter()
            .map(|s| s.max_error(&self.constraints, &self.params))
            .fold(0.0, f64::max)
    }

    /// Sum of squared residuals over all constraints.
    pub fn total_error(&self) -> f64 {
        self.subsystems()
            .iter()
            .map(|s| s.total_error(&self.constraints, &self.params))
            .sum()
    }
}
