//! A connected group of constraints and the free parameters they touch.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use slotmap::SlotMap;

use crate::constraints::{Constraint, ConstraintId};
use crate::linalg::max_abs;
use crate::param::{ParamId, ParamStore};
use crate::solvers::Problem;

/// Constraint arena shared by a [`System`](crate::System) and its SubSystems.
pub type ConstraintSet = SlotMap<ConstraintId, Constraint>;

/// Rows are constraints in the order given at construction; columns are the
/// deduplicated free parameters in first-seen order. Both orders are fixed
/// for the lifetime of the SubSystem.
#[derive(Debug, Clone, Default)]
pub struct SubSystem {
    constraints: Vec<ConstraintId>,
    params: Vec<ParamId>,
    index: HashMap<ParamId, usize>,
}

impl SubSystem {
    /// Build from constraint handles. Handles missing from `set` are skipped;
    /// fixed parameters get no column.
    pub fn new(ids: &[ConstraintId], set: &ConstraintSet, store: &ParamStore) -> Self {
        let mut sub = SubSystem::default();
        for &id in ids {
            let Some(c) = set.get(id) else { continue };
            sub.constraints.push(id);
            for p in c.parameters() {
                if store.is_fixed(p) || sub.index.contains_key(&p) {
                    continue;
                }
                sub.index.insert(p, sub.params.len());
                sub.params.push(p);
            }
        }
        sub
    }

    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    pub fn params(&self) -> &[ParamId] {
        &self.params
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Column of `param`, if it is a free parameter of this SubSystem.
    pub fn column(&self, param: ParamId) -> Option<usize> {
        self.index.get(&param).copied()
    }

    /// Parameter count minus constraint count.
    pub fn dof(&self) -> i64 {
        self.params.len() as i64 - self.constraints.len() as i64
    }

    // ── Residual Computation ─────────────────────────────────────────────

    pub fn residuals(&self, set: &ConstraintSet, store: &ParamStore) -> DVector<f64> {
        DVector::from_iterator(
            self.constraints.len(),
            self.constraints
                .iter()
                .map(|&id| set.get(id).map_or(0.0, |c| c.error(store))),
        )
    }

    /// Largest absolute residual.
    pub fn max_error(&self, set: &ConstraintSet, store: &ParamStore) -> f64 {
        max_abs(&self.residuals(set, store))
    }

    /// Sum of squared residuals.
    pub fn total_error(&self, set: &ConstraintSet, store: &ParamStore) -> f64 {
        self.residuals(set, store).norm_squared()
    }

    // ── Jacobian Computation ─────────────────────────────────────────────

    /// One row per constraint, one column per free parameter. Entries for a
    /// parameter that appears more than once are accumulated.
    pub fn jacobian(&self, set: &ConstraintSet, store: &ParamStore) -> DMatrix<f64> {
        let mut j = DMatrix::zeros(self.constraints.len(), self.params.len());
        for (row, &id) in self.constraints.iter().enumerate() {
            let Some(c) = set.get(id) else { continue };
            for p in c.parameters() {
                if let Some(col) = self.column(p) {
                    j[(row, col)] += c.grad(store, p);
                }
            }
        }
        j
    }

    // ── Parameter Vector View ────────────────────────────────────────────

    pub fn parameter_values(&self, store: &ParamStore) -> DVector<f64> {
        DVector::from_iterator(self.params.len(), self.params.iter().map(|&p| store.value(p)))
    }

    /// Write `values` back in column order. Extra entries are ignored.
    pub fn set_parameter_values(&self, store: &mut ParamStore, values: &DVector<f64>) {
        for (&p, &v) in self.params.iter().zip(values.iter()) {
            store.set_value(p, v);
        }
    }

    /// Solver-facing view that writes trial points straight into `store`.
    pub fn problem<'a>(
        &'a self,
        set: &'a ConstraintSet,
        store: &'a mut ParamStore,
    ) -> SubSystemProblem<'a> {
        SubSystemProblem {
            sub: self,
            set,
            store,
        }
    }
}

/// A [`SubSystem`] bound to the data it reads and the parameters it moves.
pub struct SubSystemProblem<'a> {
    sub: &'a SubSystem,
    set: &'a ConstraintSet,
    store: &'a mut ParamStore,
}

impl Problem for SubSystemProblem<'_> {
    fn param_count(&self) -> usize {
        self.sub.param_count()
    }

    fn residual_count(&self) -> usize {
        self.sub.constraint_count()
    }

    fn values(&self) -> DVector<f64> {
        self.sub.parameter_values(self.store)
    }

    fn set_values(&mut self, x: &DVector<f64>) {
        self.sub.set_parameter_values(self.store, x);
    }

    fn residuals(&self) -> DVector<f64> {
        self.sub.residuals(self.set, self.store)
    }

    fn jacobian(&self) -> DMatrix<f64> {
        self.sub.jacobian(self.set, self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Line;
    use approx::assert_relative_eq;

    fn insert(set: &mut ConstraintSet, c: Constraint) -> ConstraintId {
        set.insert(c)
    }

    #[test]
    fn test_columns_deduplicated_in_first_seen_order() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let b = store.add(2.0);
        let c = store.add(3.0);
        let mut set = ConstraintSet::with_key();
        let c1 = insert(&mut set, Constraint::equal(b, a));
        let c2 = insert(&mut set, Constraint::equal(a, c));

        let sub = SubSystem::new(&[c1, c2], &set, &store);
        assert_eq!(sub.params(), &[b, a, c]);
        assert_eq!(sub.column(c), Some(2));
        assert_eq!(sub.dof(), 1);
    }

    #[test]
    fn test_fixed_params_get_no_column() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let anchor = store.add_fixed(4.0);
        let mut set = ConstraintSet::with_key();
        let id = insert(&mut set, Constraint::equal(a, anchor));

        let sub = SubSystem::new(&[id], &set, &store);
        assert_eq!(sub.params(), &[a]);
        assert_eq!(sub.dof(), 0);

        let j = sub.jacobian(&set, &store);
        assert_eq!(j.shape(), (1, 1));
        assert_relative_eq!(j[(0, 0)], 1.0);
    }

    #[test]
    fn test_residuals_and_errors() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let b = store.add(4.0);
        let c = store.add(2.0);
        let mut set = ConstraintSet::with_key();
        let c1 = insert(&mut set, Constraint::equal(a, b));
        let c2 = insert(&mut set, Constraint::difference(a, c, 3.0));

        let sub = SubSystem::new(&[c1, c2], &set, &store);
        let r = sub.residuals(&set, &store);
        assert_relative_eq!(r[0], -3.0);
        assert_relative_eq!(r[1], -2.0);
        assert_relative_eq!(sub.max_error(&set, &store), 3.0);
        assert_relative_eq!(sub.total_error(&set, &store), 13.0);
    }

    #[test]
    fn test_jacobian_accumulates_shared_parameter() {
        // Perpendicular lines sharing a corner: the corner appears in both
        // direction vectors of the residual d1 . d2.
        let mut store = ParamStore::new();
        let o = store.add_point(0.0, 0.0);
        let px = store.add_point(2.0, 0.0);
        let py = store.add_point(0.0, 3.0);
        let l1 = Line::new(o, px);
        let l2 = Line::new(o, py);
        let mut set = ConstraintSet::with_key();
        let id = insert(&mut set, Constraint::perpendicular(l1, l2));

        let sub = SubSystem::new(&[id], &set, &store);
        assert_eq!(sub.param_count(), 6);
        let j = sub.jacobian(&set, &store);
        // d(d1.d2)/d(o.x) = -(d2.x) - (d1.x) = 0 - 2
        let col = sub.column(o.x).unwrap();
        assert_relative_eq!(j[(0, col)], -2.0, epsilon = 1e-12);
        let col = sub.column(o.y).unwrap();
        assert_relative_eq!(j[(0, col)], -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parameter_vector_view_round_trip() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let b = store.add(2.0);
        let mut set = ConstraintSet::with_key();
        let id = insert(&mut set, Constraint::equal(a, b));
        let sub = SubSystem::new(&[id], &set, &store);

        sub.set_parameter_values(&mut store, &DVector::from_vec(vec![7.0, 8.0]));
        assert_relative_eq!(store.value(a), 7.0);
        assert_relative_eq!(store.value(b), 8.0);
        assert_eq!(sub.parameter_values(&store).as_slice(), &[7.0, 8.0]);
    }

    #[test]
    fn test_problem_view_matches_subsystem() {
        let mut store = ParamStore::new();
        let a = store.add(1.0);
        let b = store.add(5.0);
        let mut set = ConstraintSet::with_key();
        let id = insert(&mut set, Constraint::equal(a, b));
        let sub = SubSystem::new(&[id], &set, &store);

        let mut problem = sub.problem(&set, &mut store);
        assert_eq!(problem.param_count(), 2);
        assert_eq!(problem.residual_count(), 1);
        assert_relative_eq!(problem.residuals()[0], -4.0);
        problem.set_values(&DVector::from_vec(vec![5.0, 5.0]));
        assert_relative_eq!(problem.residuals()[0], 0.0);
        assert_relative_eq!(store.value(a), 5.0);
    }
}
