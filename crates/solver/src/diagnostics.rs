//! Offline analyses over a [`System`]. Every search works on clones, so the
//! caller's system is never modified.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::constraints::ConstraintId;
use crate::error::{GcsError, SolveStatus};
use crate::linalg::{qr_rank, RankInfo};
use crate::param::ParamId;
use crate::system::System;

/// Relative perturbation used by the sensitivity probes.
pub const PERTURBATION: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticResult {
    UnderConstrained { dof: i64 },
    WellConstrained,
    /// Each listed constraint, removed alone, makes the rest solvable.
    Conflicting { constraints: Vec<ConstraintId> },
    /// Each listed constraint is implied by the others.
    Redundant { constraints: Vec<ConstraintId> },
    /// Negative DOF, but no single constraint explains it.
    OverConstrained { dof: i64 },
}

/// Finite-difference response of the solved system to one perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    /// |Δ total error| / perturbation.
    pub error_ratio: f64,
    /// Largest parameter shift after re-solving, per unit perturbation.
    pub displacement: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankReport {
    pub subsystems: Vec<RankInfo>,
    pub total_deficiency: usize,
}

impl System {
    /// Classify the system from its DOF sign, searching for culprits when it
    /// has more constraints than free parameters.
    #[instrument(skip(self), fields(constraints = self.order.len()))]
    pub fn diagnose(&self) -> DiagnosticResult {
        let dof = self.dof();
        let result = if dof > 0 {
            DiagnosticResult::UnderConstrained { dof }
        } else if dof == 0 {
            DiagnosticResult::WellConstrained
        } else {
            let conflicting = self.find_conflicting();
            if !conflicting.is_empty() {
                DiagnosticResult::Conflicting {
                    constraints: conflicting,
                }
            } else {
                let redundant = self.find_redundant();
                if redundant.is_empty() {
                    DiagnosticResult::OverConstrained { dof }
                } else {
                    DiagnosticResult::Redundant {
                        constraints: redundant,
                    }
                }
            }
        };
        info!(dof, ?result, "diagnosis finished");
        result
    }

    /// Constraints whose removal alone lets the rest solve, and whose
    /// re-addition (starting from that solution) breaks it again.
    ///
    /// A constraint that only conflicts in combination with another removed
    /// one is not reported.
    pub fn find_conflicting(&self) -> Vec<ConstraintId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| {
                let mut trial = self.clone();
                let Ok(removed) = trial.remove_constraint(id) else {
                    return false;
                };
                if trial.solve() != SolveStatus::Success {
                    return false;
                }
                if trial.add_constraint(removed).is_err() {
                    return false;
                }
                let status = trial.solve();
                debug!(?id, ?status, "conflict probe");
                status != SolveStatus::Success
            })
            .collect()
    }

    /// Constraints that are already satisfied once the others are solved.
    pub fn find_redundant(&self) -> Vec<ConstraintId> {
        let tol = 10.0 * self.config.convergence_tolerance;
        self.order
            .iter()
            .copied()
            .filter(|&id| {
                let mut trial = self.clone();
                let Ok(removed) = trial.remove_constraint(id) else {
                    return false;
                };
                if !trial.solve().is_solved() {
                    return false;
                }
                removed.error(trial.params()).abs() <= tol
            })
            .collect()
    }

    /// Scale one constraint's residual by `1 + PERTURBATION` and re-solve.
    pub fn constraint_sensitivity(&self, id: ConstraintId) -> Result<Sensitivity, GcsError> {
        let (base, base_error) = self.solved_baseline();
        let mut trial = base.clone();
        let constraint = trial
            .constraints
            .get_mut(id)
            .ok_or(GcsError::UnknownConstraint)?;
        let delta = PERTURBATION * constraint.scale.abs().max(f64::MIN_POSITIVE);
        constraint.scale += delta;
        trial.solve();
        Ok(compare(&base, base_error, &trial, delta))
    }

    /// Shift one parameter by `PERTURBATION` (relative, at least absolute
    /// 1e-3) and re-solve.
    pub fn parameter_sensitivity(&self, param: ParamId) -> Result<Sensitivity, GcsError> {
        if !self.params.contains(param) {
            return Err(GcsError::UnknownParameter);
        }
        let (base, base_error) = self.solved_baseline();
        let mut trial = base.clone();
        let value = trial.value(param);
        let delta = PERTURBATION * value.abs().max(1.0);
        trial.set_value(param, value + delta)?;
        trial.solve();
        Ok(compare(&base, base_error, &trial, delta))
    }

    /// QR rank of every SubSystem's Jacobian at the current values.
    pub fn rank_deficiency(&self) -> RankReport {
        let subsystems: Vec<RankInfo> = self
            .subsystems()
            .iter()
            .map(|s| {
                qr_rank(
                    &s.jacobian(&self.constraints, &self.params),
                    self.config.qr_pivot_threshold,
                )
            })
            .collect();
        let total_deficiency = subsystems.iter().map(|r| r.deficiency).sum();
        RankReport {
            subsystems,
            total_deficiency,
        }
    }

    fn solved_baseline(&self) -> (System, f64) {
        let mut base = self.clone();
        base.solve();
        let error = base.total_error();
        (base, error)
    }
}

fn compare(base: &System, base_error: f64, trial: &System, delta: f64) -> Sensitivity {
    let shift = base
        .params()
        .iter()
        .map(|(id, p)| (trial.value(id) - p.value).abs())
        .fold(0.0, f64::max);
    Sensitivity {
        error_ratio: (trial.total_error() - base_error).abs() / delta,
        displacement: shift / delta,
    }
}
