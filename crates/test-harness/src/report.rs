//! Structured reports over a [`System`].
//!
//! The text form is for humans reading a failing scenario; the JSON form is
//! for tooling that wants to diff two runs.

use std::fmt;

use gcs_solver::{RankInfo, System, SystemState};
use serde::Serialize;

/// A complete system report with all sections.
#[derive(Debug, Clone, Serialize)]
pub struct SystemReport {
    pub state: SystemState,
    pub dof: i64,
    pub param_count: usize,
    pub constraint_count: usize,
    pub max_error: f64,
    pub total_error: f64,
    pub last_iterations: usize,
    pub subsystems: Vec<SubSystemEntry>,
    pub total_deficiency: usize,
    pub constraints: Vec<ConstraintEntry>,
}

/// One SubSystem's size, DOF and Jacobian rank.
#[derive(Debug, Clone, Serialize)]
pub struct SubSystemEntry {
    pub index: usize,
    pub params: usize,
    pub constraints: usize,
    pub dof: i64,
    pub max_error: f64,
    pub rank: RankInfo,
}

/// One constraint's kind, caller tag and scaled residual.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintEntry {
    pub name: String,
    pub tag: i32,
    pub residual: f64,
}

impl SystemReport {
    pub fn from_system(system: &System) -> Self {
        let ranks = system.rank_deficiency();
        let subsystems = system
            .subsystems()
            .iter()
            .zip(ranks.subsystems)
            .enumerate()
            .map(|(index, (sub, rank))| SubSystemEntry {
                index,
                params: sub.param_count(),
                constraints: sub.constraint_count(),
                dof: sub.dof(),
                max_error: sub
                    .constraints()
                    .iter()
                    .filter_map(|&id| system.constraint(id))
                    .map(|c| c.error(system.params()).abs())
                    .fold(0.0, f64::max),
                rank,
            })
            .collect();

        let constraints = system
            .constraint_ids()
            .iter()
            .filter_map(|&id| system.constraint(id))
            .map(|c| ConstraintEntry {
                name: c.name().to_string(),
                tag: c.tag,
                residual: c.error(system.params()),
            })
            .collect();

        Self {
            state: system.state(),
            dof: system.dof(),
            param_count: system.params().len(),
            constraint_count: system.constraint_count(),
            max_error: system.max_error(),
            total_error: system.total_error(),
            last_iterations: system.last_iterations(),
            subsystems,
            total_deficiency: ranks.total_deficiency,
            constraints,
        }
    }

    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Constraint System Report ===\n\n");

        out.push_str(&format!(
            "State: {:?} | DOF: {} | {} params, {} constraints\n",
            self.state, self.dof, self.param_count, self.constraint_count,
        ));
        out.push_str(&format!(
            "Error: max {:.3e}, total {:.3e} | last solve: {} iterations\n",
            self.max_error, self.total_error, self.last_iterations,
        ));

        out.push_str(&format!(
            "\nSubSystems ({}, rank deficiency {}):\n",
            self.subsystems.len(),
            self.total_deficiency,
        ));
        for s in &self.subsystems {
            let rank_status = if s.rank.deficiency == 0 { "OK" } else { "DEFICIENT" };
            out.push_str(&format!(
                "  [{}] {} params, {} constraints, DOF {} | max error {:.3e}\n",
                s.index, s.params, s.constraints, s.dof, s.max_error,
            ));
            out.push_str(&format!(
                "      Jacobian {}x{} rank {} ({})\n",
                s.rank.rows, s.rank.cols, s.rank.rank, rank_status,
            ));
        }

        if self.constraints.is_empty() {
            out.push_str("\nConstraints: none\n");
        } else {
            out.push_str(&format!("\nConstraints ({}):\n", self.constraints.len()));
            for c in &self.constraints {
                out.push_str(&format!(
                    "  #{} {}: residual {:.3e}\n",
                    c.tag, c.name, c.residual
                ));
            }
        }

        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SystemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}
