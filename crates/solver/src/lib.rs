pub mod constraints;
pub mod diagnostics;
pub mod dual;
pub mod error;
pub mod geometry;
pub mod linalg;
pub mod param;
pub mod solvers;
pub mod subsystem;
pub mod system;

// Re-export the construction and solve API at crate root.
pub use constraints::{Axis, Constraint, ConstraintId, ConstraintKind};
pub use diagnostics::{DiagnosticResult, RankReport, Sensitivity};
pub use error::{GcsError, SolveStatus, SolverError};
pub use geometry::{
    Arc, ArcOfEllipse, ArcOfHyperbola, BSpline, Circle, Curve, Ellipse, Hyperbola, Line,
    Parabola, Point,
};
pub use linalg::RankInfo;
pub use param::{Param, ParamId, ParamStore};
pub use solvers::{
    Algorithm, BfgsOptions, DogLegOptions, LevenbergMarquardtOptions, LineSearchOptions,
    SolverParameters,
};
pub use subsystem::SubSystem;
pub use system::{System, SystemState};
