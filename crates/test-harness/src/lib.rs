//! Test harness for scripting constraint-solving scenarios.
//!
//! Drives the solver the way a floor-plan editor would and checks the solved
//! geometry with assertions that explain themselves on failure.
//!
//! # Key Components
//!
//! - [`RoomBuilder`]: fluent API for corners, walls and their relationships
//! - [`report`]: text and JSON summaries of a system
//! - [`helpers`]: harness error type and planar math
//! - [`assertions`]: rich assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use report::SystemReport;
pub use workflow::{RoomBuilder, SolvedRoom};
