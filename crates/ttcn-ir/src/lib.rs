//! Behaviour model and semantic checks for TTCN-3 alternatives.
//!
//! This crate defines the arena model of definitions, statements and guard
//! lists, the lowering pass from the DSL AST, the loop-control binder, and
//! the reachability and restriction checks run before code generation.

pub mod check;
pub mod diagnostics;
pub mod lowering;
pub mod model;
pub mod names;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;

pub use check::{check, check_module, CheckCycle, CheckOptions, SeverityLevel};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use lowering::{lower, lower_with_source, LoweringError, SpannedLoweringError};
pub use model::*;
pub use names::FreshNames;
