//! Semantic checks over a lowered [`BehaviorModule`].
//!
//! A check run binds loop-control statements, then validates every guard
//! list: reachability, call-response restrictions and interleave
//! restrictions. Runs are stamped with a [`CheckCycle`]; checking a module
//! or guard list twice within one cycle is a no-op.

mod binder;
mod reachability;
mod restrictions;

use tracing::{debug, info_span};

use crate::diagnostics::Diagnostics;
use crate::model::*;

/// How a finding that is not an error by itself should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SeverityLevel {
    Ignore,
    #[default]
    Warning,
    Error,
}

/// Options controlling the semantic checks.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CheckOptions {
    /// Guards following an `[else]` branch.
    pub unreachable_after_else: SeverityLevel,
    /// Guards whose precondition is the constant `false`.
    pub constant_false_precondition: SeverityLevel,
    /// Altsteps without any alternative.
    pub empty_altstep: SeverityLevel,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            unreachable_after_else: SeverityLevel::Warning,
            constant_false_precondition: SeverityLevel::Warning,
            empty_altstep: SeverityLevel::Warning,
        }
    }
}

/// Monotonic stamp distinguishing check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct CheckCycle(u64);

impl CheckCycle {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Start a new cycle; everything becomes eligible for checking again.
    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Check a module in a fresh cycle.
pub fn check_module(module: &mut BehaviorModule, options: &CheckOptions) -> Diagnostics {
    let cycle = CheckCycle(module.last_checked.map_or(1, |c| c + 1));
    check(module, options, cycle)
}

/// Check every definition and guard list of `module` within `cycle`.
pub fn check(module: &mut BehaviorModule, options: &CheckOptions, cycle: CheckCycle) -> Diagnostics {
    let mut diags = Diagnostics::new();
    if module.last_checked == Some(cycle.value()) {
        debug!(module = %module.name, cycle = cycle.value(), "already checked in this cycle");
        return diags;
    }
    let _span = info_span!("check", module = %module.name, cycle = cycle.value()).entered();

    binder::bind(module, &mut diags);
    restrictions::check_calls(module, &mut diags);

    for id in 0..module.guard_lists.len() {
        check_guard_list(module, id, options, cycle, &mut diags);
    }

    for def in &module.definitions {
        if def.kind == DefKind::Altstep {
            restrictions::check_altstep_returns(module, def, &mut diags);
        }
    }

    diags.sort();
    module.last_checked = Some(cycle.value());
    module.check_errors = diags.error_count();
    debug!(
        errors = diags.error_count(),
        warnings = diags.warnings().count(),
        "check finished"
    );
    diags
}

/// Check one guard list unless it was already checked in `cycle`.
pub fn check_guard_list(
    module: &mut BehaviorModule,
    id: GuardListId,
    options: &CheckOptions,
    cycle: CheckCycle,
    diags: &mut Diagnostics,
) {
    if module.guard_list(id).last_checked == Some(cycle.value()) {
        return;
    }

    reachability::check(module, id, options, diags);
    match module.guard_list(id).mode {
        GuardListMode::CallResponseBody => restrictions::check_call_response(module, id, diags),
        GuardListMode::Interleave => restrictions::check_interleave(module, id, diags),
        GuardListMode::PlainAlt | GuardListMode::AltstepBody => {}
    }

    module.guard_list_mut(id).last_checked = Some(cycle.value());
}

pub(crate) fn report(
    diags: &mut Diagnostics,
    level: SeverityLevel,
    code: &'static str,
    message: String,
    span: ttcn_dsl::ast::Span,
) {
    match level {
        SeverityLevel::Ignore => {}
        SeverityLevel::Warning => diags.warning(code, message, span),
        SeverityLevel::Error => diags.error(code, message, span),
    }
}
