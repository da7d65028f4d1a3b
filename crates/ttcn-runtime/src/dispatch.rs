//! Executable reference model of alternative dispatch.
//!
//! Generated code inlines the same state machine; this module runs it over a
//! [`GuardHost`] so the contract can be exercised without generating code.

use tracing::{debug, trace, trace_span};

use crate::error::{DynamicError, SourceLocation};
use crate::status::GuardStatus;

/// Static shape of one guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardSpec {
    /// Receiving operation, possibly behind a precondition.
    Operation { has_precondition: bool },
    /// Altstep reference or invocation; may report Repeat or Break.
    Altstep { has_precondition: bool },
    Else,
}

impl GuardSpec {
    fn has_precondition(&self) -> bool {
        match self {
            GuardSpec::Operation { has_precondition } | GuardSpec::Altstep { has_precondition } => {
                *has_precondition
            }
            GuardSpec::Else => false,
        }
    }
}

/// How a guard body finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOutcome {
    /// Ran to its end.
    Completed,
    Repeat,
    Break,
    /// Left the enclosing function (`return`, `stop`, `continue` of an outer loop).
    Transferred,
}

/// Result of a dispatch that selected something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltOutcome {
    /// The guard at this index (possibly the else guard) fired and its body completed.
    Guard(usize),
    /// An active default fired.
    Default,
    Break,
    Transferred,
}

/// Collaborators of the dispatcher.
pub trait GuardHost {
    /// Evaluate the precondition of guard `index`.
    fn precondition(&mut self, index: usize) -> Result<bool, DynamicError>;

    /// Attempt the receiving operation or altstep of guard `index`.
    fn attempt(&mut self, index: usize) -> Result<GuardStatus, DynamicError>;

    /// Run the body of guard `index`.
    fn run_body(&mut self, index: usize) -> Result<BodyOutcome, DynamicError>;

    fn snapshot(&mut self, blocking: bool) -> Result<(), DynamicError>;

    /// Attempt the active defaults once.
    fn try_defaults(&mut self) -> Result<GuardStatus, DynamicError>;
}

/// One step of the guard state machine.
///
/// An `Unchecked` slot evaluates the precondition and caches the result. A
/// `Maybe` slot attempts the operation once; a `No` result is cached for the
/// rest of the dispatch until the list restarts.
pub fn evaluate_guard<H: GuardHost + ?Sized>(
    host: &mut H,
    index: usize,
    slot: &mut GuardStatus,
) -> Result<GuardStatus, DynamicError> {
    if *slot == GuardStatus::Unchecked {
        *slot = GuardStatus::from_precondition(host.precondition(index)?);
        trace!(guard = index, status = %slot, "precondition evaluated");
    }
    if *slot != GuardStatus::Maybe {
        return Ok(*slot);
    }
    let status = host.attempt(index)?;
    trace!(guard = index, %status, "operation attempted");
    if status == GuardStatus::No {
        *slot = GuardStatus::No;
    }
    Ok(status)
}

fn reachable(guards: &[GuardSpec]) -> &[GuardSpec] {
    match guards.iter().position(|g| *g == GuardSpec::Else) {
        Some(i) => &guards[..=i],
        None => guards,
    }
}

enum PassResult {
    Done(AltOutcome),
    Restart,
    Exhausted,
    Retry,
}

/// Run a guard list of an `alt` statement to completion.
pub fn run_alt<H: GuardHost + ?Sized>(
    host: &mut H,
    guards: &[GuardSpec],
    construct: &str,
    location: &SourceLocation,
) -> Result<AltOutcome, DynamicError> {
    let _span = trace_span!("alt", %location).entered();
    run_snapshot_loop(host, guards, true, construct, location)
}

/// Run the response and exception handling part of a call.
///
/// There is no default fallback: when every guard is `No` the dispatch fails.
pub fn run_call_response<H: GuardHost + ?Sized>(
    host: &mut H,
    guards: &[GuardSpec],
    location: &SourceLocation,
) -> Result<AltOutcome, DynamicError> {
    let _span = trace_span!("call_response", %location).entered();
    run_snapshot_loop(
        host,
        guards,
        false,
        "response and exception handling part of call",
        location,
    )
}

fn run_snapshot_loop<H: GuardHost + ?Sized>(
    host: &mut H,
    guards: &[GuardSpec],
    with_defaults: bool,
    construct: &str,
    location: &SourceLocation,
) -> Result<AltOutcome, DynamicError> {
    let guards = reachable(guards);
    let has_else = guards.last() == Some(&GuardSpec::Else);
    'restart: loop {
        let mut slots: Vec<GuardStatus> = guards
            .iter()
            .map(|g| GuardStatus::initial(g.has_precondition()))
            .collect();
        let mut default_slot = if with_defaults && !has_else {
            GuardStatus::Maybe
        } else {
            GuardStatus::No
        };
        host.snapshot(false)?;
        loop {
            match run_pass(host, guards, &mut slots, &mut default_slot)? {
                PassResult::Done(outcome) => return Ok(outcome),
                PassResult::Restart => {
                    debug!("restarting guard list");
                    continue 'restart;
                }
                PassResult::Exhausted => {
                    debug!(construct, %location, "no branch selectable");
                    return Err(DynamicError::NoBranchSelectable {
                        construct: construct.to_string(),
                        location: location.clone(),
                    });
                }
                PassResult::Retry => host.snapshot(true)?,
            }
        }
    }
}

fn run_pass<H: GuardHost + ?Sized>(
    host: &mut H,
    guards: &[GuardSpec],
    slots: &mut [GuardStatus],
    default_slot: &mut GuardStatus,
) -> Result<PassResult, DynamicError> {
    for (index, guard) in guards.iter().enumerate() {
        let fired = match guard {
            GuardSpec::Else => GuardStatus::Yes,
            _ => evaluate_guard(host, index, &mut slots[index])?,
        };
        match fired {
            GuardStatus::Yes => {
                return Ok(match host.run_body(index)? {
                    BodyOutcome::Completed => PassResult::Done(AltOutcome::Guard(index)),
                    BodyOutcome::Repeat => PassResult::Restart,
                    BodyOutcome::Break => PassResult::Done(AltOutcome::Break),
                    BodyOutcome::Transferred => PassResult::Done(AltOutcome::Transferred),
                })
            }
            GuardStatus::Repeat => return Ok(PassResult::Restart),
            GuardStatus::Break => return Ok(PassResult::Done(AltOutcome::Break)),
            GuardStatus::Maybe | GuardStatus::No | GuardStatus::Unchecked => {}
        }
    }

    if *default_slot == GuardStatus::Maybe {
        let status = host.try_defaults()?;
        trace!(%status, "defaults attempted");
        match status {
            GuardStatus::Yes => return Ok(PassResult::Done(AltOutcome::Default)),
            GuardStatus::Break => return Ok(PassResult::Done(AltOutcome::Break)),
            GuardStatus::Repeat => return Ok(PassResult::Restart),
            GuardStatus::No => *default_slot = GuardStatus::No,
            GuardStatus::Maybe | GuardStatus::Unchecked => {}
        }
    }

    if slots.iter().all(|s| *s == GuardStatus::No) && *default_slot == GuardStatus::No {
        return Ok(PassResult::Exhausted);
    }
    Ok(PassResult::Retry)
}

/// One pass over the alternatives of an altstep, without taking snapshots.
///
/// Never fails for lack of a selectable branch: returns `Maybe` while some
/// guard is pending and `No` once every guard is definitively `No`.
///
/// A body whose guards all answered `No` yields `No`, not `Maybe`: an alt
/// made only of altstep guards then reports exhaustion rather than retrying.
/// Generated altsteps return the same.
pub fn run_altstep_body<H: GuardHost + ?Sized>(
    host: &mut H,
    guards: &[GuardSpec],
) -> Result<GuardStatus, DynamicError> {
    let guards = reachable(guards);
    let mut pending = false;
    for (index, guard) in guards.iter().enumerate() {
        let mut slot = GuardStatus::initial(guard.has_precondition());
        let fired = match guard {
            GuardSpec::Else => GuardStatus::Yes,
            _ => evaluate_guard(host, index, &mut slot)?,
        };
        match fired {
            GuardStatus::Yes => return Ok(body_status(host.run_body(index)?)),
            status @ (GuardStatus::Repeat | GuardStatus::Break) => return Ok(status),
            GuardStatus::Maybe | GuardStatus::Unchecked => pending = true,
            GuardStatus::No => {}
        }
    }
    Ok(if pending {
        GuardStatus::Maybe
    } else {
        GuardStatus::No
    })
}

fn body_status(outcome: BodyOutcome) -> GuardStatus {
    match outcome {
        BodyOutcome::Completed | BodyOutcome::Transferred => GuardStatus::Yes,
        BodyOutcome::Repeat => GuardStatus::Repeat,
        BodyOutcome::Break => GuardStatus::Break,
    }
}
