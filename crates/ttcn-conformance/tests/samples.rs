//! The sample modules under `samples/`, run on a scripted component.

use ttcn_conformance::scripted::{msg, ScriptedComponent};
use ttcn_conformance::{alt_basic, altstep_defaults, loops, unreachable_else};
use ttcn_runtime::prelude::*;

#[test]
fn poll_checks_without_consuming() {
    let mut rt = ScriptedComponent::new().queue("pt", Value::message("Response", vec![Value::from(5i64)]));
    assert!(alt_basic::f_poll(&mut rt).unwrap());
    assert_eq!(rt.pending("pt"), 1);

    let mut idle = ScriptedComponent::new();
    assert!(!alt_basic::f_poll(&mut idle).unwrap());
    assert_eq!(idle.snapshots(), vec![false]);
}

#[test]
fn keepalive_altstep_value_restarts_the_alt() {
    let mut rt = ScriptedComponent::new()
        .queue("pt", msg("KeepAlive"))
        .queue("pt", msg("Done"));
    let verdict = altstep_defaults::tc_defaults(&mut rt).unwrap();
    assert_eq!(verdict, Verdict::Pass);
    assert!(rt.events().contains(&"send pt KeepAliveAck()".to_string()));
    assert_eq!(rt.snapshots(), vec![false, false]);
    assert_eq!(rt.pending("pt"), 0);
    // both defaults were deactivated before the testcase ended
    rt.defaults().commit();
    assert!(rt.defaults().is_empty());
}

#[test]
fn unexpected_messages_reach_the_default_altsteps() {
    let mut rt = ScriptedComponent::new()
        .queue("pt", msg("Noise"))
        .then_arrive(vec![("pt", msg("Done"))]);
    let verdict = altstep_defaults::tc_defaults(&mut rt).unwrap();
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(rt.logs(), ["discarded message1"]);
}

#[test]
fn drain_counts_data_then_waits_for_ticks() {
    let mut rt = ScriptedComponent::new()
        .queue("pt", msg("Data"))
        .queue("pt", msg("Data"))
        .queue("pt", msg("Stop"))
        .then_arrive(vec![("pt", msg("Tick")), ("pt", msg("Tick"))]);
    assert_eq!(loops::f_drain(&mut rt, 5).unwrap(), 0);
    assert_eq!(rt.pending("pt"), 0);
}

#[test]
fn guards_after_else_are_never_tried() {
    let mut rt = ScriptedComponent::new().queue("pt", msg("Late"));
    unreachable_else::f_check(&mut rt).unwrap();
    assert_eq!(rt.logs(), ["idle"]);
    assert_eq!(rt.pending("pt"), 1);
}
