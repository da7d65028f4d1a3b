//! Continuation states of an `interleave` statement.
//!
//! Every branch advances through its own sequence of states. A wait state
//! holds the receiving operations the branch is blocked on; a resume state
//! holds the statements that follow a blocking call once its response part
//! has finished. The generated scheduler keeps one state index per branch.

use ttcn_dsl::ast::{CallTimeout, Spanned};
use ttcn_ir::{BehaviorModule, Guard, GuardListId, GuardListOrigin, StmtId, StmtKind};

/// What runs after an alternative fires, up to the branch's next state.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    /// Statements executed inline.
    pub inline: Vec<StmtId>,
    /// Blocking call issued after the inline statements.
    pub call: Option<StmtId>,
    /// Next state of the branch; `None` once the branch is finished.
    pub next: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Alternative<'m> {
    pub guard: &'m Spanned<Guard>,
    pub then: Continuation,
}

#[derive(Debug, Clone)]
pub enum StateKind<'m> {
    Wait(Vec<Alternative<'m>>),
    Resume(Continuation),
}

#[derive(Debug, Clone)]
pub struct State<'m> {
    pub branch: usize,
    pub kind: StateKind<'m>,
}

/// States of one interleave; branch `i` starts in state `i`.
#[derive(Debug, Clone)]
pub struct InterleavePlan<'m> {
    pub states: Vec<State<'m>>,
    pub branches: usize,
}

impl<'m> InterleavePlan<'m> {
    pub fn build(module: &'m BehaviorModule, list: GuardListId) -> Self {
        let guards = module.guard_list(list).guards();
        let mut planner = Planner {
            module,
            states: guards
                .iter()
                .enumerate()
                .map(|(branch, _)| State {
                    branch,
                    kind: StateKind::Wait(Vec::new()),
                })
                .collect(),
        };
        for (branch, guard) in guards.iter().enumerate() {
            let body = guard.node.body().cloned().unwrap_or_default();
            let then = planner.plan(&body, None, branch);
            planner.states[branch].kind = StateKind::Wait(vec![Alternative { guard, then }]);
        }
        InterleavePlan {
            states: planner.states,
            branches: guards.len(),
        }
    }
}

struct Planner<'m> {
    module: &'m BehaviorModule,
    states: Vec<State<'m>>,
}

impl<'m> Planner<'m> {
    fn push(&mut self, branch: usize, kind: StateKind<'m>) -> usize {
        self.states.push(State { branch, kind });
        self.states.len() - 1
    }

    /// Split `stmts` at its first blocking point.
    fn plan(&mut self, stmts: &[StmtId], tail: Option<usize>, branch: usize) -> Continuation {
        let module = self.module;
        for (k, &id) in stmts.iter().enumerate() {
            match &module.stmt(id).kind {
                StmtKind::Alt(gl) if module.guard_list(*gl).origin == GuardListOrigin::StandaloneReceive => {
                    let then = self.plan(&stmts[k + 1..], tail, branch);
                    let guard = &module.guard_list(*gl).guards()[0];
                    let wait = self.push(branch, StateKind::Wait(vec![Alternative { guard, then }]));
                    return Continuation {
                        inline: stmts[..k].to_vec(),
                        call: None,
                        next: Some(wait),
                    };
                }
                StmtKind::Call {
                    response: Some(gl),
                    timeout,
                    ..
                } if *timeout != CallTimeout::NoWait => {
                    let after = if k + 1 < stmts.len() {
                        let rest = self.plan(&stmts[k + 1..], tail, branch);
                        Some(self.push(branch, StateKind::Resume(rest)))
                    } else {
                        tail
                    };
                    let alternatives = module
                        .guard_list(*gl)
                        .reachable()
                        .iter()
                        .map(|guard| {
                            let body = guard.node.body().cloned().unwrap_or_default();
                            Alternative {
                                guard,
                                then: self.plan(&body, after, branch),
                            }
                        })
                        .collect();
                    let wait = self.push(branch, StateKind::Wait(alternatives));
                    return Continuation {
                        inline: stmts[..k].to_vec(),
                        call: Some(id),
                        next: Some(wait),
                    };
                }
                _ => {}
            }
        }
        Continuation {
            inline: stmts.to_vec(),
            call: None,
            next: tail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttcn_ir::{check_module, lower, CheckOptions};

    fn plan_of(source: &str) -> (BehaviorModule, GuardListId) {
        let program = ttcn_dsl::parse(source, "il.ttcn").unwrap();
        let mut module = lower(&program).unwrap();
        let diags = check_module(&mut module, &CheckOptions::default());
        assert!(!diags.has_errors(), "{diags:?}");
        let gl = module
            .guard_lists
            .iter()
            .position(|l| l.origin == GuardListOrigin::Interleave)
            .unwrap();
        (module, gl)
    }

    #[test]
    fn branches_without_receives_finish_inline() {
        let (module, gl) = plan_of(
            "module M { function f() {
                interleave {
                    [] a.receive { log(1); }
                    [] b.receive;
                }
            } }",
        );
        let plan = InterleavePlan::build(&module, gl);
        assert_eq!(plan.branches, 2);
        assert_eq!(plan.states.len(), 2);
        let StateKind::Wait(alts) = &plan.states[0].kind else {
            panic!("expected wait state");
        };
        assert_eq!(alts[0].then.inline.len(), 1);
        assert_eq!(alts[0].then.next, None);
    }

    #[test]
    fn further_receive_gets_its_own_state() {
        let (module, gl) = plan_of(include_str!("../../../samples/interleave.ttcn"));
        let plan = InterleavePlan::build(&module, gl);
        assert_eq!(plan.branches, 3);

        // Branch 0: send, then wait for Bye, then log.
        let StateKind::Wait(first) = &plan.states[0].kind else {
            panic!("expected wait state");
        };
        let next = first[0].then.next.expect("branch 0 continues");
        assert_eq!(first[0].then.inline.len(), 1);
        assert_eq!(plan.states[next].branch, 0);
        let StateKind::Wait(bye) = &plan.states[next].kind else {
            panic!("expected wait state");
        };
        assert_eq!(bye[0].then.inline.len(), 1);
        assert_eq!(bye[0].then.next, None);

        // Branch 1: the call waits on two response alternatives.
        let StateKind::Wait(second) = &plan.states[1].kind else {
            panic!("expected wait state");
        };
        assert!(second[0].then.call.is_some());
        let call_state = second[0].then.next.unwrap();
        let StateKind::Wait(responses) = &plan.states[call_state].kind else {
            panic!("expected wait state");
        };
        assert_eq!(responses.len(), 2);
        assert!(responses[0].then.next.is_some());
        assert_eq!(responses[1].then.next, None);

        // Branch 2 has no body.
        let StateKind::Wait(third) = &plan.states[2].kind else {
            panic!("expected wait state");
        };
        assert_eq!(third[0].then, Continuation { inline: vec![], call: None, next: None });
    }

    #[test]
    fn statements_after_a_call_resume_later() {
        let (module, gl) = plan_of(
            "module M { function f() {
                interleave {
                    [] a.receive {
                        a.call(Op(), 1.0) {
                            [] a.getreply(Op()) {}
                        }
                        log(\"after\");
                    }
                }
            } }",
        );
        let plan = InterleavePlan::build(&module, gl);
        let resume = plan
            .states
            .iter()
            .find_map(|s| match &s.kind {
                StateKind::Resume(c) => Some(c),
                StateKind::Wait(_) => None,
            })
            .expect("resume state");
        assert_eq!(resume.inline.len(), 1);
        assert_eq!(resume.next, None);
    }
}
