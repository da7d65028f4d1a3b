use ttcn_dsl::ast::{CallTimeout, Expr, OpSubject, ReceiveKind};

use crate::diagnostics::Diagnostics;
use crate::model::*;

/// Rules for the response and exception handling part of `call`.
pub(super) fn check_call_response(module: &BehaviorModule, id: GuardListId, diags: &mut Diagnostics) {
    let list = module.guard_list(id);
    let Some(StmtKind::Call { port, timeout, .. }) = list
        .owner
        .and_then(|o| o.stmt)
        .map(|s| &module.stmt(s).kind)
    else {
        return;
    };

    if matches!(timeout, CallTimeout::NoWait) {
        diags.error(
            "ttcn::check::call_nowait_response",
            "a nowait call cannot have a response and exception handling part",
            list.span,
        );
    }

    for guard in list.guards() {
        match &guard.node {
            Guard::Else { .. } => diags.error(
                "ttcn::check::call_else",
                "[else] branch is not allowed in the response and exception handling part of call",
                guard.span,
            ),
            Guard::AltstepRef { .. } | Guard::AltstepInvoke { .. } => diags.error(
                "ttcn::check::call_altstep",
                "altstep alternatives are not allowed in the response and exception handling part of call",
                guard.span,
            ),
            Guard::BooleanOp { op, .. } => {
                if !op.kind.is_call_response() {
                    diags.error(
                        "ttcn::check::call_operation",
                        format!(
                            "{} operation cannot be used in the response and exception handling part of call",
                            op.kind.keyword()
                        ),
                        guard.span,
                    );
                    continue;
                }
                if op.subject != OpSubject::Port(port.clone()) {
                    diags.error(
                        "ttcn::check::call_port",
                        format!("response operations must use port '{port}' of the call"),
                        guard.span,
                    );
                }
                if op.kind == ReceiveKind::CatchTimeout && !matches!(timeout, CallTimeout::Timeout(_)) {
                    diags.error(
                        "ttcn::check::call_catch_timeout",
                        "catch(timeout) requires the call to have a timeout value",
                        guard.span,
                    );
                }
            }
        }
    }
}

/// Calls that wait for an answer must say how to handle it.
pub(super) fn check_calls(module: &BehaviorModule, diags: &mut Diagnostics) {
    for stmt in &module.stmts {
        if let StmtKind::Call {
            timeout,
            response: None,
            ..
        } = &stmt.kind
        {
            if !matches!(timeout, CallTimeout::NoWait) {
                diags.error(
                    "ttcn::check::call_missing_response",
                    "a call without nowait must have a response and exception handling part",
                    stmt.span,
                );
            }
        }
    }
}

/// Rules for `interleave`: only plain receiving alternatives, and branch
/// bodies that block only at their top level.
pub(super) fn check_interleave(module: &BehaviorModule, id: GuardListId, diags: &mut Diagnostics) {
    for guard in module.guard_list(id).guards() {
        match &guard.node {
            Guard::Else { .. } => diags.error(
                "ttcn::check::interleave_else",
                "[else] branch is not allowed within an interleave statement",
                guard.span,
            ),
            Guard::AltstepRef { .. } | Guard::AltstepInvoke { .. } => diags.error(
                "ttcn::check::interleave_altstep",
                "altstep alternatives are not allowed within an interleave statement",
                guard.span,
            ),
            Guard::BooleanOp { body, .. } => {
                if let Some(body) = body {
                    let mut walker = InterleaveWalker { module, diags };
                    walker.walk(body, Placement::BranchTop);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    BranchTop,
    ResponseTop,
    Nested,
}

struct InterleaveWalker<'a> {
    module: &'a BehaviorModule,
    diags: &'a mut Diagnostics,
}

impl InterleaveWalker<'_> {
    fn forbid(&mut self, what: &str, span: ttcn_dsl::ast::Span) {
        self.diags.error(
            "ttcn::check::interleave_statement",
            format!("{what} is not allowed within an interleave statement"),
            span,
        );
    }

    fn walk(&mut self, body: &[StmtId], placement: Placement) {
        let module = self.module;
        for &id in body {
            let stmt = module.stmt(id);
            match &stmt.kind {
                StmtKind::Alt(gl) => match module.guard_list(*gl).origin {
                    GuardListOrigin::StandaloneReceive if placement != Placement::Nested => {}
                    GuardListOrigin::StandaloneReceive => self.diags.error(
                        "ttcn::check::interleave_nested_receive",
                        "receiving statements within interleave must be at the top level of a branch",
                        stmt.span,
                    ),
                    GuardListOrigin::StandaloneAltstepCall => self.forbid("altstep call", stmt.span),
                    _ => self.forbid("alt statement", stmt.span),
                },
                StmtKind::Interleave(_) => self.forbid("nested interleave statement", stmt.span),
                StmtKind::Call {
                    response: Some(gl),
                    timeout,
                    ..
                } if !matches!(timeout, CallTimeout::NoWait) => {
                    if placement != Placement::BranchTop {
                        self.diags.error(
                            "ttcn::check::interleave_nested_call",
                            "blocking calls within interleave must be at the top level of a branch",
                            stmt.span,
                        );
                    }
                    for body in module.guard_bodies(*gl) {
                        self.walk(&body, Placement::ResponseTop);
                    }
                }
                StmtKind::Return(_) => self.forbid("return statement", stmt.span),
                StmtKind::Stop => self.forbid("stop statement", stmt.span),
                StmtKind::Deactivate(_) => self.forbid("deactivate", stmt.span),
                StmtKind::VarDecl { init: Some(e), .. }
                | StmtKind::Assign { value: e, .. }
                | StmtKind::Expr(e)
                    if contains_activate(e) =>
                {
                    self.forbid("activate", stmt.span)
                }
                StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                    self.check_loop(body, stmt.span);
                    self.walk(body, Placement::Nested);
                }
                StmtKind::For { body, .. } => {
                    self.check_loop(body, stmt.span);
                    self.walk(body, Placement::Nested);
                }
                StmtKind::If {
                    then_block,
                    else_block,
                    ..
                } => {
                    self.walk(then_block, Placement::Nested);
                    if let Some(else_block) = else_block {
                        self.walk(else_block, Placement::Nested);
                    }
                }
                _ => {}
            }
        }
    }

    fn check_loop(&mut self, body: &[StmtId], span: ttcn_dsl::ast::Span) {
        if self.module.contains_receiving(body) {
            self.diags.error(
                "ttcn::check::interleave_loop",
                "loops within interleave must not contain receiving statements",
                span,
            );
        }
    }
}

fn contains_activate(expr: &Expr) -> bool {
    match expr {
        Expr::Activate { .. } => true,
        Expr::Binary(_, l, r) => contains_activate(l) || contains_activate(r),
        Expr::Unary(_, e) => contains_activate(e),
        Expr::Call { args, .. } => args.iter().any(contains_activate),
        _ => false,
    }
}

/// Altsteps report a status; they cannot return a value.
pub(super) fn check_altstep_returns(module: &BehaviorModule, def: &Definition, diags: &mut Diagnostics) {
    let mut bodies: Vec<Body> = vec![def.body.clone()];
    if let Some(gl) = def.guards {
        bodies.extend(module.guard_bodies(gl));
    }
    while let Some(body) = bodies.pop() {
        for id in body {
            let stmt = module.stmt(id);
            if let StmtKind::Return(Some(_)) = stmt.kind {
                diags.error(
                    "ttcn::check::altstep_return_value",
                    format!("altstep '{}' cannot return a value", def.name),
                    stmt.span,
                );
            }
            bodies.extend(module.child_bodies(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::check::{check_module, CheckOptions};
    use crate::diagnostics::Diagnostics;
    use crate::lowering::lower;

    fn checked(src: &str) -> Diagnostics {
        let mut m = lower(&ttcn_dsl::parse(src, "t.ttcn").expect("parse")).expect("lower");
        check_module(&mut m, &CheckOptions::default())
    }

    fn codes(diags: &Diagnostics) -> Vec<&'static str> {
        diags.iter().map(|d| d.code).collect()
    }

    #[test]
    fn valid_call_forms_pass() {
        let diags = checked(include_str!("../../../../samples/call_response.ttcn"));
        assert!(diags.is_empty(), "{:?}", codes(&diags));
    }

    #[test]
    fn call_response_restrictions() {
        let diags = checked(
            r#"
module M {
    altstep as_a() { [] p.receive {} }
    function f() {
        p.call(S()) {
            [] p.getreply(S()) {}
            [] p.receive(X) {}
            [] q.getreply(S()) {}
            [] p.catch(timeout) {}
            [] as_a();
            [else] {}
        }
        p.call(S(), nowait) { [] p.getreply(S()) {} }
        p.call(S());
    }
}
"#,
        );
        let codes = codes(&diags);
        for expected in [
            "ttcn::check::call_operation",
            "ttcn::check::call_port",
            "ttcn::check::call_catch_timeout",
            "ttcn::check::call_altstep",
            "ttcn::check::call_else",
            "ttcn::check::call_nowait_response",
            "ttcn::check::call_missing_response",
        ] {
            assert!(codes.contains(&expected), "missing {expected} in {codes:?}");
        }
    }

    #[test]
    fn valid_interleave_passes() {
        let diags = checked(include_str!("../../../../samples/interleave.ttcn"));
        assert!(diags.is_empty(), "{:?}", codes(&diags));
    }

    #[test]
    fn interleave_restrictions() {
        let diags = checked(
            r#"
module M {
    altstep as_a() { [] p.receive {} }
    function f() {
        interleave {
            [] a.receive {
                if (x) { b.receive; }
                while (y) { c.receive; }
                alt { [] d.receive {} }
                return;
            }
            [] e.receive { var default d := activate(as_a()); stop; }
            [] as_a();
            [else] {}
        }
    }
}
"#,
        );
        let codes = codes(&diags);
        for expected in [
            "ttcn::check::interleave_nested_receive",
            "ttcn::check::interleave_loop",
            "ttcn::check::interleave_statement",
            "ttcn::check::interleave_altstep",
            "ttcn::check::interleave_else",
        ] {
            assert!(codes.contains(&expected), "missing {expected} in {codes:?}");
        }
        // alt, return, activate and stop
        assert_eq!(
            diags.with_code("ttcn::check::interleave_statement").len(),
            4
        );
    }

    #[test]
    fn altstep_cannot_return_value() {
        let diags = checked(
            "module M { altstep as_a() { [] p.receive { if (x) { return 1; } return; } } }",
        );
        assert_eq!(diags.with_code("ttcn::check::altstep_return_value").len(), 1);
    }
}
