use tracing::trace;

use crate::diagnostics::Diagnostics;
use crate::model::*;

#[derive(Debug, Clone, Copy)]
enum Frame {
    Loop(StmtId),
    List(GuardListId),
}

#[derive(Debug)]
enum Binding {
    Repeat(StmtId, Option<GuardListId>),
    Break(StmtId, Option<BreakTarget>),
    Continue(StmtId, Option<StmtId>),
    OwnerLoop(GuardListId, Option<StmtId>),
}

/// Resolve `repeat`, `break` and `continue` to arena ids.
///
/// Walks each definition with a stack of enclosing loops and guard lists,
/// then writes the targets back. Re-binding overwrites earlier results.
pub(super) fn bind(module: &mut BehaviorModule, diags: &mut Diagnostics) {
    let shared: &BehaviorModule = module;
    let mut binder = Binder {
        module: shared,
        frames: Vec::new(),
        out: Vec::new(),
        diags,
    };
    for def in &shared.definitions {
        binder.frames.clear();
        binder.walk_body(&def.body);
        if let Some(guards) = def.guards {
            binder.walk_list(guards);
        }
    }
    let bindings = binder.out;

    for gl in &mut module.guard_lists {
        gl.has_repeat_requested = false;
    }
    for binding in bindings {
        match binding {
            Binding::Repeat(stmt, target) => {
                if let Some(gl) = target {
                    module.guard_list_mut(gl).has_repeat_requested = true;
                }
                module.stmts[stmt].kind = StmtKind::Repeat { target };
            }
            Binding::Break(stmt, target) => module.stmts[stmt].kind = StmtKind::Break { target },
            Binding::Continue(stmt, target) => {
                module.stmts[stmt].kind = StmtKind::Continue { target }
            }
            Binding::OwnerLoop(gl, stmt) => module.guard_list_mut(gl).set_owner_loop(stmt),
        }
    }
}

struct Binder<'a> {
    module: &'a BehaviorModule,
    frames: Vec<Frame>,
    out: Vec<Binding>,
    diags: &'a mut Diagnostics,
}

impl Binder<'_> {
    fn nearest_loop(&self) -> Option<StmtId> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::Loop(id) => Some(*id),
            Frame::List(_) => None,
        })
    }

    fn nearest_list(&self) -> Option<GuardListId> {
        self.frames.iter().rev().find_map(|f| match f {
            Frame::List(id) => Some(*id),
            Frame::Loop(_) => None,
        })
    }

    fn inside_interleave(&self) -> bool {
        self.frames.iter().any(|f| match f {
            Frame::List(id) => self.module.guard_list(*id).mode == GuardListMode::Interleave,
            Frame::Loop(_) => false,
        })
    }

    fn walk_body(&mut self, body: &[StmtId]) {
        for &id in body {
            self.walk_stmt(id);
        }
    }

    fn walk_list(&mut self, id: GuardListId) {
        self.out.push(Binding::OwnerLoop(id, self.nearest_loop()));
        let module = self.module;
        self.frames.push(Frame::List(id));
        for guard in module.guard_list(id).guards() {
            if let Some(body) = guard.node.body() {
                self.walk_body(body);
            }
        }
        self.frames.pop();
    }

    fn walk_loop(&mut self, id: StmtId, body: &[StmtId]) {
        self.frames.push(Frame::Loop(id));
        self.walk_body(body);
        self.frames.pop();
    }

    fn walk_stmt(&mut self, id: StmtId) {
        let module = self.module;
        let stmt = module.stmt(id);
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Repeat { .. } => {
                let target = if self.inside_interleave() {
                    self.diags.error(
                        "ttcn::check::repeat_in_interleave",
                        "repeat statement is not allowed within an interleave statement",
                        span,
                    );
                    None
                } else {
                    let target = self.nearest_list();
                    if target.is_none() {
                        self.diags.error(
                            "ttcn::check::repeat_outside",
                            "repeat statement used outside of an alt statement, altstep or call response part",
                            span,
                        );
                    }
                    target
                };
                trace!(stmt = id, ?target, "bound repeat");
                self.out.push(Binding::Repeat(id, target));
            }
            StmtKind::Break { .. } => {
                let target = match (self.nearest_loop(), self.nearest_list()) {
                    (Some(loop_id), _) => Some(BreakTarget::Loop(loop_id)),
                    (None, Some(_)) if self.inside_interleave() => {
                        self.diags.error(
                            "ttcn::check::break_in_interleave",
                            "break statement within an interleave statement must be enclosed in a loop",
                            span,
                        );
                        None
                    }
                    (None, Some(list)) => Some(BreakTarget::GuardList(list)),
                    (None, None) => {
                        self.diags.error(
                            "ttcn::check::break_outside",
                            "break statement used outside of a loop or alternative",
                            span,
                        );
                        None
                    }
                };
                trace!(stmt = id, ?target, "bound break");
                self.out.push(Binding::Break(id, target));
            }
            StmtKind::Continue { .. } => {
                let target = self.nearest_loop();
                if target.is_none() {
                    self.diags.error(
                        "ttcn::check::continue_outside",
                        "continue statement used outside of a loop",
                        span,
                    );
                }
                self.out.push(Binding::Continue(id, target));
            }
            StmtKind::If {
                then_block,
                else_block,
                ..
            } => {
                self.walk_body(then_block);
                if let Some(else_block) = else_block {
                    self.walk_body(else_block);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => self.walk_loop(id, body),
            StmtKind::For {
                init, step, body, ..
            } => {
                self.walk_stmt(*init);
                self.frames.push(Frame::Loop(id));
                self.walk_body(body);
                self.walk_stmt(*step);
                self.frames.pop();
            }
            StmtKind::Alt(gl) | StmtKind::Interleave(gl) => self.walk_list(*gl),
            StmtKind::Call {
                response: Some(gl), ..
            } => self.walk_list(*gl),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowering::lower;

    fn bound(src: &str) -> (BehaviorModule, Diagnostics) {
        let mut m = lower(&ttcn_dsl::parse(src, "t.ttcn").expect("parse")).expect("lower");
        let mut diags = Diagnostics::new();
        bind(&mut m, &mut diags);
        (m, diags)
    }

    fn find(m: &BehaviorModule, pred: impl Fn(&StmtKind) -> bool) -> Vec<StmtId> {
        (0..m.stmts.len()).filter(|&i| pred(&m.stmt(i).kind)).collect()
    }

    #[test]
    fn repeat_binds_innermost_list_and_sets_flag() {
        let (m, diags) = bound(
            r#"
module M {
    function f() {
        alt {
            [] p.receive {
                alt { [] q.receive { repeat; } }
            }
        }
    }
}
"#,
        );
        assert!(diags.is_empty());
        let repeats = find(&m, |k| matches!(k, StmtKind::Repeat { .. }));
        let StmtKind::Repeat { target: Some(gl) } = m.stmt(repeats[0]).kind else {
            panic!("unbound repeat");
        };
        assert_eq!(m.guard_list(gl).label, "alt_1");
        assert!(m.guard_list(gl).has_repeat());
        assert!(!m.guard_list(0).has_repeat());
    }

    #[test]
    fn break_prefers_enclosing_loop_over_list() {
        let (m, diags) = bound(
            r#"
module M {
    function f() {
        while (true) {
            alt { [] p.receive { break; } }
        }
        alt { [] p.receive { break; } }
    }
}
"#,
        );
        assert!(diags.is_empty());
        let breaks = find(&m, |k| matches!(k, StmtKind::Break { .. }));
        let loops = find(&m, StmtKind::is_loop);
        assert_eq!(
            m.stmt(breaks[0]).kind,
            StmtKind::Break {
                target: Some(BreakTarget::Loop(loops[0]))
            }
        );
        assert_eq!(
            m.stmt(breaks[1]).kind,
            StmtKind::Break {
                target: Some(BreakTarget::GuardList(1))
            }
        );
        assert_eq!(m.guard_list(0).owner_loop, Some(loops[0]));
        assert_eq!(m.guard_list(1).owner_loop, None);
    }

    #[test]
    fn break_in_altstep_binds_altstep_list() {
        let (m, diags) = bound("module M { altstep as_a() { [] p.receive { break; } } }");
        assert!(diags.is_empty());
        let breaks = find(&m, |k| matches!(k, StmtKind::Break { .. }));
        let gl = m.definitions[0].guards.unwrap();
        assert_eq!(
            m.stmt(breaks[0]).kind,
            StmtKind::Break {
                target: Some(BreakTarget::GuardList(gl))
            }
        );
    }

    #[test]
    fn continue_needs_a_loop() {
        let (m, diags) = bound(
            r#"
module M {
    function f() {
        for (var integer i := 0; i < 3; i := i + 1) {
            alt { [] p.receive { continue; } }
        }
        alt { [] p.receive { continue; } }
    }
}
"#,
        );
        assert_eq!(diags.with_code("ttcn::check::continue_outside").len(), 1);
        let conts = find(&m, |k| matches!(k, StmtKind::Continue { .. }));
        assert!(matches!(m.stmt(conts[0]).kind, StmtKind::Continue { target: Some(_) }));
        assert!(matches!(m.stmt(conts[1]).kind, StmtKind::Continue { target: None }));
    }

    #[test]
    fn misplaced_control_statements_are_errors() {
        let (_, diags) = bound(
            r#"
module M {
    function f() {
        repeat;
        break;
        interleave {
            [] p.receive { repeat; }
            [] q.receive { break; }
        }
    }
}
"#,
        );
        assert_eq!(diags.with_code("ttcn::check::repeat_outside").len(), 1);
        assert_eq!(diags.with_code("ttcn::check::break_outside").len(), 1);
        assert_eq!(diags.with_code("ttcn::check::repeat_in_interleave").len(), 1);
        assert_eq!(diags.with_code("ttcn::check::break_in_interleave").len(), 1);
    }

    #[test]
    fn repeat_in_plain_loop_is_an_error_and_binding_goes_on() {
        let (m, diags) = bound(
            r#"
module M {
    function f() {
        while (true) { repeat; }
        continue;
    }
}
"#,
        );
        assert_eq!(diags.error_count(), 2);
        let repeat_err = diags.with_code("ttcn::check::repeat_outside");
        let continue_err = diags.with_code("ttcn::check::continue_outside");
        assert_eq!(repeat_err.len(), 1);
        assert_eq!(continue_err.len(), 1);
        assert!(repeat_err[0].span.start < continue_err[0].span.start);

        let repeat = find(&m, |k| matches!(k, StmtKind::Repeat { .. }))[0];
        assert_eq!(m.stmt(repeat).kind, StmtKind::Repeat { target: None });
        let cont = find(&m, |k| matches!(k, StmtKind::Continue { .. }))[0];
        assert_eq!(m.stmt(cont).kind, StmtKind::Continue { target: None });
    }

    #[test]
    fn rebinding_resets_repeat_flags() {
        let (mut m, _) = bound("module M { function f() { alt { [] p.receive { repeat; } } } }");
        assert!(m.guard_list(0).has_repeat());
        let repeat = find(&m, |k| matches!(k, StmtKind::Repeat { .. }))[0];
        m.stmts[repeat].kind = StmtKind::Log(vec![]);
        let mut diags = Diagnostics::new();
        bind(&mut m, &mut diags);
        assert!(!m.guard_list(0).has_repeat());
    }
}
