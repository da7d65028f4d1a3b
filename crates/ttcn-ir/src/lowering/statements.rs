use tracing::trace;

use super::LoweringError;
use crate::model::*;
use crate::names::FreshNames;
use ttcn_dsl::ast;

/// Lowers the statements of one definition into the module arena.
pub(super) struct BodyLowerer<'a> {
    module: &'a mut BehaviorModule,
    names: &'a mut FreshNames,
    def: DefId,
}

impl<'a> BodyLowerer<'a> {
    pub(super) fn new(module: &'a mut BehaviorModule, names: &'a mut FreshNames, def: DefId) -> Self {
        Self { module, names, def }
    }

    pub(super) fn lower_block(&mut self, block: &ast::Block) -> Result<Body, LoweringError> {
        block.iter().map(|s| self.lower_stmt(s)).collect()
    }

    fn push(&mut self, kind: StmtKind, span: ast::Span) -> StmtId {
        self.module.add_stmt(Stmt {
            kind,
            span,
            def: self.def,
        })
    }

    /// Push a statement that owns `list` and record the ownership.
    fn push_owning(&mut self, kind: StmtKind, list: GuardListId, span: ast::Span) -> StmtId {
        let id = self.push(kind, span);
        self.module.guard_list_mut(list).set_owner(Owner {
            def: self.def,
            stmt: Some(id),
        });
        id
    }

    fn lower_stmt(&mut self, stmt: &ast::Spanned<ast::Statement>) -> Result<StmtId, LoweringError> {
        let span = stmt.span;
        let kind = match &stmt.node {
            ast::Statement::VarDecl { name, ty, init } => {
                if let Some(init) = init {
                    self.check_expr(init, span)?;
                }
                StmtKind::VarDecl {
                    name: name.clone(),
                    ty: ty.clone(),
                    init: init.clone(),
                }
            }
            ast::Statement::TimerDecl { name, duration } => StmtKind::TimerDecl {
                name: name.clone(),
                duration: duration.clone(),
            },
            ast::Statement::Assign { target, value } => {
                self.check_expr(value, span)?;
                StmtKind::Assign {
                    target: target.clone(),
                    value: value.clone(),
                }
            }
            ast::Statement::Send { port, value, to } => StmtKind::Send {
                port: port.clone(),
                value: value.clone(),
                to: to.clone(),
            },
            ast::Statement::Call(call) => {
                let response = match &call.response {
                    Some(guards) => Some(self.lower_guard_list(
                        guards,
                        GuardListMode::CallResponseBody,
                        GuardListOrigin::CallResponse,
                        span,
                    )?),
                    None => None,
                };
                let kind = StmtKind::Call {
                    port: call.port.clone(),
                    signature: call.signature.clone(),
                    timeout: call.timeout.clone(),
                    response,
                };
                return Ok(match response {
                    Some(list) => self.push_owning(kind, list, span),
                    None => self.push(kind, span),
                });
            }
            ast::Statement::Receive(op) => {
                let list = self.new_list(
                    GuardListMode::PlainAlt,
                    GuardListOrigin::StandaloneReceive,
                    span,
                );
                self.module.guard_list_mut(list).push(
                    Guard::BooleanOp {
                        precondition: None,
                        op: op.clone(),
                        body: None,
                    },
                    span,
                );
                return Ok(self.push_owning(StmtKind::Alt(list), list, span));
            }
            ast::Statement::Expr(ast::Expr::Call { name, args }) if self.module.is_altstep(name) => {
                let list = self.new_list(
                    GuardListMode::PlainAlt,
                    GuardListOrigin::StandaloneAltstepCall,
                    span,
                );
                self.module.guard_list_mut(list).push(
                    Guard::AltstepRef {
                        precondition: None,
                        altstep: name.clone(),
                        args: args.clone(),
                        body: None,
                    },
                    span,
                );
                return Ok(self.push_owning(StmtKind::Alt(list), list, span));
            }
            ast::Statement::Alt(guards) => {
                let list =
                    self.lower_guard_list(guards, GuardListMode::PlainAlt, GuardListOrigin::Alt, span)?;
                return Ok(self.push_owning(StmtKind::Alt(list), list, span));
            }
            ast::Statement::Interleave(guards) => {
                let list = self.lower_guard_list(
                    guards,
                    GuardListMode::Interleave,
                    GuardListOrigin::Interleave,
                    span,
                )?;
                return Ok(self.push_owning(StmtKind::Interleave(list), list, span));
            }
            ast::Statement::If {
                cond,
                then_block,
                else_block,
            } => StmtKind::If {
                cond: cond.clone(),
                then_block: self.lower_block(then_block)?,
                else_block: match else_block {
                    Some(b) => Some(self.lower_block(b)?),
                    None => None,
                },
            },
            ast::Statement::While { cond, body } => {
                let label = self.names.fresh("while");
                StmtKind::While {
                    label,
                    cond: cond.clone(),
                    body: self.lower_block(body)?,
                }
            }
            ast::Statement::For {
                init,
                cond,
                step,
                body,
            } => {
                let label = self.names.fresh("for");
                let init = self.lower_stmt(init)?;
                let step = self.lower_stmt(step)?;
                StmtKind::For {
                    label,
                    init,
                    cond: cond.clone(),
                    step,
                    body: self.lower_block(body)?,
                }
            }
            ast::Statement::DoWhile { body, cond } => {
                let label = self.names.fresh("do");
                StmtKind::DoWhile {
                    label,
                    body: self.lower_block(body)?,
                    cond: cond.clone(),
                }
            }
            ast::Statement::Repeat => StmtKind::Repeat { target: None },
            ast::Statement::Break => StmtKind::Break { target: None },
            ast::Statement::Continue => StmtKind::Continue { target: None },
            ast::Statement::Return(value) => StmtKind::Return(value.clone()),
            ast::Statement::Stop => StmtKind::Stop,
            ast::Statement::Log(args) => StmtKind::Log(args.clone()),
            ast::Statement::SetVerdict(v) => StmtKind::SetVerdict(v.clone()),
            ast::Statement::Deactivate(d) => StmtKind::Deactivate(d.clone()),
            ast::Statement::TimerStart { timer, duration } => StmtKind::TimerStart {
                timer: timer.clone(),
                duration: duration.clone(),
            },
            ast::Statement::TimerStop { timer } => StmtKind::TimerStop {
                timer: timer.clone(),
            },
            ast::Statement::Expr(expr) => {
                self.check_expr(expr, span)?;
                StmtKind::Expr(expr.clone())
            }
        };
        Ok(self.push(kind, span))
    }

    fn new_list(
        &mut self,
        mode: GuardListMode,
        origin: GuardListOrigin,
        span: ast::Span,
    ) -> GuardListId {
        let prefix = match mode {
            GuardListMode::PlainAlt => "alt",
            GuardListMode::AltstepBody => "altstep",
            GuardListMode::CallResponseBody => "call",
            GuardListMode::Interleave => "il",
        };
        let label = self.names.fresh(prefix);
        trace!(%label, ?origin, "new guard list");
        self.module
            .add_guard_list(GuardList::new(mode, origin, label, span))
    }

    pub(super) fn lower_guard_list(
        &mut self,
        guards: &[ast::Spanned<ast::AltGuard>],
        mode: GuardListMode,
        origin: GuardListOrigin,
        span: ast::Span,
    ) -> Result<GuardListId, LoweringError> {
        let list = self.new_list(mode, origin, span);
        for guard in guards {
            let lowered = self.lower_guard(guard)?;
            self.module.guard_list_mut(list).push(lowered, guard.span);
        }
        Ok(list)
    }

    fn lower_guard(&mut self, guard: &ast::Spanned<ast::AltGuard>) -> Result<Guard, LoweringError> {
        let span = guard.span;
        Ok(match &guard.node {
            ast::AltGuard::Operation {
                precondition,
                op,
                body,
            } => Guard::BooleanOp {
                precondition: precondition.clone(),
                op: op.clone(),
                body: self.lower_opt_block(body)?,
            },
            ast::AltGuard::Altstep {
                precondition,
                name,
                args,
                body,
            } => {
                self.expect_altstep(name, "alternative", span)?;
                Guard::AltstepRef {
                    precondition: precondition.clone(),
                    altstep: name.clone(),
                    args: args.clone(),
                    body: self.lower_opt_block(body)?,
                }
            }
            ast::AltGuard::Invoke {
                precondition,
                target,
                args,
                body,
            } => Guard::AltstepInvoke {
                precondition: precondition.clone(),
                target: target.clone(),
                args: args.clone(),
                body: self.lower_opt_block(body)?,
            },
            ast::AltGuard::Else { body } => Guard::Else {
                body: self.lower_block(body)?,
            },
        })
    }

    fn lower_opt_block(&mut self, block: &Option<ast::Block>) -> Result<Option<Body>, LoweringError> {
        block.as_ref().map(|b| self.lower_block(b)).transpose()
    }

    /// Names used as altsteps must not resolve to a function or testcase.
    ///
    /// Unknown names are accepted: they may come from imported modules.
    fn expect_altstep(
        &self,
        name: &str,
        context: &'static str,
        span: ast::Span,
    ) -> Result<(), LoweringError> {
        let found = match self.module.find_definition(name).map(|d| d.kind) {
            Some(DefKind::Function) => "function",
            Some(DefKind::Testcase) => "testcase",
            Some(DefKind::Altstep) | None => return Ok(()),
        };
        Err(LoweringError::NotAnAltstep {
            name: name.to_string(),
            found,
            context,
            span,
        })
    }

    fn check_expr(&self, expr: &ast::Expr, span: ast::Span) -> Result<(), LoweringError> {
        match expr {
            ast::Expr::Activate { altstep, args } => {
                self.expect_altstep(altstep, "activate", span)?;
                args.iter().try_for_each(|a| self.check_expr(a, span))
            }
            ast::Expr::Refers(name) => self.expect_altstep(name, "refers", span),
            ast::Expr::Binary(_, l, r) => {
                self.check_expr(l, span)?;
                self.check_expr(r, span)
            }
            ast::Expr::Unary(_, e) => self.check_expr(e, span),
            ast::Expr::Call { args, .. } => args.iter().try_for_each(|a| self.check_expr(a, span)),
            _ => Ok(()),
        }
    }
}
