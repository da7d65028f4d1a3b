use indexmap::IndexMap;

use ttcn_dsl::ast::{
    CallTimeout, Expr, FormalParam, ReceivingOp, Span, Spanned, TypeRef,
};

/// A unique identifier for a definition (function, testcase or altstep).
pub type DefId = usize;
/// A unique identifier for a statement in the arena.
pub type StmtId = usize;
/// A unique identifier for a guard list in the arena.
pub type GuardListId = usize;

/// Statement sequence, by arena id.
pub type Body = Vec<StmtId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum DefKind {
    Function,
    Testcase,
    Altstep,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Definition {
    pub name: String,
    pub kind: DefKind,
    pub params: Vec<FormalParam>,
    pub runs_on: Option<String>,
    pub return_type: Option<TypeRef>,
    /// Function body, or the local declarations of an altstep.
    pub body: Body,
    /// Alternatives of an altstep.
    pub guards: Option<GuardListId>,
    pub span: Span,
}

/// Code-generation mode of a guard list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum GuardListMode {
    PlainAlt,
    AltstepBody,
    CallResponseBody,
    Interleave,
}

/// Source construct a guard list was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum GuardListOrigin {
    Alt,
    Interleave,
    Altstep,
    CallResponse,
    StandaloneReceive,
    StandaloneAltstepCall,
}

impl GuardListOrigin {
    /// Wording used in diagnostics and dynamic errors.
    pub fn describe(&self) -> &'static str {
        match self {
            GuardListOrigin::Alt => "alt statement",
            GuardListOrigin::Interleave => "interleave statement",
            GuardListOrigin::Altstep => "altstep",
            GuardListOrigin::CallResponse => {
                "response and exception handling part of call"
            }
            GuardListOrigin::StandaloneReceive => "stand-alone receiving statement",
            GuardListOrigin::StandaloneAltstepCall => "stand-alone altstep call",
        }
    }
}

/// One alternative of a guard list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Guard {
    /// `[precondition] receiving-operation { body }`
    BooleanOp {
        precondition: Option<Expr>,
        op: ReceivingOp,
        body: Option<Body>,
    },
    /// `[precondition] as_name(args) { body }`
    AltstepRef {
        precondition: Option<Expr>,
        altstep: String,
        args: Vec<Expr>,
        body: Option<Body>,
    },
    /// `[precondition] v.apply(args) { body }`
    AltstepInvoke {
        precondition: Option<Expr>,
        target: String,
        args: Vec<Expr>,
        body: Option<Body>,
    },
    Else {
        body: Body,
    },
}

impl Guard {
    pub fn precondition(&self) -> Option<&Expr> {
        match self {
            Guard::BooleanOp { precondition, .. }
            | Guard::AltstepRef { precondition, .. }
            | Guard::AltstepInvoke { precondition, .. } => precondition.as_ref(),
            Guard::Else { .. } => None,
        }
    }

    /// Precondition that still needs evaluating at run time.
    ///
    /// A precondition folding to `true` behaves as if it were absent.
    pub fn effective_precondition(&self) -> Option<&Expr> {
        self.precondition()
            .filter(|expr| expr.const_bool() != Some(true))
    }

    pub fn body(&self) -> Option<&Body> {
        match self {
            Guard::BooleanOp { body, .. }
            | Guard::AltstepRef { body, .. }
            | Guard::AltstepInvoke { body, .. } => body.as_ref(),
            Guard::Else { body } => Some(body),
        }
    }

    pub fn is_else(&self) -> bool {
        matches!(self, Guard::Else { .. })
    }

    /// Altstep guards may report Repeat or Break besides Yes/No/Maybe.
    pub fn is_altstep(&self) -> bool {
        matches!(self, Guard::AltstepRef { .. } | Guard::AltstepInvoke { .. })
    }
}

/// Definition and statement a guard list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Owner {
    pub def: DefId,
    /// `None` for the alternatives of an altstep definition.
    pub stmt: Option<StmtId>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct GuardList {
    /// Insertion order is evaluation priority.
    guards: Vec<Spanned<Guard>>,
    pub mode: GuardListMode,
    pub origin: GuardListOrigin,
    pub label: String,
    pub has_repeat_requested: bool,
    pub owner: Option<Owner>,
    pub owner_loop: Option<StmtId>,
    pub span: Span,
    pub last_checked: Option<u64>,
}

impl GuardList {
    pub fn new(mode: GuardListMode, origin: GuardListOrigin, label: String, span: Span) -> Self {
        Self {
            guards: Vec::new(),
            mode,
            origin,
            label,
            has_repeat_requested: false,
            owner: None,
            owner_loop: None,
            span,
            last_checked: None,
        }
    }

    pub fn push(&mut self, guard: Guard, span: Span) {
        self.guards.push(Spanned::new(guard, span));
    }

    pub fn guards(&self) -> &[Spanned<Guard>] {
        &self.guards
    }

    pub fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }

    pub fn set_owner_loop(&mut self, stmt: Option<StmtId>) {
        self.owner_loop = stmt;
    }

    pub fn has_repeat(&self) -> bool {
        self.has_repeat_requested
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Index of the first else guard; everything after it is unreachable.
    pub fn else_index(&self) -> Option<usize> {
        self.guards.iter().position(|g| g.node.is_else())
    }

    /// Guards that can be selected: those up to and including the first else.
    pub fn reachable(&self) -> &[Spanned<Guard>] {
        match self.else_index() {
            Some(i) => &self.guards[..=i],
            None => &self.guards,
        }
    }

    pub fn has_else(&self) -> bool {
        self.else_index().is_some()
    }

    pub fn has_altstep_guard(&self) -> bool {
        self.reachable().iter().any(|g| g.node.is_altstep())
    }

    /// Whether the generated form needs a restart point.
    pub fn needs_restart_loop(&self) -> bool {
        self.has_repeat_requested || !self.has_else() || self.has_altstep_guard()
    }
}

/// Target of a `break` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum BreakTarget {
    Loop(StmtId),
    GuardList(GuardListId),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum StmtKind {
    VarDecl {
        name: String,
        ty: TypeRef,
        init: Option<Expr>,
    },
    TimerDecl {
        name: String,
        duration: Option<Expr>,
    },
    Assign {
        target: String,
        value: Expr,
    },
    Send {
        port: String,
        value: Expr,
        to: Option<Expr>,
    },
    Call {
        port: String,
        signature: Expr,
        timeout: CallTimeout,
        response: Option<GuardListId>,
    },
    /// `alt`, stand-alone receiving statement or stand-alone altstep call.
    Alt(GuardListId),
    Interleave(GuardListId),
    If {
        cond: Expr,
        then_block: Body,
        else_block: Option<Body>,
    },
    While {
        label: String,
        cond: Expr,
        body: Body,
    },
    For {
        label: String,
        init: StmtId,
        cond: Expr,
        step: StmtId,
        body: Body,
    },
    DoWhile {
        label: String,
        body: Body,
        cond: Expr,
    },
    Repeat {
        target: Option<GuardListId>,
    },
    Break {
        target: Option<BreakTarget>,
    },
    Continue {
        target: Option<StmtId>,
    },
    Return(Option<Expr>),
    Stop,
    Log(Vec<Expr>),
    SetVerdict(Expr),
    Deactivate(Option<Expr>),
    TimerStart {
        timer: String,
        duration: Option<Expr>,
    },
    TimerStop {
        timer: String,
    },
    Expr(Expr),
}

impl StmtKind {
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            StmtKind::While { .. } | StmtKind::For { .. } | StmtKind::DoWhile { .. }
        )
    }

    pub fn loop_label(&self) -> Option<&str> {
        match self {
            StmtKind::While { label, .. }
            | StmtKind::For { label, .. }
            | StmtKind::DoWhile { label, .. } => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub def: DefId,
}

/// Arena holding every definition, statement and guard list of a module.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct BehaviorModule {
    pub name: String,
    pub definitions: Vec<Definition>,
    pub stmts: Vec<Stmt>,
    pub guard_lists: Vec<GuardList>,
    pub def_index: IndexMap<String, DefId>,
    pub last_checked: Option<u64>,
    pub check_errors: usize,
}

impl BehaviorModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_definition(&mut self, def: Definition) -> DefId {
        let id = self.definitions.len();
        self.def_index.insert(def.name.clone(), id);
        self.definitions.push(def);
        id
    }

    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = self.stmts.len();
        self.stmts.push(stmt);
        id
    }

    pub fn add_guard_list(&mut self, list: GuardList) -> GuardListId {
        let id = self.guard_lists.len();
        self.guard_lists.push(list);
        id
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    pub fn guard_list(&self, id: GuardListId) -> &GuardList {
        &self.guard_lists[id]
    }

    pub fn guard_list_mut(&mut self, id: GuardListId) -> &mut GuardList {
        &mut self.guard_lists[id]
    }

    pub fn definition(&self, id: DefId) -> &Definition {
        &self.definitions[id]
    }

    pub fn find_definition(&self, name: &str) -> Option<&Definition> {
        self.def_index.get(name).map(|&id| &self.definitions[id])
    }

    pub fn is_altstep(&self, name: &str) -> bool {
        self.find_definition(name)
            .is_some_and(|d| d.kind == DefKind::Altstep)
    }

    /// Whether the model went through a check with no errors.
    pub fn is_checked_clean(&self) -> bool {
        self.last_checked.is_some() && self.check_errors == 0
    }

    /// Whether executing `body` always ends in a control transfer.
    pub fn transfers_control(&self, body: &[StmtId]) -> bool {
        let Some(&last) = body.last() else {
            return false;
        };
        match &self.stmt(last).kind {
            StmtKind::Repeat { .. }
            | StmtKind::Break { .. }
            | StmtKind::Continue { .. }
            | StmtKind::Return(_)
            | StmtKind::Stop => true,
            StmtKind::If {
                then_block,
                else_block: Some(else_block),
                ..
            } => self.transfers_control(then_block) && self.transfers_control(else_block),
            _ => false,
        }
    }

    /// Whether the statement can block on a snapshot.
    pub fn is_receiving(&self, id: StmtId) -> bool {
        match &self.stmt(id).kind {
            StmtKind::Alt(_) | StmtKind::Interleave(_) => true,
            StmtKind::Call {
                timeout, response, ..
            } => *timeout != CallTimeout::NoWait && response.is_some(),
            _ => false,
        }
    }

    /// Whether any statement in `body`, at any depth, can block.
    pub fn contains_receiving(&self, body: &[StmtId]) -> bool {
        body.iter().any(|&id| {
            self.is_receiving(id)
                || self
                    .child_bodies(id)
                    .iter()
                    .any(|child| self.contains_receiving(child))
        })
    }

    /// Statement sequences nested directly in a statement, including guard bodies.
    pub fn child_bodies(&self, id: StmtId) -> Vec<Body> {
        match &self.stmt(id).kind {
            StmtKind::If {
                then_block,
                else_block,
                ..
            } => {
                let mut out = vec![then_block.clone()];
                out.extend(else_block.iter().cloned());
                out
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => vec![body.clone()],
            StmtKind::For {
                init, step, body, ..
            } => vec![vec![*init], body.clone(), vec![*step]],
            StmtKind::Alt(gl) | StmtKind::Interleave(gl) => self.guard_bodies(*gl),
            StmtKind::Call {
                response: Some(gl),
                ..
            } => self.guard_bodies(*gl),
            _ => Vec::new(),
        }
    }

    pub fn guard_bodies(&self, id: GuardListId) -> Vec<Body> {
        self.guard_list(id)
            .guards()
            .iter()
            .filter_map(|g| g.node.body().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttcn_dsl::ast::{OpSubject, ReceiveKind};

    fn receive(port: &str) -> Guard {
        Guard::BooleanOp {
            precondition: None,
            op: ReceivingOp {
                kind: ReceiveKind::Receive,
                subject: OpSubject::Port(port.into()),
                signature: None,
                template: None,
                from: None,
                redirect: None,
                span: Span::default(),
            },
            body: None,
        }
    }

    #[test]
    fn reachable_stops_at_first_else() {
        let mut gl = GuardList::new(
            GuardListMode::PlainAlt,
            GuardListOrigin::Alt,
            "alt_0".into(),
            Span::default(),
        );
        gl.push(receive("a"), Span::default());
        gl.push(Guard::Else { body: vec![] }, Span::default());
        gl.push(receive("b"), Span::default());
        assert_eq!(gl.else_index(), Some(1));
        assert_eq!(gl.reachable().len(), 2);
        assert!(!gl.needs_restart_loop());
        gl.has_repeat_requested = true;
        assert!(gl.needs_restart_loop());
    }

    #[test]
    fn constant_true_precondition_is_absent() {
        let guard = Guard::BooleanOp {
            precondition: Some(Expr::BoolLit(true)),
            op: match receive("p") {
                Guard::BooleanOp { op, .. } => op,
                _ => unreachable!(),
            },
            body: None,
        };
        assert!(guard.precondition().is_some());
        assert!(guard.effective_precondition().is_none());
    }

    #[test]
    fn transfers_control_looks_through_if() {
        let mut m = BehaviorModule::new("M");
        let rep = m.add_stmt(Stmt {
            kind: StmtKind::Repeat { target: None },
            span: Span::default(),
            def: 0,
        });
        let stop = m.add_stmt(Stmt {
            kind: StmtKind::Stop,
            span: Span::default(),
            def: 0,
        });
        let both = m.add_stmt(Stmt {
            kind: StmtKind::If {
                cond: Expr::Var("c".into()),
                then_block: vec![rep],
                else_block: Some(vec![stop]),
            },
            span: Span::default(),
            def: 0,
        });
        let half = m.add_stmt(Stmt {
            kind: StmtKind::If {
                cond: Expr::Var("c".into()),
                then_block: vec![rep],
                else_block: None,
            },
            span: Span::default(),
            def: 0,
        });
        assert!(m.transfers_control(&[both]));
        assert!(!m.transfers_control(&[half]));
        assert!(!m.transfers_control(&[]));
    }
}
