/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Byte-offset to line/column mapping for a source text.
///
/// Generated code embeds 1-based line numbers in dynamic-error locations, so
/// every consumer that turns a [`Span`] into a human location goes through
/// this index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line containing `offset`.
    pub fn line(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// 1-based `(line, column)` of `offset`.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line(offset);
        let start = self.line_starts[line - 1];
        (line, offset - start + 1)
    }
}

/// Top-level program = a single module.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Program {
    pub module: Spanned<ModuleDecl>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ModuleDecl {
    pub name: String,
    pub definitions: Vec<Spanned<Definition>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Definition {
    Function(FunctionDef),
    Testcase(FunctionDef),
    Altstep(AltstepDef),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Function(f) | Definition::Testcase(f) => &f.name,
            Definition::Altstep(a) => &a.name,
        }
    }
}

/// `function` or `testcase` definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<FormalParam>,
    pub runs_on: Option<String>,
    pub return_type: Option<TypeRef>,
    pub body: Block,
}

/// `altstep` definition: local declarations followed by the alternatives.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AltstepDef {
    pub name: String,
    pub params: Vec<FormalParam>,
    pub runs_on: Option<String>,
    pub locals: Block,
    pub guards: Vec<Spanned<AltGuard>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FormalParam {
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum TypeRef {
    Integer,
    Float,
    Boolean,
    Charstring,
    Verdict,
    Default,
    Altstep,
    Timer,
    Named(String),
}

pub type Block = Vec<Spanned<Statement>>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Statement {
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
    Call(CallStmt),
    /// Stand-alone receiving statement, e.g. `p.receive(m);` or `T.timeout;`.
    Receive(ReceivingOp),
    Alt(Vec<Spanned<AltGuard>>),
    Interleave(Vec<Spanned<AltGuard>>),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        init: Box<Spanned<Statement>>,
        cond: Expr,
        step: Box<Spanned<Statement>>,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    Repeat,
    Break,
    Continue,
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
    /// Expression statement: function/altstep invocation or `activate(...)`.
    Expr(Expr),
}

/// `port.call(signature, timeout|nowait) { response guards }`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct CallStmt {
    pub port: String,
    pub signature: Expr,
    pub timeout: CallTimeout,
    pub response: Option<Vec<Spanned<AltGuard>>>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum CallTimeout {
    Blocking,
    Timeout(Expr),
    NoWait,
}

/// One alternative of an `alt`, `interleave`, `altstep` or call response.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum AltGuard {
    Operation {
        precondition: Option<Expr>,
        op: ReceivingOp,
        body: Option<Block>,
    },
    Altstep {
        precondition: Option<Expr>,
        name: String,
        args: Vec<Expr>,
        body: Option<Block>,
    },
    /// `[] v.apply(args)`: invocation of an altstep held in a variable.
    Invoke {
        precondition: Option<Expr>,
        target: String,
        args: Vec<Expr>,
        body: Option<Block>,
    },
    Else {
        body: Block,
    },
}

impl AltGuard {
    pub fn precondition(&self) -> Option<&Expr> {
        match self {
            AltGuard::Operation { precondition, .. }
            | AltGuard::Altstep { precondition, .. }
            | AltGuard::Invoke { precondition, .. } => precondition.as_ref(),
            AltGuard::Else { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&Block> {
        match self {
            AltGuard::Operation { body, .. }
            | AltGuard::Altstep { body, .. }
            | AltGuard::Invoke { body, .. } => body.as_ref(),
            AltGuard::Else { body } => Some(body),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ReceiveKind {
    Receive,
    Trigger,
    Check,
    GetCall,
    GetReply,
    Catch,
    CatchTimeout,
    Timeout,
    Done,
    Killed,
}

impl ReceiveKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ReceiveKind::Receive => "receive",
            ReceiveKind::Trigger => "trigger",
            ReceiveKind::Check => "check",
            ReceiveKind::GetCall => "getcall",
            ReceiveKind::GetReply => "getreply",
            ReceiveKind::Catch => "catch",
            ReceiveKind::CatchTimeout => "catch(timeout)",
            ReceiveKind::Timeout => "timeout",
            ReceiveKind::Done => "done",
            ReceiveKind::Killed => "killed",
        }
    }

    /// Operations legal in the response part of a call.
    pub fn is_call_response(&self) -> bool {
        matches!(
            self,
            ReceiveKind::GetReply | ReceiveKind::Catch | ReceiveKind::CatchTimeout
        )
    }
}

/// What a receiving operation is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum OpSubject {
    Port(String),
    AnyPort,
    Timer(String),
    AnyTimer,
    Component(String),
    AnyComponent,
    AllComponent,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ReceivingOp {
    pub kind: ReceiveKind,
    pub subject: OpSubject,
    /// Signature for `catch(sig, exc)`; the matching template otherwise lives in `template`.
    pub signature: Option<Expr>,
    pub template: Option<Expr>,
    pub from: Option<Expr>,
    pub redirect: Option<RedirectSpec>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct RedirectSpec {
    pub value: Option<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum VerdictLit {
    None,
    Pass,
    Inconc,
    Fail,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum BinOp {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StrLit(String),
    Verdict(VerdictLit),
    /// `?` matching template.
    AnyValue,
    /// `*` matching template.
    AnyOrOmit,
    Null,
    Var(String),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Activate {
        altstep: String,
        args: Vec<Expr>,
    },
    Refers(String),
}

impl Expr {
    /// Compile-time boolean value, if the expression folds to one.
    pub fn const_bool(&self) -> Option<bool> {
        match self {
            Expr::BoolLit(b) => Some(*b),
            Expr::Unary(UnOp::Not, inner) => inner.const_bool().map(|b| !b),
            Expr::Binary(BinOp::And, l, r) => match (l.const_bool(), r.const_bool()) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            Expr::Binary(BinOp::Or, l, r) => match (l.const_bool(), r.const_bool()) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            Expr::Binary(BinOp::Xor, l, r) => match (l.const_bool(), r.const_bool()) {
                (Some(a), Some(b)) => Some(a ^ b),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_maps_offsets() {
        let idx = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(idx.line(0), 1);
        assert_eq!(idx.line(2), 1);
        assert_eq!(idx.line(3), 2);
        assert_eq!(idx.line(6), 3);
        assert_eq!(idx.line(7), 4);
        assert_eq!(idx.line_col(8), (4, 2));
    }

    #[test]
    fn const_bool_folds_logic() {
        let t = Expr::BoolLit(true);
        let f = Expr::BoolLit(false);
        let x = Expr::Var("x".into());
        assert_eq!(
            Expr::Unary(UnOp::Not, Box::new(t.clone())).const_bool(),
            Some(false)
        );
        assert_eq!(
            Expr::Binary(BinOp::And, Box::new(x.clone()), Box::new(f.clone())).const_bool(),
            Some(false)
        );
        assert_eq!(
            Expr::Binary(BinOp::Or, Box::new(x.clone()), Box::new(t)).const_bool(),
            Some(true)
        );
        assert_eq!(
            Expr::Binary(BinOp::And, Box::new(x), Box::new(Expr::BoolLit(true))).const_bool(),
            None
        );
    }

    #[test]
    fn call_response_kinds() {
        assert!(ReceiveKind::GetReply.is_call_response());
        assert!(ReceiveKind::CatchTimeout.is_call_response());
        assert!(!ReceiveKind::Receive.is_call_response());
        assert!(!ReceiveKind::Timeout.is_call_response());
    }
}
