use indexmap::IndexMap;
use ttcn_dsl::ast::{BinOp, Expr, OpSubject, ReceiveKind, ReceivingOp, RedirectSpec, TypeRef, UnOp, VerdictLit};
use ttcn_ir::{BehaviorModule, DefId, DefKind, StmtKind};

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "dyn", "enum", "extern", "final", "fn",
    "gen", "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
    "priv", "pub", "ref", "static", "struct", "trait", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "yield",
];

/// TTCN-3 identifier as a Rust identifier.
pub fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "rt" => format!("{name}_"),
        _ if RUST_KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_string(),
    }
}

/// Map a TTCN-3 type to its Rust type string.
pub fn rust_type(ty: &TypeRef) -> &'static str {
    match ty {
        TypeRef::Integer => "i64",
        TypeRef::Float => "f64",
        TypeRef::Boolean => "bool",
        TypeRef::Charstring => "String",
        TypeRef::Verdict => "Verdict",
        TypeRef::Default => "DefaultHandle",
        TypeRef::Altstep => "AltstepValue",
        TypeRef::Timer | TypeRef::Named(_) => "Value",
    }
}

/// Types that can travel through a `*_dyn` altstep adapter.
pub fn is_dynamic_arg(ty: &TypeRef) -> bool {
    !matches!(ty, TypeRef::Default | TypeRef::Altstep)
}

pub fn verdict_variant(v: VerdictLit) -> &'static str {
    match v {
        VerdictLit::None => "Verdict::None",
        VerdictLit::Pass => "Verdict::Pass",
        VerdictLit::Inconc => "Verdict::Inconc",
        VerdictLit::Fail => "Verdict::Fail",
        VerdictLit::Error => "Verdict::Error",
    }
}

fn op_kind(kind: ReceiveKind) -> &'static str {
    match kind {
        ReceiveKind::Receive => "OpKind::Receive",
        ReceiveKind::Trigger => "OpKind::Trigger",
        ReceiveKind::Check => "OpKind::Check",
        ReceiveKind::GetCall => "OpKind::GetCall",
        ReceiveKind::GetReply => "OpKind::GetReply",
        ReceiveKind::Catch => "OpKind::Catch",
        ReceiveKind::CatchTimeout => "OpKind::CatchTimeout",
        ReceiveKind::Timeout => "OpKind::Timeout",
        ReceiveKind::Done => "OpKind::Done",
        ReceiveKind::Killed => "OpKind::Killed",
    }
}

fn subject(subject: &OpSubject) -> String {
    match subject {
        OpSubject::Port(p) => format!("Subject::Port({p:?})"),
        OpSubject::AnyPort => "Subject::AnyPort".into(),
        OpSubject::Timer(t) => format!("Subject::Timer({t:?})"),
        OpSubject::AnyTimer => "Subject::AnyTimer".into(),
        OpSubject::Component(c) => format!("Subject::Component({c:?})"),
        OpSubject::AnyComponent => "Subject::AnyComponent".into(),
        OpSubject::AllComponent => "Subject::AllComponent".into(),
    }
}

/// Variables visible in one definition, with their declared types.
///
/// Interleave branches may each declare a local of the same name. While a
/// branch is written, its hoisted locals shadow the definition-wide entries
/// under branch-specific identifiers.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: IndexMap<String, TypeRef>,
    hoisted: IndexMap<String, (String, TypeRef)>,
}

impl Scope {
    /// Parameters plus every variable declared anywhere in the definition.
    pub fn for_definition(module: &BehaviorModule, def: DefId) -> Self {
        let mut vars = IndexMap::new();
        for p in &module.definition(def).params {
            vars.insert(p.name.clone(), p.ty.clone());
        }
        for stmt in module.stmts.iter().filter(|s| s.def == def) {
            if let StmtKind::VarDecl { name, ty, .. } = &stmt.kind {
                vars.insert(name.clone(), ty.clone());
            }
        }
        Self {
            vars,
            hoisted: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        match self.hoisted.get(name) {
            Some((_, ty)) => Some(ty),
            None => self.vars.get(name),
        }
    }

    /// Rust identifier a variable is written as.
    pub fn ident(&self, name: &str) -> String {
        match self.hoisted.get(name) {
            Some((ident, _)) => ident.clone(),
            None => rust_ident(name),
        }
    }

    /// Write `name` as `ident` until the hoisted set is cleared.
    pub fn hoist(&mut self, name: &str, ident: String, ty: TypeRef) {
        self.hoisted.insert(name.to_string(), (ident, ty));
    }

    pub fn clear_hoisted(&mut self) {
        self.hoisted.clear();
    }
}

/// Renders expressions of one definition as Rust expressions.
///
/// Identifiers that are neither variables nor module definitions are taken
/// as message constants, and calls to unknown names as message constructors.
pub struct ExprWriter<'a> {
    pub module: &'a BehaviorModule,
    pub scope: &'a Scope,
}

impl ExprWriter<'_> {
    /// Plain Rust expression of the expression's natural type.
    pub fn expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::IntLit(n) => format!("{n}i64"),
            Expr::FloatLit(x) => format!("{x:?}"),
            Expr::BoolLit(b) => b.to_string(),
            Expr::StrLit(s) => format!("String::from({s:?})"),
            Expr::Verdict(v) => verdict_variant(*v).to_string(),
            Expr::AnyValue | Expr::AnyOrOmit => "Value::Omit".into(),
            Expr::Null => "Default::default()".into(),
            Expr::Var(name) => match self.scope.get(name) {
                Some(_) => self.scope.ident(name),
                None => format!("Value::message({name:?}, vec![])"),
            },
            Expr::Binary(op, l, r) => self.binary(*op, l, r),
            Expr::Unary(UnOp::Not, e) => format!("!{}", self.expr(e)),
            Expr::Unary(UnOp::Neg, e) => format!("(-{})", self.expr(e)),
            Expr::Call { name, args } => match self.module.find_definition(name) {
                Some(def) => {
                    let rendered: Vec<String> = args
                        .iter()
                        .enumerate()
                        .map(|(i, a)| match def.params.get(i) {
                            Some(p) => self.typed(a, &p.ty),
                            None => self.owned(a),
                        })
                        .collect();
                    call_with_rt(name, &rendered)
                }
                None => self.value(expr),
            },
            Expr::Activate { altstep, args } => {
                let values: Vec<String> = args.iter().map(|a| self.value(a)).collect();
                format!(
                    "rt.defaults().activate({}, vec![{}])?",
                    altstep_value(altstep),
                    values.join(", ")
                )
            }
            Expr::Refers(name) => altstep_value(name),
        }
    }

    fn binary(&self, op: BinOp, l: &Expr, r: &Expr) -> String {
        let left = self.expr(l);
        let right = self.expr(r);
        let symbol = match op {
            BinOp::Concat => return format!("format!(\"{{}}{{}}\", {left}, {right})"),
            BinOp::Mod => return format!("({left}).rem_euclid({right})"),
            BinOp::Or => "||",
            BinOp::Xor => "^",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        };
        format!("({left} {symbol} {right})")
    }

    /// Expression that yields an owned value (clones variables).
    pub fn owned(&self, expr: &Expr) -> String {
        match expr {
            Expr::Var(name) if self.scope.get(name).is_some() => {
                format!("{}.clone()", self.scope.ident(name))
            }
            _ => self.expr(expr),
        }
    }

    /// Expression converted to the Rust type of `ty`.
    pub fn typed(&self, expr: &Expr, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named(_) | TypeRef::Timer => self.value(expr),
            TypeRef::Float => self.float(expr),
            _ => self.owned(expr),
        }
    }

    pub fn float(&self, expr: &Expr) -> String {
        match expr {
            Expr::FloatLit(x) => format!("{x:?}"),
            Expr::IntLit(n) => format!("{n}.0"),
            _ => format!("({} as f64)", self.expr(expr)),
        }
    }

    /// Expression of type `Value`.
    pub fn value(&self, expr: &Expr) -> String {
        match expr {
            Expr::AnyValue | Expr::AnyOrOmit | Expr::Null => "Value::Omit".into(),
            Expr::Var(name) if self.scope.get(name).is_none() => {
                format!("Value::message({name:?}, vec![])")
            }
            Expr::Call { name, args } if self.module.find_definition(name).is_none() => {
                let fields: Vec<String> = args.iter().map(|a| self.value(a)).collect();
                format!("Value::message({name:?}, vec![{}])", fields.join(", "))
            }
            _ => format!("Value::from({})", self.owned(expr)),
        }
    }

    /// Expression of type `Template`.
    pub fn template(&self, expr: &Expr) -> String {
        match expr {
            Expr::AnyValue => "Template::Any".into(),
            Expr::AnyOrOmit => "Template::AnyOrOmit".into(),
            Expr::Var(name) if self.scope.get(name).is_none() => {
                format!("Template::message({name:?}, vec![])")
            }
            Expr::Call { name, args } if self.module.find_definition(name).is_none() => {
                let fields: Vec<String> = args.iter().map(|a| self.template(a)).collect();
                format!("Template::message({name:?}, vec![{}])", fields.join(", "))
            }
            _ => format!("Template::from({})", self.value(expr)),
        }
    }

    /// `Operation` descriptor for a receiving operation.
    pub fn operation(&self, op: &ReceivingOp) -> String {
        let mut out = format!("Operation::new({}, {})", op_kind(op.kind), subject(&op.subject));
        if let Some(signature) = &op.signature {
            out.push_str(&format!(".with_signature({})", self.template(signature)));
        }
        if let Some(template) = &op.template {
            out.push_str(&format!(".with_template({})", self.template(template)));
        }
        if let Some(from) = &op.from {
            out.push_str(&format!(".with_from({})", self.value(from)));
        }
        out
    }

    /// `rt.receive(...)?` call for a receiving operation, with its redirects.
    pub fn receive(&self, op: &ReceivingOp) -> String {
        let (value, sender) = self.redirects(op.redirect.as_ref());
        format!("rt.receive(&{}, {value}, {sender})?", self.operation(op))
    }

    /// Call of a guard's altstep: a module altstep or an altstep variable.
    pub fn altstep_call(&self, name: &str, args: &[Expr], through_value: bool) -> String {
        if through_value {
            let values: Vec<String> = args.iter().map(|a| self.value(a)).collect();
            return format!("{}.invoke(rt, &[{}])?", self.scope.ident(name), values.join(", "));
        }
        let params = self
            .module
            .find_definition(name)
            .filter(|d| d.kind == DefKind::Altstep)
            .map(|d| d.params.as_slice())
            .unwrap_or_default();
        let rendered: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, a)| match params.get(i) {
                Some(p) => self.typed(a, &p.ty),
                None => self.owned(a),
            })
            .collect();
        call_with_rt(name, &rendered)
    }

    fn redirects(&self, spec: Option<&RedirectSpec>) -> (String, String) {
        let render = |target: Option<&String>| match target {
            Some(var) => format!("Some(&mut {} as &mut dyn Redirect)", self.scope.ident(var)),
            None => "None".to_string(),
        };
        match spec {
            Some(spec) => (render(spec.value.as_ref()), render(spec.sender.as_ref())),
            None => ("None".into(), "None".into()),
        }
    }
}

fn call_with_rt(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("{}(rt)?", rust_ident(name))
    } else {
        format!("{}(rt, {})?", rust_ident(name), args.join(", "))
    }
}

fn altstep_value(name: &str) -> String {
    format!("AltstepValue::new({name:?}, {}_dyn)", name)
}
