#![allow(unused_assignments)]

mod statements;

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::model::*;
use crate::names::FreshNames;
use ttcn_dsl::ast;

use statements::BodyLowerer;

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("'{name}' is a {found}, not an altstep ({context})")]
    NotAnAltstep {
        name: String,
        found: &'static str,
        context: &'static str,
        span: ast::Span,
    },
    #[error("Duplicate parameter '{name}' in definition '{def}'")]
    DuplicateParameter {
        name: String,
        def: String,
        span: ast::Span,
    },
}

impl LoweringError {
    pub fn span(&self) -> ast::Span {
        match self {
            LoweringError::NotAnAltstep { span, .. }
            | LoweringError::DuplicateParameter { span, .. } => *span,
        }
    }
}

/// A lowering error enriched with source span information for pretty-printed diagnostics.
#[derive(Debug, Error, Diagnostic)]
#[error("{inner}")]
#[diagnostic(code(ttcn::lower))]
#[allow(unused_assignments)]
pub struct SpannedLoweringError {
    #[source_code]
    pub src: NamedSource<String>,
    pub inner: LoweringError,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl SpannedLoweringError {
    fn new(err: LoweringError, source: String, filename: String) -> Self {
        let span = err.span();
        Self {
            src: NamedSource::new(filename, source),
            inner: err,
            span: Some(SourceSpan::new(span.start.into(), span.end - span.start)),
        }
    }
}

/// Lower an AST Program, attaching source spans for pretty error reporting via miette.
#[allow(clippy::result_large_err)]
pub fn lower_with_source(
    program: &ast::Program,
    source: &str,
    filename: &str,
) -> Result<BehaviorModule, SpannedLoweringError> {
    lower(program)
        .map_err(|err| SpannedLoweringError::new(err, source.to_string(), filename.to_string()))
}

/// Lower an AST Program into a [`BehaviorModule`] arena.
///
/// Every `alt`, `interleave`, call response part, altstep body, stand-alone
/// receiving statement and stand-alone altstep call becomes a [`GuardList`]
/// whose owner is set once the owning statement exists. Loop-control targets
/// stay unbound until [`crate::check::check`] runs.
pub fn lower(program: &ast::Program) -> Result<BehaviorModule, LoweringError> {
    let module_decl = &program.module.node;
    let mut module = BehaviorModule::new(&module_decl.name);
    let mut names = FreshNames::new();

    // 1. Register every definition so that forward references resolve.
    let kinds: Vec<(String, DefKind)> = module_decl
        .definitions
        .iter()
        .map(|d| {
            let kind = match &d.node {
                ast::Definition::Function(_) => DefKind::Function,
                ast::Definition::Testcase(_) => DefKind::Testcase,
                ast::Definition::Altstep(_) => DefKind::Altstep,
            };
            (d.node.name().to_string(), kind)
        })
        .collect();

    for (def, (name, kind)) in module_decl.definitions.iter().zip(&kinds) {
        let (params, runs_on, return_type) = match &def.node {
            ast::Definition::Function(f) | ast::Definition::Testcase(f) => {
                (&f.params, &f.runs_on, f.return_type.clone())
            }
            ast::Definition::Altstep(a) => (&a.params, &a.runs_on, None),
        };
        check_params(name, params)?;
        module.add_definition(Definition {
            name: name.clone(),
            kind: *kind,
            params: params.clone(),
            runs_on: runs_on.clone(),
            return_type,
            body: Vec::new(),
            guards: None,
            span: def.span,
        });
    }

    // 2. Lower bodies.
    for (def_id, def) in module_decl.definitions.iter().enumerate() {
        let mut lowerer = BodyLowerer::new(&mut module, &mut names, def_id);
        match &def.node {
            ast::Definition::Function(f) | ast::Definition::Testcase(f) => {
                let body = lowerer.lower_block(&f.body)?;
                module.definitions[def_id].body = body;
            }
            ast::Definition::Altstep(a) => {
                let locals = lowerer.lower_block(&a.locals)?;
                let guards = lowerer.lower_guard_list(
                    &a.guards,
                    GuardListMode::AltstepBody,
                    GuardListOrigin::Altstep,
                    def.span,
                )?;
                module
                    .guard_list_mut(guards)
                    .set_owner(Owner { def: def_id, stmt: None });
                let d = &mut module.definitions[def_id];
                d.body = locals;
                d.guards = Some(guards);
            }
        }
    }

    debug!(
        module = %module.name,
        definitions = module.definitions.len(),
        statements = module.stmts.len(),
        guard_lists = module.guard_lists.len(),
        "lowered module"
    );
    Ok(module)
}

fn check_params(def: &str, params: &[ast::FormalParam]) -> Result<(), LoweringError> {
    let mut seen = HashSet::new();
    for p in params {
        if !seen.insert(p.name.as_str()) {
            return Err(LoweringError::DuplicateParameter {
                name: p.name.clone(),
                def: def.to_string(),
                span: p.span,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttcn_dsl::ast::CallTimeout;

    fn lower_src(src: &str) -> BehaviorModule {
        let program = ttcn_dsl::parse(src, "test.ttcn").expect("parse");
        lower(&program).expect("lower")
    }

    fn def_body<'a>(m: &'a BehaviorModule, name: &str) -> &'a Body {
        &m.find_definition(name).unwrap().body
    }

    #[test]
    fn alt_becomes_owned_guard_list() {
        let m = lower_src(
            "module M { function f() { alt { [] p.receive { log(1); } [else] {} } } }",
        );
        let body = def_body(&m, "f");
        assert_eq!(body.len(), 1);
        let StmtKind::Alt(gl) = m.stmt(body[0]).kind else {
            panic!("expected alt");
        };
        let list = m.guard_list(gl);
        assert_eq!(list.mode, GuardListMode::PlainAlt);
        assert_eq!(list.origin, GuardListOrigin::Alt);
        assert_eq!(list.label, "alt_0");
        assert_eq!(list.owner, Some(Owner { def: 0, stmt: Some(body[0]) }));
        assert_eq!(list.guards().len(), 2);
        assert!(list.guards()[1].node.is_else());
    }

    #[test]
    fn standalone_receive_and_altstep_call_wrap_single_guard() {
        let m = lower_src(
            r#"
module M {
    altstep as_a() { [] p.receive {} }
    function f() {
        p.receive(Msg);
        as_a();
        helper();
    }
    function helper() {}
}
"#,
        );
        let body = def_body(&m, "f");
        let StmtKind::Alt(recv) = m.stmt(body[0]).kind else {
            panic!("expected wrapped receive");
        };
        assert_eq!(m.guard_list(recv).origin, GuardListOrigin::StandaloneReceive);
        assert_eq!(m.guard_list(recv).guards().len(), 1);

        let StmtKind::Alt(call) = m.stmt(body[1]).kind else {
            panic!("expected wrapped altstep call");
        };
        assert_eq!(m.guard_list(call).origin, GuardListOrigin::StandaloneAltstepCall);
        assert!(matches!(
            &m.guard_list(call).guards()[0].node,
            Guard::AltstepRef { altstep, .. } if altstep == "as_a"
        ));

        assert!(matches!(m.stmt(body[2]).kind, StmtKind::Expr(_)));
    }

    #[test]
    fn altstep_definition_owns_body_list() {
        let m = lower_src(
            "module M { altstep as_x() { var integer n := 0; [] p.receive { n := 1; } } }",
        );
        let def = m.find_definition("as_x").unwrap();
        assert_eq!(def.kind, DefKind::Altstep);
        assert_eq!(def.body.len(), 1);
        let gl = m.guard_list(def.guards.unwrap());
        assert_eq!(gl.mode, GuardListMode::AltstepBody);
        assert_eq!(gl.owner, Some(Owner { def: 0, stmt: None }));
    }

    #[test]
    fn call_response_and_loops_get_labels() {
        let m = lower_src(
            r#"
module M {
    function f() {
        while (true) {
            p.call(S(), 1.0) { [] p.getreply(S()) {} }
        }
        for (var integer i := 0; i < 2; i := i + 1) {}
        do {} while (false)
    }
}
"#,
        );
        let body = def_body(&m, "f");
        let StmtKind::While { label, body: inner, .. } = &m.stmt(body[0]).kind else {
            panic!("expected while");
        };
        assert_eq!(label, "while_0");
        let StmtKind::Call { timeout, response: Some(gl), .. } = &m.stmt(inner[0]).kind else {
            panic!("expected call");
        };
        assert!(matches!(timeout, CallTimeout::Timeout(_)));
        assert_eq!(m.guard_list(*gl).mode, GuardListMode::CallResponseBody);
        assert_eq!(m.guard_list(*gl).label, "call_0");
        assert_eq!(m.stmt(body[1]).kind.loop_label(), Some("for_0"));
        assert_eq!(m.stmt(body[2]).kind.loop_label(), Some("do_0"));
    }

    #[test]
    fn guard_naming_a_function_is_rejected() {
        let program = ttcn_dsl::parse(
            "module M { function g() {} function f() { alt { [] g(); } } }",
            "t.ttcn",
        )
        .unwrap();
        let err = lower(&program).unwrap_err();
        assert!(matches!(err, LoweringError::NotAnAltstep { ref name, .. } if name == "g"));
    }

    #[test]
    fn duplicate_parameter_is_spanned() {
        let src = "module M { function f(integer a, integer a) {} }";
        let program = ttcn_dsl::parse(src, "t.ttcn").unwrap();
        let err = lower_with_source(&program, src, "t.ttcn").unwrap_err();
        assert!(err.span.is_some());
        assert!(err.to_string().contains("Duplicate parameter 'a'"));
    }
}
