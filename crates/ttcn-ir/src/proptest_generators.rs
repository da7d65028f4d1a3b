//! Proptest strategies for generating well-formed alternative statements.

use proptest::prelude::*;

use ttcn_dsl::ast::*;

/// Shape of one generated alternative.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardShape {
    /// `[pre] p.receive { body }`, the flag says whether the body ends in `repeat`.
    Receive {
        port: u8,
        precondition: Option<bool>,
        repeat: bool,
    },
    /// `[] as_helper();`
    Altstep,
    /// `[else] {}`
    Else,
}

pub fn arb_guard_shape() -> impl Strategy<Value = GuardShape> {
    prop_oneof![
        6 => (0u8..4, proptest::option::of(any::<bool>()), any::<bool>()).prop_map(
            |(port, precondition, repeat)| GuardShape::Receive {
                port,
                precondition,
                repeat,
            }
        ),
        1 => Just(GuardShape::Altstep),
        1 => Just(GuardShape::Else),
    ]
}

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::new(node, Span::default())
}

fn guard_from_shape(shape: &GuardShape) -> Spanned<AltGuard> {
    sp(match shape {
        GuardShape::Receive {
            port,
            precondition,
            repeat,
        } => AltGuard::Operation {
            precondition: precondition.map(|b| Expr::Binary(
                BinOp::And,
                Box::new(Expr::BoolLit(b)),
                Box::new(Expr::Var("ready".into())),
            )),
            op: ReceivingOp {
                kind: ReceiveKind::Receive,
                subject: OpSubject::Port(format!("p{port}")),
                signature: None,
                template: None,
                from: None,
                redirect: None,
                span: Span::default(),
            },
            body: Some(if *repeat {
                vec![sp(Statement::Repeat)]
            } else {
                vec![sp(Statement::Log(vec![Expr::IntLit(i64::from(*port))]))]
            }),
        },
        GuardShape::Altstep => AltGuard::Altstep {
            precondition: None,
            name: "as_helper".into(),
            args: Vec::new(),
            body: None,
        },
        GuardShape::Else => AltGuard::Else { body: Vec::new() },
    })
}

/// Strategy for a module holding one function with a single non-empty `alt`
/// and a helper altstep, together with the guard shapes used.
pub fn arb_alt_program() -> impl Strategy<Value = (Program, Vec<GuardShape>)> {
    proptest::collection::vec(arb_guard_shape(), 1..8).prop_map(|shapes| {
        let guards = shapes.iter().map(guard_from_shape).collect();
        let helper = Definition::Altstep(AltstepDef {
            name: "as_helper".into(),
            params: Vec::new(),
            runs_on: None,
            locals: Vec::new(),
            guards: vec![sp(AltGuard::Operation {
                precondition: None,
                op: ReceivingOp {
                    kind: ReceiveKind::Timeout,
                    subject: OpSubject::AnyTimer,
                    signature: None,
                    template: None,
                    from: None,
                    redirect: None,
                    span: Span::default(),
                },
                body: None,
            })],
        });
        let function = Definition::Function(FunctionDef {
            name: "f_generated".into(),
            params: Vec::new(),
            runs_on: None,
            return_type: None,
            body: vec![sp(Statement::Alt(guards))],
        });
        let program = Program {
            module: sp(ModuleDecl {
                name: "Generated".into(),
                definitions: vec![sp(helper), sp(function)],
            }),
        };
        (program, shapes)
    })
}
