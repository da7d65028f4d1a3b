#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::ParseError;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct TtcnParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Parse a TTCN-3 source file into an AST Program.
pub fn parse(source: &str, filename: &str) -> Result<Program, ParseError> {
    let pairs = TtcnParser::parse(Rule::program, source).map_err(|e| {
        let (start, end) = match e.location {
            pest::error::InputLocation::Pos(p) => (p, p + 1),
            pest::error::InputLocation::Span((s, e)) => (s, e),
        };
        ParseError::syntax(format!("{e}"), Span::new(start, end), source, filename)
    })?;

    let program_pair = pairs.into_iter().next().unwrap();
    let module_pair = program_pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::module_decl)
        .unwrap();

    let module =
        parse_module(module_pair).map_err(|e| e.with_source_context(source, filename))?;
    Ok(Program { module })
}

fn parse_module(pair: Pair<'_>) -> Result<Spanned<ModuleDecl>, ParseError> {
    let span = span_from(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();

    let mut seen = HashSet::new();
    let mut definitions = Vec::new();
    for item in inner {
        let def_span = span_from(&item);
        let def = match item.as_rule() {
            Rule::function_def => Definition::Function(parse_function(item)?),
            Rule::testcase_def => Definition::Testcase(parse_function(item)?),
            Rule::altstep_def => Definition::Altstep(parse_altstep(item)?),
            _ => continue,
        };
        if !seen.insert(def.name().to_string()) {
            return Err(ParseError::duplicate(def.name(), def_span));
        }
        definitions.push(Spanned::new(def, def_span));
    }

    Ok(Spanned::new(ModuleDecl { name, definitions }, span))
}

fn parse_function(pair: Pair<'_>) -> Result<FunctionDef, ParseError> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let mut params = Vec::new();
    let mut runs_on = None;
    let mut return_type = None;
    let mut body = Vec::new();
    for item in inner {
        match item.as_rule() {
            Rule::param_list => params = parse_params(item),
            Rule::runs_on => runs_on = Some(item.into_inner().next().unwrap().as_str().to_string()),
            Rule::return_type => return_type = Some(parse_type(item.into_inner().next().unwrap())),
            Rule::block => body = parse_block(item)?,
            _ => {}
        }
    }
    Ok(FunctionDef {
        name,
        params,
        runs_on,
        return_type,
        body,
    })
}

fn parse_altstep(pair: Pair<'_>) -> Result<AltstepDef, ParseError> {
    let mut inner = pair.into_inner();
    let name = inner.next().unwrap().as_str().to_string();
    let mut params = Vec::new();
    let mut runs_on = None;
    let mut locals = Vec::new();
    let mut guards = Vec::new();
    for item in inner {
        match item.as_rule() {
            Rule::param_list => params = parse_params(item),
            Rule::runs_on => runs_on = Some(item.into_inner().next().unwrap().as_str().to_string()),
            Rule::var_decl | Rule::timer_decl => locals.push(parse_statement(item)?),
            Rule::else_guard | Rule::cond_guard => guards.push(parse_guard(item)?),
            _ => {}
        }
    }
    Ok(AltstepDef {
        name,
        params,
        runs_on,
        locals,
        guards,
    })
}

fn parse_params(pair: Pair<'_>) -> Vec<FormalParam> {
    pair.into_inner()
        .map(|p| {
            let span = span_from(&p);
            let mut pi = p.into_inner();
            let ty = parse_type(pi.next().unwrap());
            let name = pi.next().unwrap().as_str().to_string();
            FormalParam { name, ty, span }
        })
        .collect()
}

fn parse_type(pair: Pair<'_>) -> TypeRef {
    match pair.as_str() {
        "integer" => TypeRef::Integer,
        "float" => TypeRef::Float,
        "boolean" => TypeRef::Boolean,
        "charstring" => TypeRef::Charstring,
        "verdicttype" => TypeRef::Verdict,
        "default" => TypeRef::Default,
        "altstep" => TypeRef::Altstep,
        "timer" => TypeRef::Timer,
        other => TypeRef::Named(other.to_string()),
    }
}

fn parse_block(pair: Pair<'_>) -> Result<Block, ParseError> {
    pair.into_inner().map(parse_statement).collect()
}

fn parse_statement(pair: Pair<'_>) -> Result<Spanned<Statement>, ParseError> {
    let span = span_from(&pair);
    let rule = pair.as_rule();
    let stmt = match rule {
        Rule::var_decl => {
            let mut inner = pair.into_inner();
            let ty = parse_type(inner.next().unwrap());
            let name = inner.next().unwrap().as_str().to_string();
            let init = inner.next().map(parse_expr).transpose()?;
            Statement::VarDecl { name, ty, init }
        }
        Rule::timer_decl => {
            let mut inner = pair.into_inner();
            let name = inner.next().unwrap().as_str().to_string();
            let duration = inner.next().map(parse_expr).transpose()?;
            Statement::TimerDecl { name, duration }
        }
        Rule::assign_stmt => {
            let mut inner = pair.into_inner();
            let target = inner.next().unwrap().as_str().to_string();
            let value = parse_expr(inner.next().unwrap())?;
            Statement::Assign { target, value }
        }
        Rule::repeat_stmt => Statement::Repeat,
        Rule::break_stmt => Statement::Break,
        Rule::continue_stmt => Statement::Continue,
        Rule::stop_stmt => Statement::Stop,
        Rule::return_stmt => {
            Statement::Return(pair.into_inner().next().map(parse_expr).transpose()?)
        }
        Rule::log_stmt => Statement::Log(match pair.into_inner().next() {
            Some(args) => parse_args(args)?,
            None => Vec::new(),
        }),
        Rule::setverdict_stmt => {
            Statement::SetVerdict(parse_expr(pair.into_inner().next().unwrap())?)
        }
        Rule::deactivate_stmt => {
            Statement::Deactivate(pair.into_inner().next().map(parse_expr).transpose()?)
        }
        Rule::send_stmt => {
            let mut inner = pair.into_inner();
            let port = inner.next().unwrap().as_str().to_string();
            let value = parse_expr(inner.next().unwrap())?;
            let to = match inner.next() {
                Some(to) => Some(parse_expr(to.into_inner().next().unwrap())?),
                None => None,
            };
            Statement::Send { port, value, to }
        }
        Rule::timer_start_stmt => {
            let mut inner = pair.into_inner();
            let timer = inner.next().unwrap().as_str().to_string();
            let duration = inner.next().map(parse_expr).transpose()?;
            Statement::TimerStart { timer, duration }
        }
        Rule::timer_stop_stmt => Statement::TimerStop {
            timer: pair.into_inner().next().unwrap().as_str().to_string(),
        },
        Rule::receiving_stmt => {
            Statement::Receive(parse_receiving_op(pair.into_inner().next().unwrap())?)
        }
        Rule::expr_stmt => Statement::Expr(parse_primary(pair.into_inner().next().unwrap())?),
        Rule::alt_stmt => Statement::Alt(parse_guards(pair)?),
        Rule::interleave_stmt => Statement::Interleave(parse_guards(pair)?),
        Rule::if_stmt => parse_if(pair)?,
        Rule::while_stmt => {
            let mut inner = pair.into_inner();
            let cond = parse_expr(inner.next().unwrap())?;
            let body = parse_block(inner.next().unwrap())?;
            Statement::While { cond, body }
        }
        Rule::for_stmt => {
            let mut inner = pair.into_inner();
            let init = Box::new(parse_statement(inner.next().unwrap())?);
            let cond = parse_expr(inner.next().unwrap())?;
            let step = Box::new(parse_statement(inner.next().unwrap())?);
            let body = parse_block(inner.next().unwrap())?;
            Statement::For {
                init,
                cond,
                step,
                body,
            }
        }
        Rule::do_while_stmt => {
            let mut inner = pair.into_inner();
            let body = parse_block(inner.next().unwrap())?;
            let cond = parse_expr(inner.next().unwrap())?;
            Statement::DoWhile { body, cond }
        }
        Rule::call_stmt => Statement::Call(parse_call(pair)?),
        other => unreachable!("unexpected statement rule {other:?}"),
    };
    Ok(Spanned::new(stmt, span))
}

fn parse_if(pair: Pair<'_>) -> Result<Statement, ParseError> {
    let mut inner = pair.into_inner();
    let cond = parse_expr(inner.next().unwrap())?;
    let then_block = parse_block(inner.next().unwrap())?;
    let else_block = match inner.next() {
        Some(p) if p.as_rule() == Rule::if_stmt => {
            let span = span_from(&p);
            Some(vec![Spanned::new(parse_if(p)?, span)])
        }
        Some(p) => Some(parse_block(p)?),
        None => None,
    };
    Ok(Statement::If {
        cond,
        then_block,
        else_block,
    })
}

fn parse_call(pair: Pair<'_>) -> Result<CallStmt, ParseError> {
    let mut inner = pair.into_inner();
    let port = inner.next().unwrap().as_str().to_string();
    let signature = parse_expr(inner.next().unwrap())?;
    let mut timeout = CallTimeout::Blocking;
    let mut response = None;
    for item in inner {
        match item.as_rule() {
            Rule::call_timeout => {
                let t = item.into_inner().next().unwrap();
                timeout = match t.as_rule() {
                    Rule::nowait => CallTimeout::NoWait,
                    _ => CallTimeout::Timeout(parse_expr(t)?),
                };
            }
            Rule::response_block => response = Some(parse_guards(item)?),
            _ => {}
        }
    }
    Ok(CallStmt {
        port,
        signature,
        timeout,
        response,
    })
}

fn parse_guards(pair: Pair<'_>) -> Result<Vec<Spanned<AltGuard>>, ParseError> {
    pair.into_inner().map(parse_guard).collect()
}

fn parse_guard(pair: Pair<'_>) -> Result<Spanned<AltGuard>, ParseError> {
    let span = span_from(&pair);
    if pair.as_rule() == Rule::else_guard {
        let body = parse_block(pair.into_inner().next().unwrap())?;
        return Ok(Spanned::new(AltGuard::Else { body }, span));
    }

    let mut precondition = None;
    let mut target = None;
    let mut body = None;
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::precondition => precondition = Some(parse_expr(item.into_inner().next().unwrap())?),
            Rule::block => body = Some(parse_block(item)?),
            _ => target = Some(item),
        }
    }
    let target = target.unwrap();
    let guard = match target.as_rule() {
        Rule::receiving_op => AltGuard::Operation {
            precondition,
            op: parse_receiving_op(target)?,
            body,
        },
        Rule::invoke_target => {
            let mut ti = target.into_inner();
            let target_name = ti.next().unwrap().as_str().to_string();
            let args = match ti.next() {
                Some(a) => parse_args(a)?,
                None => Vec::new(),
            };
            AltGuard::Invoke {
                precondition,
                target: target_name,
                args,
                body,
            }
        }
        _ => {
            let mut ti = target.into_inner();
            let name = ti.next().unwrap().as_str().to_string();
            let args = match ti.next() {
                Some(a) => parse_args(a)?,
                None => Vec::new(),
            };
            AltGuard::Altstep {
                precondition,
                name,
                args,
                body,
            }
        }
    };
    Ok(Spanned::new(guard, span))
}

fn parse_receiving_op(pair: Pair<'_>) -> Result<ReceivingOp, ParseError> {
    let span = span_from(&pair);
    let op_pair = pair.into_inner().next().unwrap();
    let rule = op_pair.as_rule();
    let mut inner = op_pair.into_inner();

    let (subject, tail) = match rule {
        Rule::any_port_op => (OpSubject::AnyPort, inner.next().unwrap()),
        Rule::any_timer_op => (OpSubject::AnyTimer, inner.next().unwrap()),
        Rule::any_component_op => (OpSubject::AnyComponent, inner.next().unwrap()),
        Rule::all_component_op => (OpSubject::AllComponent, inner.next().unwrap()),
        _ => {
            let name = inner.next().unwrap().as_str().to_string();
            let tail = inner.next().unwrap();
            let subject = match tail.as_rule() {
                Rule::timeout_op => OpSubject::Timer(name),
                Rule::component_op => OpSubject::Component(name),
                _ => OpSubject::Port(name),
            };
            (subject, tail)
        }
    };

    let mut op = ReceivingOp {
        kind: ReceiveKind::Receive,
        subject,
        signature: None,
        template: None,
        from: None,
        redirect: None,
        span,
    };

    match tail.as_rule() {
        Rule::timeout_op => op.kind = ReceiveKind::Timeout,
        Rule::component_op => {
            op.kind = if tail.as_str() == "done" {
                ReceiveKind::Done
            } else {
                ReceiveKind::Killed
            };
        }
        _ => parse_port_op(tail, &mut op)?,
    }
    Ok(op)
}

fn parse_port_op(pair: Pair<'_>, op: &mut ReceivingOp) -> Result<(), ParseError> {
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::catch_timeout => op.kind = ReceiveKind::CatchTimeout,
            Rule::port_op_kind => {
                op.kind = match item.as_str() {
                    "receive" => ReceiveKind::Receive,
                    "trigger" => ReceiveKind::Trigger,
                    "check" => ReceiveKind::Check,
                    "getcall" => ReceiveKind::GetCall,
                    "getreply" => ReceiveKind::GetReply,
                    _ => ReceiveKind::Catch,
                };
            }
            Rule::op_args => {
                let mut args = item.into_inner();
                let first = parse_expr(args.next().unwrap())?;
                match args.next() {
                    // `catch(Sig, template)`
                    Some(second) => {
                        op.signature = Some(first);
                        op.template = Some(parse_expr(second)?);
                    }
                    None if op.kind == ReceiveKind::Catch => op.signature = Some(first),
                    None => op.template = Some(first),
                }
            }
            Rule::from_clause => op.from = Some(parse_expr(item.into_inner().next().unwrap())?),
            Rule::redirect => {
                let mut redirect = RedirectSpec::default();
                for r in item.into_inner() {
                    let rule = r.as_rule();
                    let target = r.into_inner().next().unwrap().as_str().to_string();
                    match rule {
                        Rule::value_redirect => redirect.value = Some(target),
                        _ => redirect.sender = Some(target),
                    }
                }
                op.redirect = Some(redirect);
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_args(pair: Pair<'_>) -> Result<Vec<Expr>, ParseError> {
    pair.into_inner().map(parse_expr).collect()
}

fn parse_expr(pair: Pair<'_>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => parse_expr(pair.into_inner().next().unwrap()),
        Rule::or_expr => fold_left(pair, BinOp::Or),
        Rule::xor_expr => fold_left(pair, BinOp::Xor),
        Rule::and_expr => fold_left(pair, BinOp::And),
        Rule::concat_expr => fold_left(pair, BinOp::Concat),
        Rule::unary_not => Ok(Expr::Unary(
            UnOp::Not,
            Box::new(parse_expr(pair.into_inner().next().unwrap())?),
        )),
        Rule::neg_expr => Ok(Expr::Unary(
            UnOp::Neg,
            Box::new(parse_expr(pair.into_inner().next().unwrap())?),
        )),
        Rule::cmp_expr | Rule::add_expr | Rule::mul_expr => fold_with_ops(pair),
        _ => parse_primary(pair),
    }
}

/// Left fold for levels whose operator is implied by the rule itself.
fn fold_left(pair: Pair<'_>, op: BinOp) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut result = parse_expr(inner.next().unwrap())?;
    for next in inner {
        let rhs = parse_expr(next)?;
        result = Expr::Binary(op, Box::new(result), Box::new(rhs));
    }
    Ok(result)
}

/// Left fold for levels that carry explicit operator pairs.
fn fold_with_ops(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut result = parse_expr(inner.next().unwrap())?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "mod" => BinOp::Mod,
            _ => BinOp::Rem,
        };
        let rhs = parse_expr(inner.next().unwrap())?;
        result = Expr::Binary(op, Box::new(result), Box::new(rhs));
    }
    Ok(result)
}

fn parse_primary(pair: Pair<'_>) -> Result<Expr, ParseError> {
    let span = span_from(&pair);
    match pair.as_rule() {
        Rule::int_lit => pair
            .as_str()
            .parse::<i64>()
            .map(Expr::IntLit)
            .map_err(|e| ParseError::invalid_literal(pair.as_str(), e.to_string(), span)),
        Rule::float_lit => pair
            .as_str()
            .parse::<f64>()
            .map(Expr::FloatLit)
            .map_err(|e| ParseError::invalid_literal(pair.as_str(), e.to_string(), span)),
        Rule::string_lit => Ok(Expr::StrLit(
            pair.into_inner().next().unwrap().as_str().to_string(),
        )),
        Rule::bool_lit => Ok(Expr::BoolLit(pair.as_str() == "true")),
        Rule::verdict_lit => Ok(Expr::Verdict(match pair.as_str() {
            "pass" => VerdictLit::Pass,
            "fail" => VerdictLit::Fail,
            "inconc" => VerdictLit::Inconc,
            "error" => VerdictLit::Error,
            _ => VerdictLit::None,
        })),
        Rule::null_lit => Ok(Expr::Null),
        Rule::any_value => Ok(Expr::AnyValue),
        Rule::any_or_omit => Ok(Expr::AnyOrOmit),
        Rule::var_ref => Ok(Expr::Var(pair.as_str().to_string())),
        Rule::refers_expr => Ok(Expr::Refers(
            pair.into_inner().next().unwrap().as_str().to_string(),
        )),
        Rule::call_expr | Rule::activate_expr => {
            let is_activate = pair.as_rule() == Rule::activate_expr;
            let mut inner = pair.into_inner();
            let name = inner.next().unwrap().as_str().to_string();
            let args = match inner.next() {
                Some(a) => parse_args(a)?,
                None => Vec::new(),
            };
            if is_activate {
                Ok(Expr::Activate { altstep: name, args })
            } else {
                Ok(Expr::Call { name, args })
            }
        }
        Rule::expr => parse_expr(pair),
        other => unreachable!("unexpected expression rule {other:?}"),
    }
}
