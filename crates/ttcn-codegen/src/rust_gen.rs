use std::fmt::Write;

use indexmap::IndexMap;
use tracing::{debug, trace};
use ttcn_dsl::ast::{CallTimeout, Expr, Span, TypeRef};
use ttcn_ir::{
    BehaviorModule, BreakTarget, DefId, DefKind, Definition, Guard, GuardListId, GuardListMode,
    StmtId, StmtKind,
};

use crate::common::*;
use crate::interleave::{Continuation, InterleavePlan, StateKind};
use crate::{CodegenError, CodegenOptions};

const ALLOWED_LINTS: &str =
    "unused, unreachable_code, unused_labels, unused_mut, unused_parens, non_snake_case";

/// Generate a complete Rust source file from a checked behaviour module.
pub fn generate_rust(module: &BehaviorModule, options: &CodegenOptions) -> Result<String, CodegenError> {
    let mut out = String::new();
    write_header(&mut out, module, options);

    for (id, def) in module.definitions.iter().enumerate() {
        debug!(definition = %def.name, kind = ?def.kind, "generating definition");
        let mut writer = DefinitionWriter::new(module, options, id);
        match def.kind {
            DefKind::Altstep => writer.write_altstep()?,
            DefKind::Function | DefKind::Testcase => writer.write_function()?,
        }
        out.push_str(&writer.out);
    }
    if options.module_wrapper.is_some() {
        out.push_str("}\n");
    }
    Ok(out)
}

fn write_header(out: &mut String, module: &BehaviorModule, options: &CodegenOptions) {
    writeln!(out, "// Generated from TTCN-3 module: {}", module.name).unwrap();
    writeln!(out, "// Source: {}", options.source_name).unwrap();
    writeln!(out).unwrap();
    match &options.module_wrapper {
        Some(name) => {
            writeln!(out, "#[allow({ALLOWED_LINTS})]").unwrap();
            writeln!(out, "pub mod {} {{", rust_ident(name)).unwrap();
        }
        None => writeln!(out, "#![allow({ALLOWED_LINTS})]").unwrap(),
    }
    writeln!(out).unwrap();
    writeln!(out, "use ttcn_runtime::prelude::*;").unwrap();
    writeln!(out).unwrap();
}

/// Writes one function, testcase or altstep.
struct DefinitionWriter<'m> {
    module: &'m BehaviorModule,
    options: &'m CodegenOptions,
    def: &'m Definition,
    scope: Scope,
    out: String,
    depth: usize,
}

impl<'m> DefinitionWriter<'m> {
    fn new(module: &'m BehaviorModule, options: &'m CodegenOptions, id: DefId) -> Self {
        Self {
            module,
            options,
            def: module.definition(id),
            scope: Scope::for_definition(module, id),
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            writeln!(self.out).unwrap();
        } else {
            writeln!(self.out, "{:width$}{text}", "", width = self.depth * 4).unwrap();
        }
    }

    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: impl AsRef<str>) {
        self.depth -= 1;
        self.line(text);
    }

    fn exprs(&self) -> ExprWriter<'_> {
        ExprWriter {
            module: self.module,
            scope: &self.scope,
        }
    }

    fn location(&self, span: Span) -> (String, usize) {
        (format!("{:?}", self.options.source_name), self.options.line_of(span))
    }

    fn params(&self) -> String {
        let mut parts = vec!["rt: &mut dyn TestComponent".to_string()];
        for p in &self.def.params {
            parts.push(format!("mut {}: {}", rust_ident(&p.name), rust_type(&p.ty)));
        }
        parts.join(", ")
    }

    // --- Definitions ---

    fn write_function(&mut self) -> Result<(), CodegenError> {
        let def = self.def;
        let ret = match (def.kind, &def.return_type) {
            (DefKind::Testcase, _) => "Verdict",
            (_, Some(ty)) => rust_type(ty),
            (_, None) => "()",
        };
        if let Some(component) = &def.runs_on {
            self.line(format!("/// Runs on `{component}`."));
        }
        let params = self.params();
        self.open(format!(
            "pub fn {}({params}) -> Result<{ret}, DynamicError> {{",
            rust_ident(&def.name)
        ));
        self.write_body(&def.body)?;
        let exits = def.body.last().is_some_and(|&last| {
            matches!(
                self.module.stmt(last).kind,
                StmtKind::Return(_) | StmtKind::Stop
            )
        });
        if !exits {
            let tail = self.fallthrough();
            self.line(tail);
        }
        self.close("}");
        self.line("");
        Ok(())
    }

    /// Result of a function that runs off its end.
    fn fallthrough(&self) -> String {
        match (self.def.kind, &self.def.return_type) {
            (DefKind::Testcase, _) => "Ok(rt.verdict())".into(),
            (_, Some(_)) => format!(
                "Err(DynamicError::MissingReturn {{ function: {:?}.to_string() }})",
                self.def.name
            ),
            (_, None) => "Ok(())".into(),
        }
    }

    fn write_altstep(&mut self) -> Result<(), CodegenError> {
        let def = self.def;
        let module = self.module;
        let gl = def
            .guards
            .ok_or_else(|| CodegenError::Unsupported(format!("altstep '{}' has no guard list", def.name)))?;
        let list = module.guard_list(gl);

        if let Some(component) = &def.runs_on {
            self.line(format!("/// Runs on `{component}`."));
        }
        let params = self.params();
        self.open(format!(
            "pub fn {}({params}) -> Result<GuardStatus, DynamicError> {{",
            rust_ident(&def.name)
        ));
        self.write_body(&def.body)?;
        if list.is_empty() {
            self.line("Ok(GuardStatus::No)");
        } else {
            let pending = format!("{}_pending", list.label);
            if !list.has_else() {
                self.line(format!("let mut {pending} = false;"));
            }
            for guard in list.reachable() {
                self.write_altstep_guard(&guard.node, &pending)?;
            }
            if !list.has_else() {
                self.line(format!(
                    "if {pending} {{ Ok(GuardStatus::Maybe) }} else {{ Ok(GuardStatus::No) }}"
                ));
            }
        }
        self.close("}");
        self.line("");
        self.write_dyn_adapter();
        Ok(())
    }

    /// One alternative of an altstep: a single attempt, no snapshot.
    fn write_altstep_guard(&mut self, guard: &Guard, pending: &str) -> Result<(), CodegenError> {
        let body = guard.body().cloned().unwrap_or_default();
        let precondition = guard.effective_precondition().map(|e| self.exprs().expr(e));
        if let Some(pre) = &precondition {
            self.open(format!("if {pre} {{"));
        }
        match guard {
            Guard::Else { .. } => {
                self.write_body(&body)?;
                if !self.module.transfers_control(&body) {
                    self.line("return Ok(GuardStatus::Yes);");
                }
            }
            Guard::BooleanOp { op, .. } => {
                let receive = self.exprs().receive(op);
                self.open(format!("match {receive} {{"));
                self.write_yes_arm(&body, "return Ok(GuardStatus::Yes);")?;
                self.line("GuardStatus::No => {}");
                self.line(format!("_ => {pending} = true,"));
                self.close("}");
            }
            Guard::AltstepRef { altstep, args, .. } => {
                let call = self.exprs().altstep_call(altstep, args, false);
                self.write_nested_altstep_match(&call, &body, pending)?;
            }
            Guard::AltstepInvoke { target, args, .. } => {
                let call = self.exprs().altstep_call(target, args, true);
                self.write_nested_altstep_match(&call, &body, pending)?;
            }
        }
        if precondition.is_some() {
            self.close("}");
        }
        Ok(())
    }

    fn write_nested_altstep_match(&mut self, call: &str, body: &[StmtId], pending: &str) -> Result<(), CodegenError> {
        self.open(format!("match {call} {{"));
        self.write_yes_arm(body, "return Ok(GuardStatus::Yes);")?;
        self.line("GuardStatus::No => {}");
        self.line(format!("GuardStatus::Maybe | GuardStatus::Unchecked => {pending} = true,"));
        self.line("status => return Ok(status),");
        self.close("}");
        Ok(())
    }

    fn write_yes_arm(&mut self, body: &[StmtId], exit: &str) -> Result<(), CodegenError> {
        self.open("GuardStatus::Yes => {");
        self.write_body(body)?;
        if !self.module.transfers_control(body) {
            self.line(exit);
        }
        self.close("}");
        Ok(())
    }

    /// `*_dyn` adapter used by `refers`, `activate` and altstep variables.
    fn write_dyn_adapter(&mut self) {
        let def = self.def;
        let mut args = vec!["rt".to_string()];
        for (i, p) in def.params.iter().enumerate() {
            if is_dynamic_arg(&p.ty) {
                args.push(format!("arg(args, {i})?"));
            } else {
                args.push("Default::default()".into());
            }
        }
        self.open(format!(
            "pub fn {}_dyn(rt: &mut dyn TestComponent, args: &[Value]) -> Result<GuardStatus, DynamicError> {{",
            def.name
        ));
        self.line(format!("{}({})", rust_ident(&def.name), args.join(", ")));
        self.close("}");
        self.line("");
    }

    // --- Statements ---

    fn write_body(&mut self, body: &[StmtId]) -> Result<(), CodegenError> {
        for &id in body {
            self.write_stmt(id)?;
        }
        Ok(())
    }

    fn write_stmt(&mut self, id: StmtId) -> Result<(), CodegenError> {
        let module = self.module;
        let stmt = module.stmt(id);
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                let value = match init {
                    Some(e) => self.exprs().typed(e, ty),
                    None => "Default::default()".into(),
                };
                self.line(format!(
                    "let mut {}: {} = {value};",
                    self.scope.ident(name),
                    rust_type(ty)
                ));
            }
            StmtKind::TimerDecl { name, duration } => {
                let duration = self.optional_float(duration.as_ref());
                self.line(format!("rt.declare_timer({name:?}, {duration});"));
            }
            StmtKind::Assign { target, value } => {
                let value = match self.scope.get(target) {
                    Some(ty) => self.exprs().typed(value, ty),
                    None => self.exprs().owned(value),
                };
                self.line(format!("{} = {value};", self.scope.ident(target)));
            }
            StmtKind::Send { port, value, to } => {
                let value = self.exprs().value(value);
                let to = match to {
                    Some(e) => format!("Some({})", self.exprs().value(e)),
                    None => "None".into(),
                };
                self.line(format!("rt.send({port:?}, {value}, {to})?;"));
            }
            StmtKind::Call {
                timeout, response, ..
            } => {
                self.write_call_issue(id);
                if let (Some(gl), false) = (response, *timeout == CallTimeout::NoWait) {
                    self.write_guard_list(*gl)?;
                }
            }
            StmtKind::Alt(gl) => self.write_guard_list(*gl)?,
            StmtKind::Interleave(gl) => self.write_interleave(*gl)?,
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.exprs().expr(cond);
                self.open(format!("if {cond} {{"));
                self.write_body(then_block)?;
                if let Some(else_block) = else_block {
                    self.close("} else {");
                    self.depth += 1;
                    self.write_body(else_block)?;
                }
                self.close("}");
            }
            StmtKind::While { label, cond, body } => {
                if cond.const_bool() == Some(true) {
                    self.open(format!("'{label}: loop {{"));
                } else {
                    let cond = self.exprs().expr(cond);
                    self.open(format!("'{label}: while {cond} {{"));
                }
                self.write_body(body)?;
                self.close("}");
            }
            StmtKind::For {
                label,
                init,
                cond,
                step,
                body,
            } => {
                let cond = self.exprs().expr(cond);
                self.open("{");
                self.write_stmt(*init)?;
                self.open(format!("'{label}: loop {{"));
                self.open(format!("if !{cond} {{"));
                self.line(format!("break '{label};"));
                self.close("}");
                self.write_body(body)?;
                self.write_stmt(*step)?;
                self.close("}");
                self.close("}");
            }
            StmtKind::DoWhile { label, body, cond } => {
                let cond = self.exprs().expr(cond);
                self.open(format!("'{label}: loop {{"));
                self.write_body(body)?;
                self.open(format!("if !{cond} {{"));
                self.line(format!("break '{label};"));
                self.close("}");
                self.close("}");
            }
            StmtKind::Repeat { target } => {
                let gl = target.ok_or_else(|| unbound("repeat"))?;
                let list = module.guard_list(gl);
                match list.mode {
                    GuardListMode::PlainAlt | GuardListMode::CallResponseBody => {
                        self.line(format!("continue '{};", list.label))
                    }
                    GuardListMode::AltstepBody => self.line("return Ok(GuardStatus::Repeat);"),
                    GuardListMode::Interleave => {
                        return Err(CodegenError::Unsupported("repeat within interleave".into()))
                    }
                }
            }
            StmtKind::Break { target } => match target.ok_or_else(|| unbound("break"))? {
                BreakTarget::Loop(lp) => {
                    let label = module.stmt(lp).kind.loop_label().unwrap_or_default();
                    self.line(format!("break '{label};"));
                }
                BreakTarget::GuardList(gl) => {
                    let list = module.guard_list(gl);
                    match list.mode {
                        GuardListMode::PlainAlt | GuardListMode::CallResponseBody => {
                            self.line(format!("break '{};", list.label))
                        }
                        GuardListMode::AltstepBody => self.line("return Ok(GuardStatus::Break);"),
                        GuardListMode::Interleave => {
                            return Err(CodegenError::Unsupported("break out of interleave".into()))
                        }
                    }
                }
            },
            StmtKind::Continue { target } => {
                let lp = target.ok_or_else(|| unbound("continue"))?;
                match &module.stmt(lp).kind {
                    StmtKind::For { label, step, .. } => {
                        self.write_stmt(*step)?;
                        self.line(format!("continue '{label};"));
                    }
                    StmtKind::DoWhile { label, cond, .. } => {
                        let cond = self.exprs().expr(cond);
                        self.open(format!("if {cond} {{"));
                        self.line(format!("continue '{label};"));
                        self.close("}");
                        self.line(format!("break '{label};"));
                    }
                    kind => {
                        let label = kind.loop_label().unwrap_or_default();
                        self.line(format!("continue '{label};"));
                    }
                }
            }
            StmtKind::Return(value) => {
                let line = self.return_stmt(value.as_ref());
                self.line(line);
            }
            StmtKind::Stop => self.line("return Err(DynamicError::Stopped);"),
            StmtKind::Log(args) => {
                let rendered: Vec<String> = args.iter().map(|a| self.exprs().expr(a)).collect();
                if rendered.is_empty() {
                    self.line("rt.log(String::new());");
                } else {
                    self.line(format!(
                        "rt.log(format!(\"{}\", {}));",
                        "{}".repeat(rendered.len()),
                        rendered.join(", ")
                    ));
                }
            }
            StmtKind::SetVerdict(v) => {
                let v = self.exprs().expr(v);
                self.line(format!("rt.set_verdict({v});"));
            }
            StmtKind::Deactivate(Some(handle)) => {
                let handle = self.exprs().expr(handle);
                self.line(format!("rt.defaults().deactivate({handle});"));
            }
            StmtKind::Deactivate(None) => self.line("rt.defaults().deactivate_all();"),
            StmtKind::TimerStart { timer, duration } => {
                let duration = self.optional_float(duration.as_ref());
                self.line(format!("rt.start_timer({timer:?}, {duration})?;"));
            }
            StmtKind::TimerStop { timer } => self.line(format!("rt.stop_timer({timer:?})?;")),
            StmtKind::Expr(e) => {
                let e = self.exprs().expr(e);
                self.line(format!("{e};"));
            }
        }
        Ok(())
    }

    fn optional_float(&self, expr: Option<&Expr>) -> String {
        match expr {
            Some(e) => format!("Some({})", self.exprs().float(e)),
            None => "None".into(),
        }
    }

    fn return_stmt(&self, value: Option<&Expr>) -> String {
        match (self.def.kind, &self.def.return_type, value) {
            (DefKind::Altstep, _, _) => "return Ok(GuardStatus::Yes);".into(),
            (DefKind::Testcase, _, _) => "return Ok(rt.verdict());".into(),
            (_, Some(ty), Some(v)) => format!("return Ok({});", self.exprs().typed(v, ty)),
            (_, Some(_), None) => format!("return {};", self.fallthrough()),
            (_, None, _) => "return Ok(());".into(),
        }
    }

    /// `rt.call(...)` for a call statement, without its response part.
    fn write_call_issue(&mut self, id: StmtId) {
        let module = self.module;
        let StmtKind::Call {
            port,
            signature,
            timeout,
            ..
        } = &module.stmt(id).kind
        else {
            return;
        };
        let signature = self.exprs().value(signature);
        let timeout = match timeout {
            CallTimeout::Timeout(e) => format!("Some({})", self.exprs().float(e)),
            CallTimeout::Blocking | CallTimeout::NoWait => "None".into(),
        };
        self.line(format!("rt.call({port:?}, {signature}, {timeout})?;"));
    }

    // --- Alternatives ---

    /// Snapshot loop of an `alt` statement or of a call's response part.
    fn write_guard_list(&mut self, gl: GuardListId) -> Result<(), CodegenError> {
        let module = self.module;
        let list = module.guard_list(gl);
        let construct = list.origin.describe();
        if list.is_empty() {
            return Err(CodegenError::EmptyGuardList { construct });
        }
        trace!(label = %list.label, mode = ?list.mode, "writing guard list");
        let label = &list.label;
        let with_defaults = list.mode == GuardListMode::PlainAlt && !list.has_else();

        if list.needs_restart_loop() {
            self.open(format!("'{label}: loop {{"));
        } else {
            self.open(format!("'{label}: {{"));
        }
        let mut slots = Vec::new();
        for (i, guard) in list.reachable().iter().enumerate() {
            if guard.node.is_else() {
                continue;
            }
            let slot = format!("{label}_s{i}");
            let init = if guard.node.effective_precondition().is_some() {
                "Unchecked"
            } else {
                "Maybe"
            };
            self.line(format!("let mut {slot} = GuardStatus::{init};"));
            slots.push(slot);
        }
        let defaults = format!("{label}_defaults");
        if with_defaults {
            self.line(format!("let mut {defaults} = GuardStatus::Maybe;"));
        }
        self.line("take_snapshot(rt, false)?;");
        self.open("loop {");

        for (i, guard) in list.reachable().iter().enumerate() {
            self.write_alt_guard(label, i, &guard.node)?;
        }

        if !list.has_else() {
            if with_defaults {
                self.open(format!("if {defaults} == GuardStatus::Maybe {{"));
                self.open("match try_altsteps(rt)? {");
                self.line(format!("GuardStatus::Yes | GuardStatus::Break => break '{label},"));
                self.line(format!("GuardStatus::Repeat => continue '{label},"));
                self.line(format!("GuardStatus::No => {defaults} = GuardStatus::No,"));
                self.line("_ => {}");
                self.close("}");
                self.close("}");
            }
            let mut conditions: Vec<String> =
                slots.iter().map(|s| format!("{s} == GuardStatus::No")).collect();
            if with_defaults {
                conditions.push(format!("{defaults} == GuardStatus::No"));
            }
            let (file, line) = self.location(list.span);
            self.open(format!("if {} {{", conditions.join(" && ")));
            self.line(format!(
                "return Err(DynamicError::no_branch_selectable({construct:?}, {file}, {line}));"
            ));
            self.close("}");
            self.line("take_snapshot(rt, true)?;");
        }
        self.close("}");
        self.close("}");
        Ok(())
    }

    fn write_alt_guard(&mut self, label: &str, index: usize, guard: &Guard) -> Result<(), CodegenError> {
        let body = guard.body().cloned().unwrap_or_default();
        let exit = format!("break '{label};");
        if guard.is_else() {
            self.open("{");
            self.write_body(&body)?;
            if !self.module.transfers_control(&body) {
                self.line(&exit);
            }
            self.close("}");
            return Ok(());
        }

        let slot = format!("{label}_s{index}");
        if let Some(pre) = guard.effective_precondition() {
            let pre = self.exprs().expr(pre);
            self.open(format!("if {slot} == GuardStatus::Unchecked {{"));
            self.line(format!(
                "{slot} = if {pre} {{ GuardStatus::Maybe }} else {{ GuardStatus::No }};"
            ));
            self.close("}");
        }
        self.open(format!("if {slot} == GuardStatus::Maybe {{"));
        let attempt = match guard {
            Guard::BooleanOp { op, .. } => self.exprs().receive(op),
            Guard::AltstepRef { altstep, args, .. } => self.exprs().altstep_call(altstep, args, false),
            Guard::AltstepInvoke { target, args, .. } => self.exprs().altstep_call(target, args, true),
            Guard::Else { .. } => unreachable!("else guards are handled above"),
        };
        self.open(format!("match {attempt} {{"));
        self.write_yes_arm(&body, &exit)?;
        if guard.is_altstep() {
            self.line(format!("GuardStatus::Repeat => continue '{label},"));
            self.line(format!("GuardStatus::Break => break '{label},"));
        }
        self.line(format!("GuardStatus::No => {slot} = GuardStatus::No,"));
        self.line("_ => {}");
        self.close("}");
        self.close("}");
        Ok(())
    }

    // --- Interleave ---

    fn write_interleave(&mut self, gl: GuardListId) -> Result<(), CodegenError> {
        let module = self.module;
        let list = module.guard_list(gl);
        if list.is_empty() {
            return Err(CodegenError::EmptyGuardList {
                construct: list.origin.describe(),
            });
        }
        let plan = InterleavePlan::build(module, gl);
        trace!(label = %list.label, states = plan.states.len(), "writing interleave");
        let label = &list.label;
        let state = format!("{label}_state");
        let pending = format!("{label}_pending");
        let defaults = format!("{label}_defaults");

        // Locals declared between waiting points outlive a single state.
        // Each branch keeps its own copy.
        let mut hoisted: Vec<IndexMap<String, (String, TypeRef)>> = vec![IndexMap::new(); plan.branches];
        for st in &plan.states {
            for &id in continuations(st).into_iter().flat_map(|c| c.inline.iter()) {
                if let StmtKind::VarDecl { name, ty, .. } = &module.stmt(id).kind {
                    hoisted[st.branch]
                        .entry(name.clone())
                        .or_insert_with(|| (format!("{label}_b{}_{name}", st.branch), ty.clone()));
                }
            }
        }
        for (ident, ty) in hoisted.iter().flat_map(|locals| locals.values()) {
            self.line(format!("let mut {ident}: {} = Default::default();", rust_type(ty)));
        }
        let initial: Vec<String> = (0..plan.branches).map(|b| b.to_string()).collect();
        self.line(format!(
            "let mut {state}: [usize; {}] = [{}];",
            plan.branches,
            initial.join(", ")
        ));
        self.open(format!("'{label}: loop {{"));
        self.open(format!("if {state}.iter().all(|s| *s == usize::MAX) {{"));
        self.line(format!("break '{label};"));
        self.close("}");
        self.line(format!("let mut {defaults} = GuardStatus::Maybe;"));
        self.line("take_snapshot(rt, false)?;");
        self.open("loop {");
        self.line(format!("let mut {pending} = false;"));

        for (id, st) in plan.states.iter().enumerate() {
            let branch = st.branch;
            self.scope.clear_hoisted();
            for (name, (ident, ty)) in &hoisted[branch] {
                self.scope.hoist(name, ident.clone(), ty.clone());
            }
            self.line(format!("// state {id}, branch {branch}"));
            self.open(format!("if {state}[{branch}] == {id} {{"));
            match &st.kind {
                StateKind::Wait(alternatives) => {
                    for alt in alternatives {
                        let Guard::BooleanOp {
                            precondition, op, ..
                        } = &alt.guard.node
                        else {
                            return Err(CodegenError::Unsupported(
                                "altstep or else alternative within interleave".into(),
                            ));
                        };
                        let pre = precondition
                            .as_ref()
                            .filter(|p| p.const_bool() != Some(true))
                            .map(|p| self.exprs().expr(p));
                        if let Some(pre) = &pre {
                            self.open(format!("if {pre} {{"));
                        }
                        let receive = self.exprs().receive(op);
                        self.open(format!("match {receive} {{"));
                        self.open("GuardStatus::Yes => {");
                        self.write_continuation(label, &state, branch, &alt.then)?;
                        self.close("}");
                        self.line("GuardStatus::No => {}");
                        self.line(format!("_ => {pending} = true,"));
                        self.close("}");
                        if pre.is_some() {
                            self.close("}");
                        }
                    }
                }
                StateKind::Resume(cont) => self.write_continuation(label, &state, branch, cont)?,
            }
            self.close("}");
        }
        self.scope.clear_hoisted();

        self.open(format!("if {defaults} == GuardStatus::Maybe {{"));
        self.open("match try_altsteps(rt)? {");
        self.line(format!("GuardStatus::Yes | GuardStatus::Repeat => continue '{label},"));
        self.line(format!("GuardStatus::Break => break '{label},"));
        self.line(format!("GuardStatus::No => {defaults} = GuardStatus::No,"));
        self.line("_ => {}");
        self.close("}");
        self.close("}");
        let (file, line) = self.location(list.span);
        self.open(format!("if !{pending} && {defaults} == GuardStatus::No {{"));
        self.line(format!(
            "return Err(DynamicError::no_branch_selectable({:?}, {file}, {line}));",
            list.origin.describe()
        ));
        self.close("}");
        self.line("take_snapshot(rt, true)?;");
        self.close("}");
        self.close("}");
        Ok(())
    }

    fn write_continuation(
        &mut self,
        label: &str,
        state: &str,
        branch: usize,
        cont: &Continuation,
    ) -> Result<(), CodegenError> {
        let module = self.module;
        for &id in &cont.inline {
            match &module.stmt(id).kind {
                StmtKind::VarDecl {
                    name,
                    ty,
                    init: Some(init),
                } => {
                    let value = self.exprs().typed(init, ty);
                    self.line(format!("{} = {value};", self.scope.ident(name)));
                }
                StmtKind::VarDecl { init: None, .. } => {}
                _ => self.write_stmt(id)?,
            }
        }
        if let Some(call) = cont.call {
            self.write_call_issue(call);
        }
        match cont.next {
            Some(next) => self.line(format!("{state}[{branch}] = {next};")),
            None => self.line(format!("{state}[{branch}] = usize::MAX;")),
        }
        self.line(format!("continue '{label};"));
        Ok(())
    }
}

fn continuations<'a>(state: &'a crate::interleave::State<'_>) -> Vec<&'a Continuation> {
    match &state.kind {
        StateKind::Wait(alternatives) => alternatives.iter().map(|a| &a.then).collect(),
        StateKind::Resume(cont) => vec![cont],
    }
}

fn unbound(what: &str) -> CodegenError {
    CodegenError::Unsupported(format!("{what} statement without a resolved target"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{generate, CodegenTarget};
    use ttcn_ir::{check_module, lower, CheckOptions};

    fn gen(source: &str) -> String {
        let program = ttcn_dsl::parse(source, "t.ttcn").expect("parse failed");
        let mut module = lower(&program).expect("lowering failed");
        let diags = check_module(&mut module, &CheckOptions::default());
        assert!(!diags.has_errors(), "{diags:?}");
        generate(
            &module,
            CodegenTarget::Rust,
            &CodegenOptions::for_source("t.ttcn", source),
        )
        .expect("codegen failed")
    }

    #[test]
    fn header_and_signature() {
        let code = gen("module M { function f(integer n) return integer { return n; } }");
        assert!(code.contains("#![allow(unused"));
        assert!(code.contains("use ttcn_runtime::prelude::*;"));
        assert!(code.contains(
            "pub fn f(rt: &mut dyn TestComponent, mut n: i64) -> Result<i64, DynamicError> {"
        ));
        assert!(code.contains("return Ok(n.clone());"));
        assert!(!code.contains("MissingReturn"));
    }

    #[test]
    fn wrapped_output_is_an_includable_module() {
        let source = "module M { function f() { log(1); } }";
        let program = ttcn_dsl::parse(source, "t.ttcn").expect("parse failed");
        let mut module = lower(&program).expect("lowering failed");
        check_module(&mut module, &CheckOptions::default());
        let options = CodegenOptions::for_source("t.ttcn", source).wrapped_in("m");
        let code = generate(&module, CodegenTarget::Rust, &options).expect("codegen failed");
        assert!(!code.contains("#![allow"));
        assert!(code.contains("#[allow(unused, unreachable_code"));
        assert!(code.contains("pub mod m {\n"));
        assert!(code.ends_with("\n}\n"));
    }

    #[test]
    fn alt_with_else_is_a_labelled_block() {
        let code = gen(
            "module M { function f() {
                alt {
                    [] p.receive(A) { log(1); }
                    [else] { log(2); }
                }
            } }",
        );
        assert!(code.contains("'alt_0: {"));
        assert!(!code.contains("'alt_0: loop {"));
        assert!(!code.contains("try_altsteps"));
        assert!(!code.contains("no_branch_selectable"));
        assert!(!code.contains("take_snapshot(rt, true)"));
    }

    #[test]
    fn alt_without_else_falls_back_to_defaults() {
        let code = gen(
            "module M { function f() {
                alt {
                    [x] p.receive(A) {}
                    [] q.receive {}
                }
            } }",
        );
        assert!(code.contains("'alt_0: loop {"));
        assert!(code.contains("let mut alt_0_s0 = GuardStatus::Unchecked;"));
        assert!(code.contains("let mut alt_0_s1 = GuardStatus::Maybe;"));
        assert!(code.contains("match try_altsteps(rt)? {"));
        assert!(code.contains(
            "if alt_0_s0 == GuardStatus::No && alt_0_s1 == GuardStatus::No && alt_0_defaults == GuardStatus::No {"
        ));
        assert!(code.contains(
            "return Err(DynamicError::no_branch_selectable(\"alt statement\", \"t.ttcn\", 2));"
        ));
        assert!(code.contains("take_snapshot(rt, true)?;"));
    }

    #[test]
    fn constant_true_precondition_needs_no_check() {
        let code = gen("module M { function f() { alt { [true] p.receive {} } } }");
        assert!(code.contains("let mut alt_0_s0 = GuardStatus::Maybe;"));
        assert!(!code.contains("GuardStatus::Unchecked"));
    }

    #[test]
    fn altstep_body_returns_status() {
        let code = gen(
            "module M { altstep as_a(integer n) {
                [n > 0] p.receive { repeat; }
                [] q.receive { break; }
            } }",
        );
        assert!(code.contains(
            "pub fn as_a(rt: &mut dyn TestComponent, mut n: i64) -> Result<GuardStatus, DynamicError> {"
        ));
        assert!(code.contains("return Ok(GuardStatus::Repeat);"));
        assert!(code.contains("return Ok(GuardStatus::Break);"));
        assert!(code.contains("if altstep_0_pending { Ok(GuardStatus::Maybe) } else { Ok(GuardStatus::No) }"));
        assert!(!code.contains("no_branch_selectable"));
        assert!(!code.contains("take_snapshot"));
        assert!(code.contains("pub fn as_a_dyn(rt: &mut dyn TestComponent, args: &[Value])"));
        assert!(code.contains("as_a(rt, arg(args, 0)?)"));
    }

    #[test]
    fn altstep_guard_propagates_repeat_and_break() {
        let code = gen(
            "module M {
                altstep as_a() { [] p.receive {} }
                function f() { alt { [] as_a(); } }
            }",
        );
        assert!(code.contains("match as_a(rt)? {"));
        assert!(code.contains("GuardStatus::Repeat => continue 'alt_0,"));
        assert!(code.contains("GuardStatus::Break => break 'alt_0,"));
    }

    #[test]
    fn loop_control_targets() {
        let code = gen(include_str!("../../../samples/loops.ttcn"));
        // continue in a for loop runs the step first
        assert!(code.contains("i = (i + 1i64);\n"));
        assert!(code.contains("continue 'for_0;"));
        assert!(code.contains("break 'for_0;"));
        assert!(code.contains("break 'do_0;"));
        assert!(code.contains("'do_0: loop {"));
    }

    #[test]
    fn do_while_continue_checks_condition() {
        let code = gen(
            "module M { function f(integer n) {
                do {
                    n := n - 1;
                    if (n == 2) { continue; }
                } while (n > 0)
            } }",
        );
        assert!(code.contains("if (n > 0i64) {"));
        assert!(code.contains("continue 'do_0;"));
    }

    #[test]
    fn constant_true_while_is_a_plain_loop() {
        let code = gen(
            "module M { function f(integer n) {
                while (true) { if (n > 3) { break; } n := n + 1; }
                while (n > 0) { n := n - 1; }
            } }",
        );
        assert!(code.contains("'while_0: loop {"));
        assert!(code.contains("break 'while_0;"));
        assert!(code.contains("'while_1: while (n > 0i64) {"));
        assert!(!code.contains("while true"));
    }

    #[test]
    fn call_response_has_no_defaults() {
        let code = gen(include_str!("../../../samples/call_response.ttcn"));
        assert!(code.contains("rt.call(\"pt\", Value::message(\"GetTime\", vec![Value::from(1i64)]), Some(5.0))?;"));
        assert!(code.contains("'call_0: loop {"));
        assert!(!code.contains("try_altsteps"));
        assert!(code.contains("\"response and exception handling part of call\""));
        assert!(code.contains("rt.call(\"pt\", Value::message(\"Notify\", vec![Value::from(now.clone())]), None)?;"));
    }

    #[test]
    fn defaults_and_altstep_values() {
        let code = gen(include_str!("../../../samples/altstep_defaults.ttcn"));
        assert!(code.contains(
            "let mut d_keep: DefaultHandle = rt.defaults().activate(AltstepValue::new(\"as_keepalive\", as_keepalive_dyn), vec![])?;"
        ));
        assert!(code.contains("vec![Value::from(5i64)]"));
        assert!(code.contains("let mut handler: AltstepValue = AltstepValue::new(\"as_keepalive\", as_keepalive_dyn);"));
        assert!(code.contains("match handler.invoke(rt, &[])? {"));
        assert!(code.contains("rt.defaults().deactivate(d_keep);"));
        assert!(code.contains("rt.defaults().deactivate_all();"));
        assert!(code.contains("break 'while_0;"));
    }

    #[test]
    fn testcase_returns_verdict() {
        let code = gen("module M { testcase tc() { setverdict(pass); } }");
        assert!(code.contains("-> Result<Verdict, DynamicError>"));
        assert!(code.contains("rt.set_verdict(Verdict::Pass);"));
        assert!(code.contains("Ok(rt.verdict())"));
    }

    #[test]
    fn generation_is_deterministic() {
        let source = include_str!("../../../samples/alt_basic.ttcn");
        assert_eq!(gen(source), gen(source));
    }
}
