//! Code generation from checked TTCN-3 behaviour modules.
//!
//! The generated Rust code runs against `ttcn-runtime`: every alternative
//! construct becomes an inline state machine over `GuardStatus` slots,
//! snapshots and the default chain of the running test component.

pub mod common;
pub mod interleave;
pub mod rust_gen;

use tracing::info;
use ttcn_dsl::ast::{LineIndex, Span};
use ttcn_ir::BehaviorModule;

/// Target language for generated behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenTarget {
    Rust,
}

/// Errors returned by code generation entry points.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The module was never run through the semantic checker.
    #[error("module '{0}' has not been checked")]
    Unchecked(String),
    /// The last check of the module reported errors.
    #[error("module '{module}' has {errors} semantic error(s)")]
    CheckFailed { module: String, errors: usize },
    #[error("{construct} has no alternatives")]
    EmptyGuardList { construct: &'static str },
    /// The input uses a construct the backend cannot express.
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// Settings that affect the generated text.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// File name embedded in dynamic-error locations.
    pub source_name: String,
    pub line_index: Option<LineIndex>,
    /// Wrap the output in `pub mod <name> { .. }` so it can be `include!`d.
    pub module_wrapper: Option<String>,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            source_name: "<input>".into(),
            line_index: None,
            module_wrapper: None,
        }
    }
}

impl CodegenOptions {
    pub fn for_source(name: impl Into<String>, source: &str) -> Self {
        Self {
            source_name: name.into(),
            line_index: Some(LineIndex::new(source)),
            module_wrapper: None,
        }
    }

    pub fn wrapped_in(mut self, module: impl Into<String>) -> Self {
        self.module_wrapper = Some(module.into());
        self
    }

    /// 1-based source line of `span`, or 0 without a line index.
    pub fn line_of(&self, span: Span) -> usize {
        self.line_index
            .as_ref()
            .map_or(0, |index| index.line(span.start))
    }
}

/// Generate code for a checked module.
///
/// Modules that have not been checked, or whose last check reported errors,
/// are rejected.
pub fn generate(
    module: &BehaviorModule,
    target: CodegenTarget,
    options: &CodegenOptions,
) -> Result<String, CodegenError> {
    if module.last_checked.is_none() {
        return Err(CodegenError::Unchecked(module.name.clone()));
    }
    if !module.is_checked_clean() {
        return Err(CodegenError::CheckFailed {
            module: module.name.clone(),
            errors: module.check_errors,
        });
    }
    info!(module = %module.name, ?target, "generating code");
    match target {
        CodegenTarget::Rust => rust_gen::generate_rust(module, options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttcn_ir::{check_module, lower, CheckOptions};

    fn lowered(source: &str) -> BehaviorModule {
        let program = ttcn_dsl::parse(source, "test.ttcn").expect("parse failed");
        lower(&program).expect("lowering failed")
    }

    #[test]
    fn unchecked_modules_are_rejected() {
        let module = lowered(include_str!("../../../samples/alt_basic.ttcn"));
        let err = generate(&module, CodegenTarget::Rust, &CodegenOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::Unchecked(_)));
    }

    #[test]
    fn modules_with_errors_are_rejected() {
        let mut module = lowered(
            "module M { function f() { while (true) { repeat; } } }",
        );
        let diags = check_module(&mut module, &CheckOptions::default());
        assert!(diags.has_errors());
        let err = generate(&module, CodegenTarget::Rust, &CodegenOptions::default()).unwrap_err();
        assert!(matches!(err, CodegenError::CheckFailed { errors: 1, .. }));
    }

    #[test]
    fn warnings_do_not_block_generation() {
        let source = include_str!("../../../samples/unreachable_else.ttcn");
        let mut module = lowered(source);
        let diags = check_module(&mut module, &CheckOptions::default());
        assert_eq!(diags.warnings().count(), 1);
        let code = generate(
            &module,
            CodegenTarget::Rust,
            &CodegenOptions::for_source("unreachable_else.ttcn", source),
        )
        .expect("codegen failed");
        assert!(!code.contains("\"Late\""));
    }

    #[test]
    fn line_of_uses_the_index() {
        let options = CodegenOptions::for_source("a.ttcn", "x\ny\nz");
        assert_eq!(options.line_of(Span::new(4, 5)), 3);
        assert_eq!(CodegenOptions::default().line_of(Span::new(4, 5)), 0);
    }
}
