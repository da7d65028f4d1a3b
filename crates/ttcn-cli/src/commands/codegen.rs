// Command handler for: Codegen
//
// Generates Rust dispatch code from a module that checks without errors.
// Warnings are reported but do not stop generation.

use std::fs;
use std::path::PathBuf;

use miette::IntoDiagnostic;
use tracing::info;
use ttcn_codegen::{CodegenOptions, CodegenTarget};

use super::helpers::{check_options_from_cli, load_and_check, print_diagnostics};
use crate::CheckArgs;

pub(crate) fn parse_codegen_target(raw: &str) -> miette::Result<CodegenTarget> {
    match raw.to_lowercase().as_str() {
        "rust" | "rs" => Ok(CodegenTarget::Rust),
        other => Err(miette::miette!(
            "Unknown codegen target '{other}'. Use rust."
        )),
    }
}

/// Run the `codegen` CLI command.
///
/// Checks the module first; generated code goes to `output/<module>.rs`, or
/// to stdout without an output directory.
pub(crate) fn run_codegen_command(
    file: PathBuf,
    target: String,
    output: Option<PathBuf>,
    checks: CheckArgs,
) -> miette::Result<()> {
    let codegen_target = parse_codegen_target(&target)?;
    let options = check_options_from_cli(&checks)?;
    let checked = load_and_check(&file, &options)?;
    print_diagnostics(&checked);
    if checked.diagnostics.has_errors() {
        miette::bail!(
            "{} has {} semantic error(s); no code generated",
            checked.filename,
            checked.diagnostics.error_count()
        );
    }

    let codegen_options = CodegenOptions::for_source(
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| checked.filename.clone()),
        &checked.source,
    );
    let code = ttcn_codegen::generate(&checked.module, codegen_target, &codegen_options)
        .map_err(|e| miette::miette!("Codegen error: {e}"))?;

    match output {
        Some(dir) => {
            let out_file = dir.join(format!("{}.rs", checked.module.name.to_lowercase()));
            fs::create_dir_all(&dir).into_diagnostic()?;
            fs::write(&out_file, &code).into_diagnostic()?;
            info!(path = %out_file.display(), bytes = code.len(), "wrote generated code");
            println!("Generated {}", out_file.display());
        }
        None => print!("{code}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets() {
        assert_eq!(parse_codegen_target("Rust").unwrap(), CodegenTarget::Rust);
        assert_eq!(parse_codegen_target("rs").unwrap(), CodegenTarget::Rust);
        let err = parse_codegen_target("go").unwrap_err();
        assert!(err.to_string().contains("Unknown codegen target 'go'"));
    }
}
