// Command handler for: Check
//
// Lowers a module, runs the semantic checks and reports the findings as
// rendered diagnostics or as a JSON report.

use std::path::PathBuf;

use miette::IntoDiagnostic;
use serde::Serialize;
use tracing::info;
use ttcn_dsl::ast::LineIndex;
use ttcn_ir::Severity;

use super::helpers::{check_options_from_cli, load_and_check, parse_output_format, print_diagnostics, CheckedModule};
use crate::{CheckArgs, OutputFormat};

pub(crate) const CHECK_REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct CheckIssue {
    pub(crate) severity: &'static str,
    pub(crate) code: &'static str,
    pub(crate) message: String,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct GuardListSummary {
    pub(crate) label: String,
    pub(crate) construct: &'static str,
    pub(crate) guards: usize,
    pub(crate) reachable: usize,
    pub(crate) restartable: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckReport {
    pub(crate) schema_version: u32,
    pub(crate) file: String,
    pub(crate) module: String,
    pub(crate) errors: usize,
    pub(crate) warnings: usize,
    pub(crate) issues: Vec<CheckIssue>,
    pub(crate) guard_lists: Vec<GuardListSummary>,
}

pub(crate) fn build_check_report(checked: &CheckedModule) -> CheckReport {
    let index = LineIndex::new(&checked.source);
    let issues = checked
        .diagnostics
        .iter()
        .map(|d| {
            let (line, column) = index.line_col(d.span.start);
            CheckIssue {
                severity: match d.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                },
                code: d.code,
                message: d.message.clone(),
                line,
                column,
            }
        })
        .collect();
    let guard_lists = checked
        .module
        .guard_lists
        .iter()
        .map(|gl| GuardListSummary {
            label: gl.label.clone(),
            construct: gl.origin.describe(),
            guards: gl.guards().len(),
            reachable: gl.reachable().len(),
            restartable: gl.needs_restart_loop(),
        })
        .collect();
    CheckReport {
        schema_version: CHECK_REPORT_SCHEMA_VERSION,
        file: checked.filename.clone(),
        module: checked.module.name.clone(),
        errors: checked.diagnostics.error_count(),
        warnings: checked.diagnostics.warnings().count(),
        issues,
        guard_lists,
    }
}

/// Run the `check` CLI command.
///
/// Exits with status 1 when the module has semantic errors.
pub(crate) fn run_check_command(file: PathBuf, checks: CheckArgs, format: String) -> miette::Result<()> {
    let format = parse_output_format(&format)?;
    let options = check_options_from_cli(&checks)?;
    let checked = load_and_check(&file, &options)?;
    let report = build_check_report(&checked);
    info!(
        module = %report.module,
        errors = report.errors,
        warnings = report.warnings,
        "check finished"
    );

    match format {
        OutputFormat::Text => {
            print_diagnostics(&checked);
            println!(
                "{}: {} error(s), {} warning(s)",
                report.file, report.errors, report.warnings
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }
    if report.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttcn_ir::CheckOptions;

    fn checked_sample(name: &str) -> CheckedModule {
        let path = PathBuf::from(format!("{}/../../samples/{name}", env!("CARGO_MANIFEST_DIR")));
        load_and_check(&path, &CheckOptions::default()).unwrap()
    }

    #[test]
    fn report_positions_issues_by_line() {
        let report = build_check_report(&checked_sample("unreachable_else.ttcn"));
        assert_eq!(report.module, "UnreachableElse");
        assert_eq!(report.errors, 0);
        assert_eq!(report.warnings, 1);
        assert_eq!(report.issues[0].severity, "warning");
        assert_eq!(report.issues[0].line, 8);
    }

    #[test]
    fn report_lists_guard_lists() {
        let report = build_check_report(&checked_sample("alt_basic.ttcn"));
        let labels: Vec<&str> = report.guard_lists.iter().map(|gl| gl.label.as_str()).collect();
        assert!(labels.contains(&"altstep_0"));
        assert!(labels.contains(&"alt_0"));
        let alt = report.guard_lists.iter().find(|gl| gl.label == "alt_0").unwrap();
        assert_eq!(alt.construct, "alt statement");
        assert_eq!(alt.guards, 4);
        assert!(alt.restartable);
    }
}
