// Shared helpers for the command handlers: reading input, mapping CLI flags
// to check options, and running the front end up to the semantic checks.

use std::path::Path;

use miette::IntoDiagnostic;
use tracing::debug;
use ttcn_ir::{check_module, lower_with_source, BehaviorModule, CheckOptions, Diagnostics, SeverityLevel};

use crate::{CheckArgs, OutputFormat};

/// Largest module accepted as input.
pub(crate) const MAX_INPUT_BYTES: u64 = 1 << 20;

pub(crate) fn read_source(path: &Path) -> miette::Result<String> {
    let metadata = std::fs::metadata(path).into_diagnostic()?;
    if metadata.len() > MAX_INPUT_BYTES {
        miette::bail!(
            "Input file {} is {} bytes, exceeding the limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_INPUT_BYTES
        );
    }
    std::fs::read_to_string(path).into_diagnostic()
}

pub(crate) fn parse_output_format(raw: &str) -> miette::Result<OutputFormat> {
    match raw.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(miette::miette!(
            "Unknown output format '{other}'. Use text | json."
        )),
    }
}

pub(crate) fn parse_severity(flag: &str, raw: &str) -> miette::Result<SeverityLevel> {
    match raw.to_lowercase().as_str() {
        "ignore" | "off" => Ok(SeverityLevel::Ignore),
        "warning" | "warn" => Ok(SeverityLevel::Warning),
        "error" => Ok(SeverityLevel::Error),
        other => Err(miette::miette!(
            "Invalid value '{other}' for --{flag}. Use ignore | warning | error."
        )),
    }
}

/// Check options from an optional JSON config file, overridden by flags.
pub(crate) fn check_options_from_cli(args: &CheckArgs) -> miette::Result<CheckOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let raw = read_source(path)?;
            serde_json::from_str::<CheckOptions>(&raw)
                .map_err(|e| miette::miette!("Invalid check config {}: {e}", path.display()))?
        }
        None => CheckOptions::default(),
    };
    if let Some(raw) = &args.after_else {
        options.unreachable_after_else = parse_severity("after-else", raw)?;
    }
    if let Some(raw) = &args.false_precondition {
        options.constant_false_precondition = parse_severity("false-precondition", raw)?;
    }
    if let Some(raw) = &args.empty_altstep {
        options.empty_altstep = parse_severity("empty-altstep", raw)?;
    }
    debug!(?options, "check options");
    Ok(options)
}

/// A module run through parsing, lowering and the semantic checks.
pub(crate) struct CheckedModule {
    pub(crate) source: String,
    pub(crate) filename: String,
    pub(crate) module: BehaviorModule,
    pub(crate) diagnostics: Diagnostics,
}

pub(crate) fn load_and_check(path: &Path, options: &CheckOptions) -> miette::Result<CheckedModule> {
    let source = read_source(path)?;
    let filename = path.display().to_string();
    let program = ttcn_dsl::parse(&source, &filename).map_err(miette::Report::new)?;
    let mut module = lower_with_source(&program, &source, &filename).map_err(miette::Report::new)?;
    let mut diagnostics = check_module(&mut module, options);
    diagnostics.sort();
    Ok(CheckedModule {
        source,
        filename,
        module,
        diagnostics,
    })
}

/// Render every diagnostic with its source snippet on stderr.
pub(crate) fn print_diagnostics(checked: &CheckedModule) {
    for diagnostic in checked.diagnostics.iter() {
        let report = miette::Report::new(diagnostic.with_source(&checked.source, &checked.filename));
        eprintln!("{report:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_accept_short_forms() {
        assert_eq!(parse_severity("x", "off").unwrap(), SeverityLevel::Ignore);
        assert_eq!(parse_severity("x", "Warn").unwrap(), SeverityLevel::Warning);
        assert_eq!(parse_severity("x", "error").unwrap(), SeverityLevel::Error);
        let err = parse_severity("after-else", "fatal").unwrap_err();
        assert!(err.to_string().contains("--after-else"));
    }

    #[test]
    fn output_formats() {
        assert_eq!(parse_output_format("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(parse_output_format("text").unwrap(), OutputFormat::Text);
        assert!(parse_output_format("yaml").is_err());
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = std::env::temp_dir().join(format!("ttcn_cli_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checks.json");
        std::fs::write(
            &path,
            r#"{ "unreachable_after_else": "error", "empty_altstep": "ignore" }"#,
        )
        .unwrap();

        let args = CheckArgs {
            config: Some(path),
            empty_altstep: Some("error".into()),
            ..CheckArgs::default()
        };
        let options = check_options_from_cli(&args);
        let _ = std::fs::remove_dir_all(&dir);
        let options = options.unwrap();

        assert_eq!(options.unreachable_after_else, SeverityLevel::Error);
        assert_eq!(options.constant_false_precondition, SeverityLevel::Warning);
        assert_eq!(options.empty_altstep, SeverityLevel::Error);
    }

    #[test]
    fn no_flags_means_defaults() {
        let options = check_options_from_cli(&CheckArgs::default()).unwrap();
        assert_eq!(options, CheckOptions::default());
    }
}
