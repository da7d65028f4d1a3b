// Command handler for: Parse
//
// Prints the syntax tree of a module, as Rust debug output or JSON.

use std::path::PathBuf;

use miette::IntoDiagnostic;

use super::helpers::{parse_output_format, read_source};
use crate::OutputFormat;

pub(crate) fn run_parse_command(file: PathBuf, format: String) -> miette::Result<()> {
    let format = parse_output_format(&format)?;
    let source = read_source(&file)?;
    let filename = file.display().to_string();

    let program = ttcn_dsl::parse(&source, &filename).map_err(miette::Report::new)?;
    match format {
        OutputFormat::Text => println!("{program:#?}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&program).into_diagnostic()?)
        }
    }
    Ok(())
}
