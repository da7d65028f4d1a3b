//! `ttcn`: parse, check and compile the alternative behaviour of TTCN-3
//! modules.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ttcn")]
#[command(about = "Compiler for TTCN-3 alt, interleave and altstep dispatch")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a module and print its syntax tree
    Parse {
        /// Path to the .ttcn module
        file: PathBuf,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Lower and check a module, reporting diagnostics
    Check {
        /// Path to the .ttcn module
        file: PathBuf,

        #[command(flatten)]
        checks: CheckArgs,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Generate code for a module that checks without errors
    Codegen {
        /// Path to the .ttcn module
        file: PathBuf,

        /// Target language: rust
        #[arg(long, default_value = "rust")]
        target: String,

        /// Output directory; the code is printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        checks: CheckArgs,
    },
}

/// Flags shared by every command that runs the semantic checks.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct CheckArgs {
    /// JSON file with check options
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Severity of guards that follow an [else] branch: ignore | warning | error
    #[arg(long)]
    pub(crate) after_else: Option<String>,

    /// Severity of guards with a constant false precondition: ignore | warning | error
    #[arg(long)]
    pub(crate) false_precondition: Option<String>,

    /// Severity of altsteps without alternatives: ignore | warning | error
    #[arg(long)]
    pub(crate) empty_altstep: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, format } => {
            commands::parse::run_parse_command(file, format)?;
        }
        Commands::Check {
            file,
            checks,
            format,
        } => {
            commands::check::run_check_command(file, checks, format)?;
        }
        Commands::Codegen {
            file,
            target,
            output,
            checks,
        } => {
            commands::codegen::run_codegen_command(file, target, output, checks)?;
        }
    }
    Ok(())
}
