//! `tessera plan` — Display the order modules must be applied in.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tessera_common::config::EngineConfig;
use tessera_sdk::Composer;

use crate::output;

/// Output format for the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable listing.
    Text,
    /// JSON document on stdout.
    Json,
}

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the .tsr composition file.
    #[arg(default_value = tessera_common::constants::DEFAULT_COMPOSITION_FILE)]
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

/// Executes the `plan` command.
///
/// Parses the `.tsr` file, validates every module, resolves references,
/// orders the dependency graph, and displays the plan.
///
/// # Errors
///
/// Returns an error if parsing, validation, resolution, or ordering fails.
pub fn execute(args: PlanArgs, config: EngineConfig) -> anyhow::Result<()> {
    let composer = Composer::builtin(config)?;
    let plan = composer.compose_file(&args.file).map_err(super::report)?;

    match args.format {
        Format::Text => print!("{}", output::render_plan(&args.file.display().to_string(), &plan)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&output::plan_json(&plan))?),
    }
    Ok(())
}
