//! CLI command definitions and dispatch.

pub mod plan;
pub mod schemas;
pub mod validate;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tessera_common::config::{EngineConfig, ValidationMode};
use tessera_common::error::TesseraError;

use crate::output;

/// Tessera — validate and order infrastructure module compositions.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Reject fields the module schema does not declare.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Validation mode (strict or lenient).
    #[arg(long, global = true, env = tessera_common::constants::MODE_ENV_VAR)]
    pub mode: Option<ValidationMode>,

    /// Engine configuration file (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl Cli {
    /// Builds the engine configuration: file first, then `--mode`, then `--strict`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading engine configuration {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.strict {
            config.mode = ValidationMode::Strict;
        }
        tracing::debug!(mode = %config.mode, "engine configuration");
        Ok(config)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a .tsr file and validate every module against its schema.
    Validate(validate::ValidateArgs),
    /// Resolve references and print the order modules must be applied in.
    Plan(plan::PlanArgs),
    /// List the built-in module kinds or describe one of them.
    Schemas(schemas::SchemasArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.engine_config()?;
    match cli.command {
        Command::Validate(args) => validate::execute(args, config),
        Command::Plan(args) => plan::execute(args, config),
        Command::Schemas(args) => schemas::execute(&args),
    }
}

/// Prints per-instance violations before handing the error back.
fn report(err: TesseraError) -> anyhow::Error {
    if let TesseraError::Validation { failures } = &err {
        println!("{}", output::render_failures(failures));
    }
    anyhow::Error::new(err)
}
