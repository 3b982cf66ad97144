//! `tessera validate` — Check every module in a composition file.

use std::path::PathBuf;

use clap::Args;
use tessera_common::config::EngineConfig;
use tessera_sdk::Composer;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the .tsr composition file.
    #[arg(default_value = tessera_common::constants::DEFAULT_COMPOSITION_FILE)]
    pub file: PathBuf,
}

/// Executes the `validate` command.
///
/// Every module is checked even after one fails, so the report lists all
/// violations at once.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or any module is invalid.
pub fn execute(args: ValidateArgs, config: EngineConfig) -> anyhow::Result<()> {
    let composer = Composer::builtin(config)?;
    let requests = tessera_sdk::load_file(&args.file)?;
    let instances = composer.instantiate_all(&requests).map_err(super::report)?;

    println!("\u{2713} {}: {} module(s) valid", args.file.display(), instances.len());
    Ok(())
}
