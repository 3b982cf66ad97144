//! `tessera schemas` — Inspect the built-in module catalog.

use clap::Args;
use tessera_common::types::ModuleKind;

use crate::output;

/// Arguments for the `schemas` command.
#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Module kind to describe; lists every kind when omitted.
    pub kind: Option<String>,
}

/// Executes the `schemas` command.
///
/// # Errors
///
/// Returns an error if the catalog fails to load or the kind is unknown.
pub fn execute(args: &SchemasArgs) -> anyhow::Result<()> {
    let registry = tessera_schema::catalog::builtin()?;
    match &args.kind {
        None => print!("{}", output::render_catalog(registry)),
        Some(kind) => {
            let schema = registry
                .get(&ModuleKind::new(kind.as_str()))
                .ok_or_else(|| anyhow::anyhow!("unknown module kind \"{kind}\""))?;
            print!("{}", output::render_schema(schema));
        }
    }
    Ok(())
}
