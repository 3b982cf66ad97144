//! Static checks on the parsed AST.
//!
//! Catches duplicate instance names and duplicate field assignments before
//! any schema is consulted.

use std::collections::HashSet;

use tessera_common::error::{Result, TesseraError};
use tessera_common::types::InstanceId;

use super::ast::CompositionFile;

/// Validates a parsed composition file for structural correctness.
///
/// # Checks performed
///
/// 1. No duplicate module instance names.
/// 2. No field assigned twice within one module block.
///
/// # Errors
///
/// Returns an error if any check fails.
pub fn validate(file: &CompositionFile) -> Result<()> {
    tracing::debug!(modules = file.modules.len(), "validating composition file");
    check_duplicate_modules(file)?;
    check_duplicate_fields(file)?;
    Ok(())
}

fn check_duplicate_modules(file: &CompositionFile) -> Result<()> {
    let mut seen = HashSet::new();
    for module in &file.modules {
        if !seen.insert(module.name.as_str()) {
            return Err(TesseraError::DuplicateInstance {
                id: InstanceId::new(module.name.clone()),
            });
        }
    }
    Ok(())
}

fn check_duplicate_fields(file: &CompositionFile) -> Result<()> {
    for module in &file.modules {
        let mut seen = HashSet::new();
        for field in &module.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(TesseraError::Parse {
                    message: format!(
                        "field \"{}\" assigned twice in module \"{}\"",
                        field.name, module.name
                    ),
                });
            }
        }
    }
    Ok(())
}
