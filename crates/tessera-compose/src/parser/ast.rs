//! Abstract Syntax Tree for `.tsr` composition files.

use tessera_schema::instance::{FieldValue, ModuleRequest};

/// Root node of a parsed `.tsr` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionFile {
    /// Module blocks in declaration order.
    pub modules: Vec<ModuleDecl>,
}

/// A `MODULE <name> KIND <kind> { ... }` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDecl {
    /// Instance name.
    pub name: String,
    /// Module kind.
    pub kind: String,
    /// Field assignments in source order.
    pub fields: Vec<FieldDecl>,
}

/// A `field = value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name.
    pub name: String,
    /// Literal or reference.
    pub value: FieldValue,
}

impl CompositionFile {
    /// Converts the parsed blocks into module requests, preserving order.
    #[must_use]
    pub fn into_requests(self) -> Vec<ModuleRequest> {
        self.modules
            .into_iter()
            .map(|module| {
                let mut request = ModuleRequest::new(module.name, module.kind);
                for field in module.fields {
                    let _ = request.values.insert(field.name, field.value);
                }
                request
            })
            .collect()
    }
}
