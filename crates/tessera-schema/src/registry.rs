//! The read-only set of module schemas known to a process.

use std::collections::BTreeMap;
use std::sync::Arc;

use tessera_common::error::{Result, TesseraError};
use tessera_common::types::ModuleKind;

use crate::schema::ModuleSchema;

/// Immutable mapping from module kind to schema.
///
/// Built once through [`SchemaRegistry::builder`]; nothing can be added or
/// changed afterwards. Cloning shares the underlying schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<ModuleKind, Arc<ModuleSchema>>,
}

impl SchemaRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            schemas: BTreeMap::new(),
        }
    }

    /// Looks up the schema for `kind`.
    #[must_use]
    pub fn get(&self, kind: &ModuleKind) -> Option<&Arc<ModuleSchema>> {
        self.schemas.get(kind)
    }

    /// Registered kinds in lexical order.
    pub fn kinds(&self) -> impl Iterator<Item = &ModuleKind> {
        self.schemas.keys()
    }

    /// Registered schemas in kind order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<ModuleSchema>> {
        self.schemas.values()
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Builder for [`SchemaRegistry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    schemas: BTreeMap<ModuleKind, Arc<ModuleSchema>>,
}

impl RegistryBuilder {
    /// Registers a schema.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Schema`] if the kind is already registered.
    pub fn register(mut self, schema: ModuleSchema) -> Result<Self> {
        let kind = schema.kind().clone();
        if self.schemas.contains_key(&kind) {
            return Err(TesseraError::Schema {
                kind: kind.to_string(),
                message: "module kind registered twice".into(),
            });
        }
        tracing::debug!(kind = %kind, "registering schema");
        let _ = self.schemas.insert(kind, Arc::new(schema));
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}

#[cfg(test)]
mod tests {
    use tessera_common::types::FieldType;

    use super::*;
    use crate::field::Field;

    fn schema(kind: &str) -> ModuleSchema {
        ModuleSchema::builder(kind)
            .field(Field::new("name", FieldType::String).required())
            .build()
            .expect("schema should build")
    }

    #[test]
    fn lookup_by_kind() {
        let registry = SchemaRegistry::builder()
            .register(schema("gateway"))
            .expect("register")
            .build();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&ModuleKind::new("gateway")).is_some());
        assert!(registry.get(&ModuleKind::new("dns-zone")).is_none());
    }

    #[test]
    fn kinds_are_sorted() {
        let registry = SchemaRegistry::builder()
            .register(schema("gateway"))
            .and_then(|b| b.register(schema("container-registry")))
            .expect("register")
            .build();
        let kinds: Vec<&str> = registry.kinds().map(ModuleKind::as_str).collect();
        assert_eq!(kinds, vec!["container-registry", "gateway"]);
    }

    #[test]
    fn duplicate_kind_fails_fast() {
        let err = SchemaRegistry::builder()
            .register(schema("gateway"))
            .and_then(|b| b.register(schema("gateway")))
            .unwrap_err();
        assert!(err.to_string().contains("registered twice"), "got: {err}");
    }
}
