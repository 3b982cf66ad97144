//! Runs the whole pipeline: requests to instances to graph to plan.
//!
//! Wraps `tessera-schema` instantiation and `tessera-compose` resolution
//! and ordering into a high-level API for SDK consumers.

use std::path::Path;
use std::sync::Arc;

use tessera_common::config::EngineConfig;
use tessera_common::error::{InstanceViolations, Result, TesseraError};
use tessera_compose::graph::DependencyGraph;
use tessera_compose::plan::CompositionPlan;
use tessera_schema::instance::{ModuleInstance, ModuleRequest, instantiate};
use tessera_schema::registry::SchemaRegistry;
use tessera_schema::schema::ModuleSchema;

/// Validates and composes module requests against a schema registry.
///
/// A `Composer` holds no per-run state, so one value can serve independent
/// compositions from several threads.
#[derive(Debug, Clone)]
pub struct Composer {
    registry: SchemaRegistry,
    config: EngineConfig,
}

impl Composer {
    /// Creates a composer over `registry`.
    #[must_use]
    pub const fn new(registry: SchemaRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Creates a composer over the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in schema is inconsistent.
    pub fn builtin(config: EngineConfig) -> Result<Self> {
        Ok(Self::new(tessera_schema::catalog::builtin()?.clone(), config))
    }

    /// The schemas this composer validates against.
    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The active engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn schema_for(&self, request: &ModuleRequest) -> Result<&Arc<ModuleSchema>> {
        self.registry
            .get(&request.kind)
            .ok_or_else(|| TesseraError::UnknownKind {
                instance: request.id.clone(),
                kind: request.kind.to_string(),
            })
    }

    /// Validates one request.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::UnknownKind`] if the kind is not registered, or
    /// [`TesseraError::Validation`] carrying every violation of the request.
    pub fn instantiate(&self, request: &ModuleRequest) -> Result<ModuleInstance> {
        let schema = self.schema_for(request)?;
        instantiate(schema, request.id.clone(), &request.values, self.config.mode).map_err(
            |violations| TesseraError::Validation {
                failures: vec![InstanceViolations {
                    instance: request.id.clone(),
                    violations,
                }],
            },
        )
    }

    /// Validates every request, collecting the violations of all of them.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::UnknownKind`] for the first request naming an
    /// unregistered kind, otherwise [`TesseraError::Validation`] listing each
    /// failing instance in request order.
    pub fn instantiate_all(&self, requests: &[ModuleRequest]) -> Result<Vec<ModuleInstance>> {
        tracing::info!(requests = requests.len(), mode = %self.config.mode, "validating modules");

        let mut instances = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();
        for request in requests {
            let schema = self.schema_for(request)?;
            match instantiate(schema, request.id.clone(), &request.values, self.config.mode) {
                Ok(instance) => instances.push(instance),
                Err(violations) => {
                    tracing::debug!(
                        instance = %request.id,
                        violations = violations.len(),
                        "module failed validation"
                    );
                    failures.push(InstanceViolations {
                        instance: request.id.clone(),
                        violations,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(instances)
        } else {
            Err(TesseraError::Validation { failures })
        }
    }

    /// Resolves references among validated instances.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error in declaration order.
    pub fn resolve(&self, instances: Vec<ModuleInstance>) -> Result<DependencyGraph> {
        tessera_compose::resolver::resolve(instances)
    }

    /// Resolves and orders validated instances.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or a composition (cycle) error.
    pub fn compose(&self, instances: Vec<ModuleInstance>) -> Result<CompositionPlan> {
        let graph = self.resolve(instances)?;
        Ok(graph.compose()?)
    }

    /// Runs the full pipeline over `requests`.
    ///
    /// # Errors
    ///
    /// Returns validation errors for every failing request, or the first
    /// resolution or composition error.
    pub fn compose_requests(&self, requests: &[ModuleRequest]) -> Result<CompositionPlan> {
        let instances = self.instantiate_all(requests)?;
        self.compose(instances)
    }

    /// Parses `.tsr` source and runs the full pipeline over it.
    ///
    /// # Errors
    ///
    /// Returns a parse error, or any error of [`Self::compose_requests`].
    pub fn compose_source(&self, source: &str) -> Result<CompositionPlan> {
        let requests = parse_requests(source)?;
        self.compose_requests(&requests)
    }

    /// Loads a `.tsr` file and runs the full pipeline over it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or any error of
    /// [`Self::compose_source`].
    pub fn compose_file(&self, path: &Path) -> Result<CompositionPlan> {
        tracing::info!(path = %path.display(), "loading .tsr file");
        self.compose_source(&read_source(path)?)
    }
}

/// Parses `.tsr` source into module requests.
///
/// # Errors
///
/// Returns a parse error if the source is malformed.
pub fn parse_requests(source: &str) -> Result<Vec<ModuleRequest>> {
    Ok(tessera_compose::parser::parse_tsr(source)?.into_requests())
}

/// Reads a `.tsr` file and parses it into module requests.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or a parse error.
pub fn load_file(path: &Path) -> Result<Vec<ModuleRequest>> {
    parse_requests(&read_source(path)?)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| TesseraError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use tessera_common::config::ValidationMode;
    use tessera_common::types::{FieldType, Value};
    use tessera_schema::field::Field;

    use super::*;

    fn composer(mode: ValidationMode) -> Composer {
        let registry = SchemaRegistry::builder()
            .register(
                ModuleSchema::builder("bucket")
                    .field(Field::new("name", FieldType::String).required())
                    .field(Field::new("region", FieldType::String).default_value("eu"))
                    .field(Field::new("source", FieldType::String))
                    .output("url", "https://${name}.${region}/")
                    .build()
                    .expect("schema should build"),
            )
            .expect("register")
            .build();
        Composer::new(registry, EngineConfig { mode })
    }

    #[test]
    fn instantiate_applies_defaults() {
        let instance = composer(ValidationMode::Strict)
            .instantiate(&ModuleRequest::new("logs", "bucket").with("name", "logs"))
            .expect("should validate");
        assert_eq!(instance.value("region"), Some(&"eu".into()));
        assert_eq!(instance.output("url"), Some(&Value::from("https://logs.eu/")));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = composer(ValidationMode::Strict)
            .instantiate(&ModuleRequest::new("x", "queue"))
            .unwrap_err();
        assert!(matches!(err, TesseraError::UnknownKind { .. }), "got: {err}");
    }

    #[test]
    fn instantiate_all_collects_every_failure() {
        let requests = vec![
            ModuleRequest::new("a", "bucket"),
            ModuleRequest::new("b", "bucket").with("name", "b"),
            ModuleRequest::new("c", "bucket").with("name", 3.0),
        ];
        let err = composer(ValidationMode::Strict)
            .instantiate_all(&requests)
            .unwrap_err();
        let TesseraError::Validation { failures } = err else {
            panic!("expected validation error, got {err}");
        };
        let failed: Vec<&str> = failures.iter().map(|f| f.instance.as_str()).collect();
        assert_eq!(failed, vec!["a", "c"]);
    }

    #[test]
    fn mode_governs_unknown_fields() {
        let request = ModuleRequest::new("a", "bucket")
            .with("name", "a")
            .with("colour", "red");
        assert!(composer(ValidationMode::Lenient).instantiate(&request).is_ok());
        assert!(composer(ValidationMode::Strict).instantiate(&request).is_err());
    }

    #[test]
    fn compose_source_runs_pipeline() {
        let plan = composer(ValidationMode::Strict)
            .compose_source(
                r#"
MODULE mirror KIND bucket { name = "mirror" source = primary.url }
MODULE primary KIND bucket { name = "primary" }
"#,
            )
            .expect("should compose");
        let order: Vec<&str> = plan.order().map(|id| id.as_str()).collect();
        assert_eq!(order, vec!["primary", "mirror"]);
        let mirror = plan.get(&"mirror".into()).expect("mirror step");
        assert_eq!(mirror.value("source"), Some(&"https://primary.eu/".into()));
    }
}
