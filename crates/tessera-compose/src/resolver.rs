//! Cross-instance reference resolution.
//!
//! Every reference field is replaced by the producer's output value, and
//! each reference becomes an edge in the [`DependencyGraph`]. Outputs are
//! fixed at instantiation, so the scan order never changes the result.

use std::collections::HashMap;

use indexmap::IndexMap;
use tessera_common::error::{ResolutionError, ResolutionReason, Result, TesseraError};
use tessera_common::types::{InstanceId, Value};
use tessera_schema::instance::{ModuleInstance, OutputRef};

use crate::graph::DependencyGraph;

/// One resolved reference: `consumer.field` took `producer.output`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Reference {
    /// Instance holding the reference.
    pub consumer: InstanceId,
    /// Field that received the value.
    pub field: String,
    /// Instance exposing the output.
    pub producer: InstanceId,
    /// Output name.
    pub output: String,
}

/// Resolves every reference among `instances` and builds the dependency graph.
///
/// Instances keep their declaration order as graph node order.
///
/// # Errors
///
/// Returns [`TesseraError::DuplicateInstance`] if two instances share an id,
/// or [`TesseraError::Resolution`] for the first reference (in declaration
/// order) naming a missing producer or output, an output with no value, or
/// a value the consumer field rejects.
pub fn resolve(instances: Vec<ModuleInstance>) -> Result<DependencyGraph> {
    tracing::info!(instances = instances.len(), "resolving references");

    let mut by_id: HashMap<&InstanceId, usize> = HashMap::new();
    for (idx, instance) in instances.iter().enumerate() {
        if by_id.insert(instance.id(), idx).is_some() {
            return Err(TesseraError::DuplicateInstance {
                id: instance.id().clone(),
            });
        }
    }

    let mut resolved = Vec::with_capacity(instances.len());
    let mut edges = Vec::new();
    for instance in &instances {
        let mut substitutions = IndexMap::new();
        for (field, target) in instance.references() {
            let producer = by_id
                .get(&target.instance)
                .map(|&idx| &instances[idx])
                .ok_or_else(|| failure(instance, field, target, ResolutionReason::UnknownProducer))?;
            let value = lookup_output(producer, target)
                .ok_or_else(|| failure(instance, field, target, ResolutionReason::UnknownOutput))?;
            if value.is_null() {
                return Err(failure(instance, field, target, ResolutionReason::UnsetOutput));
            }
            if let Some(declared) = instance.schema().field(field) {
                declared.check(value, instance.values()).map_err(|violation| {
                    failure(
                        instance,
                        field,
                        target,
                        ResolutionReason::RejectedValue(violation.message),
                    )
                })?;
            }
            tracing::debug!(
                consumer = %instance.id(),
                field,
                producer = %target.instance,
                output = %target.output,
                "reference resolved"
            );
            let _ = substitutions.insert(field.to_owned(), value.clone());
            edges.push(Reference {
                consumer: instance.id().clone(),
                field: field.to_owned(),
                producer: target.instance.clone(),
                output: target.output.clone(),
            });
        }

        let next = if substitutions.is_empty() {
            instance.clone()
        } else {
            instance
                .substitute(&substitutions)
                .map_err(|violation| TesseraError::Config {
                    message: violation.to_string(),
                })?
        };
        resolved.push(next);
    }

    let mut graph = DependencyGraph::new();
    let mut nodes = HashMap::new();
    for instance in resolved {
        let id = instance.id().clone();
        let node = graph.add_instance(instance);
        let _ = nodes.insert(id, node);
    }
    for reference in edges {
        if let (Some(&dependent), Some(&dependency)) =
            (nodes.get(&reference.consumer), nodes.get(&reference.producer))
        {
            graph.add_dependency(dependent, dependency, reference);
        }
    }

    Ok(graph)
}

/// The producer's value for a declared output. Declared-ness is checked
/// against the schema, not against whatever the instance happens to hold.
fn lookup_output<'a>(producer: &'a ModuleInstance, target: &OutputRef) -> Option<&'a Value> {
    if producer.schema().output(&target.output).is_none() {
        return None;
    }
    producer.output(&target.output)
}

fn failure(
    consumer: &ModuleInstance,
    field: &str,
    target: &OutputRef,
    reason: ResolutionReason,
) -> TesseraError {
    TesseraError::Resolution(ResolutionError {
        consumer: consumer.id().clone(),
        field: field.to_owned(),
        producer: target.instance.clone(),
        output: target.output.clone(),
        reason,
    })
}
