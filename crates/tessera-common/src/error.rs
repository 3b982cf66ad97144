//! Unified error types for the Tessera workspace.
//!
//! The three diagnostic kinds surfaced to a driver (constraint violations,
//! resolution errors, composition errors) are plain structs so callers can
//! inspect them; [`TesseraError`] wraps them for `?` propagation.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::InstanceId;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("field `{field}`: {message}")]
pub struct ConstraintViolation {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ConstraintViolation {
    /// Creates a violation for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All violations found for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceViolations {
    /// Instance that failed to validate.
    pub instance: InstanceId,
    /// Every violation, in field-declaration order.
    pub violations: Vec<ConstraintViolation>,
}

/// Why a reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum ResolutionReason {
    /// The referenced producer instance is not part of the composition.
    UnknownProducer,
    /// The producer's schema does not declare the referenced output.
    UnknownOutput,
    /// The output is declared but has no value, because a field it reads is unset.
    UnsetOutput,
    /// The producer's output does not satisfy the consumer field.
    RejectedValue(String),
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProducer => write!(f, "unknown-producer"),
            Self::UnknownOutput => write!(f, "unknown-output"),
            Self::UnsetOutput => write!(f, "unset-output"),
            Self::RejectedValue(msg) => write!(f, "rejected-value ({msg})"),
        }
    }
}

/// A reference naming an instance or output that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{consumer}.{field} -> {producer}.{output}: {reason}")]
pub struct ResolutionError {
    /// Instance holding the reference.
    pub consumer: InstanceId,
    /// Field holding the reference.
    pub field: String,
    /// Referenced producer instance.
    pub producer: InstanceId,
    /// Referenced output name.
    pub output: String,
    /// Failure reason.
    pub reason: ResolutionReason,
}

/// A dependency cycle between instances.
///
/// `cycle` is a closed walk along dependency edges: each instance depends on
/// the next, and the last depends on the first. Every member of the cyclic
/// group appears at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("dependency cycle: {}", render_cycle(.cycle))]
pub struct CompositionError {
    /// Instances in the cycle, starting from the lexically-first identifier.
    pub cycle: Vec<InstanceId>,
}

fn render_cycle(cycle: &[InstanceId]) -> String {
    let mut names: Vec<&str> = cycle.iter().map(InstanceId::as_str).collect();
    if let Some(first) = names.first().copied() {
        names.push(first);
    }
    names.join(" -> ")
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Composition source text could not be parsed.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the syntax error.
        message: String,
    },

    /// A schema definition is inconsistent. This is a programmer error.
    #[error("invalid schema `{kind}`: {message}")]
    Schema {
        /// Kind of the offending schema.
        kind: String,
        /// Description of the inconsistency.
        message: String,
    },

    /// No schema is registered for the requested module kind.
    #[error("unknown module kind `{kind}` for instance `{instance}`")]
    UnknownKind {
        /// Instance that requested the kind.
        instance: InstanceId,
        /// Requested kind.
        kind: String,
    },

    /// Two instances share an identifier.
    #[error("duplicate instance identifier `{id}`")]
    DuplicateInstance {
        /// The duplicated identifier.
        id: InstanceId,
    },

    /// One or more instances failed validation.
    #[error("{} instance(s) failed validation", failures.len())]
    Validation {
        /// Per-instance violations, in declaration order.
        failures: Vec<InstanceViolations>,
    },

    /// A reference could not be resolved.
    #[error("unresolved reference {0}")]
    Resolution(#[from] ResolutionError),

    /// The dependency graph is cyclic.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TesseraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_closes_the_loop() {
        let err = CompositionError {
            cycle: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a");
    }

    #[test]
    fn resolution_message_names_both_ends() {
        let err = ResolutionError {
            consumer: "registry".into(),
            field: "trusted_issuer_url".into(),
            producer: "identity".into(),
            output: "oidc_issuer_url".into(),
            reason: ResolutionReason::UnknownOutput,
        };
        let msg = err.to_string();
        assert!(msg.contains("registry.trusted_issuer_url"), "got: {msg}");
        assert!(msg.contains("unknown-output"), "got: {msg}");
    }

    #[test]
    fn violation_message_names_field() {
        let v = ConstraintViolation::new("sku", "must be one of [\"Basic\"]");
        assert_eq!(v.to_string(), "field `sku`: must be one of [\"Basic\"]");
    }

    #[test]
    fn validation_error_counts_instances() {
        let err = TesseraError::Validation {
            failures: vec![InstanceViolations {
                instance: "x".into(),
                violations: vec![ConstraintViolation::new("a", "bad")],
            }],
        };
        assert_eq!(err.to_string(), "1 instance(s) failed validation");
    }
}
