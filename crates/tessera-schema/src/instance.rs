//! Module instances: concrete values bound to a schema.
//!
//! Instantiation is all-or-nothing. Either every declared field checks out
//! and an immutable [`ModuleInstance`] is returned, or the complete list of
//! violations is returned in field-declaration order.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tessera_common::config::ValidationMode;
use tessera_common::error::ConstraintViolation;
use tessera_common::types::{InstanceId, ModuleKind, Value};

use crate::constraint::Siblings;
use crate::schema::ModuleSchema;

/// Points at an output of another instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// Producer instance.
    pub instance: InstanceId,
    /// Output name declared by the producer's schema.
    pub output: String,
}

impl OutputRef {
    /// Creates a reference to `instance.output`.
    #[must_use]
    pub fn new(instance: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instance: InstanceId::new(instance),
            output: output.into(),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.output)
    }
}

/// A supplied field value: literal, or sourced from another instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A concrete value.
    Literal(Value),
    /// A value taken from a producer's output during resolution.
    Reference(OutputRef),
}

impl FieldValue {
    /// Returns the literal value, if this is not a reference.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Reference(_) => None,
        }
    }

    /// Returns the reference, if this is one.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&OutputRef> {
        match self {
            Self::Reference(r) => Some(r),
            Self::Literal(_) => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Literal(Value::Number(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

impl From<OutputRef> for FieldValue {
    fn from(value: OutputRef) -> Self {
        Self::Reference(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Reference(r) => write!(f, "{r}"),
        }
    }
}

/// Field values keyed by field name, in order.
pub type FieldValues = IndexMap<String, FieldValue>;

impl Siblings for FieldValues {
    fn is_present(&self, field: &str) -> bool {
        match self.get(field) {
            Some(FieldValue::Literal(v)) => !v.is_null(),
            Some(FieldValue::Reference(_)) => true,
            None => false,
        }
    }
}

/// A driver's request to create one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRequest {
    /// Identifier of the instance to create.
    pub id: InstanceId,
    /// Requested module kind.
    pub kind: ModuleKind,
    /// Supplied values, in the order the driver gave them.
    pub values: FieldValues,
}

impl ModuleRequest {
    /// Creates a request with no supplied values.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(id),
            kind: ModuleKind::new(kind),
            values: IndexMap::new(),
        }
    }

    /// Supplies a value for `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let _ = self.values.insert(field.into(), value.into());
        self
    }
}

/// A validated, immutable set of field and output values.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    id: InstanceId,
    schema: Arc<ModuleSchema>,
    values: FieldValues,
    outputs: IndexMap<String, Value>,
}

impl PartialEq for ModuleInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.schema.kind() == other.schema.kind()
            && self.values == other.values
            && self.outputs == other.outputs
    }
}

impl ModuleInstance {
    /// Instance identifier.
    #[must_use]
    pub const fn id(&self) -> &InstanceId {
        &self.id
    }

    /// Module kind.
    #[must_use]
    pub fn kind(&self) -> &ModuleKind {
        self.schema.kind()
    }

    /// Schema this instance was validated against.
    #[must_use]
    pub const fn schema(&self) -> &Arc<ModuleSchema> {
        &self.schema
    }

    /// Every declared field's value, in declaration order.
    #[must_use]
    pub const fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Value of one field.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Rendered outputs, in declaration order.
    #[must_use]
    pub const fn outputs(&self) -> &IndexMap<String, Value> {
        &self.outputs
    }

    /// Value of one output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Fields whose values come from other instances.
    pub fn references(&self) -> impl Iterator<Item = (&str, &OutputRef)> {
        self.values
            .iter()
            .filter_map(|(field, value)| value.as_reference().map(|r| (field.as_str(), r)))
    }

    /// Whether every field holds a literal value.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.references().next().is_none()
    }

    /// Builds a new instance with reference fields replaced by literals.
    ///
    /// Each substituted value is checked against its field exactly as a
    /// supplied literal would be. `self` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the violation for the first substitution that does not fit
    /// its field, or that targets a field not holding a reference.
    pub fn substitute(
        &self,
        substitutions: &IndexMap<String, Value>,
    ) -> Result<Self, ConstraintViolation> {
        let mut values = self.values.clone();
        for (field_name, value) in substitutions {
            let Some(field) = self.schema.field(field_name) else {
                return Err(ConstraintViolation::new(field_name, "field is not declared"));
            };
            if self.values.get(field_name).and_then(FieldValue::as_reference).is_none() {
                return Err(ConstraintViolation::new(
                    field_name,
                    "field does not hold a reference",
                ));
            }
            field.check(value, &self.values)?;
            let _ = values.insert(field_name.clone(), FieldValue::Literal(value.clone()));
        }
        Ok(Self {
            id: self.id.clone(),
            schema: Arc::clone(&self.schema),
            values,
            outputs: self.outputs.clone(),
        })
    }
}

/// Validates `supplied` against `schema` and builds an instance.
///
/// For every declared field: an omitted field takes its default, an omitted
/// required field without default is a violation, and a supplied literal is
/// type- and constraint-checked. Reference values are checked later, when
/// the resolver substitutes them. Undeclared fields are violations in
/// [`ValidationMode::Strict`] and ignored otherwise.
///
/// # Errors
///
/// Returns every violation found, in field-declaration order followed by
/// undeclared fields in supplied order.
pub fn instantiate(
    schema: &Arc<ModuleSchema>,
    id: InstanceId,
    supplied: &FieldValues,
    mode: ValidationMode,
) -> Result<ModuleInstance, Vec<ConstraintViolation>> {
    let mut values = FieldValues::new();
    for field in schema.fields() {
        let value = match supplied.get(field.name()) {
            Some(v) => v.clone(),
            None => FieldValue::Literal(field.default().cloned().unwrap_or(Value::Null)),
        };
        let _ = values.insert(field.name().to_owned(), value);
    }

    let mut violations = Vec::new();
    for field in schema.fields() {
        let name = field.name();
        let omitted = !supplied.contains_key(name);
        match values.get(name) {
            Some(FieldValue::Literal(Value::Null))
                if omitted && field.is_required() && field.default().is_none() =>
            {
                violations.push(ConstraintViolation::new(name, "missing required field"));
            }
            Some(FieldValue::Literal(v)) => {
                if let Err(violation) = field.check(v, &values) {
                    violations.push(violation);
                }
            }
            Some(FieldValue::Reference(r)) => {
                if let Some(output) = schema.outputs_reading(name).next() {
                    violations.push(ConstraintViolation::new(
                        name,
                        format!("feeds output `{output}` and must be a literal, not a reference to {r}"),
                    ));
                }
            }
            None => {}
        }
    }

    for name in supplied.keys() {
        if schema.field(name).is_none() {
            match mode {
                ValidationMode::Strict => violations.push(ConstraintViolation::new(
                    name,
                    format!("not declared by module kind `{}`", schema.kind()),
                )),
                ValidationMode::Lenient => {
                    tracing::warn!(instance = %id, field = %name, "ignoring undeclared field");
                }
            }
        }
    }

    if !violations.is_empty() {
        tracing::debug!(instance = %id, count = violations.len(), "instantiation rejected");
        return Err(violations);
    }

    let outputs = schema
        .outputs()
        .map(|decl| {
            let rendered = decl
                .template()
                .render(|f| values.get(f).and_then(FieldValue::as_literal));
            (decl.name().to_owned(), rendered)
        })
        .collect();

    tracing::debug!(instance = %id, kind = %schema.kind(), "instance validated");
    Ok(ModuleInstance {
        id,
        schema: Arc::clone(schema),
        values,
        outputs,
    })
}
