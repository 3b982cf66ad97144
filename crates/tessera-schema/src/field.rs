//! Schema field declarations.

use tessera_common::error::ConstraintViolation;
use tessera_common::types::{FieldType, Value};

use crate::constraint::{self, Constraint, Siblings};

/// A named, typed, optionally constrained configuration value.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    constraint: Option<Constraint>,
    required: bool,
    description: Option<String>,
    defect: Option<String>,
}

impl Field {
    /// Creates an optional field with no default and no constraint.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            constraint: None,
            required: false,
            description: None,
            defect: None,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default used when an instance omits the field.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attaches a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Attaches a full-match regex constraint.
    ///
    /// An invalid pattern is remembered and reported when the owning schema
    /// is built.
    #[must_use]
    pub fn pattern(mut self, pattern: &str, message: impl Into<String>) -> Self {
        match Constraint::pattern(pattern, message) {
            Ok(c) => self.constraint = Some(c),
            Err(e) => self.defect = Some(format!("invalid pattern for `{}`: {e}", self.name)),
        }
        self
    }

    /// Sets a human-readable description.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn ty(&self) -> FieldType {
        self.ty
    }

    /// Default value, if any.
    #[must_use]
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Constraint, if any.
    #[must_use]
    pub const fn rule(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// Whether instances must supply a value when no default exists.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn defect(&self) -> Option<&str> {
        self.defect.as_deref()
    }

    /// Checks a concrete value: null handling, then type, then constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check(&self, value: &Value, siblings: &dyn Siblings) -> Result<(), ConstraintViolation> {
        if value.is_null() {
            if self.required {
                return Err(ConstraintViolation::new(&self.name, "must not be null"));
            }
            return Ok(());
        }
        constraint::check_type(&self.name, self.ty, value)?;
        match &self.constraint {
            Some(c) => constraint::validate(&self.name, value, c, siblings),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::NoSiblings;

    #[test]
    fn required_field_rejects_null() {
        let field = Field::new("name", FieldType::String).required();
        let err = field.check(&Value::Null, &NoSiblings).unwrap_err();
        assert_eq!(err.message, "must not be null");
    }

    #[test]
    fn optional_field_accepts_null() {
        let field = Field::new("tags", FieldType::StringMap);
        assert!(field.check(&Value::Null, &NoSiblings).is_ok());
    }

    #[test]
    fn type_mismatch_precedes_constraint() {
        let field = Field::new("name", FieldType::String).pattern("[a-z]+", "lowercase only");
        let err = field.check(&Value::Number(1.0), &NoSiblings).unwrap_err();
        assert_eq!(err.message, "expected string, got number");
    }

    #[test]
    fn invalid_pattern_is_recorded_as_defect() {
        let field = Field::new("name", FieldType::String).pattern("[", "broken");
        assert!(field.defect().is_some());
        assert!(field.rule().is_none());
    }
}
