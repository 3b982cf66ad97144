//! Field-level constraint evaluation.
//!
//! Every check here is a pure function of the value, the constraint, and a
//! read-only view of sibling field presence. Type checking always happens
//! first; a constraint never sees a value of the wrong shape.

use regex::Regex;
use tessera_common::error::ConstraintViolation;
use tessera_common::types::{FieldType, Value};

/// Read-only view of which sibling fields carry a value.
///
/// Used by presence-dependent allowed sets, e.g. an identity type whose
/// valid choices depend on whether identity IDs were supplied.
pub trait Siblings {
    /// Returns `true` if `field` is supplied (or defaulted) with a non-null value.
    fn is_present(&self, field: &str) -> bool;
}

/// Sibling view where no field is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSiblings;

impl Siblings for NoSiblings {
    fn is_present(&self, _field: &str) -> bool {
        false
    }
}

/// A compiled full-match regular expression with its failure message.
#[derive(Debug, Clone)]
pub struct PatternRule {
    source: String,
    regex: Regex,
    message: String,
}

impl PatternRule {
    /// Compiles `pattern` so that it must match the entire value.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error if `pattern` is invalid.
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            source: pattern.to_owned(),
            regex,
            message: message.into(),
        })
    }

    /// The pattern as written, without anchors.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// The human-readable failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Allowed values for a nullable enumerated field.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedSet {
    /// A fixed set.
    Fixed(Vec<Value>),
    /// A set chosen by whether another field is present.
    DependsOnPresence {
        /// Field whose presence selects the set.
        field: String,
        /// Allowed values when `field` is present.
        when_present: Vec<Value>,
        /// Allowed values when `field` is absent.
        when_absent: Vec<Value>,
    },
}

impl AllowedSet {
    /// Selects the concrete allowed values given sibling presence.
    #[must_use]
    pub fn select(&self, siblings: &dyn Siblings) -> &[Value] {
        match self {
            Self::Fixed(values) => values.as_slice(),
            Self::DependsOnPresence {
                field,
                when_present,
                when_absent,
            } => {
                if siblings.is_present(field) {
                    when_present.as_slice()
                } else {
                    when_absent.as_slice()
                }
            }
        }
    }

    /// Every value this set can ever allow.
    pub fn all_values(&self) -> impl Iterator<Item = &Value> {
        let (a, b): (&[Value], &[Value]) = match self {
            Self::Fixed(values) => (values.as_slice(), &[]),
            Self::DependsOnPresence {
                when_present,
                when_absent,
                ..
            } => (when_present.as_slice(), when_absent.as_slice()),
        };
        a.iter().chain(b)
    }
}

/// A declared rule for a single field.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// String value must fully match a regex.
    Pattern(PatternRule),
    /// Value must equal one of an ordered set (case-sensitive).
    OneOf(Vec<Value>),
    /// Number must lie within an inclusive range.
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Value may be null, otherwise must be a member of the allowed set.
    NullableOneOf(AllowedSet),
}

impl Constraint {
    /// Builds a full-match regex constraint.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error if `pattern` is invalid.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        PatternRule::new(pattern, message).map(Self::Pattern)
    }

    /// Builds an enumerated-membership constraint over strings.
    #[must_use]
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(values.into_iter().map(|v| Value::String(v.into())).collect())
    }

    /// Builds an inclusive numeric range constraint.
    #[must_use]
    pub const fn range(min: f64, max: f64) -> Self {
        Self::Range { min, max }
    }

    /// Whether this constraint accepts a null value.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::NullableOneOf(_))
    }

    /// One-line description for schema listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Pattern(rule) => format!("matches /{}/", rule.pattern()),
            Self::OneOf(values) => format!("one of {}", render_set(values)),
            Self::Range { min, max } => format!("between {min} and {max}"),
            Self::NullableOneOf(AllowedSet::Fixed(values)) => {
                format!("null or one of {}", render_set(values))
            }
            Self::NullableOneOf(AllowedSet::DependsOnPresence {
                field,
                when_present,
                when_absent,
            }) => format!(
                "null or one of {} when `{field}` is set, otherwise {}",
                render_set(when_present),
                render_set(when_absent)
            ),
        }
    }
}

/// Renders an allowed set as `["a", "b"]`.
#[must_use]
pub fn render_set(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Checks that a non-null `value` has the declared type.
///
/// # Errors
///
/// Returns a violation naming the expected and actual types.
pub fn check_type(field: &str, ty: FieldType, value: &Value) -> Result<(), ConstraintViolation> {
    if ty.accepts(value) {
        Ok(())
    } else {
        Err(ConstraintViolation::new(
            field,
            format!("expected {ty}, got {}", value.type_name()),
        ))
    }
}

/// Validates `value` against `constraint`.
///
/// Assumes the type check already passed for non-null values; the regex and
/// range arms still refuse values of the wrong shape rather than coercing.
///
/// # Errors
///
/// Returns a [`ConstraintViolation`] describing the first rule that failed.
pub fn validate(
    field: &str,
    value: &Value,
    constraint: &Constraint,
    siblings: &dyn Siblings,
) -> Result<(), ConstraintViolation> {
    match constraint {
        Constraint::Pattern(rule) => match value.as_str() {
            Some(s) if rule.is_match(s) => Ok(()),
            Some(_) => Err(ConstraintViolation::new(field, rule.message())),
            None => Err(ConstraintViolation::new(
                field,
                format!("pattern requires a string, got {}", value.type_name()),
            )),
        },
        Constraint::OneOf(allowed) => check_membership(field, value, allowed),
        Constraint::Range { min, max } => match value.as_number() {
            Some(n) if n >= *min && n <= *max => Ok(()),
            Some(n) => Err(ConstraintViolation::new(
                field,
                format!("{n} is outside the range [{min}, {max}]"),
            )),
            None => Err(ConstraintViolation::new(
                field,
                format!("range requires a number, got {}", value.type_name()),
            )),
        },
        Constraint::NullableOneOf(set) => {
            if value.is_null() {
                Ok(())
            } else {
                check_membership(field, value, set.select(siblings))
            }
        }
    }
}

fn check_membership(
    field: &str,
    value: &Value,
    allowed: &[Value],
) -> Result<(), ConstraintViolation> {
    if allowed.contains(value) {
        Ok(())
    } else {
        Err(ConstraintViolation::new(
            field,
            format!("{value} is not one of {}", render_set(allowed)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct Present(HashSet<&'static str>);

    impl Siblings for Present {
        fn is_present(&self, field: &str) -> bool {
            self.0.contains(field)
        }
    }

    fn sku() -> Constraint {
        Constraint::one_of(["Basic", "Standard", "Premium"])
    }

    #[test]
    fn pattern_requires_full_match() {
        let c = Constraint::pattern("[a-z]+", "lowercase letters only").expect("valid regex");
        assert!(validate("name", &Value::from("abc"), &c, &NoSiblings).is_ok());
        let err = validate("name", &Value::from("abc1"), &c, &NoSiblings).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.message, "lowercase letters only");
    }

    #[test]
    fn pattern_alternation_is_anchored_as_a_whole() {
        let c = Constraint::pattern("a|b", "a or b").expect("valid regex");
        assert!(validate("x", &Value::from("a"), &c, &NoSiblings).is_ok());
        assert!(validate("x", &Value::from("ab"), &c, &NoSiblings).is_err());
    }

    #[test]
    fn pattern_never_runs_on_non_strings() {
        let c = Constraint::pattern(".*", "anything").expect("valid regex");
        let err = validate("x", &Value::Number(3.0), &c, &NoSiblings).unwrap_err();
        assert!(err.message.contains("requires a string"), "got: {}", err.message);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(Constraint::pattern("(unclosed", "msg").is_err());
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let err = validate("sku", &Value::from("Ultra"), &sku(), &NoSiblings).unwrap_err();
        assert_eq!(err.field, "sku");
        for allowed in ["\"Basic\"", "\"Standard\"", "\"Premium\""] {
            assert!(err.message.contains(allowed), "got: {}", err.message);
        }
    }

    #[test]
    fn one_of_is_case_sensitive() {
        assert!(validate("sku", &Value::from("Premium"), &sku(), &NoSiblings).is_ok());
        assert!(validate("sku", &Value::from("premium"), &sku(), &NoSiblings).is_err());
    }

    #[test]
    fn range_is_inclusive() {
        let c = Constraint::range(1.0, 10.0);
        assert!(validate("n", &Value::Number(1.0), &c, &NoSiblings).is_ok());
        assert!(validate("n", &Value::Number(10.0), &c, &NoSiblings).is_ok());
        assert!(validate("n", &Value::Number(10.5), &c, &NoSiblings).is_err());
        assert!(validate("n", &Value::Number(f64::NAN), &c, &NoSiblings).is_err());
        assert!(validate("n", &Value::from("5"), &c, &NoSiblings).is_err());
    }

    #[test]
    fn nullable_one_of_accepts_null() {
        let c = Constraint::NullableOneOf(AllowedSet::Fixed(vec![Value::from("A")]));
        assert!(validate("t", &Value::Null, &c, &NoSiblings).is_ok());
        assert!(validate("t", &Value::from("A"), &c, &NoSiblings).is_ok());
        assert!(validate("t", &Value::from("B"), &c, &NoSiblings).is_err());
    }

    #[test]
    fn nullable_one_of_follows_sibling_presence() {
        let c = Constraint::NullableOneOf(AllowedSet::DependsOnPresence {
            field: "identity_id".into(),
            when_present: vec![Value::from("UserAssigned")],
            when_absent: vec![Value::from("SystemAssigned")],
        });
        let with = Present(HashSet::from(["identity_id"]));
        let without = Present(HashSet::new());
        assert!(validate("t", &Value::from("UserAssigned"), &c, &with).is_ok());
        assert!(validate("t", &Value::from("UserAssigned"), &c, &without).is_err());
        assert!(validate("t", &Value::from("SystemAssigned"), &c, &without).is_ok());
        assert!(validate("t", &Value::Null, &c, &with).is_ok());
    }

    #[test]
    fn type_check_names_both_types() {
        let err = check_type("capacity", FieldType::Number, &Value::from("two")).unwrap_err();
        assert_eq!(err.message, "expected number, got string");
    }

    #[test]
    fn describe_renders_each_kind() {
        assert_eq!(sku().describe(), "one of [\"Basic\", \"Standard\", \"Premium\"]");
        assert_eq!(Constraint::range(0.0, 365.0).describe(), "between 0 and 365");
    }
}
