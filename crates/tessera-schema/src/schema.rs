//! Module schemas: the configuration surface of one module kind.
//!
//! A schema is immutable once [`SchemaBuilder::build`] returns. Every
//! inconsistency in a definition is reported there, never per instance.

use std::collections::HashSet;

use indexmap::IndexMap;
use tessera_common::constants::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};
use tessera_common::error::{Result, TesseraError};
use tessera_common::types::{FieldType, ModuleKind, Value};

use crate::constraint::{AllowedSet, Constraint, Siblings};
use crate::field::Field;

/// One piece of an output template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim.
    Text(String),
    /// Value of the named field.
    Field(String),
}

/// An output value rendered from `${field}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl OutputTemplate {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for unterminated or empty placeholders.
    pub fn parse(source: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_owned()));
            }
            let after = &rest[start + PLACEHOLDER_OPEN.len()..];
            let end = after
                .find(PLACEHOLDER_CLOSE)
                .ok_or_else(|| format!("unterminated placeholder in \"{source}\""))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(format!("empty placeholder in \"{source}\""));
            }
            segments.push(Segment::Field(name.to_owned()));
            rest = &after[end + PLACEHOLDER_CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_owned()));
        }
        Ok(Self {
            source: source.to_owned(),
            segments,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the fields this template reads.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Renders the template. Yields [`Value::Null`] if any placeholder field
    /// has no value.
    pub fn render<'a>(&self, lookup: impl Fn(&str) -> Option<&'a Value>) -> Value {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => match lookup(name) {
                    Some(v) if !v.is_null() => out.push_str(&v.to_plain_string()),
                    _ => return Value::Null,
                },
            }
        }
        Value::String(out)
    }
}

/// An output exposed to other instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecl {
    name: String,
    template: OutputTemplate,
    description: Option<String>,
}

impl OutputDecl {
    /// Output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template the value is rendered from.
    #[must_use]
    pub const fn template(&self) -> &OutputTemplate {
        &self.template
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// The configuration surface of one module kind.
#[derive(Debug, Clone)]
pub struct ModuleSchema {
    kind: ModuleKind,
    description: Option<String>,
    fields: IndexMap<String, Field>,
    outputs: IndexMap<String, OutputDecl>,
}

impl ModuleSchema {
    /// Starts a schema definition.
    #[must_use]
    pub fn builder(kind: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            kind: kind.into(),
            description: None,
            fields: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Module kind.
    #[must_use]
    pub const fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Declared outputs in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputDecl> {
        self.outputs.values()
    }

    /// Looks up an output declaration by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputDecl> {
        self.outputs.get(name)
    }

    /// Names of the outputs whose templates read `field`.
    pub fn outputs_reading<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> {
        self.outputs
            .values()
            .filter(move |o| o.template.fields().any(|f| f == field))
            .map(OutputDecl::name)
    }
}

/// Builder for [`ModuleSchema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    kind: String,
    description: Option<String>,
    fields: Vec<Field>,
    outputs: Vec<(String, String, Option<String>)>,
}

impl SchemaBuilder {
    /// Sets the schema description.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares an output rendered from `template`.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.outputs.push((name.into(), template.into(), None));
        self
    }

    /// Declares a documented output rendered from `template`.
    #[must_use]
    pub fn output_described(
        mut self,
        name: impl Into<String>,
        template: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.outputs
            .push((name.into(), template.into(), Some(description.into())));
        self
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Schema`] for duplicate names, invalid patterns,
    /// constraints that do not fit the field type, presence conditions or
    /// templates naming unknown fields, and defaults that fail their own
    /// field's checks.
    pub fn build(self) -> Result<ModuleSchema> {
        let kind = self.kind;
        let fail = |message: String| TesseraError::Schema {
            kind: kind.clone(),
            message,
        };

        if kind.trim().is_empty() {
            return Err(fail("module kind must not be empty".into()));
        }

        let mut fields = IndexMap::new();
        for field in self.fields {
            if let Some(defect) = field.defect() {
                return Err(fail(defect.to_owned()));
            }
            let name = field.name().to_owned();
            if fields.insert(name.clone(), field).is_some() {
                return Err(fail(format!("duplicate field `{name}`")));
            }
        }

        for field in fields.values() {
            check_constraint_fits(field, &fields).map_err(&fail)?;
        }

        let defaults = DefaultsView(&fields);
        for field in fields.values() {
            if let Some(default) = field.default() {
                field
                    .check(default, &defaults)
                    .map_err(|v| fail(format!("default for `{}` is invalid: {}", v.field, v.message)))?;
            }
        }

        let mut outputs = IndexMap::new();
        for (name, source, description) in self.outputs {
            let template = OutputTemplate::parse(&source).map_err(&fail)?;
            if let Some(unknown) = template.fields().find(|f| !fields.contains_key(*f)) {
                return Err(fail(format!(
                    "output `{name}` reads undeclared field `{unknown}`"
                )));
            }
            let decl = OutputDecl {
                name: name.clone(),
                template,
                description,
            };
            if outputs.insert(name.clone(), decl).is_some() {
                return Err(fail(format!("duplicate output `{name}`")));
            }
        }

        tracing::debug!(
            kind = %kind,
            fields = fields.len(),
            outputs = outputs.len(),
            "schema built"
        );

        Ok(ModuleSchema {
            kind: ModuleKind::new(kind),
            description: self.description,
            fields,
            outputs,
        })
    }
}

/// Presence as seen through schema defaults, used to check defaults.
struct DefaultsView<'a>(&'a IndexMap<String, Field>);

impl Siblings for DefaultsView<'_> {
    fn is_present(&self, field: &str) -> bool {
        self.0
            .get(field)
            .and_then(Field::default)
            .is_some_and(|v| !v.is_null())
    }
}

fn check_constraint_fits(
    field: &Field,
    fields: &IndexMap<String, Field>,
) -> std::result::Result<(), String> {
    let name = field.name();
    let ty = field.ty();
    let enumerable = matches!(ty, FieldType::String | FieldType::Number | FieldType::Bool);

    match field.rule() {
        None => Ok(()),
        Some(Constraint::Pattern(_)) if ty != FieldType::String => Err(format!(
            "pattern constraint on `{name}` requires a string field, found {ty}"
        )),
        Some(Constraint::Range { .. }) if ty != FieldType::Number => Err(format!(
            "range constraint on `{name}` requires a number field, found {ty}"
        )),
        Some(Constraint::Range { min, max }) if !(min <= max) => {
            Err(format!("range on `{name}` has min {min} above max {max}"))
        }
        Some(Constraint::OneOf(values)) => {
            check_allowed(name, ty, enumerable, values.iter())?;
            if values.is_empty() {
                return Err(format!("enumeration on `{name}` allows nothing"));
            }
            Ok(())
        }
        Some(Constraint::NullableOneOf(set)) => {
            check_allowed(name, ty, enumerable, set.all_values())?;
            if let AllowedSet::DependsOnPresence { field: other, .. } = set {
                if other == name {
                    return Err(format!("`{name}` cannot depend on its own presence"));
                }
                if !fields.contains_key(other) {
                    return Err(format!("`{name}` depends on undeclared field `{other}`"));
                }
            }
            Ok(())
        }
        Some(_) => Ok(()),
    }
}

fn check_allowed<'a>(
    name: &str,
    ty: FieldType,
    enumerable: bool,
    mut values: impl Iterator<Item = &'a Value>,
) -> std::result::Result<(), String> {
    if !enumerable {
        return Err(format!(
            "enumeration on `{name}` requires a string, number, or boolean field, found {ty}"
        ));
    }
    match values.find(|v| !ty.accepts(v)) {
        Some(bad) => Err(format!(
            "allowed value {bad} for `{name}` is not a {ty}"
        )),
        None => Ok(()),
    }
}
