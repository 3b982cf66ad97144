//! Formatted output helpers for CLI commands.
//!
//! Renders violation reports, composition plans, and schema listings as
//! plain text, and plans as JSON.

use std::fmt::Write as _;

use serde_json::json;
use tessera_common::error::InstanceViolations;
use tessera_compose::plan::CompositionPlan;
use tessera_schema::registry::SchemaRegistry;
use tessera_schema::schema::ModuleSchema;

const RULE: &str = "\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}";

/// Lists every violation grouped by instance.
#[must_use]
pub fn render_failures(failures: &[InstanceViolations]) -> String {
    let mut out = String::new();
    for failure in failures {
        let _ = writeln!(
            out,
            "  \u{2717} {} ({} violation(s))",
            failure.instance,
            failure.violations.len()
        );
        for violation in &failure.violations {
            let _ = writeln!(out, "      {}: {}", violation.field, violation.message);
        }
    }
    out
}

/// Renders the application order with each step's values and outputs.
#[must_use]
pub fn render_plan(source: &str, plan: &CompositionPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Composition Plan for: {source}");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    for (position, step) in plan.steps().iter().enumerate() {
        let _ = writeln!(out, "  {}. {} ({})", position + 1, step.id(), step.kind());
        for (field, value) in step.values() {
            if value.as_literal().is_some_and(tessera_common::types::Value::is_null) {
                continue;
            }
            let _ = writeln!(out, "      {field} = {value}");
        }
        for (name, value) in step.outputs() {
            if !value.is_null() {
                let _ = writeln!(out, "      -> {name} = {value}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} module(s) will be applied.", plan.len());

    if !plan.references().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  References:");
        for reference in plan.references() {
            let _ = writeln!(
                out,
                "    {}.{} <- {}.{}",
                reference.consumer, reference.field, reference.producer, reference.output
            );
        }
    }
    out
}

/// Renders a plan as a JSON document.
#[must_use]
pub fn plan_json(plan: &CompositionPlan) -> serde_json::Value {
    let steps: Vec<serde_json::Value> = plan
        .steps()
        .iter()
        .map(|step| {
            let values: serde_json::Map<String, serde_json::Value> = step
                .values()
                .iter()
                .map(|(field, value)| {
                    let rendered = value
                        .as_literal()
                        .map_or_else(|| json!(value.to_string()), |literal| json!(literal));
                    (field.clone(), rendered)
                })
                .collect();
            json!({
                "id": step.id(),
                "kind": step.kind(),
                "values": values,
                "outputs": step.outputs(),
            })
        })
        .collect();

    json!({
        "steps": steps,
        "references": plan.references(),
    })
}

/// Lists every registered kind with its description.
#[must_use]
pub fn render_catalog(registry: &SchemaRegistry) -> String {
    let width = registry
        .kinds()
        .map(|kind| kind.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for schema in registry.schemas() {
        let _ = writeln!(
            out,
            "{:<width$}  {}",
            schema.kind().as_str(),
            schema.description().unwrap_or("")
        );
    }
    out
}

/// Describes one schema: its fields, rules, defaults, and outputs.
#[must_use]
pub fn render_schema(schema: &ModuleSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", schema.kind());
    if let Some(description) = schema.description() {
        let _ = writeln!(out, "  {description}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  Fields:");
    for field in schema.fields() {
        let mut line = format!("    {}: {}", field.name(), field.ty());
        if field.is_required() {
            line.push_str(" (required)");
        }
        if let Some(default) = field.default() {
            let _ = write!(line, " = {default}");
        }
        if let Some(rule) = field.rule() {
            let _ = write!(line, ", {}", rule.describe());
        }
        let _ = writeln!(out, "{line}");
        if let Some(description) = field.description() {
            let _ = writeln!(out, "        {description}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  Outputs:");
    for output in schema.outputs() {
        let _ = writeln!(out, "    {} = {}", output.name(), output.template().source());
    }
    out
}

#[cfg(test)]
mod tests {
    use tessera_common::config::EngineConfig;
    use tessera_common::error::ConstraintViolation;
    use tessera_common::types::FieldType;
    use tessera_schema::field::Field;
    use tessera_sdk::Composer;

    use super::*;

    fn plan() -> CompositionPlan {
        let registry = SchemaRegistry::builder()
            .register(
                ModuleSchema::builder("bucket")
                    .describe("Object storage bucket.")
                    .field(Field::new("name", FieldType::String).required())
                    .field(Field::new("source", FieldType::String))
                    .output("url", "https://${name}/")
                    .build()
                    .expect("schema should build"),
            )
            .expect("register")
            .build();
        Composer::new(registry, EngineConfig::strict())
            .compose_source(
                r#"
MODULE mirror KIND bucket { name = "mirror" source = primary.url }
MODULE primary KIND bucket { name = "primary" }
"#,
            )
            .expect("should compose")
    }

    #[test]
    fn failures_list_every_violation() {
        let text = render_failures(&[InstanceViolations {
            instance: "acr".into(),
            violations: vec![
                ConstraintViolation::new("name", "too short"),
                ConstraintViolation::new("sku", "not allowed"),
            ],
        }]);
        assert!(text.contains("acr (2 violation(s))"), "got: {text}");
        assert!(text.contains("name: too short"));
        assert!(text.contains("sku: not allowed"));
    }

    #[test]
    fn text_plan_lists_steps_in_order() {
        let text = render_plan("demo.tsr", &plan());
        let primary = text.find("1. primary").expect("primary listed first");
        let mirror = text.find("2. mirror").expect("mirror listed second");
        assert!(primary < mirror);
        assert!(text.contains("source = \"https://primary/\""), "got: {text}");
        assert!(text.contains("mirror.source <- primary.url"));
        assert!(text.contains("2 module(s)"));
    }

    #[test]
    fn json_plan_carries_values_and_references() {
        let doc = plan_json(&plan());
        assert_eq!(doc["steps"][0]["id"], "primary");
        assert_eq!(doc["steps"][1]["values"]["source"], "https://primary/");
        assert_eq!(doc["steps"][0]["outputs"]["url"], "https://primary/");
        assert_eq!(doc["references"][0]["producer"], "primary");
    }

    #[test]
    fn catalog_lists_builtin_kinds() {
        let registry = tessera_schema::catalog::builtin().expect("builtin");
        let text = render_catalog(registry);
        for kind in ["container-registry", "gateway", "managed-identity", "virtual-network"] {
            assert!(text.contains(kind), "missing {kind}: {text}");
        }
    }

    #[test]
    fn schema_description_shows_rules_and_outputs() {
        let registry = tessera_schema::catalog::builtin().expect("builtin");
        let schema = registry
            .get(&"container-registry".into())
            .expect("container-registry");
        let text = render_schema(schema);
        assert!(text.contains("sku: string = \"Standard\""), "got: {text}");
        assert!(text.contains("\"Premium\""));
        assert!(text.contains("login_server = ${name}.azurecr.io"));
    }
}
