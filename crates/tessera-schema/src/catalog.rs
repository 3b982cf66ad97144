//! Built-in module schemas.
//!
//! Covers a user-assigned managed identity with a federated credential, a
//! container registry, a virtual network with one subnet, and an
//! application gateway. The process-wide registry is built on first use and
//! never changes afterwards.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tessera_common::error::Result;
use tessera_common::types::{FieldType, Value};

use crate::constraint::{AllowedSet, Constraint};
use crate::field::Field;
use crate::registry::SchemaRegistry;
use crate::schema::ModuleSchema;

/// Kind of the managed identity module.
pub const MANAGED_IDENTITY: &str = "managed-identity";
/// Kind of the container registry module.
pub const CONTAINER_REGISTRY: &str = "container-registry";
/// Kind of the virtual network module.
pub const VIRTUAL_NETWORK: &str = "virtual-network";
/// Kind of the application gateway module.
pub const GATEWAY: &str = "gateway";

const UUID: &str =
    "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";
const HTTPS_URL: &str = r"https://\S+";
const CIDR: &str = r"(\d{1,3}\.){3}\d{1,3}/\d{1,2}";
const IDENTITY_ID: &str = "/subscriptions/[^/]+/resourceGroups/[^/]+/providers/Microsoft\\.ManagedIdentity/userAssignedIdentities/[^/]+";
const SUBNET_ID: &str = "/subscriptions/[^/]+/resourceGroups/[^/]+/providers/Microsoft\\.Network/virtualNetworks/[^/]+/subnets/[^/]+";
const RESOURCE_PREFIX: &str = "/subscriptions/${subscription_id}/resourceGroups/${resource_group_name}/providers";

static BUILTIN: OnceLock<SchemaRegistry> = OnceLock::new();

/// Returns the process-wide registry of built-in schemas.
///
/// # Errors
///
/// Returns [`tessera_common::error::TesseraError::Schema`] if a built-in
/// definition is inconsistent.
pub fn builtin() -> Result<&'static SchemaRegistry> {
    if let Some(registry) = BUILTIN.get() {
        return Ok(registry);
    }
    let registry = builtin_registry()?;
    Ok(BUILTIN.get_or_init(|| registry))
}

/// Builds a fresh registry containing every built-in schema.
///
/// # Errors
///
/// Returns an error if a built-in definition is inconsistent.
pub fn builtin_registry() -> Result<SchemaRegistry> {
    Ok(SchemaRegistry::builder()
        .register(managed_identity()?)?
        .register(container_registry()?)?
        .register(virtual_network()?)?
        .register(gateway()?)?
        .build())
}

fn resource_group() -> Field {
    Field::new("resource_group_name", FieldType::String)
        .required()
        .pattern(
            r"[-\w.()]{1,90}",
            "resource group names are 1-90 word characters, periods, or parentheses",
        )
        .describe("Resource group holding the resource.")
}

fn subscription() -> Field {
    Field::new("subscription_id", FieldType::String)
        .required()
        .pattern(UUID, "subscription_id must be a UUID")
}

fn location() -> Field {
    Field::new("location", FieldType::String)
        .default_value("westeurope")
        .pattern("[a-z0-9]+", "location must be a lowercase region name")
}

fn tags() -> Field {
    Field::new("tags", FieldType::StringMap).default_value(Value::Map(BTreeMap::new()))
}

/// User-assigned managed identity with an optional federated credential for
/// workload identity federation.
///
/// # Errors
///
/// Returns an error if the definition is inconsistent.
pub fn managed_identity() -> Result<ModuleSchema> {
    ModuleSchema::builder(MANAGED_IDENTITY)
        .describe("User-assigned managed identity for workload federation.")
        .field(
            Field::new("name", FieldType::String).required().pattern(
                "[a-zA-Z0-9][a-zA-Z0-9_-]{2,127}",
                "identity names are 3-128 characters of letters, digits, hyphens, or underscores",
            ),
        )
        .field(resource_group())
        .field(subscription())
        .field(
            Field::new("tenant_id", FieldType::String)
                .required()
                .pattern(UUID, "tenant_id must be a UUID"),
        )
        .field(location())
        .field(
            Field::new("federated_credential_name", FieldType::String)
                .default_value("workload")
                .pattern("[a-zA-Z0-9][a-zA-Z0-9_-]{2,119}", "invalid federated credential name"),
        )
        .field(
            Field::new("federated_subject", FieldType::String)
                .pattern(
                    "system:serviceaccount:[a-z0-9]([-a-z0-9]*[a-z0-9])?:[a-z0-9]([-a-z0-9.]*[a-z0-9])?",
                    "subject must look like system:serviceaccount:<namespace>:<name>",
                )
                .describe("Kubernetes service account trusted by the federated credential."),
        )
        .field(
            Field::new("audiences", FieldType::StringList)
                .default_value(Value::List(vec!["api://AzureADTokenExchange".into()])),
        )
        .field(tags())
        .output_described(
            "id",
            format!("{RESOURCE_PREFIX}/Microsoft.ManagedIdentity/userAssignedIdentities/${{name}}"),
            "Resource identifier of the identity.",
        )
        .output_described(
            "oidc_issuer_url",
            "https://${location}.oic.prod-aks.azure.com/${tenant_id}/${name}/",
            "OIDC issuer trusted by the federated credential.",
        )
        .output(
            "federated_credential_id",
            format!(
                "{RESOURCE_PREFIX}/Microsoft.ManagedIdentity/userAssignedIdentities/${{name}}/federatedIdentityCredentials/${{federated_credential_name}}"
            ),
        )
        .build()
}

/// Container registry that can trust a managed identity and its issuer.
///
/// # Errors
///
/// Returns an error if the definition is inconsistent.
pub fn container_registry() -> Result<ModuleSchema> {
    ModuleSchema::builder(CONTAINER_REGISTRY)
        .describe("Container registry with optional user-assigned identity.")
        .field(
            Field::new("name", FieldType::String)
                .required()
                .pattern("[a-zA-Z0-9]{5,50}", "registry names are 5-50 alphanumeric characters"),
        )
        .field(resource_group())
        .field(subscription())
        .field(location())
        .field(
            Field::new("sku", FieldType::String)
                .constraint(Constraint::one_of(["Basic", "Standard", "Premium"]))
                .default_value("Standard"),
        )
        .field(Field::new("admin_enabled", FieldType::Bool).default_value(false))
        .field(Field::new("public_network_access_enabled", FieldType::Bool).default_value(true))
        .field(
            Field::new("retention_days", FieldType::Number)
                .constraint(Constraint::range(0.0, 365.0))
                .default_value(7.0),
        )
        .field(
            Field::new("identity_id", FieldType::String)
                .pattern(IDENTITY_ID, "identity_id must be a user-assigned identity resource id"),
        )
        .field(
            Field::new("identity_type", FieldType::String).constraint(Constraint::NullableOneOf(
                AllowedSet::DependsOnPresence {
                    field: "identity_id".into(),
                    when_present: vec![
                        Value::from("UserAssigned"),
                        Value::from("SystemAssigned, UserAssigned"),
                    ],
                    when_absent: vec![Value::from("SystemAssigned")],
                },
            )),
        )
        .field(
            Field::new("trusted_issuer_url", FieldType::String)
                .pattern(HTTPS_URL, "trusted_issuer_url must be an https URL"),
        )
        .field(tags())
        .output(
            "id",
            format!("{RESOURCE_PREFIX}/Microsoft.ContainerRegistry/registries/${{name}}"),
        )
        .output("login_server", "${name}.azurecr.io")
        .build()
}

/// Virtual network with a single subnet.
///
/// # Errors
///
/// Returns an error if the definition is inconsistent.
pub fn virtual_network() -> Result<ModuleSchema> {
    ModuleSchema::builder(VIRTUAL_NETWORK)
        .describe("Virtual network exposing one subnet.")
        .field(
            Field::new("name", FieldType::String)
                .required()
                .pattern("[a-zA-Z0-9][a-zA-Z0-9_.-]{1,63}", "invalid virtual network name"),
        )
        .field(resource_group())
        .field(subscription())
        .field(location())
        .field(
            Field::new("address_space", FieldType::StringList)
                .default_value(Value::List(vec!["10.0.0.0/16".into()])),
        )
        .field(
            Field::new("subnet_name", FieldType::String)
                .default_value("default")
                .pattern("[a-zA-Z0-9][a-zA-Z0-9_.-]{0,79}", "invalid subnet name"),
        )
        .field(
            Field::new("subnet_prefix", FieldType::String)
                .default_value("10.0.1.0/24")
                .pattern(CIDR, "subnet_prefix must be CIDR notation"),
        )
        .field(tags())
        .output(
            "id",
            format!("{RESOURCE_PREFIX}/Microsoft.Network/virtualNetworks/${{name}}"),
        )
        .output(
            "subnet_id",
            format!(
                "{RESOURCE_PREFIX}/Microsoft.Network/virtualNetworks/${{name}}/subnets/${{subnet_name}}"
            ),
        )
        .build()
}

/// Application gateway placed in a subnet.
///
/// # Errors
///
/// Returns an error if the definition is inconsistent.
pub fn gateway() -> Result<ModuleSchema> {
    ModuleSchema::builder(GATEWAY)
        .describe("Application gateway attached to an existing subnet.")
        .field(
            Field::new("name", FieldType::String).required().pattern(
                "[a-zA-Z0-9]([a-zA-Z0-9_.-]{0,78}[a-zA-Z0-9_])?",
                "invalid gateway name",
            ),
        )
        .field(resource_group())
        .field(subscription())
        .field(location())
        .field(
            Field::new("subnet_id", FieldType::String)
                .required()
                .pattern(SUBNET_ID, "subnet_id must be a subnet resource id"),
        )
        .field(
            Field::new("sku_tier", FieldType::String)
                .constraint(Constraint::one_of(["Standard_v2", "WAF_v2"]))
                .default_value("Standard_v2"),
        )
        .field(
            Field::new("capacity", FieldType::Number)
                .constraint(Constraint::range(1.0, 125.0))
                .default_value(2.0),
        )
        .field(
            Field::new("frontend_port", FieldType::Number)
                .constraint(Constraint::range(1.0, 65535.0))
                .default_value(443.0),
        )
        .field(
            Field::new("identity_id", FieldType::String)
                .pattern(IDENTITY_ID, "identity_id must be a user-assigned identity resource id"),
        )
        .field(
            Field::new("identity_type", FieldType::String).constraint(Constraint::NullableOneOf(
                AllowedSet::Fixed(vec![Value::from("UserAssigned")]),
            )),
        )
        .field(tags())
        .output(
            "id",
            format!("{RESOURCE_PREFIX}/Microsoft.Network/applicationGateways/${{name}}"),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use tessera_common::types::ModuleKind;

    use super::*;

    #[test]
    fn every_builtin_schema_builds() {
        let registry = builtin_registry().expect("builtin schemas should build");
        let kinds: Vec<&str> = registry.kinds().map(ModuleKind::as_str).collect();
        assert_eq!(
            kinds,
            vec![CONTAINER_REGISTRY, GATEWAY, MANAGED_IDENTITY, VIRTUAL_NETWORK]
        );
    }

    #[test]
    fn builtin_is_shared() {
        let a = builtin().expect("builtin");
        let b = builtin().expect("builtin");
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn identity_declares_issuer_output() {
        let schema = managed_identity().expect("schema");
        let issuer = schema.output("oidc_issuer_url").expect("issuer output");
        let fields: Vec<&str> = issuer.template().fields().collect();
        assert_eq!(fields, vec!["location", "tenant_id", "name"]);
    }

    #[test]
    fn registry_sku_is_enumerated() {
        let schema = container_registry().expect("schema");
        let sku = schema.field("sku").expect("sku field");
        assert_eq!(
            sku.rule().map(Constraint::describe).as_deref(),
            Some("one of [\"Basic\", \"Standard\", \"Premium\"]")
        );
    }
}
