//! End-to-end pipeline tests against the built-in catalog.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::io::Write;

use tessera_common::config::{EngineConfig, ValidationMode};
use tessera_common::error::{ConstraintViolation, ResolutionReason, TesseraError};
use tessera_common::types::{FieldType, InstanceId, Value};
use tessera_schema::catalog;
use tessera_schema::field::Field;
use tessera_schema::registry::SchemaRegistry;
use tessera_schema::schema::ModuleSchema;
use tessera_sdk::{Composer, FieldValue, ModuleRequest, OutputRef};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
const TENANT: &str = "00000000-0000-0000-0000-0000000000aa";

fn composer() -> Composer {
    Composer::builtin(EngineConfig::strict()).expect("builtin catalog should load")
}

fn identity(id: &str) -> ModuleRequest {
    ModuleRequest::new(id, catalog::MANAGED_IDENTITY)
        .with("name", "ci-identity")
        .with("resource_group_name", "rg-ci")
        .with("subscription_id", SUBSCRIPTION)
        .with("tenant_id", TENANT)
}

fn registry(id: &str) -> ModuleRequest {
    ModuleRequest::new(id, catalog::CONTAINER_REGISTRY)
        .with("name", "tesseraci")
        .with("resource_group_name", "rg-ci")
        .with("subscription_id", SUBSCRIPTION)
}

fn violations(err: TesseraError) -> Vec<ConstraintViolation> {
    match err {
        TesseraError::Validation { mut failures } => {
            assert_eq!(failures.len(), 1, "expected one failing instance");
            failures.remove(0).violations
        }
        other => panic!("expected validation error, got {other}"),
    }
}

fn reason(err: TesseraError) -> ResolutionReason {
    match err {
        TesseraError::Resolution(e) => e.reason,
        other => panic!("expected resolution error, got {other}"),
    }
}

fn ids<'a>(order: impl Iterator<Item = &'a InstanceId>) -> Vec<&'a str> {
    order.map(InstanceId::as_str).collect()
}

#[test]
fn valid_instance_round_trips_unchanged() {
    let request = registry("acr")
        .with("sku", "Premium")
        .with("retention_days", 30.0)
        .with("admin_enabled", false);
    let instance = composer().instantiate(&request).expect("should validate");
    for (field, value) in &request.values {
        assert_eq!(instance.value(field), Some(value), "field {field} changed");
    }
}

#[test]
fn one_bad_field_yields_one_violation() {
    let err = composer()
        .instantiate(&registry("acr").with("retention_days", 400.0))
        .unwrap_err();
    let found = violations(err);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field, "retention_days");
}

#[test]
fn every_bad_field_is_reported_in_declaration_order() {
    let request = ModuleRequest::new("acr", catalog::CONTAINER_REGISTRY)
        .with("retention_days", -1.0)
        .with("sku", "Ultra")
        .with("name", "ab")
        .with("resource_group_name", "rg-ci")
        .with("subscription_id", SUBSCRIPTION);
    let found = violations(composer().instantiate(&request).unwrap_err());
    let fields: Vec<&str> = found.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "sku", "retention_days"]);
}

#[test]
fn unknown_sku_lists_allowed_values() {
    let found = violations(
        composer()
            .instantiate(&registry("acr").with("sku", "Ultra"))
            .unwrap_err(),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].field, "sku");
    for allowed in ["Basic", "Standard", "Premium"] {
        assert!(found[0].message.contains(allowed), "got: {}", found[0].message);
    }
}

#[test]
fn instantiation_is_idempotent() {
    let composer = composer();
    let request = registry("acr").with("sku", "Basic");
    let first = composer.instantiate(&request).expect("first");
    let second = composer.instantiate(&request).expect("second");
    assert_eq!(first, second);
}

#[test]
fn missing_required_fields_are_violations() {
    let found = violations(
        composer()
            .instantiate(&ModuleRequest::new("acr", catalog::CONTAINER_REGISTRY))
            .unwrap_err(),
    );
    let fields: Vec<&str> = found.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "resource_group_name", "subscription_id"]);
}

#[test]
fn identity_type_depends_on_identity_id() {
    let composer = composer();
    let without_id = registry("acr").with("identity_type", "UserAssigned");
    assert!(composer.instantiate(&without_id).is_err());

    let system = registry("acr").with("identity_type", "SystemAssigned");
    assert!(composer.instantiate(&system).is_ok());

    let unset = registry("acr").with("identity_type", Value::Null);
    assert!(composer.instantiate(&unset).is_ok());
}

#[test]
fn strict_mode_rejects_undeclared_fields() {
    let request = registry("acr").with("colour", "blue");
    let found = violations(composer().instantiate(&request).unwrap_err());
    assert_eq!(found[0].field, "colour");

    let lenient = Composer::builtin(EngineConfig::default()).expect("builtin");
    let instance = lenient.instantiate(&request).expect("lenient should accept");
    assert!(instance.value("colour").is_none());
}

#[test]
fn registry_trusts_identity_issuer() {
    let plan = composer()
        .compose_requests(&[
            registry("acr").with(
                "trusted_issuer_url",
                OutputRef::new("id", "oidc_issuer_url"),
            ),
            identity("id"),
        ])
        .expect("should compose");

    assert_eq!(ids(plan.order()), vec!["id", "acr"]);
    let acr = plan.get(&"acr".into()).expect("acr step");
    assert_eq!(
        acr.value("trusted_issuer_url"),
        Some(&FieldValue::from(format!(
            "https://westeurope.oic.prod-aks.azure.com/{TENANT}/ci-identity/"
        )))
    );
    assert_eq!(plan.references().len(), 1);
}

#[test]
fn issuer_reference_fails_without_declared_output() {
    let bare_identity = ModuleSchema::builder(catalog::MANAGED_IDENTITY)
        .field(Field::new("name", FieldType::String).required())
        .field(Field::new("resource_group_name", FieldType::String))
        .field(Field::new("subscription_id", FieldType::String))
        .field(Field::new("tenant_id", FieldType::String))
        .output("id", "${name}")
        .build()
        .expect("schema should build");
    let schemas = SchemaRegistry::builder()
        .register(bare_identity)
        .expect("register identity")
        .register(catalog::container_registry().expect("registry schema"))
        .expect("register registry")
        .build();
    let composer = Composer::new(schemas, EngineConfig::strict());

    let err = composer
        .compose_requests(&[
            identity("id"),
            registry("acr").with(
                "trusted_issuer_url",
                OutputRef::new("id", "oidc_issuer_url"),
            ),
        ])
        .unwrap_err();
    assert_eq!(reason(err), ResolutionReason::UnknownOutput);
}

#[test]
fn issuer_from_null_location_is_not_substituted() {
    let err = composer()
        .compose_requests(&[
            identity("id").with("location", Value::Null),
            registry("acr").with(
                "trusted_issuer_url",
                OutputRef::new("id", "oidc_issuer_url"),
            ),
        ])
        .unwrap_err();
    assert_eq!(reason(err), ResolutionReason::UnsetOutput);
}

#[test]
fn reference_to_missing_instance_is_unknown_producer() {
    let err = composer()
        .compose_requests(&[registry("acr").with(
            "trusted_issuer_url",
            OutputRef::new("ghost", "oidc_issuer_url"),
        )])
        .unwrap_err();
    assert_eq!(reason(err), ResolutionReason::UnknownProducer);
}

#[test]
fn substituted_value_must_satisfy_consumer_field() {
    let err = composer()
        .compose_requests(&[
            identity("id"),
            registry("acr").with("identity_id", OutputRef::new("id", "oidc_issuer_url")),
        ])
        .unwrap_err();
    assert!(
        matches!(reason(err), ResolutionReason::RejectedValue(_)),
        "issuer URL is not an identity resource id"
    );
}

fn chain_composer() -> Composer {
    let schemas = SchemaRegistry::builder()
        .register(
            ModuleSchema::builder("link")
                .field(Field::new("name", FieldType::String).required())
                .field(Field::new("after", FieldType::String))
                .output("name", "${name}")
                .build()
                .expect("schema should build"),
        )
        .expect("register")
        .build();
    Composer::new(schemas, EngineConfig::strict())
}

fn link(id: &str, after: Option<&str>) -> ModuleRequest {
    let request = ModuleRequest::new(id, "link").with("name", id);
    match after {
        Some(producer) => request.with("after", OutputRef::new(producer, "name")),
        None => request,
    }
}

#[test]
fn chain_orders_producers_first() {
    let plan = chain_composer()
        .compose_requests(&[link("a", Some("b")), link("b", Some("c")), link("c", None)])
        .expect("should compose");
    assert_eq!(ids(plan.order()), vec!["c", "b", "a"]);
    assert_eq!(plan.position(&"c".into()), Some(0));
}

#[test]
fn two_instance_cycle_is_reported() {
    let err = chain_composer()
        .compose_requests(&[link("a", Some("b")), link("b", Some("a"))])
        .unwrap_err();
    let TesseraError::Composition(cycle) = err else {
        panic!("expected composition error, got {err}");
    };
    assert_eq!(ids(cycle.cycle.iter()), vec!["a", "b"]);
}

#[test]
fn independent_compositions_run_concurrently() {
    let composer = chain_composer();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let composer = &composer;
                scope.spawn(move || {
                    let head = format!("head{n}");
                    let tail = format!("tail{n}");
                    composer
                        .compose_requests(&[link(&head, Some(tail.as_str())), link(&tail, None)])
                        .expect("should compose")
                        .order()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            let order = handle.join().expect("thread should finish");
            assert_eq!(order, vec![format!("tail{n}"), format!("head{n}")]);
        }
    });
}

#[test]
fn demo_workload_composes() {
    let plan = composer()
        .compose_source(include_str!("../../../demos/workload.tsr"))
        .expect("demo should compose");
    assert_eq!(ids(plan.order()), vec!["identity", "registry", "network", "edge"]);

    let edge = plan.get(&"edge".into()).expect("edge step");
    assert_eq!(
        edge.value("subnet_id"),
        Some(&FieldValue::from(format!(
            "/subscriptions/{SUBSCRIPTION}/resourceGroups/rg-net/providers/Microsoft.Network/virtualNetworks/vnet-ci/subnets/gateway"
        )))
    );
    let registry = plan.get(&"registry".into()).expect("registry step");
    assert_eq!(
        registry.output("login_server"),
        Some(&Value::from("tesseraci.azurecr.io"))
    );
}

#[test]
fn compose_file_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(include_str!("../../../demos/workload.tsr").as_bytes())
        .expect("write temp file");

    let requests = tessera_sdk::load_file(file.path()).expect("should load");
    assert_eq!(requests.len(), 4);

    let plan = composer().compose_file(file.path()).expect("should compose");
    assert_eq!(plan.len(), 4);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = composer()
        .compose_file(&dir.path().join("absent.tsr"))
        .unwrap_err();
    assert!(matches!(err, TesseraError::Io { .. }), "got: {err}");
}

#[test]
fn config_file_selects_mode() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(b"mode: lenient\n").expect("write temp file");
    let config = EngineConfig::load(file.path()).expect("should load");
    assert_eq!(config.mode, ValidationMode::Lenient);
}
