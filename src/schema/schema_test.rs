use super::*;
use crate::fields::FieldKind;
use crate::fields::FieldValue;

fn limits_schema() -> Schema {
    Schema::builder("limits")
        .field("max", 100_i64, "Requests per window")
        .field("rate", 1.5_f64, "Refill rate per second")
        .field("enforced", true, "Reject requests over the limit")
        .field("mode", "soft", "Enforcement mode")
        .build()
}

#[test]
fn test_field_kinds_derive_from_defaults() {
    let schema = limits_schema();

    assert_eq!(schema.spec("max").unwrap().kind(), FieldKind::Int);
    assert_eq!(schema.spec("rate").unwrap().kind(), FieldKind::Float);
    assert_eq!(schema.spec("enforced").unwrap().kind(), FieldKind::Bool);
    assert_eq!(schema.spec("mode").unwrap().kind(), FieldKind::Str);
}

#[test]
fn test_spec_keeps_description() {
    let schema = limits_schema();

    assert_eq!(
        schema.spec("max").unwrap().description(),
        "Requests per window"
    );
    assert_eq!(schema.spec("max").unwrap().name(), "max");
    assert_eq!(schema.spec("max").unwrap().default(), &FieldValue::Int(100));
}

#[test]
fn test_value_falls_back_to_default() {
    let schema = limits_schema();

    assert_eq!(schema.value("max").unwrap(), FieldValue::Int(100));
    assert_eq!(schema.value("mode").unwrap(), FieldValue::Str("soft".to_string()));
}

#[test]
fn test_assign_overrides_default() {
    let mut schema = limits_schema();

    schema.assign("max", 250_i64).unwrap();

    assert_eq!(schema.value("max").unwrap(), FieldValue::Int(250));
    // Other fields keep their defaults.
    assert_eq!(schema.value("rate").unwrap(), FieldValue::Float(1.5));
}

#[test]
fn test_assign_rejects_wrong_kind() {
    let mut schema = limits_schema();

    let err = schema.assign("max", "lots").unwrap_err();

    assert_eq!(
        err.to_string(),
        "Unexpected type: reality: Str, expected: Int"
    );
    // The default still answers after a failed assignment.
    assert_eq!(schema.value("max").unwrap(), FieldValue::Int(100));
}

#[test]
fn test_assign_rejects_unknown_field() {
    let mut schema = limits_schema();

    assert!(schema.assign("nope", 1_i64).is_err());
    assert!(schema.value("nope").is_err());
}

#[test]
fn test_to_field_map_overlays_assignments() {
    let mut schema = limits_schema();
    schema.assign("max", 250_i64).unwrap();

    let map = schema.to_field_map();

    assert_eq!(map.len(), 4);
    assert_eq!(map.get("max"), Some(&FieldValue::Int(250)));
    assert_eq!(map.get("rate"), Some(&FieldValue::Float(1.5)));
    assert_eq!(map.get("enforced"), Some(&FieldValue::Bool(true)));
}

#[test]
fn test_registry_round_trip() {
    let registry = SchemaRegistry::new();
    registry.register(limits_schema());

    assert!(registry.contains("limits"));
    assert_eq!(registry.namespaces(), vec!["limits"]);

    registry.assign("limits", "max", 300_i64).unwrap();
    assert_eq!(
        registry.value("limits", "max").unwrap(),
        FieldValue::Int(300)
    );

    let map = registry.to_field_map("limits").unwrap();
    assert_eq!(map.get("max"), Some(&FieldValue::Int(300)));
}

#[test]
fn test_registry_value_reads_defaults() {
    let registry = SchemaRegistry::new();
    registry.register(limits_schema());

    // No assignment yet; the lookup must reach the schema's defaults.
    assert_eq!(
        registry.value("limits", "rate").unwrap(),
        FieldValue::Float(1.5)
    );
    assert_eq!(
        registry.value("limits", "mode").unwrap(),
        FieldValue::Str("soft".to_string())
    );
    assert!(registry.value("limits", "nope").is_err());
}

#[test]
fn test_registry_rejects_unknown_namespace() {
    let registry = SchemaRegistry::new();

    assert!(registry.assign("ghost", "x", 1_i64).is_err());
    assert!(registry.value("ghost", "x").is_err());
    assert!(registry.to_field_map("ghost").is_err());
}

#[test]
fn test_redeclaration_replaces_schema() {
    let registry = SchemaRegistry::new();
    registry.register(limits_schema());
    registry.register(
        Schema::builder("limits")
            .field("only", 1_i64, "The only field left")
            .build(),
    );

    let map = registry.to_field_map("limits").unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("only"), Some(&FieldValue::Int(1)));
}
