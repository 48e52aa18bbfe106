//! Unit tests for schema flattening

use crd_upgrade_safety::schema::{FieldPath, SchemaNode, flatten};
use serde_json::json;

use crate::common::*;

#[test]
fn test_every_node_appears_once() {
    let flat = flatten(&widget_schema());
    let paths: Vec<String> = flat.keys().map(|p| p.to_string()).collect();

    let mut expected = vec![
        "^",
        "spec",
        "spec.size",
        "spec.replicas",
        "spec.color",
        "spec.tags",
        "spec.tags[]",
        "spec.ports",
        "spec.ports[]",
        "spec.ports[].name",
        "spec.ports[].port",
    ];
    expected.sort_by_key(|p| FieldPath::parse(p));

    assert_eq!(paths, expected);
}

#[test]
fn test_required_in_parent() {
    let flat = flatten(&widget_schema());
    assert!(descriptor(&flat, "spec.size").required_in_parent);
    assert!(!descriptor(&flat, "spec.replicas").required_in_parent);
    assert!(descriptor(&flat, "spec.ports[].name").required_in_parent);
    assert!(!descriptor(&flat, "spec.ports[].port").required_in_parent);
    // Array items are never "required" by their parent
    assert!(!descriptor(&flat, "spec.ports[]").required_in_parent);
}

#[test]
fn test_attributes_copied_verbatim() {
    let node = SchemaNode {
        type_: Some("string".to_string()),
        enum_values: vec![json!("a"), json!("b")],
        default: Some(json!("a")),
        min_length: Some(1),
        max_length: Some(63),
        pattern: Some("^[a-z]+$".to_string()),
        ..Default::default()
    };
    let flat = flatten(&object_field(vec![("name", node)], &[]));
    let name = descriptor(&flat, "name");

    assert_eq!(name.type_.as_deref(), Some("string"));
    assert_eq!(name.enum_values, vec![json!("a"), json!("b")]);
    assert_eq!(name.default, Some(json!("a")));
    assert_eq!(name.min_length, Some(1));
    assert_eq!(name.max_length, Some(63));
    assert_eq!(name.pattern.as_deref(), Some("^[a-z]+$"));
}

#[test]
fn test_bounds_copied_for_collections() {
    let flat = flatten(&widget_schema());
    assert_eq!(descriptor(&flat, "spec.tags").max_items, Some(5));
    assert_eq!(descriptor(&flat, "spec.replicas").maximum, Some(10.0));
    assert_eq!(descriptor(&flat, "spec.replicas").minimum, Some(1.0));
}

#[test]
fn test_nested_arrays() {
    let schema = object_field(vec![("matrix", array_of(array_of(integer_field())))], &[]);
    let flat = flatten(&schema);
    assert!(flat.contains_key(&FieldPath::parse("matrix[][]")));
    assert_eq!(flat.len(), 4);
}

#[test]
fn test_flatten_is_deterministic() {
    let schema = widget_schema();
    assert_eq!(flatten(&schema), flatten(&schema.clone()));
}

#[test]
fn test_empty_schema_has_only_root() {
    let flat = flatten(&SchemaNode::default());
    assert_eq!(flat.len(), 1);
    assert!(flat.contains_key(&FieldPath::root()));
}

#[test]
fn test_map_values_get_their_own_entry() {
    let schema = object_field(vec![("labels", map_of(enum_field(&["a", "b"])))], &[]);
    let flat = flatten(&schema);

    let paths: Vec<String> = flat.keys().map(|p| p.to_string()).collect();
    assert_eq!(paths, vec!["^", "labels", "labels{}"]);
    assert_eq!(descriptor(&flat, "labels{}").enum_values.len(), 2);
}

#[test]
fn test_unmodeled_attributes_reach_descriptor() {
    let node = with_attribute(
        with_attribute(integer_field(), "multipleOf", json!(2)),
        "description",
        json!("documentation only"),
    );
    let flat = flatten(&object_field(vec![("count", node)], &[]));
    let count = descriptor(&flat, "count");

    assert_eq!(count.other_attributes.get("multipleOf"), Some(&json!(2)));
    assert!(!count.other_attributes.contains_key("description"));
}

#[test]
fn test_required_without_property_kept_on_parent() {
    let schema = object_field(vec![("size", string_field())], &["size", "ghost"]);
    let flat = flatten(&schema);
    let root = descriptor(&flat, "^");
    assert_eq!(root.undeclared_required.iter().collect::<Vec<_>>(), vec!["ghost"]);
    assert!(descriptor(&flat, "size").required_in_parent);
}
