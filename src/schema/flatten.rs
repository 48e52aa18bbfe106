//! Schema flattening
//!
//! Turns a recursive [`SchemaNode`] tree into a map keyed by [`FieldPath`].
//! Every object property, array item schema and map value schema gets its
//! own entry, so two schemas can later be compared field by field.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

use super::definition::{AdditionalProperties, SchemaNode};

/// Keys that only document a schema and never change what it accepts
const DOCUMENTATION_KEYS: [&str; 4] = ["description", "title", "example", "externalDocs"];

/// One step of a [`FieldPath`]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathToken {
    /// A named object property
    Property(String),
    /// The item schema of an array; all elements collapse to this token
    Items,
    /// The `additionalProperties` schema shared by every value of a map
    MapValues,
}

/// Location of a field inside a schema tree
///
/// Rendered as `spec.replicas`, `spec.items[].name` or `spec.labels{}`; the
/// root is `^`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<PathToken>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the rendered form back into a path (`^` or `a.b[].c{}`)
    ///
    /// The rendered form is not escaped, so a property whose name contains
    /// `.` or ends in `[]` or `{}` does not survive the round trip. Paths
    /// produced by [`flatten`] should be compared as values, not re-parsed.
    pub fn parse(s: &str) -> Self {
        let mut tokens = Vec::new();
        if s == "^" || s.is_empty() {
            return Self(tokens);
        }
        for segment in s.split('.') {
            let split = segment.find(['[', '{']).unwrap_or(segment.len());
            let (name, mut suffix) = segment.split_at(split);
            let mut nested = Vec::new();
            loop {
                if let Some(rest) = suffix.strip_prefix("[]") {
                    nested.push(PathToken::Items);
                    suffix = rest;
                } else if let Some(rest) = suffix.strip_prefix("{}") {
                    nested.push(PathToken::MapValues);
                    suffix = rest;
                } else {
                    break;
                }
            }
            if !suffix.is_empty() {
                tokens.push(PathToken::Property(segment.to_string()));
                continue;
            }
            if !name.is_empty() {
                tokens.push(PathToken::Property(name.to_string()));
            }
            tokens.extend(nested);
        }
        Self(tokens)
    }

    pub fn child(&self, property: &str) -> Self {
        self.with(PathToken::Property(property.to_string()))
    }

    pub fn items(&self) -> Self {
        self.with(PathToken::Items)
    }

    pub fn map_values(&self) -> Self {
        self.with(PathToken::MapValues)
    }

    /// The enclosing path, or `None` for the root
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, parent)| Self(parent.to_vec()))
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn with(&self, token: PathToken) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(token);
        Self(tokens)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "^");
        }
        for (i, token) in self.0.iter().enumerate() {
            match token {
                PathToken::Property(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathToken::Items => write!(f, "[]")?,
                PathToken::MapValues => write!(f, "{{}}")?,
            }
        }
        Ok(())
    }
}

/// The validation attributes of a single schema node
///
/// Child structure (`properties`, `items`, a map value schema and the
/// `required` list) is not part of the descriptor: children are flattened
/// into their own entries, and the parent's `required` list surfaces as
/// `required_in_parent` on each child. Required names without a matching
/// property stay on the parent in `undeclared_required`.
///
/// `other_attributes` holds every key no change rule understands. No rule
/// clears it, so any difference there is an unknown change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDescriptor {
    pub type_: Option<String>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub min_items: Option<i64>,
    pub max_items: Option<i64>,
    pub min_properties: Option<i64>,
    pub max_properties: Option<i64>,
    pub required_in_parent: bool,
    pub undeclared_required: BTreeSet<String>,
    pub other_attributes: BTreeMap<String, Value>,
}

impl FieldDescriptor {
    fn from_node(node: &SchemaNode, required_in_parent: bool) -> Self {
        let mut other_attributes: BTreeMap<String, Value> = node
            .other_attributes
            .iter()
            .filter(|(key, _)| !DOCUMENTATION_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(AdditionalProperties::Allowed(allowed)) = node.additional_properties {
            other_attributes.insert("additionalProperties".to_string(), Value::Bool(allowed));
        }

        Self {
            type_: node.type_.clone(),
            format: node.format.clone(),
            pattern: node.pattern.clone(),
            enum_values: node.enum_values.clone(),
            default: node.default.clone(),
            minimum: node.minimum,
            maximum: node.maximum,
            min_length: node.min_length,
            max_length: node.max_length,
            min_items: node.min_items,
            max_items: node.max_items,
            min_properties: node.min_properties,
            max_properties: node.max_properties,
            required_in_parent,
            undeclared_required: node
                .required
                .iter()
                .filter(|name| !node.properties.contains_key(*name))
                .cloned()
                .collect(),
            other_attributes,
        }
    }
}

/// Flattened schema, ordered by path
pub type FlatSchema = BTreeMap<FieldPath, FieldDescriptor>;

/// Flatten a schema tree depth-first
pub fn flatten(schema: &SchemaNode) -> FlatSchema {
    let mut flat = FlatSchema::new();
    walk(schema, FieldPath::root(), false, &mut flat);
    flat
}

fn walk(node: &SchemaNode, path: FieldPath, required_in_parent: bool, flat: &mut FlatSchema) {
    for (name, child) in &node.properties {
        let required = node.required.iter().any(|r| r == name);
        walk(child, path.child(name), required, flat);
    }
    if let Some(items) = &node.items {
        walk(items, path.items(), false, flat);
    }
    if let Some(AdditionalProperties::Schema(values)) = &node.additional_properties {
        walk(values, path.map_values(), false, flat);
    }
    flat.insert(path, FieldDescriptor::from_node(node, required_in_parent));
}
