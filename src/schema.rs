// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Path-tree reconstruction of flattened schema tables into nested
//! OpenAPI schemas.
//!
//! The inverse of the flattening walk: paths like `user.friends[].name`
//! are split back into a segment trie, array suffixes become `array`
//! wrappers, and leaves are typed from their first example.

use crate::schema_store::SchemaTables;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An OpenAPI schema object. Maps are ordered so generated documents are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
}

impl Schema {
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }
}

/// Convert flattened tables into a nested schema.
///
/// When every path shares one leading `name[]` segment the whole store
/// describes an array body; the shared segment is stripped and the rest
/// builds the item schema. Otherwise the store describes an object.
pub fn schema_from_tables(tables: &SchemaTables) -> Schema {
    if tables.examples.is_empty() {
        return Schema::typed("object");
    }

    let mut array_key: Option<&str> = None;
    let mut all_array = true;
    for path in tables.examples.keys() {
        let first = path.split('.').next().unwrap_or("");
        if !first.ends_with("[]") {
            all_array = false;
            break;
        }
        match array_key {
            None => array_key = Some(first),
            Some(key) if key != first => {
                all_array = false;
                break;
            }
            _ => {}
        }
    }

    if all_array && array_key.is_some() {
        let mut item_tables = SchemaTables::default();
        for (path, examples) in &tables.examples {
            if let Some((_, rest)) = path.split_once('.') {
                item_tables
                    .examples
                    .insert(rest.to_string(), examples.clone());
                if let Some(optional) = tables.optional.get(path) {
                    item_tables.optional.insert(rest.to_string(), *optional);
                }
            }
        }

        let mut item_schema = object_schema_from_tables(&item_tables);
        if item_schema.schema_type.is_none() {
            item_schema.schema_type = Some("object".to_string());
        }
        if item_schema.schema_type.as_deref() == Some("object") && item_schema.properties.is_none()
        {
            item_schema.properties = Some(BTreeMap::new());
        }

        return Schema {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(item_schema)),
            ..Schema::default()
        };
    }

    object_schema_from_tables(tables)
}

#[derive(Default)]
struct PathNode {
    children: BTreeMap<String, PathNode>,
    leaf_path: Option<String>,
}

fn object_schema_from_tables(tables: &SchemaTables) -> Schema {
    let mut root = PathNode::default();
    for path in tables.examples.keys() {
        let mut node = &mut root;
        for part in path.split('.') {
            node = node.children.entry(part.to_string()).or_default();
        }
        node.leaf_path = Some(path.clone());
    }

    let mut schema = build_node(&root, true, tables);
    if schema.schema_type.is_none() {
        schema.schema_type = Some("object".to_string());
    }
    schema
}

fn build_node(node: &PathNode, is_root: bool, tables: &SchemaTables) -> Schema {
    if let Some(path) = &node.leaf_path {
        let examples = tables.examples.get(path).cloned().unwrap_or_default();
        return property_schema(&examples);
    }

    // Below the root, a point whose every observed field is an array
    // renders as an object of array-valued properties.
    if !is_root && !node.children.is_empty() && node.children.keys().all(|key| key.ends_with("[]"))
    {
        let mut properties = BTreeMap::new();
        for (key, child) in &node.children {
            let name = key.strip_suffix("[]").unwrap_or(key).to_string();
            properties.insert(name, array_of(build_node(child, false, tables)));
        }
        return Schema {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            ..Schema::default()
        };
    }

    let mut properties = BTreeMap::new();
    let mut required = Vec::new();
    for (key, child) in &node.children {
        let (name, child_schema) = match key.strip_suffix("[]") {
            Some(stripped) => (
                stripped.to_string(),
                array_of(build_node(child, false, tables)),
            ),
            None => {
                let mut inner = build_node(child, false, tables);
                if inner.schema_type.is_none() {
                    inner.schema_type = Some("object".to_string());
                }
                (key.clone(), inner)
            }
        };
        properties.insert(name.clone(), child_schema);

        if let Some(path) = resolve_leaf_path(child) {
            if tables.optional.get(&path) == Some(&false) {
                required.push(name);
            }
        }
    }

    Schema {
        schema_type: Some("object".to_string()),
        properties: Some(properties),
        required,
        ..Schema::default()
    }
}

fn array_of(mut items: Schema) -> Schema {
    if items.schema_type.is_none() {
        items.schema_type = Some("object".to_string());
    }
    Schema {
        schema_type: Some("array".to_string()),
        items: Some(Box::new(items)),
        ..Schema::default()
    }
}

/// Find the store path that decides a child's required-ness: its own leaf
/// path, or the leaf at the end of a single-child chain below it.
fn resolve_leaf_path(node: &PathNode) -> Option<String> {
    if let Some(path) = &node.leaf_path {
        return Some(path.clone());
    }
    let mut current = node;
    while current.leaf_path.is_none() && current.children.len() == 1 {
        let (_, child) = current.children.iter().next()?;
        current = child;
    }
    current.leaf_path.clone()
}

/// Type a leaf from its first example; attach all examples, and an enum
/// when a string leaf has fewer than five distinct values.
fn property_schema(examples: &[Value]) -> Schema {
    let mut schema = Schema::default();
    let Some(first) = examples.first() else {
        return schema;
    };

    match first {
        Value::String(_) => {
            schema.schema_type = Some("string".to_string());
            let mut distinct: Vec<String> = Vec::new();
            for example in examples {
                if let Value::String(text) = example {
                    if !distinct.contains(text) {
                        distinct.push(text.clone());
                    }
                }
            }
            if !distinct.is_empty() && distinct.len() < 5 {
                schema.enum_values = distinct;
            }
        }
        Value::Number(_) => schema.schema_type = Some("number".to_string()),
        Value::Bool(_) => schema.schema_type = Some("boolean".to_string()),
        Value::Array(_) => {
            schema.schema_type = Some("array".to_string());
            schema.items = Some(Box::new(Schema::typed("object")));
        }
        Value::Object(_) => schema.schema_type = Some("object".to_string()),
        Value::Null => {}
    }

    schema.examples = examples.to_vec();
    schema
}
