// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Recursive flattening of decoded JSON bodies into schema paths.
//!
//! Object keys join with `.`; entering an array appends `[]` to the current
//! path without an index, so `{"user":{"friends":[{"name":"x"}]}}` yields
//! `user.friends[].name`.

use crate::schema_store::SchemaStore;
use serde_json::Value;

/// Walk `value` and record every leaf in `store` under its flattened path.
///
/// Callers pass an empty `base_path` for a whole body. A root-level `null`
/// is ignored; `null` leaves inside objects are recorded without recursing.
pub fn extract_paths(store: &SchemaStore, base_path: &str, value: &Value) {
    if base_path.is_empty() && value.is_null() {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if base_path.is_empty() {
                    key.clone()
                } else {
                    format!("{base_path}.{key}")
                };
                if child.is_null() {
                    store.add_value(&child_path, Value::Null);
                } else {
                    extract_paths(store, &child_path, child);
                }
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                // The `]` guard keeps nested empty arrays from producing a
                // second marker on an already-array path.
                if !base_path.is_empty() && !base_path.contains(']') {
                    store.add_value(&format!("{base_path}[]"), Value::Null);
                }
                return;
            }

            if items[0].is_object() {
                let child_path = format!("{base_path}[]");
                for item in items {
                    extract_paths(store, &child_path, item);
                }
            } else if !base_path.is_empty() && !base_path.contains(']') {
                let array_path = format!("{base_path}[]");
                for item in items {
                    store.add_value(&array_path, item.clone());
                }
            }
        }
        _ => store.add_value(base_path, value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_store::{Redactor, SchemaTables};
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn flatten(value: Value) -> SchemaTables {
        let store = SchemaStore::new(10, Arc::new(Redactor::new()));
        extract_paths(&store, "", &value);
        store.snapshot()
    }

    #[rstest]
    #[case::simple_object(
        json!({"name": "John", "age": 30}),
        vec![("name", vec![json!("John")]), ("age", vec![json!(30)])]
    )]
    #[case::nested_object(
        json!({"user": {"name": "John", "address": {"city": "New York"}}}),
        vec![
            ("user.name", vec![json!("John")]),
            ("user.address.city", vec![json!("New York")]),
        ]
    )]
    #[case::array_of_objects(
        json!({"users": [{"name": "John", "age": 30}, {"name": "Jane", "age": 25}]}),
        vec![
            ("users[].name", vec![json!("John"), json!("Jane")]),
            ("users[].age", vec![json!(30), json!(25)]),
        ]
    )]
    #[case::mixed_types(
        json!({"string": "text", "number": 42, "bool": true, "null": null}),
        vec![
            ("string", vec![json!("text")]),
            ("number", vec![json!(42)]),
            ("bool", vec![json!(true)]),
            ("null", vec![json!(null)]),
        ]
    )]
    #[case::array_of_primitives(
        json!({"tags": ["tag1", "tag2", "tag3"]}),
        vec![("tags[]", vec![json!("tag1"), json!("tag2"), json!("tag3")])]
    )]
    #[case::empty_array(
        json!({"items": []}),
        vec![("items[]", vec![json!(null)])]
    )]
    #[case::spec_example(
        json!({"user": {"friends": [{"name": "John", "age": 25}]}}),
        vec![
            ("user.friends[].name", vec![json!("John")]),
            ("user.friends[].age", vec![json!(25)]),
        ]
    )]
    fn flattening_cases(#[case] payload: Value, #[case] expected: Vec<(&str, Vec<Value>)>) {
        let tables = flatten(payload);

        for (path, values) in &expected {
            assert_eq!(
                tables.examples.get(*path),
                Some(values),
                "wrong examples at {path}"
            );
        }
        assert_eq!(
            tables.examples.len(),
            expected.len(),
            "unexpected extra paths: {:?}",
            tables.examples.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn deeply_nested_arrays_of_objects() {
        let tables = flatten(json!({
            "invoices": [
                {
                    "id": 1,
                    "line_items": [
                        {
                            "product_id": 1,
                            "tax_info": [
                                {"jurisdiction": "CA", "tax_rate": 8.5},
                                {"jurisdiction": "LA", "tax_rate": 2.0}
                            ]
                        },
                        {
                            "product_id": 2,
                            "tax_info": [{"jurisdiction": "CA", "tax_rate": 8.5}]
                        }
                    ]
                },
                {
                    "id": 2,
                    "line_items": [
                        {
                            "product_id": 3,
                            "tax_info": [{"jurisdiction": "TX", "tax_rate": 6.25}]
                        }
                    ]
                }
            ]
        }));

        assert_eq!(
            tables.examples.get("invoices[].id"),
            Some(&vec![json!(1), json!(2)])
        );
        assert_eq!(
            tables.examples.get("invoices[].line_items[].product_id"),
            Some(&vec![json!(1), json!(2), json!(3)])
        );
        assert_eq!(
            tables
                .examples
                .get("invoices[].line_items[].tax_info[].jurisdiction"),
            Some(&vec![json!("CA"), json!("LA"), json!("TX")])
        );
        assert_eq!(
            tables
                .examples
                .get("invoices[].line_items[].tax_info[].tax_rate"),
            Some(&vec![json!(8.5), json!(2.0), json!(6.25)])
        );
    }

    #[test]
    fn root_null_is_ignored() {
        let tables = flatten(json!(null));
        assert!(tables.examples.is_empty());
        assert!(tables.optional.is_empty());
    }

    #[test]
    fn root_array_of_objects_uses_bare_array_prefix() {
        let tables = flatten(json!([{"id": 1}, {"id": 2}]));
        assert_eq!(
            tables.examples.get("[].id"),
            Some(&vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn nested_empty_array_inside_array_adds_no_second_marker() {
        let tables = flatten(json!({"rows": [{"cells": [[]]}]}));
        // The inner empty array sits at path `rows[].cells`, which already
        // contains `]`, so no marker is recorded for it.
        assert!(tables.examples.is_empty());
    }

    #[test]
    fn arrays_of_arrays_store_whole_inner_arrays() {
        let tables = flatten(json!({"matrix": [[1, 2], [3]]}));
        assert_eq!(
            tables.examples.get("matrix[]"),
            Some(&vec![json!([1, 2]), json!([3])])
        );
    }

    #[test]
    fn heterogeneous_array_elements_share_one_path() {
        let tables = flatten(json!({"values": [1, "two", true]}));
        assert_eq!(
            tables.examples.get("values[]"),
            Some(&vec![json!(1), json!("two"), json!(true)])
        );
    }
}
