// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Postman v2.1.0 collection generation from the endpoint registry.

use crate::analyzer::{Analyzer, EndpointSnapshot};
use crate::schema_store::SchemaTables;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanCollection {
    pub info: PostmanInfo,
    pub item: Vec<PostmanItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanInfo {
    pub name: String,
    pub description: String,
    pub schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<PostmanRequest>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub item: Vec<PostmanItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanRequest {
    pub method: String,
    pub header: Vec<PostmanHeader>,
    pub url: PostmanUrl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<PostmanBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanHeader {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub header_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanUrl {
    pub raw: String,
    pub protocol: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub query: Vec<PostmanQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanQuery {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmanBody {
    pub mode: String,
    pub raw: String,
    pub options: Value,
}

/// Build a collection from the registry, grouping endpoints into folders by
/// their first path segment. Requests target `localhost:<proxy_port>`.
pub fn generate_postman(analyzer: &Analyzer, proxy_port: u16) -> PostmanCollection {
    let mut groups: BTreeMap<String, Vec<EndpointSnapshot>> = BTreeMap::new();
    for endpoint in analyzer.snapshot().into_values() {
        let group = endpoint
            .url
            .split('/')
            .nth(1)
            .unwrap_or_default()
            .to_string();
        groups.entry(group).or_default().push(endpoint);
    }

    let item = groups
        .into_iter()
        .map(|(group, endpoints)| PostmanItem {
            name: group.clone(),
            description: Some(format!("Endpoints for {group}")),
            request: None,
            item: endpoints
                .into_iter()
                .map(|endpoint| PostmanItem {
                    name: format!("{} {}", endpoint.method, endpoint.url),
                    description: Some(format!(
                        "{} request for {}",
                        endpoint.method, endpoint.url
                    )),
                    request: Some(build_request(&endpoint, proxy_port)),
                    item: Vec::new(),
                })
                .collect(),
        })
        .collect();

    PostmanCollection {
        info: PostmanInfo {
            name: "API Collection".to_string(),
            description: "Generated API collection from analyzer data".to_string(),
            schema: COLLECTION_SCHEMA.to_string(),
        },
        item,
    }
}

fn build_request(endpoint: &EndpointSnapshot, proxy_port: u16) -> PostmanRequest {
    let header = endpoint
        .request_headers
        .examples
        .iter()
        .filter_map(|(name, examples)| {
            examples.first().map(|value| PostmanHeader {
                key: name.clone(),
                value: plain_value(value),
                header_type: "text".to_string(),
            })
        })
        .collect();

    let query = endpoint
        .url_parameters
        .examples
        .iter()
        .filter_map(|(name, examples)| {
            examples.first().map(|value| PostmanQuery {
                key: name.clone(),
                value: plain_value(value),
            })
        })
        .collect();

    let body = example_from_tables(&endpoint.request_payload).and_then(|example| {
        serde_json::to_string_pretty(&example)
            .ok()
            .map(|raw| PostmanBody {
                mode: "raw".to_string(),
                raw,
                options: json!({"raw": {"language": "json"}}),
            })
    });

    PostmanRequest {
        method: endpoint.method.clone(),
        header,
        url: PostmanUrl {
            raw: endpoint.url.clone(),
            protocol: "http".to_string(),
            host: vec![format!("localhost:{proxy_port}")],
            path: endpoint.url.split('/').map(str::to_string).collect(),
            query,
        },
        body,
    }
}

/// Render a JSON value the way it would appear in a header or query field:
/// strings bare, everything else as JSON text.
fn plain_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rebuild one concrete example document from flattened tables, taking the
/// first example at every path.
pub fn example_from_tables(tables: &SchemaTables) -> Option<Value> {
    if tables.examples.is_empty() {
        return None;
    }

    let mut example = Map::new();
    for (path, values) in &tables.examples {
        let Some(first) = values.first() else {
            continue;
        };
        let parts: Vec<&str> = path.split('.').collect();
        insert_example_path(&mut example, &parts, first);
    }

    Some(Value::Object(example))
}

fn insert_example_path(current: &mut Map<String, Value>, parts: &[&str], value: &Value) {
    let Some((part, rest)) = parts.split_first() else {
        return;
    };
    let is_last = rest.is_empty();

    if let Some(name) = part.strip_suffix("[]") {
        let entry = current
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(array) = entry else {
            return;
        };
        if is_last {
            array.push(value.clone());
        } else {
            if array.is_empty() {
                array.push(Value::Object(Map::new()));
            }
            if let Some(Value::Object(object)) = array.first_mut() {
                insert_example_path(object, rest, value);
            }
        }
    } else if is_last {
        current.insert((*part).to_string(), value.clone());
    } else {
        let entry = current
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(object) = entry {
            insert_example_path(object, rest, value);
        }
    }
}
