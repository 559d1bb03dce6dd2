// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! OpenAPI 3.0 document types and the registry-to-document assembler.

use crate::analyzer::{Analyzer, EndpointSnapshot};
use crate::schema::{schema_from_tables, Schema};
use crate::schema_store::SchemaTables;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Query parameters common enough to deserve canonical documentation.
const COMMON_QUERY_PARAMS: [(&str, &str, &str); 5] = [
    ("page", "Page number for pagination", "integer"),
    ("page_size", "Number of items per page", "integer"),
    ("sort_by", "Field to sort by", "string"),
    ("order", "Sort order (asc/desc)", "string"),
    ("search", "Search query", "string"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ApiResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub description: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub headers: BTreeMap<String, ResponseHeader>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub schema: Schema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    pub schemas: BTreeMap<String, Schema>,
}

/// Assemble the full OpenAPI document from the analyzer's current registry.
pub fn generate_openapi(analyzer: &Analyzer) -> OpenApi {
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();

    for (key, endpoint) in analyzer.snapshot() {
        let Some((method, path)) = key.split_once(' ') else {
            continue;
        };

        let operation = build_operation(method, path, &endpoint);
        let item = paths.entry(path.to_string()).or_default();
        match method {
            "GET" => item.get = Some(operation),
            "POST" => item.post = Some(operation),
            "PUT" => item.put = Some(operation),
            "DELETE" => item.delete = Some(operation),
            _ => {}
        }
    }

    OpenApi {
        openapi: "3.0.0".to_string(),
        info: Info {
            title: "API Documentation".to_string(),
            version: "1.0.0".to_string(),
        },
        paths,
        components: Components::default(),
    }
}

fn build_operation(method: &str, path: &str, endpoint: &EndpointSnapshot) -> Operation {
    let mut parameters = Vec::new();

    for segment in path.split('/') {
        match segment {
            "{id}" => parameters.push(Parameter {
                name: "id".to_string(),
                location: "path".to_string(),
                required: true,
                description: "Resource ID".to_string(),
                schema: Schema::typed("integer"),
            }),
            "{uuid}" => parameters.push(Parameter {
                name: "uuid".to_string(),
                location: "path".to_string(),
                required: true,
                description: "Resource UUID".to_string(),
                schema: Schema {
                    schema_type: Some("string".to_string()),
                    format: Some("uuid".to_string()),
                    ..Schema::default()
                },
            }),
            _ => {}
        }
    }

    parameters.extend(query_parameters(&endpoint.url_parameters));

    for (name, examples) in &endpoint.request_headers.examples {
        parameters.push(Parameter {
            name: name.clone(),
            location: "header".to_string(),
            required: !is_optional(&endpoint.request_headers, name),
            description: format!("Header: {name}"),
            schema: Schema {
                schema_type: Some("string".to_string()),
                examples: examples.clone(),
                ..Schema::default()
            },
        });
    }

    let request_body = if endpoint.request_payload.examples.is_empty() {
        None
    } else {
        Some(RequestBody {
            required: true,
            content: json_content(schema_from_tables(&endpoint.request_payload)),
        })
    };

    let mut responses = BTreeMap::new();
    for (status, slot) in &endpoint.response_statuses {
        let headers = slot
            .headers
            .examples
            .iter()
            .map(|(name, examples)| {
                (
                    name.clone(),
                    ResponseHeader {
                        schema: Schema {
                            schema_type: Some("string".to_string()),
                            examples: examples.clone(),
                            ..Schema::default()
                        },
                    },
                )
            })
            .collect();

        responses.insert(
            status.to_string(),
            ApiResponse {
                description: format!("Status {status}"),
                content: json_content(schema_from_tables(&slot.payload)),
                headers,
            },
        );
    }

    Operation {
        summary: format!("{method} {path}"),
        parameters,
        request_body,
        responses,
    }
}

/// Observed query parameters, with the five well-known names documented
/// last under their canonical descriptions.
fn query_parameters(tables: &SchemaTables) -> Vec<Parameter> {
    let mut parameters = Vec::new();

    for (name, examples) in &tables.examples {
        if COMMON_QUERY_PARAMS
            .iter()
            .any(|(common, _, _)| *common == name.as_str())
        {
            continue;
        }
        parameters.push(Parameter {
            name: name.clone(),
            location: "query".to_string(),
            required: !is_optional(tables, name),
            description: format!("Query parameter: {name}"),
            schema: Schema {
                schema_type: Some(query_param_type(examples).to_string()),
                examples: examples.clone(),
                ..Schema::default()
            },
        });
    }

    for (name, description, param_type) in COMMON_QUERY_PARAMS {
        if let Some(examples) = tables.examples.get(name) {
            parameters.push(Parameter {
                name: name.to_string(),
                location: "query".to_string(),
                required: !is_optional(tables, name),
                description: description.to_string(),
                schema: Schema {
                    schema_type: Some(param_type.to_string()),
                    examples: examples.clone(),
                    ..Schema::default()
                },
            });
        }
    }

    parameters
}

fn query_param_type(examples: &[Value]) -> &'static str {
    match examples.first() {
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(number)) => {
            if number.is_f64() {
                "number"
            } else {
                "integer"
            }
        }
        _ => "string",
    }
}

fn is_optional(tables: &SchemaTables, name: &str) -> bool {
    tables.optional.get(name).copied().unwrap_or(true)
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    let mut content = BTreeMap::new();
    content.insert(JSON_CONTENT_TYPE.to_string(), MediaType { schema });
    content
}
