// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Endpoint registry and the capture pipeline that feeds it.
//!
//! The analyzer consumes materialized request/response exchanges from the
//! proxy and files their schema material under `(method, normalized path)`.
//! Nothing on this path ever surfaces an error to the caller: a
//! documentation engine must not perturb proxying.

use crate::json_paths::extract_paths;
use crate::normalize::{normalize_url, parse_query};
use crate::schema_store::{Redactor, SchemaStore, SchemaTables};
use flate2::read::GzDecoder;
use hyper::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::{Arc, RwLock};

/// Default per-path cap on stored distinct examples.
pub const DEFAULT_MAX_EXAMPLES: usize = 10;

/// Transport-level headers that say nothing about the API contract.
/// Matched against hyper's canonical (lowercase) header names.
const EXCLUDED_HEADERS: [&str; 12] = [
    "content-length",
    "content-type",
    "date",
    "server",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "accept",
    "accept-encoding",
    "accept-language",
    "user-agent",
    "host",
];

/// All schema material observed for one `(method, normalized path)` pair.
pub struct Endpoint {
    pub method: String,
    pub url: String,
    pub request_headers: SchemaStore,
    pub request_payload: SchemaStore,
    pub url_parameters: SchemaStore,
    response_statuses: RwLock<HashMap<u16, Arc<ResponseSlot>>>,
}

/// Response material for one status code under an endpoint.
pub struct ResponseSlot {
    pub headers: SchemaStore,
    pub payload: SchemaStore,
}

impl Endpoint {
    fn new(method: &str, url: &str, max_examples: usize, redactor: Arc<Redactor>) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            request_headers: SchemaStore::new(max_examples, redactor.clone()),
            request_payload: SchemaStore::new(max_examples, redactor.clone()),
            url_parameters: SchemaStore::new(max_examples, redactor),
            response_statuses: RwLock::new(HashMap::new()),
        }
    }

    fn from_snapshot(
        snapshot: EndpointSnapshot,
        max_examples: usize,
        redactor: Arc<Redactor>,
    ) -> Self {
        let response_statuses = snapshot
            .response_statuses
            .into_iter()
            .map(|(status, slot)| {
                (
                    status,
                    Arc::new(ResponseSlot {
                        headers: SchemaStore::from_tables(
                            slot.headers,
                            max_examples,
                            redactor.clone(),
                        ),
                        payload: SchemaStore::from_tables(
                            slot.payload,
                            max_examples,
                            redactor.clone(),
                        ),
                    }),
                )
            })
            .collect();

        Self {
            method: snapshot.method,
            url: snapshot.url,
            request_headers: SchemaStore::from_tables(
                snapshot.request_headers,
                max_examples,
                redactor.clone(),
            ),
            request_payload: SchemaStore::from_tables(
                snapshot.request_payload,
                max_examples,
                redactor.clone(),
            ),
            url_parameters: SchemaStore::from_tables(
                snapshot.url_parameters,
                max_examples,
                redactor,
            ),
            response_statuses: RwLock::new(response_statuses),
        }
    }

    /// Get or lazily create the response slot for a status code.
    fn response_slot(
        &self,
        status: u16,
        max_examples: usize,
        redactor: &Arc<Redactor>,
    ) -> Option<Arc<ResponseSlot>> {
        if let Ok(slots) = self.response_statuses.read() {
            if let Some(slot) = slots.get(&status) {
                return Some(slot.clone());
            }
        }

        match self.response_statuses.write() {
            Ok(mut slots) => Some(
                slots
                    .entry(status)
                    .or_insert_with(|| {
                        Arc::new(ResponseSlot {
                            headers: SchemaStore::new(max_examples, redactor.clone()),
                            payload: SchemaStore::new(max_examples, redactor.clone()),
                        })
                    })
                    .clone(),
            ),
            Err(_) => {
                tracing::warn!("response status map lock poisoned during write");
                None
            }
        }
    }

    /// Clone all schema tables under their read locks.
    pub fn snapshot(&self) -> EndpointSnapshot {
        let slots: Vec<(u16, Arc<ResponseSlot>)> = match self.response_statuses.read() {
            Ok(slots) => slots
                .iter()
                .map(|(status, slot)| (*status, slot.clone()))
                .collect(),
            Err(_) => {
                tracing::warn!("response status map lock poisoned during read");
                Vec::new()
            }
        };

        EndpointSnapshot {
            method: self.method.clone(),
            url: self.url.clone(),
            request_headers: self.request_headers.snapshot(),
            request_payload: self.request_payload.snapshot(),
            url_parameters: self.url_parameters.snapshot(),
            response_statuses: slots
                .into_iter()
                .map(|(status, slot)| {
                    (
                        status,
                        ResponseSnapshot {
                            headers: slot.headers.snapshot(),
                            payload: slot.payload.snapshot(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Serialized view of an [`Endpoint`]; also the snapshot-file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "RequestHeaders")]
    pub request_headers: SchemaTables,
    #[serde(rename = "RequestPayload")]
    pub request_payload: SchemaTables,
    #[serde(rename = "URLParameters")]
    pub url_parameters: SchemaTables,
    #[serde(rename = "ResponseStatuses")]
    pub response_statuses: BTreeMap<u16, ResponseSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    #[serde(rename = "Headers")]
    pub headers: SchemaTables,
    #[serde(rename = "Payload")]
    pub payload: SchemaTables,
}

/// The process-wide registry plus the configuration the stores consult.
pub struct Analyzer {
    endpoints: RwLock<HashMap<String, Arc<Endpoint>>>,
    max_examples: usize,
    redactor: Arc<Redactor>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            max_examples: DEFAULT_MAX_EXAMPLES,
            redactor: Arc::new(Redactor::new()),
        }
    }

    /// Cap on distinct examples per path. Applies to stores created after
    /// the call, so configure before the first capture.
    pub fn set_max_examples(&mut self, max_examples: usize) {
        self.max_examples = max_examples;
    }

    /// Replace the redaction list consulted by every store.
    pub fn set_redacted_fields(&mut self, fields: &[String]) {
        self.redactor.set_fields(fields);
    }

    /// Ingest one observed exchange.
    ///
    /// Error responses are not evidence of contract and are discarded
    /// whole. Bodies that fail to decode as JSON still contribute their
    /// headers and URL parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &self,
        method: &str,
        raw_url: &str,
        request_headers: &HeaderMap,
        request_body: &[u8],
        response_status: u16,
        response_headers: &HeaderMap,
        response_body: &[u8],
    ) {
        if response_status >= 400 {
            return;
        }

        // Query parameters come from the raw URL; normalization strips them.
        let query = parse_query(raw_url);
        let method = method.to_ascii_uppercase();
        let path = normalize_url(raw_url);
        let key = format!("{method} {path}");

        let Some(endpoint) = self.endpoint_for(&key, &method, &path) else {
            return;
        };

        for (name, values) in &query {
            for value in values {
                endpoint
                    .url_parameters
                    .add_value(name, Value::String(value.clone()));
            }
            // A parameter's presence in one request proves nothing about
            // the rest; every observed parameter stays optional.
            endpoint.url_parameters.set_optional(name, true);
        }

        ingest_headers(&endpoint.request_headers, request_headers);

        if !request_body.is_empty() {
            if let Ok(payload) = serde_json::from_slice::<Value>(request_body) {
                extract_paths(&endpoint.request_payload, "", &payload);
            }
        }

        let Some(slot) = endpoint.response_slot(response_status, self.max_examples, &self.redactor)
        else {
            return;
        };

        ingest_headers(&slot.headers, response_headers);

        if !response_body.is_empty() {
            let body = decode_response_body(response_headers, response_body);
            if let Ok(payload) = serde_json::from_slice::<Value>(&body) {
                extract_paths(&slot.payload, "", &payload);
            }
        }
    }

    /// Get or lazily create the endpoint for a registry key. The registry
    /// lock is released before any store lock is taken.
    fn endpoint_for(&self, key: &str, method: &str, url: &str) -> Option<Arc<Endpoint>> {
        if let Ok(endpoints) = self.endpoints.read() {
            if let Some(endpoint) = endpoints.get(key) {
                return Some(endpoint.clone());
            }
        }

        match self.endpoints.write() {
            Ok(mut endpoints) => Some(
                endpoints
                    .entry(key.to_string())
                    .or_insert_with(|| {
                        Arc::new(Endpoint::new(
                            method,
                            url,
                            self.max_examples,
                            self.redactor.clone(),
                        ))
                    })
                    .clone(),
            ),
            Err(_) => {
                tracing::warn!("registry lock poisoned during write");
                None
            }
        }
    }

    /// Consistent (per-store, not cross-store) copy of the whole registry.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointSnapshot> {
        let endpoints: Vec<(String, Arc<Endpoint>)> = match self.endpoints.read() {
            Ok(endpoints) => endpoints
                .iter()
                .map(|(key, endpoint)| (key.clone(), endpoint.clone()))
                .collect(),
            Err(_) => {
                tracing::warn!("registry lock poisoned during read");
                Vec::new()
            }
        };

        endpoints
            .into_iter()
            .map(|(key, endpoint)| (key, endpoint.snapshot()))
            .collect()
    }

    /// Replace the registry wholesale with snapshotted state.
    pub fn restore(&self, snapshot: BTreeMap<String, EndpointSnapshot>) {
        let rebuilt: HashMap<String, Arc<Endpoint>> = snapshot
            .into_iter()
            .map(|(key, endpoint)| {
                (
                    key,
                    Arc::new(Endpoint::from_snapshot(
                        endpoint,
                        self.max_examples,
                        self.redactor.clone(),
                    )),
                )
            })
            .collect();

        match self.endpoints.write() {
            Ok(mut endpoints) => *endpoints = rebuilt,
            Err(_) => tracing::warn!("registry lock poisoned during restore"),
        }
    }
}

fn ingest_headers(store: &SchemaStore, headers: &HeaderMap) {
    for name in headers.keys() {
        if EXCLUDED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        for value in headers.get_all(name) {
            if let Ok(value) = value.to_str() {
                store.add_value(name.as_str(), Value::String(value.to_string()));
            }
        }
    }
}

/// Undo gzip content-encoding before JSON decode; any other encoding (or a
/// broken gzip stream) passes through and simply fails the JSON parse.
fn decode_response_body(headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let is_gzip = headers
        .get(hyper::header::CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    if !is_gzip {
        return body.to_vec();
    }

    let mut decoded = Vec::new();
    match GzDecoder::new(body).read_to_end(&mut decoded) {
        Ok(_) => decoded,
        Err(_) => body.to_vec(),
    }
}
