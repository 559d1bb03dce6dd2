// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Path-keyed example storage with bounded retention and field redaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

/// Literal stored in place of any value whose field name is on the
/// redaction list.
pub const REDACTED_PLACEHOLDER: &str = "REDACTED";

/// Case-insensitive set of field names whose captured values must never be
/// stored verbatim.
///
/// Owned by the analyzer; every store it creates holds a shared handle so the
/// list is consulted on each write.
#[derive(Debug, Default)]
pub struct Redactor {
    fields: RwLock<HashSet<String>>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the redacted-field set.
    pub fn set_fields(&self, fields: &[String]) {
        match self.fields.write() {
            Ok(mut set) => {
                *set = fields.iter().map(|f| f.to_lowercase()).collect();
            }
            Err(_) => tracing::warn!("Redactor lock poisoned during write"),
        }
    }

    /// Whether a field name is on the redaction list.
    pub fn is_redacted(&self, name: &str) -> bool {
        match self.fields.read() {
            Ok(set) => set.contains(&name.to_lowercase()),
            Err(_) => {
                tracing::warn!("Redactor lock poisoned during read");
                false
            }
        }
    }
}

/// Flattened schema material for one category of an endpoint: distinct
/// example values and an optionality flag, both keyed by schema path.
///
/// This is the plain data that the snapshot file, the `/api/analyzer` view
/// and the schema synthesizer all consume; [`SchemaStore`] wraps it with a
/// lock for the capture path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaTables {
    #[serde(rename = "Examples")]
    pub examples: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "Optional")]
    pub optional: BTreeMap<String, bool>,
}

/// Concurrency-safe store of example values keyed by schema path.
///
/// Every path holds at most `max_examples` structurally distinct values;
/// later distinct values are silently dropped. A path present in `examples`
/// is always present in `optional`.
pub struct SchemaStore {
    tables: RwLock<SchemaTables>,
    max_examples: usize,
    redactor: Arc<Redactor>,
}

impl SchemaStore {
    pub fn new(max_examples: usize, redactor: Arc<Redactor>) -> Self {
        Self {
            tables: RwLock::new(SchemaTables::default()),
            max_examples,
            redactor,
        }
    }

    /// Rebuild a store from previously snapshotted tables.
    pub fn from_tables(tables: SchemaTables, max_examples: usize, redactor: Arc<Redactor>) -> Self {
        Self {
            tables: RwLock::new(tables),
            max_examples,
            redactor,
        }
    }

    /// Record one observed value under a path.
    ///
    /// Redaction applies before the distinctness check, so every occurrence
    /// of a redacted field collapses to a single `"REDACTED"` example.
    pub fn add_value(&self, path: &str, value: Value) {
        let value = if self.redactor.is_redacted(redaction_name(path)) {
            Value::String(REDACTED_PLACEHOLDER.to_string())
        } else {
            value
        };

        match self.tables.write() {
            Ok(mut tables) => {
                if !tables.examples.contains_key(path) {
                    tables.optional.insert(path.to_string(), true);
                }
                let examples = tables.examples.entry(path.to_string()).or_default();
                if examples.iter().any(|existing| existing == &value) {
                    return;
                }
                if examples.len() < self.max_examples {
                    examples.push(value);
                }
            }
            Err(_) => tracing::warn!("SchemaStore lock poisoned during write"),
        }
    }

    /// Overwrite the optionality flag for a path.
    pub fn set_optional(&self, path: &str, optional: bool) {
        match self.tables.write() {
            Ok(mut tables) => {
                tables.optional.insert(path.to_string(), optional);
            }
            Err(_) => tracing::warn!("SchemaStore lock poisoned during write"),
        }
    }

    /// Clone the current tables under the read lock.
    pub fn snapshot(&self) -> SchemaTables {
        match self.tables.read() {
            Ok(tables) => tables.clone(),
            Err(_) => {
                tracing::warn!("SchemaStore lock poisoned during read");
                SchemaTables::default()
            }
        }
    }
}

/// The name a path is matched against on the redaction list: its final
/// segment, with an array suffix stripped. Header and query-parameter paths
/// have a single segment and match whole.
fn redaction_name(path: &str) -> &str {
    let last = path.rsplit('.').next().unwrap_or(path);
    last.strip_suffix("[]").unwrap_or(last)
}
