//! Catalog snapshots and change detection.

use crate::catalog::OperationDescriptor;
use serde_json::Value;
use sha2::Digest as _;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub descriptor: OperationDescriptor,
    /// Hex SHA-256 of the canonical input schema.
    pub fingerprint: String,
}

/// The full tool catalog at one point in time, in build order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    entries: Vec<CatalogEntry>,
}

/// What differs between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDiff {
    pub previous_count: usize,
    pub current_count: usize,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub schema_changed: Vec<String>,
}

impl CatalogDiff {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.previous_count != self.current_count
            || !self.removed.is_empty()
            || !self.schema_changed.is_empty()
            || !self.added.is_empty()
    }
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new(descriptors: Vec<OperationDescriptor>) -> Self {
        let entries = descriptors
            .into_iter()
            .map(|descriptor| CatalogEntry {
                fingerprint: schema_fingerprint(&descriptor.input_schema),
                descriptor,
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.descriptor.tool_name.as_str())
            .collect()
    }

    #[must_use]
    pub fn get(&self, tool_name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.tool_name == tool_name)
    }

    #[must_use]
    pub fn descriptors(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Compare `self` (the published baseline) with a freshly built snapshot.
    #[must_use]
    pub fn diff(&self, current: &CatalogSnapshot) -> CatalogDiff {
        let previous: HashMap<&str, &str> = self
            .entries
            .iter()
            .map(|e| (e.descriptor.tool_name.as_str(), e.fingerprint.as_str()))
            .collect();
        let now: HashMap<&str, &str> = current
            .entries
            .iter()
            .map(|e| (e.descriptor.tool_name.as_str(), e.fingerprint.as_str()))
            .collect();

        let removed = self
            .tool_names()
            .into_iter()
            .filter(|name| !now.contains_key(name))
            .map(str::to_string)
            .collect();

        let mut added = Vec::new();
        let mut schema_changed = Vec::new();
        for entry in &current.entries {
            let name = entry.descriptor.tool_name.as_str();
            match previous.get(name) {
                None => added.push(name.to_string()),
                Some(fp) if *fp != entry.fingerprint => schema_changed.push(name.to_string()),
                Some(_) => {}
            }
        }

        CatalogDiff {
            previous_count: self.len(),
            current_count: current.len(),
            added,
            removed,
            schema_changed,
        }
    }
}

/// Hex SHA-256 of the key-sorted serialization of `schema`.
#[must_use]
pub fn schema_fingerprint(schema: &Value) -> String {
    let serialized = canonicalize_json(schema).to_string();
    hex::encode(sha2::Sha256::digest(serialized.as_bytes()))
}

fn canonicalize_json(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                if let Some(val) = map.get(&k) {
                    out.insert(k, canonicalize_json(val));
                }
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}
