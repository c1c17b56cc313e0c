//! API contract document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// HTTP methods that mark an operation under an OpenAPI path item.
const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// An opaque structured API contract.
///
/// The watcher never interprets the document beyond a few summary fields;
/// comparison is left to the diff engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecDocument(Value);

impl SpecDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// SHA-256 over the compact JSON serialization.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.0).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Short fingerprint for log lines.
    pub fn short_fingerprint(&self) -> String {
        self.fingerprint()[..12].to_string()
    }

    /// `info.title`, if present.
    pub fn title(&self) -> Option<&str> {
        self.0.pointer("/info/title").and_then(Value::as_str)
    }

    /// `info.version`, if present.
    pub fn version(&self) -> Option<&str> {
        self.0.pointer("/info/version").and_then(Value::as_str)
    }

    /// Number of operations (method entries) under `paths`.
    pub fn operation_count(&self) -> usize {
        self.0
            .get("paths")
            .and_then(Value::as_object)
            .map(|paths| {
                paths
                    .values()
                    .filter_map(Value::as_object)
                    .map(|item| {
                        item.keys()
                            .filter(|k| OPERATION_METHODS.contains(&k.to_ascii_lowercase().as_str()))
                            .count()
                    })
                    .sum()
            })
            .unwrap_or(0)
    }
}
