// src/services/extractor.rs

//! Embedded document extraction.
//!
//! Swagger UI bundles ship a `swagger-ui-init.js` that assigns the whole
//! UI configuration, including the API document, to a variable:
//!
//! ```text
//! window.onload = function() {
//!   let options = { "swaggerDoc": { "openapi": "3.0.0", ... }, ... };
//!   ...
//! }
//! ```
//!
//! The extractor locates that assignment, walks the literal to its matching
//! closing brace (ignoring braces inside strings and comments) and parses it
//! as JSON.

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{SourceConfig, SpecDocument};

/// Pulls a [`SpecDocument`] out of a script-like carrier payload.
#[derive(Debug, Clone)]
pub struct Extractor {
    variable: String,
    document_key: Option<String>,
    assignment: Regex,
}

impl Extractor {
    /// Create an extractor for `variable`, selecting `document_key` from the
    /// literal (an empty key selects the whole literal).
    pub fn new(variable: &str, document_key: &str) -> Result<Self> {
        let variable = variable.trim();
        if variable.is_empty() {
            return Err(AppError::config("extractor variable name is empty"));
        }
        let pattern = format!(
            r"(?:\b(?:let|const|var)\s+)?\b{}\s*=\s*",
            regex::escape(variable)
        );
        let assignment = Regex::new(&pattern)
            .map_err(|e| AppError::config(format!("invalid variable pattern: {e}")))?;

        let document_key = Some(document_key.trim())
            .filter(|k| !k.is_empty())
            .map(String::from);

        Ok(Self {
            variable: variable.to_string(),
            document_key,
            assignment,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(&config.variable, &config.document_key)
    }

    /// Extract the embedded document.
    ///
    /// Every assignment to the variable is tried in order; the first one that
    /// yields a balanced, parseable literal wins.
    pub fn extract(&self, carrier: &str) -> Result<SpecDocument> {
        let mut last_error = None;

        for found in self.assignment.find_iter(carrier) {
            match self.extract_at(carrier, found.end()) {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    log::debug!("Skipping candidate at byte {}: {}", found.start(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::extraction(format!(
                "no object literal assigned to '{}' found",
                self.variable
            ))
        }))
    }

    fn extract_at(&self, carrier: &str, start: usize) -> Result<SpecDocument> {
        if !carrier[start..].starts_with('{') {
            return Err(AppError::extraction(format!(
                "'{}' is not assigned an object literal",
                self.variable
            )));
        }

        let end = literal_end(carrier, start).ok_or_else(|| {
            AppError::extraction(format!(
                "object literal assigned to '{}' is not terminated",
                self.variable
            ))
        })?;

        let literal: Value = serde_json::from_str(&carrier[start..end]).map_err(|e| {
            AppError::extraction(format!(
                "literal assigned to '{}' is not valid JSON: {e}",
                self.variable
            ))
        })?;

        let document = match &self.document_key {
            Some(key) => match literal {
                Value::Object(mut map) => map.remove(key).ok_or_else(|| {
                    AppError::extraction(format!("literal has no '{key}' member"))
                })?,
                _ => return Err(AppError::extraction("literal is not an object")),
            },
            None => literal,
        };

        if !document.is_object() {
            return Err(AppError::extraction("embedded document is not an object"));
        }
        Ok(SpecDocument::new(document))
    }
}

/// Byte offset just past the bracket matching the one at `open`.
///
/// Tracks nesting of `{}` and `[]`, skips string contents (double, single and
/// backtick quoted, with backslash escapes) and `//` / `/* */` comments.
/// Returns `None` for unbalanced or mismatched input.
fn literal_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut closers: Vec<u8> = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i += text[i..].find('\n')?;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i += text[i + 2..].find("*/")? + 3;
                }
                b'{' => closers.push(b'}'),
                b'[' => closers.push(b']'),
                b'}' | b']' => {
                    if closers.pop()? != b {
                        return None;
                    }
                    if closers.is_empty() {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}
