//! Registry linting - static analysis of registry documents.
//!
//! Unlike [`SchemaRegistry::from_value`](crate::SchemaRegistry::from_value),
//! which stops at the first problem, the linter reports every problem it finds:
//! - malformed resource entries
//! - missing, empty, unknown or repeated HTTP methods
//! - `paramsValidator` / `bodyValidator` schemas that cannot be compiled
//! - non-string `path` templates

use serde::Serialize;
use serde_json::Value;

use crate::types::{json_type_name, HttpMethod};

/// Keys understood in a resource definition.
const RESOURCE_KEYS: &[&str] = &["methods", "paramsValidator", "bodyValidator", "path"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// JSON path to the issue (e.g., "/products/methods/1")
    pub path: String,
    pub message: String,
}

/// Result of linting one registry document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintResult {
    pub resources: usize,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    /// True when no errors were found (warnings allowed).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }

    fn push(&mut self, severity: Severity, code: &str, path: String, message: String) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            path,
            message,
        });
    }
}

/// Lint a registry document.
pub fn lint_registry(document: &Value) -> LintResult {
    let mut result = LintResult::default();

    let Value::Object(resources) = document else {
        result.push(
            Severity::Error,
            "E001",
            String::new(),
            format!("registry must be an object, got {}", json_type_name(document)),
        );
        return result;
    };

    result.resources = resources.len();
    for (name, entry) in resources {
        lint_resource(name, entry, &mut result);
    }
    result
}

fn lint_resource(name: &str, entry: &Value, result: &mut LintResult) {
    let base = format!("/{}", escape_pointer(name));

    let Value::Object(fields) = entry else {
        result.push(
            Severity::Error,
            "E001",
            base,
            format!("resource must be an object, got {}", json_type_name(entry)),
        );
        return;
    };

    match fields.get("methods") {
        None => result.push(
            Severity::Error,
            "E002",
            base.clone(),
            "missing \"methods\"".to_string(),
        ),
        Some(Value::Array(methods)) => lint_methods(&base, methods, result),
        Some(other) => result.push(
            Severity::Error,
            "E002",
            format!("{base}/methods"),
            format!("\"methods\" must be an array, got {}", json_type_name(other)),
        ),
    }

    for key in ["paramsValidator", "bodyValidator"] {
        if let Some(schema) = fields.get(key) {
            if let Err(e) = jsonschema::validator_for(schema) {
                result.push(
                    Severity::Error,
                    "E004",
                    format!("{base}/{key}"),
                    format!("schema does not compile: {e}"),
                );
            }
        }
    }

    if let Some(path) = fields.get("path") {
        if !path.is_string() {
            result.push(
                Severity::Error,
                "E005",
                format!("{base}/path"),
                format!("\"path\" must be a string, got {}", json_type_name(path)),
            );
        }
    }

    for key in fields.keys() {
        if !RESOURCE_KEYS.contains(&key.as_str()) {
            result.push(
                Severity::Warning,
                "W002",
                format!("{base}/{}", escape_pointer(key)),
                format!("unknown key \"{key}\" is ignored"),
            );
        }
    }
}

fn lint_methods(base: &str, methods: &[Value], result: &mut LintResult) {
    if methods.is_empty() {
        result.push(
            Severity::Error,
            "E002",
            format!("{base}/methods"),
            "\"methods\" must not be empty".to_string(),
        );
        return;
    }

    let mut seen = Vec::new();
    for (i, value) in methods.iter().enumerate() {
        let path = format!("{base}/methods/{i}");
        let Some(verb) = value.as_str() else {
            result.push(
                Severity::Error,
                "E003",
                path,
                format!("method must be a string, got {}", json_type_name(value)),
            );
            continue;
        };
        match HttpMethod::parse(verb) {
            None => result.push(
                Severity::Error,
                "E003",
                path,
                format!("\"{verb}\" is not a valid http method"),
            ),
            Some(method) if seen.contains(&method) => result.push(
                Severity::Warning,
                "W001",
                path,
                format!("\"{verb}\" is listed more than once"),
            ),
            Some(method) => seen.push(method),
        }
    }
}

/// Escape a key for use in a JSON Pointer (~ -> ~0, / -> ~1).
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
