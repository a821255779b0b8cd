//! Core types shared by the registry, validator and resolver.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named arguments used to render a resource's path template.
pub type FragmentArgs = Map<String, Value>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a params/body payload counts as "not supplied".
///
/// `null`, `{}` and `[]` are empty. Empty payloads skip validation unless
/// [`ValidateOptions::validate_empty`](crate::ValidateOptions) is set.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// The fixed set of recognized HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    /// Every recognized verb, in declaration order.
    pub const ALL: [HttpMethod; 9] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Connect,
        HttpMethod::Trace,
    ];

    /// Parse a verb from a string.
    ///
    /// Only the exact lowercase names are recognized; `"POST"` is not a verb.
    /// Returns `None` for anything outside the set (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            "connect" => Some(HttpMethod::Connect),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Lowercase wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Connect => "connect",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
