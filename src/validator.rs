//! Payload validation against declared JSON Schemas.
//!
//! The validation algorithm itself sits behind [`SchemaValidator`]; the
//! default [`JsonSchemaValidator`] delegates to the `jsonschema` crate.

use serde_json::Value;

use crate::error::SchemaError;

/// Outcome of validating one document against one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Failures in the order the validator reported them.
    pub errors: Vec<SchemaError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First reported failure, if any.
    pub fn first(&self) -> Option<&SchemaError> {
        self.errors.first()
    }
}

/// A JSON-Schema-capable document validator.
pub trait SchemaValidator: Send + Sync {
    /// Validate `document` against `schema`.
    ///
    /// # Errors
    ///
    /// Returns a message when `schema` itself cannot be used for validation.
    fn validate(&self, document: &Value, schema: &Value) -> Result<Validation, String>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
///
/// The schema is compiled on every call; nothing is cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Value, schema: &Value) -> Result<Validation, String> {
        let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;

        let errors = validator
            .iter_errors(document)
            .map(|e| SchemaError {
                path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
                instance: e.instance.clone().into_owned(),
            })
            .collect();

        Ok(Validation { errors })
    }
}

/// Recursively set `additionalProperties: false` on all object schemas.
///
/// Only sets the value if `additionalProperties` is missing or explicitly `true`.
/// Custom `additionalProperties` schemas are left untouched.
pub fn close_additional_properties(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    let is_object_schema = map.get("type").and_then(Value::as_str) == Some("object")
        || map.contains_key("properties");

    if is_object_schema {
        match map.get("additionalProperties") {
            None | Some(Value::Bool(true)) => {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            _ => {}
        }
    }

    for (key, child) in map.iter_mut() {
        match key.as_str() {
            "properties" | "$defs" | "definitions" => {
                if let Value::Object(entries) = child {
                    entries.values_mut().for_each(close_additional_properties);
                }
            }
            "items" | "additionalProperties" => close_additional_properties(child),
            "allOf" | "anyOf" | "oneOf" => {
                if let Value::Array(branches) = child {
                    branches.iter_mut().for_each(close_additional_properties);
                }
            }
            _ => {}
        }
    }
}
