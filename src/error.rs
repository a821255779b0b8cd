//! Error types for registry loading, request resolution and validation.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::types::HttpMethod;

/// Errors raised while resolving, validating or compiling a request.
///
/// Each variant is raised synchronously at the stage that detects it.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{url} is not a valid url")]
    InvalidUrl { url: String },

    #[error("{path} not in schema. valid paths are [{}]", valid.join(","))]
    PathNotInSchema { path: String, valid: Vec<String> },

    #[error("{method} is not a valid http method")]
    InvalidHttpMethod { method: String },

    #[error(
        "{method} not supported in {path}. supported methods are {}",
        join_methods(supported)
    )]
    MethodNotSupported {
        method: HttpMethod,
        path: String,
        supported: Vec<HttpMethod>,
    },

    #[error("{target} failed validation: {error}")]
    Validation {
        target: PayloadTarget,
        error: SchemaError,
    },

    #[error("invalid {target} schema: {message}")]
    InvalidSchema {
        target: PayloadTarget,
        message: String,
    },

    #[error("cannot render path template for {path}: {message}")]
    Template { path: String, message: String },
}

impl ManagerError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ManagerError::Validation { .. } => 1,
            _ => 2,
        }
    }
}

/// Errors while building or loading a schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse and definition errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("resource \"{name}\" is defined more than once")]
    DuplicateResource { name: String },

    #[error("resource \"{resource}\" declares no methods")]
    NoMethods { resource: String },

    #[error("resource \"{resource}\" declares unknown http method \"{method}\"")]
    UnknownMethod { resource: String, method: String },

    #[error("invalid definition for \"{resource}\": {message}")]
    InvalidDefinition { resource: String, message: String },
}

impl RegistryError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::FileNotFound { .. } | RegistryError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            RegistryError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Which payload of a request a validation problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadTarget {
    Params,
    Body,
}

impl fmt::Display for PayloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadTarget::Params => f.write_str("params"),
            PayloadTarget::Body => f.write_str("body"),
        }
    }
}

/// Single validation failure with path context.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// JSON Pointer to the schema keyword that rejected the value.
    pub schema_path: String,
    /// Human-readable error message.
    pub message: String,
    /// The offending value.
    pub instance: Value,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

fn join_methods(methods: &[HttpMethod]) -> String {
    methods
        .iter()
        .map(HttpMethod::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
