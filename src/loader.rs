//! Registry loading from files, strings and HTTP URLs.

use std::fmt;
use std::path::Path;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::error::RegistryError;
use crate::registry::SchemaRegistry;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level keys of a JSON object in document order, repeats included.
///
/// Parsing into a `Value` keeps only the last of a repeated key, so resource
/// names are checked on the raw text.
struct TopLevelKeys(Vec<String>);

impl<'de> Deserialize<'de> for TopLevelKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = TopLevelKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut keys = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    map.next_value::<IgnoredAny>()?;
                    keys.push(key);
                }
                Ok(TopLevelKeys(keys))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}

/// Parse registry text, rejecting a resource name that appears twice.
///
/// # Errors
///
/// Returns `RegistryError::InvalidJson` for malformed text, or
/// `RegistryError::DuplicateResource` for the first repeated top-level key.
pub fn parse_document(content: &str) -> Result<Value, RegistryError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| RegistryError::InvalidJson { source })?;

    // Non-object documents are reported by the registry itself.
    if let Ok(TopLevelKeys(keys)) = serde_json::from_str::<TopLevelKeys>(content) {
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(RegistryError::DuplicateResource { name: key.clone() });
            }
        }
    }
    Ok(value)
}

/// Read a registry document from disk without interpreting it.
///
/// # Errors
///
/// Returns `RegistryError::FileNotFound` if the file doesn't exist,
/// `RegistryError::InvalidJson` if the file isn't valid JSON, or
/// `RegistryError::DuplicateResource` if a resource name is repeated.
pub fn load_document(path: &Path) -> Result<Value, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    parse_document(&content)
}

/// Load a registry from a file path.
///
/// # Errors
///
/// Returns `RegistryError` if the file can't be read, isn't valid JSON, or
/// doesn't describe a valid registry.
pub fn load_registry(path: &Path) -> Result<SchemaRegistry, RegistryError> {
    SchemaRegistry::from_value(&load_document(path)?)
}

/// Load a registry from a JSON string.
///
/// # Errors
///
/// Returns `RegistryError::InvalidJson` if the string isn't valid JSON, or
/// another `RegistryError` if the registry itself is invalid.
pub fn load_registry_str(content: &str) -> Result<SchemaRegistry, RegistryError> {
    SchemaRegistry::from_value(&parse_document(content)?)
}

/// Fetch a registry document from an HTTP/HTTPS URL without interpreting it.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `RegistryError::NetworkError` if the request fails or the server
/// answers with an error status, or the errors of [`parse_document`].
#[cfg(feature = "remote")]
pub fn fetch_document(url: &str) -> Result<Value, RegistryError> {
    let network = |source| RegistryError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let content = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text)
        .map_err(network)?;

    parse_document(&content)
}

/// Load a registry from an HTTP/HTTPS URL.
///
/// # Errors
///
/// Returns `RegistryError::NetworkError` on transport failures, or another
/// `RegistryError` if the registry itself is invalid.
#[cfg(feature = "remote")]
pub fn load_registry_url(url: &str) -> Result<SchemaRegistry, RegistryError> {
    SchemaRegistry::from_value(&fetch_document(url)?)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Read a registry document from a file path or URL.
///
/// # Errors
///
/// Same as [`load_document`] or [`fetch_document`] depending on the source.
pub fn load_document_auto(source: &str) -> Result<Value, RegistryError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            fetch_document(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(RegistryError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Load a registry from a file path or URL, auto-detecting which.
///
/// # Errors
///
/// Same as [`load_registry`] or `load_registry_url` depending on the source.
pub fn load_registry_auto(source: &str) -> Result<SchemaRegistry, RegistryError> {
    SchemaRegistry::from_value(&load_document_auto(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const REGISTRY: &str = r#"{
        "products": {
            "methods": ["get", "post"],
            "bodyValidator": { "type": "object" }
        }
    }"#;

    #[test]
    fn load_registry_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{REGISTRY}").unwrap();

        let registry = load_registry(file.path()).unwrap();
        assert_eq!(registry.names(), vec!["products"]);
    }

    #[test]
    fn load_registry_file_not_found() {
        let result = load_registry(Path::new("/nonexistent/registry.json"));
        assert!(matches!(result, Err(RegistryError::FileNotFound { .. })));
    }

    #[test]
    fn load_registry_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not valid json }}").unwrap();

        let result = load_registry(file.path());
        assert!(matches!(result, Err(RegistryError::InvalidJson { .. })));
    }

    #[test]
    fn load_registry_str_valid() {
        let registry = load_registry_str(REGISTRY).unwrap();
        assert!(registry.get("products").is_some());
    }

    #[test]
    fn load_registry_str_invalid_definition() {
        let result = load_registry_str(r#"{"products": {"methods": ["grab"]}}"#);
        assert!(matches!(result, Err(RegistryError::UnknownMethod { .. })));
    }

    #[test]
    fn repeated_resource_name_is_rejected() {
        let result = load_registry_str(
            r#"{"products": {"methods": ["get"]}, "products": {"methods": ["post"]}}"#,
        );
        assert!(
            matches!(result, Err(RegistryError::DuplicateResource { name }) if name == "products")
        );
    }

    #[test]
    fn repeated_nested_key_is_not_a_duplicate_resource() {
        let registry =
            load_registry_str(r#"{"products": {"methods": ["get"], "methods": ["post"]}}"#)
                .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("http://example.com/registry.json"));
        assert!(is_url("https://example.com/registry.json"));
        assert!(!is_url("/path/to/registry.json"));
        assert!(!is_url("localhost:8080/registry.json"));
    }

    #[test]
    fn load_registry_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{REGISTRY}").unwrap();

        let registry = load_registry_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[cfg(feature = "remote")]
    #[test]
    fn load_registry_url_from_server() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/registry.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(REGISTRY)
            .create();

        let registry = load_registry_url(&format!("{}/registry.json", server.url())).unwrap();
        assert_eq!(registry.names(), vec!["products"]);
        mock.assert();
    }

    #[cfg(feature = "remote")]
    #[test]
    fn load_registry_url_http_error() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing.json").with_status(404).create();

        let result = load_registry_url(&format!("{}/missing.json", server.url()));
        let err = result.unwrap_err();
        assert!(matches!(err, RegistryError::NetworkError { .. }));
        assert_eq!(err.exit_code(), 3);
    }
}
