//! REST Schema
//!
//! Declarative request building for REST-like APIs.
//!
//! A [`SchemaRegistry`] names each resource of an API together with the HTTP
//! verbs it accepts, optional JSON Schemas for its params and body, and an
//! optional URL path template. A [`Manager`] bound to a registry resolves
//! requests in three stages (resource, verb, invocation), failing as soon as
//! a stage is given something the registry does not allow. Valid requests are
//! handed to a caller-supplied dispatch callback as a [`RequestDescriptor`].
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rest_schema::{HttpMethod, Manager, ResourceDefinition, SchemaRegistry};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::new()
//!     .with_resource(
//!         "products",
//!         ResourceDefinition::new([HttpMethod::Get, HttpMethod::Post]).body_schema(json!({
//!             "type": "object",
//!             "properties": { "name": { "type": "string" } },
//!             "required": ["name"]
//!         })),
//!     )
//!     .unwrap();
//!
//! let sent = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&sent);
//! let manager = Manager::with_dispatch("localhost:8080/api", move |request| {
//!     sink.lock().unwrap().push(request);
//! })
//! .unwrap();
//!
//! let api = manager.bind_schema(registry);
//! let products = api.path("products").unwrap().fragment(None);
//!
//! products
//!     .method("post")
//!     .unwrap()
//!     .invoke(json!({}), json!({ "name": "lamp" }))
//!     .unwrap();
//!
//! // Unsupported verbs fail before any payload is supplied
//! assert!(products.method("patch").is_err());
//!
//! let sent = sent.lock().unwrap();
//! assert_eq!(sent[0].url, "localhost:8080/api");
//! assert_eq!(sent[0].body["name"], "lamp");
//! ```
//!
//! # Registry Format
//!
//! Registries can also be loaded from JSON:
//! ```json
//! {
//!   "products": { "methods": ["get", "post"], "bodyValidator": { "type": "object" } },
//!   "product":  { "methods": ["get", "patch"], "path": "/${ productId }" }
//! }
//! ```
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `methods` | Permitted verbs (required, non-empty) |
//! | `paramsValidator` | JSON Schema for params, skipped when params are empty |
//! | `bodyValidator` | JSON Schema for the body, skipped when the body is empty |
//! | `path` | Fragment template appended to the base URL, `${ name }` placeholders |

mod error;
mod linter;
mod loader;
mod manager;
mod registry;
mod request;
mod types;
mod validator;

pub use error::{ManagerError, PayloadTarget, RegistryError, SchemaError};
pub use linter::{lint_registry, Diagnostic, LintResult, Severity};
pub use loader::{
    is_url, load_document, load_document_auto, load_registry, load_registry_auto,
    load_registry_str, parse_document,
};
pub use manager::{
    is_valid_base_url, Dispatch, Invocation, Manager, MethodAccessor, PathBuilder, Resolver,
};
pub use registry::{PathTemplate, ResourceDefinition, SchemaRegistry};
pub use request::{compile_url, RequestContext, RequestDescriptor, ValidateOptions};
pub use types::{is_empty_payload, json_type_name, FragmentArgs, HttpMethod};
pub use validator::{close_additional_properties, JsonSchemaValidator, SchemaValidator, Validation};

#[cfg(feature = "remote")]
pub use loader::{fetch_document, load_registry_url};
