//! The entry object and its three-stage request resolver.
//!
//! ```text
//! manager.bind_schema(registry)        -> Resolver
//!     .path("product")?                -> PathBuilder     (unknown resource fails here)
//!     .fragment(args)                  -> MethodAccessor
//!     .method("get")?                  -> Invocation      (bad or unsupported verb fails here)
//!     .invoke(params, body)?           -> dispatch        (bad payload fails here)
//! ```
//!
//! Every stage checks its own input as soon as it is reached, so misuse is
//! reported where it happens rather than when the request is finally sent.

use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use regex::Regex;
use serde_json::Value;

use crate::error::ManagerError;
use crate::registry::{ResourceDefinition, SchemaRegistry};
use crate::request::{RequestContext, RequestDescriptor, ValidateOptions};
use crate::types::{FragmentArgs, HttpMethod};
use crate::validator::{JsonSchemaValidator, SchemaValidator};

/// Lenient URL shape: a `scheme:` or `host`-like prefix, optional path,
/// query and fragment. Not RFC 3986. Word characters are ASCII only.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?-u)((([A-Za-z]{3,9}:(?://)?)(?:[-;:&=+$,\w]+@)?[A-Za-z0-9.-]+",
        r"|(?:www\.|[-;:&=+$,\w]+@)[A-Za-z0-9.-]+)",
        r"((?:/[+~%/.\w\-_]*)?\??(?:[-+=&;%@.\w_]*)#?(?:[.!/\\\w]*))?)",
    ))
    .expect("url regex is valid")
});

/// Receives every successfully built [`RequestDescriptor`].
pub type Dispatch = Arc<dyn Fn(RequestDescriptor) + Send + Sync>;

/// Whether `url` has the scheme-or-host-like shape required of a base URL.
pub fn is_valid_base_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Entry object for one API base URL.
pub struct Manager {
    base_url: String,
    dispatch: RwLock<Option<Dispatch>>,
}

impl Manager {
    /// Create a manager for `base_url`, stored verbatim.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::InvalidUrl` if the URL has no scheme or
    /// host-like prefix (e.g. `"/api/v2/products"`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ManagerError> {
        let base_url = base_url.into();
        if !is_valid_base_url(&base_url) {
            return Err(ManagerError::InvalidUrl { url: base_url });
        }
        Ok(Self {
            base_url,
            dispatch: RwLock::new(None),
        })
    }

    /// Create a manager with its dispatch callback already registered.
    pub fn with_dispatch<F>(base_url: impl Into<String>, dispatch: F) -> Result<Self, ManagerError>
    where
        F: Fn(RequestDescriptor) + Send + Sync + 'static,
    {
        let manager = Self::new(base_url)?;
        manager.set_dispatch(dispatch);
        Ok(manager)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register the dispatch callback, replacing any previous one.
    ///
    /// Resolvers already bound to this manager pick up the new callback on
    /// their next invocation.
    pub fn set_dispatch<F>(&self, dispatch: F)
    where
        F: Fn(RequestDescriptor) + Send + Sync + 'static,
    {
        *self.dispatch.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(dispatch));
    }

    /// Remove the dispatch callback.
    pub fn clear_dispatch(&self) {
        *self.dispatch.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn has_dispatch(&self) -> bool {
        self.dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Bind a registry, validating payloads with [`JsonSchemaValidator`].
    pub fn bind_schema(&self, registry: SchemaRegistry) -> Resolver<'_> {
        self.bind_schema_with(registry, JsonSchemaValidator, ValidateOptions::default())
    }

    /// Bind a registry with a custom validator and options.
    pub fn bind_schema_with<V>(
        &self,
        registry: SchemaRegistry,
        validator: V,
        options: ValidateOptions,
    ) -> Resolver<'_>
    where
        V: SchemaValidator + 'static,
    {
        Resolver {
            manager: self,
            registry,
            validator: Box::new(validator),
            options,
        }
    }

    fn dispatch(&self, descriptor: RequestDescriptor) {
        // Clone out of the slot so the callback may replace itself.
        let target = self
            .dispatch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match target {
            Some(dispatch) => {
                tracing::debug!(
                    method = %descriptor.method,
                    url = %descriptor.url,
                    "dispatching request"
                );
                dispatch(descriptor);
            }
            None => {
                tracing::debug!(?descriptor, "no dispatch registered, request dropped");
            }
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("base_url", &self.base_url)
            .field("has_dispatch", &self.has_dispatch())
            .finish()
    }
}

/// Stage 1: resource lookup over a bound registry.
pub struct Resolver<'a> {
    manager: &'a Manager,
    registry: SchemaRegistry,
    validator: Box<dyn SchemaValidator>,
    options: ValidateOptions,
}

impl Resolver<'_> {
    /// Look up a resource by name.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::PathNotInSchema`, listing every registered
    /// resource, if `name` is not in the registry.
    pub fn path(&self, name: &str) -> Result<PathBuilder<'_>, ManagerError> {
        let Some(definition) = self.registry.get(name) else {
            return Err(ManagerError::PathNotInSchema {
                path: name.to_string(),
                valid: self.registry.names(),
            });
        };
        tracing::trace!(path = name, "resource resolved");
        Ok(PathBuilder {
            resolver: self,
            name: name.to_string(),
            definition,
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn manager(&self) -> &Manager {
        self.manager
    }
}

/// A resolved resource waiting for its optional fragment arguments.
///
/// Clone it to build accessors for several sets of arguments.
#[derive(Clone)]
pub struct PathBuilder<'a> {
    resolver: &'a Resolver<'a>,
    name: String,
    definition: &'a ResourceDefinition,
}

impl<'a> PathBuilder<'a> {
    /// Supply the fragment arguments for the resource's path template.
    ///
    /// `None` (or a resource without a template) leaves the URL at the base.
    pub fn fragment(self, args: Option<FragmentArgs>) -> MethodAccessor<'a> {
        MethodAccessor {
            resolver: self.resolver,
            name: self.name,
            definition: self.definition,
            fragment_args: args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Stage 2: verb lookup for one resource.
///
/// Can be kept and used for several verbs.
pub struct MethodAccessor<'a> {
    resolver: &'a Resolver<'a>,
    name: String,
    definition: &'a ResourceDefinition,
    fragment_args: Option<FragmentArgs>,
}

impl MethodAccessor<'_> {
    /// Look up a verb by name.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::InvalidHttpMethod` if `verb` is not an HTTP
    /// method at all, or `ManagerError::MethodNotSupported` if this resource
    /// does not permit it.
    pub fn method(&self, verb: &str) -> Result<Invocation<'_>, ManagerError> {
        let method = HttpMethod::parse(verb).ok_or_else(|| ManagerError::InvalidHttpMethod {
            method: verb.to_string(),
        })?;
        self.verb(method)
    }

    /// Typed form of [`method`](Self::method).
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::MethodNotSupported` if this resource does not
    /// permit `method`.
    pub fn verb(&self, method: HttpMethod) -> Result<Invocation<'_>, ManagerError> {
        if !self.definition.supports(method) {
            return Err(ManagerError::MethodNotSupported {
                method,
                path: self.name.clone(),
                supported: self.definition.methods().to_vec(),
            });
        }
        Ok(Invocation {
            accessor: self,
            method,
        })
    }

    pub fn fragment_args(&self) -> Option<&FragmentArgs> {
        self.fragment_args.as_ref()
    }
}

/// Stage 3: a resource and verb ready to be called, any number of times.
pub struct Invocation<'a> {
    accessor: &'a MethodAccessor<'a>,
    method: HttpMethod,
}

impl Invocation<'_> {
    /// Validate the payloads and build the descriptor without dispatching.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::Validation` for the first payload failure,
    /// `ManagerError::InvalidSchema` or `ManagerError::Template` otherwise.
    pub fn prepare(&self, params: Value, body: Value) -> Result<RequestDescriptor, ManagerError> {
        let accessor = self.accessor;
        let resolver = accessor.resolver;
        RequestContext {
            resource: &accessor.name,
            definition: accessor.definition,
            base_url: resolver.manager.base_url(),
            fragment_args: accessor.fragment_args.as_ref(),
            validator: &*resolver.validator,
            options: resolver.options,
        }
        .validate_and_compile(self.method, params, body)
    }

    /// Validate, build and hand the descriptor to the manager's current
    /// dispatch callback. The callback's outcome is not observed.
    ///
    /// # Errors
    ///
    /// Same as [`prepare`](Self::prepare); nothing is dispatched on error.
    pub fn invoke(&self, params: Value, body: Value) -> Result<(), ManagerError> {
        let descriptor = self.prepare(params, body)?;
        self.accessor.resolver.manager.dispatch(descriptor);
        Ok(())
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }
}
