//! Schema registry: named resources with their permitted verbs, payload
//! schemas and URL path templates.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RegistryError;
use crate::types::{FragmentArgs, HttpMethod};

/// `${ name }` placeholders inside a path pattern.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\}").expect("placeholder regex is valid")
});

type RenderFn = dyn Fn(&FragmentArgs) -> String + Send + Sync;

/// Produces the URL fragment appended to the base URL for a resource.
#[derive(Clone)]
pub enum PathTemplate {
    /// A string with `${ name }` placeholders, e.g. `"/${ productId }"`.
    Pattern(String),
    /// Caller-supplied rendering function.
    Custom(Arc<RenderFn>),
}

impl PathTemplate {
    /// Template from a `${ name }` pattern string.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        PathTemplate::Pattern(pattern.into())
    }

    /// Template from a closure. The closure alone decides the output.
    pub fn custom<F>(render: F) -> Self
    where
        F: Fn(&FragmentArgs) -> String + Send + Sync + 'static,
    {
        PathTemplate::Custom(Arc::new(render))
    }

    /// Placeholder names referenced by a pattern, in order of appearance.
    ///
    /// Always empty for custom templates.
    pub fn placeholders(&self) -> Vec<&str> {
        match self {
            PathTemplate::Pattern(pattern) => PLACEHOLDER_RE
                .captures_iter(pattern)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect(),
            PathTemplate::Custom(_) => Vec::new(),
        }
    }

    /// Render the fragment for the given arguments.
    ///
    /// String values are inserted verbatim, other values as their JSON text.
    /// Nothing is escaped or encoded.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first placeholder with no matching argument.
    pub fn render(&self, args: &FragmentArgs) -> Result<String, String> {
        let pattern = match self {
            PathTemplate::Pattern(pattern) => pattern,
            PathTemplate::Custom(render) => return Ok(render(args)),
        };

        let mut out = String::with_capacity(pattern.len());
        let mut last = 0;
        for caps in PLACEHOLDER_RE.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = args
                .get(name.as_str())
                .ok_or_else(|| format!("{} is not defined", name.as_str()))?;
            out.push_str(&pattern[last..whole.start()]);
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            last = whole.end();
        }
        out.push_str(&pattern[last..]);
        Ok(out)
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathTemplate::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            PathTemplate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One named entry of a [`SchemaRegistry`].
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    methods: Vec<HttpMethod>,
    params_schema: Option<Value>,
    body_schema: Option<Value>,
    path_template: Option<PathTemplate>,
}

impl ResourceDefinition {
    /// A resource permitting the given verbs. Duplicates are dropped, order kept.
    pub fn new(methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        let mut unique = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }
        Self {
            methods: unique,
            params_schema: None,
            body_schema: None,
            path_template: None,
        }
    }

    /// Set the JSON Schema for query/params payloads.
    pub fn params_schema(mut self, schema: Value) -> Self {
        self.params_schema = Some(schema);
        self
    }

    /// Set the JSON Schema for body payloads.
    pub fn body_schema(mut self, schema: Value) -> Self {
        self.body_schema = Some(schema);
        self
    }

    /// Set the path template appended to the base URL.
    pub fn path_template(mut self, template: PathTemplate) -> Self {
        self.path_template = Some(template);
        self
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn supports(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn params_validator(&self) -> Option<&Value> {
        self.params_schema.as_ref()
    }

    pub fn body_validator(&self) -> Option<&Value> {
        self.body_schema.as_ref()
    }

    pub fn template(&self) -> Option<&PathTemplate> {
        self.path_template.as_ref()
    }
}

/// JSON shape of a resource definition.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResource {
    methods: Vec<String>,
    #[serde(default)]
    params_validator: Option<Value>,
    #[serde(default)]
    body_validator: Option<Value>,
    #[serde(default)]
    path: Option<String>,
}

impl RawResource {
    fn into_definition(self, name: &str) -> Result<ResourceDefinition, RegistryError> {
        let methods = self
            .methods
            .iter()
            .map(|m| {
                HttpMethod::parse(m).ok_or_else(|| RegistryError::UnknownMethod {
                    resource: name.to_string(),
                    method: m.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut def = ResourceDefinition::new(methods);
        def.params_schema = self.params_validator;
        def.body_schema = self.body_validator;
        def.path_template = self.path.map(PathTemplate::Pattern);
        Ok(def)
    }
}

/// Mapping from resource name to [`ResourceDefinition`].
///
/// Names are unique and kept in insertion order, which is the order used when
/// an error lists the valid resources.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    resources: Vec<(String, ResourceDefinition)>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from its JSON form.
    ///
    /// ```json
    /// { "products": { "methods": ["get", "post"], "bodyValidator": { ... } },
    ///   "product":  { "methods": ["get"], "path": "/${ productId }" } }
    /// ```
    ///
    /// A `Value` cannot hold a repeated key: when the text named a resource
    /// twice, only the last definition is seen here. Load text through
    /// [`parse_document`](crate::parse_document) to reject repeats.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if the document is not an object of resource
    /// definitions or any definition breaks the registry invariants.
    pub fn from_value(value: &Value) -> Result<Self, RegistryError> {
        let Value::Object(entries) = value else {
            return Err(RegistryError::InvalidDefinition {
                resource: String::new(),
                message: "registry must be a JSON object".to_string(),
            });
        };

        let mut registry = Self::new();
        for (name, entry) in entries {
            let raw: RawResource = serde_json::from_value(entry.clone()).map_err(|e| {
                RegistryError::InvalidDefinition {
                    resource: name.clone(),
                    message: e.to_string(),
                }
            })?;
            registry.insert(name.clone(), raw.into_definition(name)?)?;
        }
        Ok(registry)
    }

    /// Add a resource.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateResource` if the name is taken, or
    /// `RegistryError::NoMethods` if the definition permits no verbs.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: ResourceDefinition,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(RegistryError::DuplicateResource { name });
        }
        if definition.methods.is_empty() {
            return Err(RegistryError::NoMethods { resource: name });
        }
        self.resources.push((name, definition));
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        definition: ResourceDefinition,
    ) -> Result<Self, RegistryError> {
        self.insert(name, definition)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    /// Resource names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.resources.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceDefinition)> {
        self.resources.iter().map(|(n, def)| (n.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
