//! Request validation and URL compilation.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;

use crate::error::{ManagerError, PayloadTarget};
use crate::registry::{PathTemplate, ResourceDefinition};
use crate::types::{is_empty_payload, FragmentArgs, HttpMethod};
use crate::validator::{close_additional_properties, SchemaValidator};

/// The assembled request handed to the dispatch callback.
///
/// Built fresh for every invocation. `params` and `body` are the caller's
/// values, untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub params: Value,
    pub body: Value,
    pub url: String,
}

/// Options applied when validating payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// When true, sets `additionalProperties: false` on all object schemas
    /// before validating, so unknown fields are rejected.
    pub strict: bool,
    /// When true, empty payloads (`null`, `{}`, `[]`) are validated too.
    /// Off by default: an empty body passes even if its schema has `required`
    /// fields.
    pub validate_empty: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode (additionalProperties: false on all objects).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate empty payloads instead of skipping them.
    pub fn validate_empty(mut self, validate_empty: bool) -> Self {
        self.validate_empty = validate_empty;
        self
    }
}

/// Compile the request URL.
///
/// With both a template and fragment arguments the URL is
/// `base_url + template(args)`; otherwise it is `base_url` unchanged.
///
/// # Errors
///
/// Returns `ManagerError::Template` if a pattern references a missing argument.
pub fn compile_url(
    resource: &str,
    base_url: &str,
    template: Option<&PathTemplate>,
    fragment_args: Option<&FragmentArgs>,
) -> Result<String, ManagerError> {
    let (Some(template), Some(args)) = (template, fragment_args) else {
        return Ok(base_url.to_string());
    };
    let fragment = template
        .render(args)
        .map_err(|message| ManagerError::Template {
            path: resource.to_string(),
            message,
        })?;
    Ok(format!("{base_url}{fragment}"))
}

/// Everything needed to turn one call into a [`RequestDescriptor`].
pub struct RequestContext<'a> {
    pub resource: &'a str,
    pub definition: &'a ResourceDefinition,
    pub base_url: &'a str,
    pub fragment_args: Option<&'a FragmentArgs>,
    pub validator: &'a dyn SchemaValidator,
    pub options: ValidateOptions,
}

impl RequestContext<'_> {
    /// Validate `params` and `body`, then compile the descriptor.
    ///
    /// Only the first failure of each payload is surfaced. Params are
    /// checked before the body.
    ///
    /// # Errors
    ///
    /// Returns `ManagerError::Validation` for a payload that breaks its
    /// schema, `ManagerError::InvalidSchema` if the declared schema is
    /// unusable, or `ManagerError::Template` if the URL cannot be built.
    pub fn validate_and_compile(
        &self,
        method: HttpMethod,
        params: Value,
        body: Value,
    ) -> Result<RequestDescriptor, ManagerError> {
        self.check(
            PayloadTarget::Params,
            &params,
            self.definition.params_validator(),
        )?;
        self.check(PayloadTarget::Body, &body, self.definition.body_validator())?;

        let url = compile_url(
            self.resource,
            self.base_url,
            self.definition.template(),
            self.fragment_args,
        )?;

        Ok(RequestDescriptor {
            method,
            params,
            body,
            url,
        })
    }

    fn check(
        &self,
        target: PayloadTarget,
        payload: &Value,
        schema: Option<&Value>,
    ) -> Result<(), ManagerError> {
        let Some(schema) = schema else {
            return Ok(());
        };
        if !self.options.validate_empty && is_empty_payload(payload) {
            return Ok(());
        }

        let schema = if self.options.strict {
            let mut closed = schema.clone();
            close_additional_properties(&mut closed);
            Cow::Owned(closed)
        } else {
            Cow::Borrowed(schema)
        };
        let validation = self
            .validator
            .validate(payload, &schema)
            .map_err(|message| ManagerError::InvalidSchema { target, message })?;

        match validation.errors.into_iter().next() {
            None => Ok(()),
            Some(error) => {
                tracing::trace!(resource = self.resource, %target, %error, "payload rejected");
                Err(ManagerError::Validation { target, error })
            }
        }
    }
}
