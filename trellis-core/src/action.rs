//! Actions, their parameters and the per-request context.

use crate::binding_source::{BindingInfo, BindingSource};
use crate::container::Container;
use crate::http::HttpRequest;
use crate::logging::debug;
use crate::metadata::MetadataProvider;
use crate::model_type::{Attribute, Bindable, ModelType, TypeShape};
use crate::options::MvcOptions;
use crate::{Error, Result};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything binding needs to know about the current request
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub request: HttpRequest,
    pub services: Container,
    pub options: Arc<MvcOptions>,
    pub cancellation: CancellationToken,
}

impl ActionContext {
    pub fn new(request: HttpRequest, options: Arc<MvcOptions>) -> Self {
        Self {
            request,
            services: Container::new(),
            options,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_services(mut self, services: Container) -> Self {
        self.services = services;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// A handler parameter to bind
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub model_type: ModelType,
    pub binding_info: BindingInfo,
    pub attributes: Vec<Attribute>,
}

impl ParameterDescriptor {
    pub fn new<T: Bindable>(name: impl Into<String>) -> Self {
        Self::with_type(name, T::model_type())
    }

    pub fn with_type(name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            name: name.into(),
            model_type,
            binding_info: BindingInfo::default(),
            attributes: Vec::new(),
        }
    }

    pub fn from_source(mut self, source: BindingSource) -> Self {
        self.binding_info.binding_source = Some(source);
        self
    }

    pub fn with_binding_info(mut self, info: BindingInfo) -> Self {
        self.binding_info = info;
        self
    }

    /// Bind under `alias` instead of the parameter name
    pub fn with_model_name(mut self, alias: impl Into<String>) -> Self {
        self.binding_info.binder_model_name = Some(alias.into());
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A routed handler and its parameters, in declaration order
#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Startup check for configurations binding can never satisfy.
    ///
    /// Fails when more than one parameter binds from the body, or when a
    /// parameter (or any property reachable from it) names a custom binder
    /// that is not registered in `options`.
    pub fn validate(&self, options: &MvcOptions, metadata: &MetadataProvider) -> Result<()> {
        let mut body_parameters = Vec::new();
        for parameter in &self.parameters {
            let param_metadata = metadata
                .metadata_for_parameter(&parameter.model_type, &parameter.name, &parameter.attributes)
                .with_binding_info(&parameter.binding_info);

            if param_metadata.binding_source() == Some(BindingSource::Body) {
                body_parameters.push(parameter.name.as_str());
            }
            if let Some(binder) = param_metadata.binder_type() {
                ensure_registered(options, binder)?;
            }
            let mut visited = HashSet::new();
            validate_binder_types(options, &parameter.model_type, &mut visited)?;
        }

        if body_parameters.len() > 1 {
            return Err(Error::AmbiguousBody {
                action: self.name.clone(),
                parameters: body_parameters.join(", "),
            });
        }

        debug!(action = %self.name, parameters = self.parameters.len(), "Action validated");
        Ok(())
    }
}

fn ensure_registered(options: &MvcOptions, binder: &str) -> Result<()> {
    if options.custom_binders.contains_key(binder) {
        Ok(())
    } else {
        Err(Error::InvalidBinderType(binder.to_string()))
    }
}

fn validate_binder_types(
    options: &MvcOptions,
    model_type: &ModelType,
    visited: &mut HashSet<TypeId>,
) -> Result<()> {
    if !visited.insert(model_type.id()) {
        return Ok(());
    }
    match model_type.shape() {
        TypeShape::Complex(complex) => {
            for attribute in &complex.attributes {
                if let Attribute::ModelBinder(name) = attribute {
                    ensure_registered(options, name)?;
                }
            }
            for property in &complex.properties {
                for attribute in &property.attributes {
                    if let Attribute::ModelBinder(name) = attribute {
                        ensure_registered(options, name)?;
                    }
                }
                validate_binder_types(options, &property.model_type(), visited)?;
            }
            Ok(())
        }
        TypeShape::Nullable(inner) | TypeShape::Array(inner) | TypeShape::Collection(inner) => {
            validate_binder_types(options, &inner(), visited)
        }
        TypeShape::Dictionary { key, value, .. } | TypeShape::KeyValuePair { key, value } => {
            validate_binder_types(options, &key(), visited)?;
            validate_binder_types(options, &value(), visited)
        }
        _ => Ok(()),
    }
}
