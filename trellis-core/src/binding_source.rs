//! Where a model's data comes from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of the data a model is bound from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingSource {
    Body,
    Custom,
    Form,
    FormFile,
    Header,
    /// Any non-greedy request source
    ModelBinding,
    Path,
    Query,
    Services,
    Special,
}

impl BindingSource {
    /// Greedy sources bind a whole model in one step and are never combined
    /// with other sources.
    pub fn is_greedy(&self) -> bool {
        matches!(
            self,
            BindingSource::Body
                | BindingSource::FormFile
                | BindingSource::Header
                | BindingSource::Services
                | BindingSource::Special
        )
    }

    pub fn is_from_request(&self) -> bool {
        !matches!(self, BindingSource::Services | BindingSource::Special)
    }

    /// Whether a binder for `self` may use data produced by `other`
    pub fn can_accept_data_from(&self, other: BindingSource) -> bool {
        if *self == other {
            return true;
        }
        *self == BindingSource::ModelBinding && other.is_from_request() && !other.is_greedy()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BindingSource::Body => "Body",
            BindingSource::Custom => "Custom",
            BindingSource::Form => "Form",
            BindingSource::FormFile => "FormFile",
            BindingSource::Header => "Header",
            BindingSource::ModelBinding => "ModelBinding",
            BindingSource::Path => "Path",
            BindingSource::Query => "Query",
            BindingSource::Services => "Services",
            BindingSource::Special => "Special",
        }
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What a body binder does with an empty request body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmptyBodyBehavior {
    /// Follow `MvcOptions::allow_empty_input_in_body_model_binding`
    #[default]
    Default,
    Allow,
    Disallow,
}

/// Binding overrides declared on a parameter or property
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingInfo {
    pub binding_source: Option<BindingSource>,
    /// Alias used instead of the parameter or property name
    pub binder_model_name: Option<String>,
    /// Name of a custom binder registered in `MvcOptions`
    pub binder_type: Option<String>,
    pub empty_body_behavior: EmptyBodyBehavior,
}

impl BindingInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: BindingSource) -> Self {
        Self {
            binding_source: Some(source),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: BindingSource) -> Self {
        self.binding_source = Some(source);
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.binder_model_name = Some(name.into());
        self
    }

    pub fn with_binder(mut self, name: impl Into<String>) -> Self {
        self.binder_type = Some(name.into());
        self
    }

    pub fn with_empty_body_behavior(mut self, behavior: EmptyBodyBehavior) -> Self {
        self.empty_body_behavior = behavior;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
