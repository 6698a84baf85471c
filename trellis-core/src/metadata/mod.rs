//! Model metadata: immutable per-type, per-property and per-parameter
//! descriptors consulted by binders.
//!
//! Metadata never holds references to other metadata. Properties and element
//! types are looked up through the [`MetadataProvider`], which keeps recursive
//! type graphs finite.

mod details;
mod provider;

pub use details::{
    BindingAttributeMetadataProvider, BindingSourceMetadataProvider, DetailsContext,
    DisplayMetadataProvider, MetadataDetailsProvider, ValidationMetadataProvider,
};
pub use provider::MetadataProvider;

use crate::binding_source::{BindingInfo, BindingSource, EmptyBodyBehavior};
use crate::model_type::{Attribute, ModelType, TypeShape};
use std::any::TypeId;

/// Identity of a metadata cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    Type(TypeId),
    Property {
        container: TypeId,
        name: String,
    },
    Parameter {
        model_type: TypeId,
        name: String,
        attributes: Vec<Attribute>,
    },
}

/// What a metadata instance describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Type,
    Property,
    Parameter,
}

/// Values produced by the details providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDetails {
    pub binding_source: Option<BindingSource>,
    pub binder_model_name: Option<String>,
    pub binder_type: Option<String>,
    pub empty_body_behavior: EmptyBodyBehavior,
    pub is_binding_allowed: bool,
    pub is_binding_required: bool,
    pub is_read_only: bool,
    pub is_required: bool,
    pub convert_empty_string_to_null: bool,
    pub display_name: Option<String>,
    pub display_format: Option<String>,
    pub edit_format: Option<String>,
    pub null_display_text: Option<String>,
    pub validate_children: bool,
    pub suppress_validation: bool,
}

impl Default for MetadataDetails {
    fn default() -> Self {
        Self {
            binding_source: None,
            binder_model_name: None,
            binder_type: None,
            empty_body_behavior: EmptyBodyBehavior::Default,
            is_binding_allowed: true,
            is_binding_required: false,
            is_read_only: false,
            is_required: false,
            convert_empty_string_to_null: true,
            display_name: None,
            display_format: None,
            edit_format: None,
            null_display_text: None,
            validate_children: true,
            suppress_validation: false,
        }
    }
}

/// Immutable description of a type, property or parameter
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    key: MetadataKey,
    kind: MetadataKind,
    model_type: ModelType,
    container_type: Option<ModelType>,
    name: Option<String>,
    attributes: Vec<Attribute>,
    details: MetadataDetails,
}

impl ModelMetadata {
    pub(crate) fn new(
        key: MetadataKey,
        kind: MetadataKind,
        model_type: ModelType,
        container_type: Option<ModelType>,
        name: Option<String>,
        attributes: Vec<Attribute>,
        details: MetadataDetails,
    ) -> Self {
        Self {
            key,
            kind,
            model_type,
            container_type,
            name,
            attributes,
            details,
        }
    }

    pub fn key(&self) -> &MetadataKey {
        &self.key
    }

    pub fn kind(&self) -> MetadataKind {
        self.kind
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn container_type(&self) -> Option<&ModelType> {
        self.container_type.as_ref()
    }

    /// Property or parameter name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn details(&self) -> &MetadataDetails {
        &self.details
    }

    pub fn is_complex_type(&self) -> bool {
        self.model_type.is_complex()
    }

    pub fn is_collection_type(&self) -> bool {
        matches!(
            self.model_type.shape(),
            TypeShape::Array(_) | TypeShape::Collection(_) | TypeShape::Dictionary { .. }
        )
    }

    pub fn is_enumerable_type(&self) -> bool {
        self.is_collection_type() || matches!(self.model_type.shape(), TypeShape::FormFileCollection)
    }

    pub fn is_nullable_value_type(&self) -> bool {
        self.model_type.is_nullable()
    }

    pub fn is_reference_or_nullable_type(&self) -> bool {
        self.model_type.accepts_null()
    }

    pub fn element_type(&self) -> Option<ModelType> {
        if self.is_enumerable_type() {
            self.model_type.element_type()
        } else {
            None
        }
    }

    pub fn binding_source(&self) -> Option<BindingSource> {
        self.details.binding_source
    }

    pub fn binder_model_name(&self) -> Option<&str> {
        self.details.binder_model_name.as_deref()
    }

    pub fn binder_type(&self) -> Option<&str> {
        self.details.binder_type.as_deref()
    }

    pub fn empty_body_behavior(&self) -> EmptyBodyBehavior {
        self.details.empty_body_behavior
    }

    pub fn is_binding_allowed(&self) -> bool {
        self.details.is_binding_allowed
    }

    pub fn is_binding_required(&self) -> bool {
        self.details.is_binding_required
    }

    pub fn is_read_only(&self) -> bool {
        self.details.is_read_only
    }

    pub fn is_required(&self) -> bool {
        self.details.is_required
    }

    pub fn convert_empty_string_to_null(&self) -> bool {
        self.details.convert_empty_string_to_null
    }

    pub fn display_name(&self) -> Option<&str> {
        self.details.display_name.as_deref()
    }

    pub fn display_format(&self) -> Option<&str> {
        self.details.display_format.as_deref()
    }

    pub fn edit_format(&self) -> Option<&str> {
        self.details.edit_format.as_deref()
    }

    pub fn null_display_text(&self) -> Option<&str> {
        self.details.null_display_text.as_deref()
    }

    pub fn validate_children(&self) -> bool {
        self.details.validate_children
    }

    pub fn suppress_validation(&self) -> bool {
        self.details.suppress_validation
    }

    /// Name shown in error messages: display name, then member name, then
    /// the short type name
    pub fn get_display_name(&self) -> &str {
        self.display_name()
            .or(self.name())
            .unwrap_or_else(|| self.model_type.short_name())
    }

    /// Binding overrides carried by this metadata
    pub fn binding_info(&self) -> BindingInfo {
        BindingInfo {
            binding_source: self.details.binding_source,
            binder_model_name: self.details.binder_model_name.clone(),
            binder_type: self.details.binder_type.clone(),
            empty_body_behavior: self.details.empty_body_behavior,
        }
    }

    /// Copy with binding overrides applied on top (parameter descriptors)
    pub fn with_binding_info(&self, info: &BindingInfo) -> Self {
        let mut copy = self.clone();
        if info.binding_source.is_some() {
            copy.details.binding_source = info.binding_source;
        }
        if info.binder_model_name.is_some() {
            copy.details.binder_model_name = info.binder_model_name.clone();
        }
        if info.binder_type.is_some() {
            copy.details.binder_type = info.binder_type.clone();
        }
        if info.empty_body_behavior != EmptyBodyBehavior::Default {
            copy.details.empty_body_behavior = info.empty_body_behavior;
        }
        copy
    }
}

impl PartialEq for ModelMetadata {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.kind == other.kind
            && self.model_type == other.model_type
            && self.container_type == other.container_type
            && self.name == other.name
            && self.attributes == other.attributes
            && self.details == other.details
    }
}

impl Eq for ModelMetadata {}
