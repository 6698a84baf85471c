// Details providers translate attributes into metadata fields

use super::{MetadataDetails, MetadataKey};
use crate::binding_source::BindingSource;
use crate::model_type::{Attribute, ModelType, TypeShape};

/// Inputs and output of one details pass
pub struct DetailsContext<'a> {
    pub key: &'a MetadataKey,
    pub model_type: &'a ModelType,
    /// Member attributes first, then the type's own attributes
    pub attributes: &'a [Attribute],
    pub details: &'a mut MetadataDetails,
}

/// Populates metadata details; providers run in registration order
pub trait MetadataDetailsProvider: Send + Sync {
    fn create_details(&self, context: &mut DetailsContext<'_>);
}

/// Infers a binding source from the model's shape
pub struct BindingSourceMetadataProvider;

impl MetadataDetailsProvider for BindingSourceMetadataProvider {
    fn create_details(&self, context: &mut DetailsContext<'_>) {
        let inferred = match context.model_type.underlying().shape() {
            TypeShape::FormFile | TypeShape::FormFileCollection => Some(BindingSource::FormFile),
            TypeShape::Array(element) | TypeShape::Collection(element)
                if matches!(element().shape(), TypeShape::FormFile) =>
            {
                Some(BindingSource::FormFile)
            }
            TypeShape::FormCollection => Some(BindingSource::Form),
            TypeShape::Opaque => Some(BindingSource::Services),
            _ => None,
        };
        if context.details.binding_source.is_none() {
            context.details.binding_source = inferred;
        }
    }
}

/// `BindNever`, `BindRequired`, `From*`, `ModelBinder` and `ReadOnly`.
///
/// The first attribute of each kind wins, so member attributes override
/// type attributes.
pub struct BindingAttributeMetadataProvider;

impl MetadataDetailsProvider for BindingAttributeMetadataProvider {
    fn create_details(&self, context: &mut DetailsContext<'_>) {
        let details = &mut *context.details;
        let mut behavior_set = false;
        let mut source_set = false;

        for attribute in context.attributes {
            match attribute {
                Attribute::BindNever if !behavior_set => {
                    details.is_binding_allowed = false;
                    details.is_binding_required = false;
                    behavior_set = true;
                }
                Attribute::BindRequired if !behavior_set => {
                    details.is_binding_allowed = true;
                    details.is_binding_required = true;
                    behavior_set = true;
                }
                Attribute::From { source, name } if !source_set => {
                    details.binding_source = Some(*source);
                    if name.is_some() {
                        details.binder_model_name = name.clone();
                    }
                    source_set = true;
                }
                Attribute::FromBody(behavior) if !source_set => {
                    details.binding_source = Some(BindingSource::Body);
                    details.empty_body_behavior = *behavior;
                    source_set = true;
                }
                Attribute::ModelBinder(name) if details.binder_type.is_none() => {
                    details.binder_type = Some(name.clone());
                }
                Attribute::ReadOnly => details.is_read_only = true,
                _ => {}
            }
        }

        if details.binder_type.is_some() && !source_set {
            details.binding_source = Some(BindingSource::Custom);
        }
    }
}

/// `DisplayName`, `DisplayFormat`, `NullDisplayText` and
/// `ConvertEmptyStringToNull`
pub struct DisplayMetadataProvider;

impl MetadataDetailsProvider for DisplayMetadataProvider {
    fn create_details(&self, context: &mut DetailsContext<'_>) {
        let details = &mut *context.details;
        for attribute in context.attributes.iter().rev() {
            match attribute {
                Attribute::DisplayName(name) => details.display_name = Some(name.clone()),
                Attribute::DisplayFormat { display, edit } => {
                    details.display_format = display.clone();
                    details.edit_format = edit.clone();
                }
                Attribute::NullDisplayText(text) => details.null_display_text = Some(text.clone()),
                Attribute::ConvertEmptyStringToNull(convert) => {
                    details.convert_empty_string_to_null = *convert
                }
                _ => {}
            }
        }
    }
}

/// `Required` and `ValidateNever`
pub struct ValidationMetadataProvider;

impl MetadataDetailsProvider for ValidationMetadataProvider {
    fn create_details(&self, context: &mut DetailsContext<'_>) {
        let details = &mut *context.details;
        // Non-nullable scalars are implicitly required
        details.is_required = matches!(context.model_type.shape(), TypeShape::Scalar(_));
        for attribute in context.attributes {
            match attribute {
                Attribute::Required => details.is_required = true,
                Attribute::ValidateNever => {
                    details.validate_children = false;
                    details.suppress_validation = true;
                }
                _ => {}
            }
        }
    }
}
