// Per-attempt binding state

use super::model_names::{create_index_model_name, create_property_model_name};
use super::result::{Model, ModelBindingResult};
use crate::action::ActionContext;
use crate::binding_source::{BindingInfo, BindingSource};
use crate::metadata::{MetadataProvider, ModelMetadata};
use crate::model_state::ModelStateDictionary;
use crate::options::{ModelBindingMessageProvider, MvcOptions};
use crate::validation::ValidationNode;
use crate::value_provider::CompositeValueProvider;
use std::sync::Arc;

/// Mutable state for one bind attempt.
///
/// A top-level context is created per parameter; binders create children
/// with [`nested`](Self::nested) for properties and elements. A child
/// reborrows the parent's model state, so only one context is active at a
/// time.
pub struct ModelBindingContext<'a> {
    action_context: &'a ActionContext,
    metadata_provider: &'a MetadataProvider,
    pub model_state: &'a mut ModelStateDictionary,
    /// Provider scoped to the current binding source
    pub value_provider: Arc<CompositeValueProvider>,
    original_value_provider: Arc<CompositeValueProvider>,
    pub metadata: Arc<ModelMetadata>,
    pub binding_source: Option<BindingSource>,
    pub binder_model_name: Option<String>,
    pub field_name: String,
    pub model_name: String,
    /// Name of the top-level model this context descends from
    pub original_model_name: String,
    pub is_top_level_object: bool,
    /// Existing model, if any
    pub model: Option<Model>,
    pub result: ModelBindingResult,
    pub validation_node: Option<ValidationNode>,
    pub depth: usize,
}

impl<'a> ModelBindingContext<'a> {
    /// Context for a top-level parameter
    #[allow(clippy::too_many_arguments)]
    pub fn top_level(
        action_context: &'a ActionContext,
        metadata_provider: &'a MetadataProvider,
        model_state: &'a mut ModelStateDictionary,
        value_provider: Arc<CompositeValueProvider>,
        metadata: Arc<ModelMetadata>,
        binding_info: &BindingInfo,
        model_name: impl Into<String>,
    ) -> Self {
        let model_name = model_name.into();
        let binder_model_name = binding_info
            .binder_model_name
            .clone()
            .or_else(|| metadata.binder_model_name().map(str::to_string));
        let binding_source = binding_info.binding_source.or(metadata.binding_source());
        let scoped = filter_by_source(&value_provider, binding_source);
        let name = binder_model_name.clone().unwrap_or(model_name);

        Self {
            action_context,
            metadata_provider,
            model_state,
            value_provider: scoped,
            original_value_provider: value_provider,
            metadata,
            binding_source,
            binder_model_name,
            field_name: name.clone(),
            model_name: name.clone(),
            original_model_name: name,
            is_top_level_object: true,
            model: None,
            result: ModelBindingResult::NoResult,
            validation_node: None,
            depth: 0,
        }
    }

    /// Child context for a property or element.
    ///
    /// The child re-filters the original provider when the new metadata
    /// names its own non-greedy source, and otherwise keeps the parent's.
    pub fn nested(
        &mut self,
        metadata: Arc<ModelMetadata>,
        field_name: impl Into<String>,
        model_name: impl Into<String>,
        model: Option<Model>,
    ) -> ModelBindingContext<'_> {
        let binding_source = metadata.binding_source();
        let value_provider = match binding_source {
            Some(source) if !source.is_greedy() => {
                filter_by_source(&self.original_value_provider, Some(source))
            }
            _ => self.value_provider.clone(),
        };

        ModelBindingContext {
            action_context: self.action_context,
            metadata_provider: self.metadata_provider,
            model_state: &mut *self.model_state,
            value_provider,
            original_value_provider: self.original_value_provider.clone(),
            binder_model_name: metadata.binder_model_name().map(str::to_string),
            binding_source,
            metadata,
            field_name: field_name.into(),
            model_name: model_name.into(),
            original_model_name: self.original_model_name.clone(),
            is_top_level_object: false,
            model,
            result: ModelBindingResult::NoResult,
            validation_node: None,
            depth: self.depth + 1,
        }
    }

    /// Child context for property `name` of the current model
    pub fn nested_property(
        &mut self,
        metadata: Arc<ModelMetadata>,
        model: Option<Model>,
    ) -> ModelBindingContext<'_> {
        let field = metadata
            .binder_model_name()
            .or(metadata.name())
            .unwrap_or_default()
            .to_string();
        let model_name = create_property_model_name(&self.model_name, &field);
        self.nested(metadata, field, model_name, model)
    }

    /// Child context for element `index` of the current collection
    pub fn nested_element(
        &mut self,
        metadata: Arc<ModelMetadata>,
        index: &str,
    ) -> ModelBindingContext<'_> {
        let field = self.field_name.clone();
        let model_name = create_index_model_name(&self.model_name, index);
        self.nested(metadata, field, model_name, None)
    }

    pub fn action_context(&self) -> &'a ActionContext {
        self.action_context
    }

    pub fn metadata_provider(&self) -> &'a MetadataProvider {
        self.metadata_provider
    }

    pub fn options(&self) -> &'a MvcOptions {
        &self.action_context.options
    }

    pub fn messages(&self) -> &'a ModelBindingMessageProvider {
        &self.action_context.options.messages
    }

    pub fn original_value_provider(&self) -> &Arc<CompositeValueProvider> {
        &self.original_value_provider
    }

    /// Record `ModelBindingResult::Success`
    pub fn set_success(&mut self, model: impl Into<Model>) {
        self.result = ModelBindingResult::Success(model.into());
    }

    pub fn set_failed(&mut self) {
        self.result = ModelBindingResult::Failed;
    }

    /// Record an error at the current model name
    pub fn add_error(&mut self, message: impl Into<String>) -> bool {
        let key = self.model_name.clone();
        self.model_state.add_model_error(&key, message)
    }
}

fn filter_by_source(
    provider: &Arc<CompositeValueProvider>,
    source: Option<BindingSource>,
) -> Arc<CompositeValueProvider> {
    match source {
        Some(source) if !source.is_greedy() => Arc::new(provider.filter(source)),
        _ => provider.clone(),
    }
}

impl std::fmt::Debug for ModelBindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBindingContext")
            .field("model_name", &self.model_name)
            .field("model_type", &self.metadata.model_type().name())
            .field("binding_source", &self.binding_source)
            .field("is_top_level_object", &self.is_top_level_object)
            .field("depth", &self.depth)
            .field("result", &self.result)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use crate::model_type::{Attribute, Bindable, ModelType};
    use crate::value_provider::{QueryStringValueProvider, RouteValueProvider};
    use std::collections::HashMap;

    struct Filter;

    impl Bindable for Filter {
        fn model_type() -> ModelType {
            ModelType::complex::<Self>()
                .property_with::<i32>("Page", [Attribute::from_query(None)])
                .property::<String>("Term")
                .build()
        }
    }

    fn providers() -> Arc<CompositeValueProvider> {
        let mut route = HashMap::new();
        route.insert("filter.Page".to_string(), "7".to_string());
        Arc::new(CompositeValueProvider::new(vec![
            Arc::new(RouteValueProvider::new(&route)),
            Arc::new(QueryStringValueProvider::new(vec![(
                "filter.Page".to_string(),
                "2".to_string(),
            )])),
        ]))
    }

    #[test]
    fn test_nested_names_and_filtering() {
        let action = ActionContext::new(HttpRequest::get("/"), Arc::new(MvcOptions::new()));
        let metadata = MetadataProvider::new();
        let mut state = ModelStateDictionary::new();
        let mut ctx = ModelBindingContext::top_level(
            &action,
            &metadata,
            &mut state,
            providers(),
            metadata.metadata_for::<Filter>(),
            &BindingInfo::default(),
            "filter",
        );
        assert!(ctx.is_top_level_object);
        assert_eq!(ctx.value_provider.len(), 2);

        let page = metadata
            .metadata_for_property(&Filter::model_type(), "Page")
            .unwrap();
        let child = ctx.nested_property(page, None);
        assert_eq!(child.model_name, "filter.Page");
        assert_eq!(child.original_model_name, "filter");
        assert_eq!(child.depth, 1);
        assert!(!child.is_top_level_object);
        // Only the query provider survives the [FromQuery] filter
        assert_eq!(child.value_provider.len(), 1);
    }

    #[test]
    fn test_alias_replaces_model_name() {
        let action = ActionContext::new(HttpRequest::get("/"), Arc::new(MvcOptions::new()));
        let metadata = MetadataProvider::new();
        let mut state = ModelStateDictionary::new();
        let ctx = ModelBindingContext::top_level(
            &action,
            &metadata,
            &mut state,
            providers(),
            metadata.metadata_for::<i32>(),
            &BindingInfo::default().with_model_name("p"),
            "page",
        );
        assert_eq!(ctx.model_name, "p");
        assert_eq!(ctx.binder_model_name.as_deref(), Some("p"));
    }

    #[test]
    fn test_element_names() {
        let action = ActionContext::new(HttpRequest::get("/"), Arc::new(MvcOptions::new()));
        let metadata = MetadataProvider::new();
        let mut state = ModelStateDictionary::new();
        let mut ctx = ModelBindingContext::top_level(
            &action,
            &metadata,
            &mut state,
            providers(),
            metadata.metadata_for::<Vec<i32>>(),
            &BindingInfo::default(),
            "",
        );
        let element = ctx.nested_element(metadata.metadata_for::<i32>(), "3");
        assert_eq!(element.model_name, "[3]");
    }
}
