// Property-by-property binding of complex types

use crate::binding::{
    create_property_model_name, Model, ModelBinder, ModelBinderProvider,
    ModelBinderProviderContext, ModelBindingContext, ModelBindingResult,
};
use crate::binding_source::BindingSource;
use crate::logging::{debug, trace};
use crate::metadata::ModelMetadata;
use crate::model_type::TypeShape;
use crate::validation::ValidationNode;
use crate::value_provider::ValueProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataAvailability {
    None,
    ValueProvider,
    /// Only greedy-source properties (files, headers, body) might bind
    GreedyPropertiesMayHaveData,
}

struct BoundProperty {
    metadata: Arc<ModelMetadata>,
    binder: Arc<dyn ModelBinder>,
}

/// Creates the default instance and binds each settable property in
/// declaration order under `name.Property`.
pub struct ComplexObjectModelBinder {
    properties: Vec<BoundProperty>,
}

impl ComplexObjectModelBinder {
    fn availability(&self, ctx: &ModelBindingContext<'_>) -> DataAvailability {
        if ctx.is_top_level_object {
            return DataAvailability::ValueProvider;
        }
        if ctx.binding_source.is_some_and(|s| s.is_greedy()) {
            return DataAvailability::None;
        }

        let mut has_greedy = false;
        for property in &self.properties {
            let metadata = &property.metadata;
            let source = metadata.binding_source();
            if source.is_some_and(|s| s.is_greedy()) {
                has_greedy = true;
                continue;
            }
            let field = metadata
                .binder_model_name()
                .or(metadata.name())
                .unwrap_or_default();
            let model_name = create_property_model_name(&ctx.model_name, field);
            let has_data = match source {
                Some(source) => ctx
                    .original_value_provider()
                    .filter(source)
                    .contains_prefix(&model_name),
                None => ctx.value_provider.contains_prefix(&model_name),
            };
            if has_data {
                return DataAvailability::ValueProvider;
            }
        }

        if has_greedy {
            DataAvailability::GreedyPropertiesMayHaveData
        } else {
            DataAvailability::None
        }
    }
}

#[async_trait]
impl ModelBinder for ComplexObjectModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let max_depth = ctx.options().max_model_binding_recursion_depth;
        if ctx.depth > max_depth {
            return Err(Error::RecursionDepthExceeded {
                depth: max_depth,
                model_name: ctx.model_name.clone(),
            });
        }

        let availability = self.availability(ctx);
        if availability == DataAvailability::None {
            trace!(model_name = %ctx.model_name, "No data for complex model");
            return Ok(());
        }

        let model_type = ctx.metadata.model_type().underlying();
        let constructible = model_type.as_complex().is_some_and(|c| c.constructible);
        let mut instance = match ctx.model.take() {
            Some(Model::Value(Value::Object(existing))) => existing,
            _ if !constructible => {
                let message = ctx.messages().could_not_create_instance(model_type.name());
                ctx.add_error(message);
                ctx.set_failed();
                return Ok(());
            }
            _ => match model_type.default_value() {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        };

        let mut node = ValidationNode::new(ctx.model_name.clone(), ctx.metadata.clone());
        let mut attempted = false;
        let mut succeeded = false;

        for property in &self.properties {
            let mut child = ctx.nested_property(property.metadata.clone(), None);
            property.binder.bind_model(&mut child).await?;

            match std::mem::take(&mut child.result) {
                ModelBindingResult::Success(Model::Value(value)) => {
                    attempted = true;
                    succeeded = true;
                    let child_node = child.validation_node.take().unwrap_or_else(|| {
                        ValidationNode::new(child.model_name.clone(), child.metadata.clone())
                    });
                    node.add_child(child_node);
                    if let Some(name) = property.metadata.name() {
                        instance.insert(name.to_string(), value);
                    }
                }
                _ if property.metadata.is_binding_required() => {
                    attempted = true;
                    let message = child.messages().missing_bind_required_value(&child.field_name);
                    let key = child.model_name.clone();
                    child.model_state.add_model_error(&key, message);
                }
                _ => {}
            }
        }

        if !attempted && ctx.is_top_level_object && ctx.metadata.is_binding_required() {
            let message = ctx.messages().missing_bind_required_value(&ctx.field_name);
            ctx.add_error(message);
        }

        if !succeeded && availability == DataAvailability::GreedyPropertiesMayHaveData {
            ctx.set_failed();
            return Ok(());
        }

        debug!(
            model_name = %ctx.model_name,
            model_type = model_type.name(),
            "Bound complex model"
        );
        ctx.validation_node = Some(node);
        ctx.set_success(Value::Object(instance));
        Ok(())
    }
}

/// Whether a property takes part in binding at all
fn is_bindable_property(metadata: &ModelMetadata) -> bool {
    metadata.is_binding_allowed()
        && !metadata.is_read_only()
        && metadata.binding_source() != Some(BindingSource::Services)
}

#[derive(Debug, Default)]
pub struct ComplexObjectModelBinderProvider;

impl ModelBinderProvider for ComplexObjectModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        if !matches!(model_type.shape(), TypeShape::Complex(_)) {
            return Ok(None);
        }

        let mut properties = Vec::new();
        for metadata in context.metadata_provider().properties_of(context.metadata()) {
            if !is_bindable_property(&metadata) {
                continue;
            }
            let binder = context.create_binder(metadata.clone())?;
            properties.push(BoundProperty { metadata, binder });
        }
        Ok(Some(Arc::new(ComplexObjectModelBinder { properties })))
    }
}
