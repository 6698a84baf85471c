// Key/value pair binding

use crate::binding::{
    create_property_model_name, Model, ModelBinder, ModelBinderProvider,
    ModelBinderProviderContext, ModelBindingContext, ModelBindingResult,
};
use crate::metadata::ModelMetadata;
use crate::model_type::TypeShape;
use crate::validation::ValidationNode;
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Binds `name.Key` and `name.Value`
pub struct KeyValuePairModelBinder {
    key_metadata: Arc<ModelMetadata>,
    key_binder: Arc<dyn ModelBinder>,
    value_metadata: Arc<ModelMetadata>,
    value_binder: Arc<dyn ModelBinder>,
}

impl KeyValuePairModelBinder {
    pub fn new(
        key_metadata: Arc<ModelMetadata>,
        key_binder: Arc<dyn ModelBinder>,
        value_metadata: Arc<ModelMetadata>,
        value_binder: Arc<dyn ModelBinder>,
    ) -> Self {
        Self {
            key_metadata,
            key_binder,
            value_metadata,
            value_binder,
        }
    }
}

async fn bind_part(
    ctx: &mut ModelBindingContext<'_>,
    metadata: &Arc<ModelMetadata>,
    binder: &dyn ModelBinder,
    part: &str,
    node: &mut ValidationNode,
) -> Result<Option<Value>> {
    let model_name = create_property_model_name(&ctx.model_name, part);
    let mut child = ctx.nested(metadata.clone(), part, model_name, None);
    binder.bind_model(&mut child).await?;
    match std::mem::take(&mut child.result) {
        ModelBindingResult::Success(Model::Value(value)) => {
            if let Some(child_node) = child.validation_node.take() {
                node.add_child(child_node);
            }
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl ModelBinder for KeyValuePairModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let mut node = ValidationNode::new(ctx.model_name.clone(), ctx.metadata.clone());
        let key = bind_part(ctx, &self.key_metadata, &*self.key_binder, "Key", &mut node).await?;
        let value =
            bind_part(ctx, &self.value_metadata, &*self.value_binder, "Value", &mut node).await?;

        let pair = |key: Value, value: Value| {
            let mut map = Map::new();
            map.insert("Key".to_string(), key);
            map.insert("Value".to_string(), value);
            Value::Object(map)
        };

        match (key, value) {
            (Some(key), Some(value)) => {
                ctx.validation_node = Some(node);
                ctx.set_success(pair(key, value));
            }
            (None, Some(_)) => {
                let name = create_property_model_name(&ctx.model_name, "Key");
                let message = ctx.messages().missing_key_or_value();
                ctx.model_state.add_model_error(&name, message);
            }
            (Some(_), None) => {
                let name = create_property_model_name(&ctx.model_name, "Value");
                let message = ctx.messages().missing_key_or_value();
                ctx.model_state.add_model_error(&name, message);
            }
            (None, None) if ctx.is_top_level_object => {
                ctx.validation_node = Some(node);
                ctx.set_success(ctx.metadata.model_type().underlying().default_value());
            }
            (None, None) => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct KeyValuePairModelBinderProvider;

impl ModelBinderProvider for KeyValuePairModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        let TypeShape::KeyValuePair { key, value } = model_type.shape() else {
            return Ok(None);
        };
        let provider = context.metadata_provider();
        let key_metadata = provider.metadata_for_type(&key());
        let value_metadata = provider.metadata_for_type(&value());
        let key_binder = context.create_binder(key_metadata.clone())?;
        let value_binder = context.create_binder(value_metadata.clone())?;
        Ok(Some(Arc::new(KeyValuePairModelBinder::new(
            key_metadata,
            key_binder,
            value_metadata,
            value_binder,
        ))))
    }
}
