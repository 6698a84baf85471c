// Dictionary binding

use super::collection::{bind_collection, bind_empty_top_level, element_binder_for};
use crate::binding::{
    Model, ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext,
    ModelBindingResult,
};
use crate::conversion::convert_to;
use crate::culture::Culture;
use crate::logging::{debug, trace};
use crate::metadata::ModelMetadata;
use crate::model_type::{ModelType, TypeShape};
use crate::validation::ValidationNode;
use crate::value_provider::ValueProvider;
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Binds `name[i].Key`/`name[i].Value` pairs, falling back to
/// `name[key]=value` entries.
///
/// Keys always convert with the invariant culture. In the fallback form a
/// value that fails to bind still inserts its key with the value type's
/// default; the failure stays recorded in model state.
pub struct DictionaryModelBinder {
    entry_metadata: Arc<ModelMetadata>,
    entry_binder: Arc<dyn ModelBinder>,
    key_type: ModelType,
    value_metadata: Arc<ModelMetadata>,
    value_binder: Arc<dyn ModelBinder>,
}

impl DictionaryModelBinder {
    pub fn new(
        entry_metadata: Arc<ModelMetadata>,
        entry_binder: Arc<dyn ModelBinder>,
        key_type: ModelType,
        value_metadata: Arc<ModelMetadata>,
        value_binder: Arc<dyn ModelBinder>,
    ) -> Self {
        Self {
            entry_metadata,
            entry_binder,
            key_type,
            value_metadata,
            value_binder,
        }
    }

    async fn bind_keyed_entries(
        &self,
        ctx: &mut ModelBindingContext<'_>,
        map: &mut Map<String, Value>,
        node: &mut ValidationNode,
    ) -> Result<()> {
        let keys = match ctx.value_provider.as_enumerable() {
            Some(enumerable) => enumerable.get_keys_from_prefix(&ctx.model_name),
            None => return Ok(()),
        };

        let invariant = Culture::invariant();
        let field = ctx.field_name.clone();
        for (short_key, full_key) in keys {
            let key = match convert_to(&self.key_type, &short_key, &invariant) {
                Ok(Value::Null) | Err(_) => {
                    trace!(model_name = %full_key, "Dictionary key did not convert");
                    let message = ctx
                        .messages()
                        .non_property_attempted_value_is_invalid(&short_key);
                    ctx.model_state.add_model_error(&full_key, message);
                    continue;
                }
                Ok(converted) => json_key(converted),
            };

            let mut child = ctx.nested(self.value_metadata.clone(), field.clone(), full_key, None);
            self.value_binder.bind_model(&mut child).await?;
            let value = match std::mem::take(&mut child.result) {
                ModelBindingResult::Success(Model::Value(value)) => {
                    let child_node = child.validation_node.take().unwrap_or_else(|| {
                        ValidationNode::new(child.model_name.clone(), child.metadata.clone())
                    });
                    node.add_child(child_node);
                    value
                }
                _ => self.value_metadata.model_type().default_value(),
            };
            map.insert(key, value);
        }
        Ok(())
    }
}

#[async_trait]
impl ModelBinder for DictionaryModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        if !ctx.value_provider.contains_prefix(&ctx.model_name) {
            bind_empty_top_level(ctx, Value::Object(Map::new()));
            return Ok(());
        }

        let mut map = Map::new();
        let mut node = ValidationNode::new(ctx.model_name.clone(), ctx.metadata.clone());
        let entries = bind_collection(ctx, &self.entry_metadata, &*self.entry_binder).await?;
        for entry in entries {
            if let Value::Object(mut pair) = entry.value {
                let key = pair.remove("Key").map(json_key).unwrap_or_default();
                let value = pair.remove("Value").unwrap_or(Value::Null);
                map.insert(key, value);
                node.add_child(entry.node);
            }
        }

        if map.is_empty() {
            self.bind_keyed_entries(ctx, &mut map, &mut node).await?;
        }

        if map.is_empty() && !ctx.is_top_level_object {
            return Ok(());
        }
        debug!(model_name = %ctx.model_name, entries = map.len(), "Bound dictionary");
        ctx.validation_node = Some(node);
        ctx.set_success(Value::Object(map));
        Ok(())
    }
}

/// JSON object key for a converted dictionary key
fn json_key(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct DictionaryModelBinderProvider;

impl ModelBinderProvider for DictionaryModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        let TypeShape::Dictionary { key, value, entry } = model_type.shape() else {
            return Ok(None);
        };
        let (entry_metadata, entry_binder) = element_binder_for(context, &entry())?;
        let (value_metadata, value_binder) = element_binder_for(context, &value())?;
        Ok(Some(Arc::new(DictionaryModelBinder::new(
            entry_metadata,
            entry_binder,
            key(),
            value_metadata,
            value_binder,
        ))))
    }
}
