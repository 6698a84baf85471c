// Sequence binding: arrays, vectors and sets

use crate::binding::{
    create_index_model_name, create_property_model_name, Model, ModelBinder,
    ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext, ModelBindingResult,
};
use crate::logging::{debug, trace};
use crate::metadata::ModelMetadata;
use crate::model_type::{ModelType, TypeShape};
use crate::validation::ValidationNode;
use crate::value_provider::{
    CompositeValueProvider, ElementalValueProvider, ValueProvider, ValueProviderResult,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// An element that bound, with its validation node
pub(crate) struct BoundElement {
    pub(crate) value: Value,
    pub(crate) node: ValidationNode,
}

/// Binds each element of a sequence with the element binder.
///
/// Elements come from repeated values under the model name
/// (`items=1&items=2`) or from indexed names (`items[0]`, `items[1]`).
/// Indices are the explicit `items.index` values, else the numeric
/// indices present in the request, else `0, 1, ...` up to the first gap.
pub struct CollectionModelBinder {
    element_metadata: Arc<ModelMetadata>,
    element_binder: Arc<dyn ModelBinder>,
}

impl CollectionModelBinder {
    pub fn new(element_metadata: Arc<ModelMetadata>, element_binder: Arc<dyn ModelBinder>) -> Self {
        Self {
            element_metadata,
            element_binder,
        }
    }
}

#[async_trait]
impl ModelBinder for CollectionModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        if !ctx.value_provider.contains_prefix(&ctx.model_name) {
            bind_empty_top_level(ctx, Value::Array(Vec::new()));
            return Ok(());
        }

        let elements = bind_collection(ctx, &self.element_metadata, &*self.element_binder).await?;
        if elements.is_empty() && !ctx.is_top_level_object {
            trace!(model_name = %ctx.model_name, "No collection elements bound");
            return Ok(());
        }

        let mut node = ValidationNode::new(ctx.model_name.clone(), ctx.metadata.clone());
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(element.value);
            node.add_child(element.node);
        }
        debug!(model_name = %ctx.model_name, elements = values.len(), "Bound collection");
        ctx.validation_node = Some(node);
        ctx.set_success(Value::Array(values));
        Ok(())
    }
}

/// Result for a collection or dictionary with no data under its name: an
/// empty model at the top level, nothing otherwise
pub(crate) fn bind_empty_top_level(ctx: &mut ModelBindingContext<'_>, empty: Value) {
    if !ctx.is_top_level_object {
        return;
    }
    if ctx.metadata.is_binding_required() {
        let message = ctx.messages().missing_bind_required_value(&ctx.field_name);
        ctx.add_error(message);
    }
    ctx.validation_node = Some(ValidationNode::new(ctx.model_name.clone(), ctx.metadata.clone()));
    ctx.set_success(empty);
}

/// Bind the elements under `ctx.model_name`, skipping those that fail
pub(crate) async fn bind_collection(
    ctx: &mut ModelBindingContext<'_>,
    element_metadata: &Arc<ModelMetadata>,
    element_binder: &dyn ModelBinder,
) -> Result<Vec<BoundElement>> {
    let values = ctx.value_provider.get_value(&ctx.model_name);
    if !values.is_empty() {
        return bind_simple_collection(ctx, element_metadata, element_binder, values).await;
    }

    let index_key = create_property_model_name(&ctx.model_name, "index");
    let explicit = ctx.value_provider.get_value(&index_key);
    let limit = ctx.options().max_model_binding_collection_size;

    let (indices, finite): (Box<dyn Iterator<Item = String> + Send>, bool) = if !explicit.is_empty() {
        (Box::new(explicit.values().to_vec().into_iter()), true)
    } else if let Some(harvested) = harvest_indices(&ctx.value_provider, &ctx.model_name) {
        (Box::new(harvested.into_iter()), true)
    } else {
        (Box::new((0..limit.saturating_add(1)).map(|i| i.to_string())), false)
    };

    let field = ctx.field_name.clone();
    let mut bound = Vec::new();
    for index in indices {
        let name = create_index_model_name(&ctx.model_name, &index);
        let mut child = ctx.nested(element_metadata.clone(), field.clone(), name, None);
        element_binder.bind_model(&mut child).await?;
        match take_element(&mut child) {
            Some(element) => bound.push(element),
            None if !finite => break,
            None => trace!(model_name = %child.model_name, "Skipping element that did not bind"),
        }
        if bound.len() > limit {
            return Err(Error::CollectionTooLarge {
                limit,
                model_name: collection_name(ctx, finite),
            });
        }
    }
    Ok(bound)
}

async fn bind_simple_collection(
    ctx: &mut ModelBindingContext<'_>,
    element_metadata: &Arc<ModelMetadata>,
    element_binder: &dyn ModelBinder,
    values: ValueProviderResult,
) -> Result<Vec<BoundElement>> {
    let key = ctx.model_name.clone();
    let field = ctx.field_name.clone();
    let limit = ctx.options().max_model_binding_collection_size;
    ctx.model_state.set_model_value(&key, &values);

    let mut bound = Vec::new();
    for value in values.values() {
        let mut child = ctx.nested(element_metadata.clone(), field.clone(), key.clone(), None);
        child.value_provider = Arc::new(CompositeValueProvider::new(vec![Arc::new(
            ElementalValueProvider::new(key.clone(), value.clone(), values.culture().clone()),
        )]));
        element_binder.bind_model(&mut child).await?;
        if let Some(element) = take_element(&mut child) {
            bound.push(element);
        }
    }
    if bound.len() > limit {
        return Err(Error::CollectionTooLarge {
            limit,
            model_name: collection_name(ctx, true),
        });
    }
    Ok(bound)
}

fn take_element(child: &mut ModelBindingContext<'_>) -> Option<BoundElement> {
    match std::mem::take(&mut child.result) {
        ModelBindingResult::Success(Model::Value(value)) => {
            let node = child
                .validation_node
                .take()
                .unwrap_or_else(|| ValidationNode::new(child.model_name.clone(), child.metadata.clone()));
            Some(BoundElement { value, node })
        }
        _ => None,
    }
}

/// Numeric indices under `prefix`, ascending
fn harvest_indices(provider: &CompositeValueProvider, prefix: &str) -> Option<Vec<String>> {
    let enumerable = provider.as_enumerable()?;
    let mut numeric: Vec<(usize, String)> = enumerable
        .get_keys_from_prefix(prefix)
        .into_keys()
        .filter_map(|key| key.parse::<usize>().ok().map(|n| (n, key)))
        .collect();
    if numeric.is_empty() {
        return None;
    }
    numeric.sort_by_key(|(n, _)| *n);
    Some(numeric.into_iter().map(|(_, key)| key).collect())
}

fn collection_name(ctx: &ModelBindingContext<'_>, finite: bool) -> String {
    if !ctx.model_name.is_empty() {
        ctx.model_name.clone()
    } else if ctx.original_model_name.is_empty() && !finite {
        "[0]".to_string()
    } else {
        ctx.original_model_name.clone()
    }
}

pub(crate) fn element_binder_for(
    context: &ModelBinderProviderContext<'_>,
    element: &ModelType,
) -> Result<(Arc<ModelMetadata>, Arc<dyn ModelBinder>)> {
    let metadata = context.metadata_provider().metadata_for_type(element);
    let binder = context.create_binder(metadata.clone())?;
    Ok((metadata, binder))
}

/// Fixed-size sequences (`Box<[T]>`)
#[derive(Debug, Default)]
pub struct ArrayModelBinderProvider;

impl ModelBinderProvider for ArrayModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        let TypeShape::Array(element) = model_type.shape() else {
            return Ok(None);
        };
        let (metadata, binder) = element_binder_for(context, &element())?;
        Ok(Some(Arc::new(CollectionModelBinder::new(metadata, binder))))
    }
}

/// Growable sequences and sets
#[derive(Debug, Default)]
pub struct CollectionModelBinderProvider;

impl ModelBinderProvider for CollectionModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        let TypeShape::Collection(element) = model_type.shape() else {
            return Ok(None);
        };
        let (metadata, binder) = element_binder_for(context, &element())?;
        Ok(Some(Arc::new(CollectionModelBinder::new(metadata, binder))))
    }
}
