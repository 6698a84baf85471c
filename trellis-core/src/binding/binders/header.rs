// Binding from request headers

use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::binding_source::{BindingInfo, BindingSource};
use crate::culture::Culture;
use crate::logging::{debug, trace};
use crate::model_type::ModelType;
use crate::value_provider::{CompositeValueProvider, ElementalValueProvider};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Binds a scalar or a collection of scalars from the header named by the
/// field name. Collections split the header on commas.
pub struct HeaderModelBinder {
    inner: Arc<dyn ModelBinder>,
}

impl HeaderModelBinder {
    pub fn new(inner: Arc<dyn ModelBinder>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ModelBinder for HeaderModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let header_name = ctx.field_name.clone();
        let request = &ctx.action_context().request;
        let is_collection = ctx.metadata.model_type().element_type().is_some();

        let values: Vec<String> = match request.header(&header_name) {
            Some(raw) if is_collection => raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            Some(raw) => vec![raw.to_string()],
            None => Vec::new(),
        };
        trace!(header = %header_name, values = values.len(), "Read header values");

        let provider = ElementalValueProvider::with_values(
            ctx.model_name.clone(),
            values,
            Culture::invariant(),
        );
        let metadata = ctx.metadata.clone();
        let field = ctx.field_name.clone();
        let name = ctx.model_name.clone();
        let model = ctx.model.take();
        let is_top_level = ctx.is_top_level_object;
        let depth = ctx.depth;

        let (result, node) = {
            let mut scope = ctx.nested(metadata, field, name, model);
            scope.value_provider = Arc::new(CompositeValueProvider::new(vec![Arc::new(provider)]));
            scope.is_top_level_object = is_top_level;
            scope.depth = depth;
            self.inner.bind_model(&mut scope).await?;
            (std::mem::take(&mut scope.result), scope.validation_node.take())
        };

        if result.is_model_set() {
            debug!(header = %header_name, "Bound header value");
        }
        ctx.result = result;
        ctx.validation_node = node;
        Ok(())
    }
}

fn is_simple(model_type: &ModelType) -> bool {
    model_type.scalar_kind().is_some()
}

#[derive(Debug, Default)]
pub struct HeaderModelBinderProvider;

impl ModelBinderProvider for HeaderModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let info = context.binding_info();
        if info.binding_source != Some(BindingSource::Header) {
            return Ok(None);
        }

        let model_type = context.metadata().model_type().underlying();
        let supported = is_simple(&model_type)
            || model_type.element_type().is_some_and(|element| is_simple(&element));
        if !supported {
            debug!(
                model_type = model_type.name(),
                "Header binding supports scalars and scalar collections only"
            );
            return Ok(None);
        }

        let inner_info = BindingInfo {
            binding_source: Some(BindingSource::ModelBinding),
            ..info.clone()
        };
        let inner = context.create_binder_with_info(context.metadata().clone(), &inner_info)?;
        Ok(Some(Arc::new(HeaderModelBinder::new(inner))))
    }
}
