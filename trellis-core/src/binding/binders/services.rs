// Services binding source

use crate::binding::{Model, ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::binding_source::BindingSource;
use crate::logging::trace;
use crate::validation::ValidationNode;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves the model from the request's service container.
///
/// Services are never validated.
#[derive(Debug, Default)]
pub struct ServicesModelBinder;

#[async_trait]
impl ModelBinder for ServicesModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let model_type = ctx.metadata.model_type().clone();
        let service_type = model_type.underlying();
        let services = &ctx.action_context().services;

        let model = match services.resolve_by_id(service_type.id()) {
            Some(instance) => Model::Service(instance),
            None if model_type.is_nullable() => Model::null(),
            None => return Err(Error::ServiceNotFound(service_type.name().to_string())),
        };
        trace!(model_name = %ctx.model_name, service = service_type.name(), "Bound service");

        ctx.validation_node = Some(ValidationNode::suppressed(
            ctx.model_name.clone(),
            ctx.metadata.clone(),
        ));
        ctx.set_success(model);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ServicesModelBinderProvider;

impl ModelBinderProvider for ServicesModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        if context.binding_info().binding_source != Some(BindingSource::Services) {
            return Ok(None);
        }
        Ok(Some(Arc::new(ServicesModelBinder)))
    }
}
