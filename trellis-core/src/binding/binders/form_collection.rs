// Whole-form binding

use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::form::FormCollection;
use crate::logging::debug;
use crate::model_type::TypeShape;
use crate::validation::ValidationNode;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Binds the request form itself; non-form requests get an empty form
#[derive(Debug, Default)]
pub struct FormCollectionModelBinder;

#[async_trait]
impl ModelBinder for FormCollectionModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let action = ctx.action_context();
        let request = &action.request;
        let form = if request.has_form_content_type() {
            match request.read_form(&action.cancellation).await {
                Ok(form) => form.clone(),
                Err(err) => {
                    debug!(error = %err, "Could not read form");
                    let message = err.to_string();
                    ctx.add_error(message);
                    ctx.set_failed();
                    return Ok(());
                }
            }
        } else {
            FormCollection::new()
        };

        ctx.validation_node = Some(ValidationNode::suppressed(
            ctx.model_name.clone(),
            ctx.metadata.clone(),
        ));
        ctx.set_success(serde_json::to_value(form)?);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FormCollectionModelBinderProvider;

impl ModelBinderProvider for FormCollectionModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        if !matches!(model_type.shape(), TypeShape::FormCollection) {
            return Ok(None);
        }
        Ok(Some(Arc::new(FormCollectionModelBinder)))
    }
}
