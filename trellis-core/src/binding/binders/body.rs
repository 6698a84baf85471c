// Request body binding through the input formatters

use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::binding_source::{BindingSource, EmptyBodyBehavior};
use crate::formatters::{InputFormatter, InputFormatterContext, InputFormatterResult};
use crate::logging::{debug, warn};
use crate::model_state::{ModelError, ModelErrorKind};
use crate::validation::ValidationNode;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Reads the whole model from the request body with the first input
/// formatter that accepts the request content type
pub struct BodyModelBinder {
    formatters: Vec<Arc<dyn InputFormatter>>,
    allow_empty_body: bool,
}

impl BodyModelBinder {
    pub fn new(formatters: Vec<Arc<dyn InputFormatter>>, allow_empty_body: bool) -> Self {
        Self {
            formatters,
            allow_empty_body,
        }
    }
}

#[async_trait]
impl ModelBinder for BodyModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        // Top-level bodies are keyed by alias only, so errors land on ""
        let key = if ctx.is_top_level_object {
            ctx.binder_model_name.clone().unwrap_or_default()
        } else {
            ctx.model_name.clone()
        };
        let action = ctx.action_context();
        let request = &action.request;
        let metadata = ctx.metadata.clone();

        let mut input = InputFormatterContext {
            request,
            model_name: &key,
            metadata: &metadata,
            model_state: &mut *ctx.model_state,
            treat_empty_input_as_default_value: self.allow_empty_body,
        };

        let Some(formatter) = self.formatters.iter().find(|f| f.can_read(&input)) else {
            if self.allow_empty_body && request.body.is_empty() {
                ctx.set_success(Value::Null);
                return Ok(());
            }
            let content_type = request.header("content-type").unwrap_or_default();
            warn!(model_name = %key, content_type, "No input formatter for request body");
            let message = ctx.messages().unsupported_content_type(content_type);
            ctx.model_state.try_add_error(
                &key,
                ModelError::with_kind(message, ModelErrorKind::UnsupportedContentType),
            );
            return Ok(());
        };

        let outcome = tokio::select! {
            biased;
            _ = action.cancellation.cancelled() => None,
            result = formatter.read(&mut input) => Some(result),
        };

        match outcome {
            None => {
                debug!(model_name = %key, "Body read cancelled");
                let message = ctx.messages().request_aborted();
                ctx.model_state.add_model_error(&key, message);
                ctx.set_failed();
            }
            Some(result) => match result? {
                InputFormatterResult::Failure => {
                    debug!(model_name = %key, formatter = formatter.name(), "Body could not be read");
                }
                InputFormatterResult::NoValue => {
                    let message = ctx.messages().missing_request_body_required_value();
                    ctx.model_state.add_model_error(&key, message);
                }
                InputFormatterResult::Success(value) => {
                    debug!(model_name = %key, formatter = formatter.name(), "Bound request body");
                    ctx.validation_node = Some(ValidationNode::new(key, metadata));
                    ctx.set_success(value);
                }
            },
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BodyModelBinderProvider;

impl ModelBinderProvider for BodyModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let info = context.binding_info();
        if info.binding_source != Some(BindingSource::Body) {
            return Ok(None);
        }
        let options = context.options();
        if options.input_formatters.is_empty() {
            return Err(Error::Config(
                "No input formatters are registered for request body binding".to_string(),
            ));
        }
        let allow_empty_body = match info.empty_body_behavior {
            EmptyBodyBehavior::Allow => true,
            EmptyBodyBehavior::Disallow => false,
            EmptyBodyBehavior::Default => options.allow_empty_input_in_body_model_binding,
        };
        Ok(Some(Arc::new(BodyModelBinder::new(
            options.input_formatters.clone(),
            allow_empty_body,
        ))))
    }
}
