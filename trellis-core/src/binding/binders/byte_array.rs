// Base64 binary values

use super::simple::attempted_value_is_invalid;
use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::logging::trace;
use crate::model_type::TypeShape;
use crate::value_provider::ValueProvider;
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;

/// Decodes a standard base64 value into a byte array
#[derive(Debug, Default)]
pub struct ByteArrayModelBinder;

#[async_trait]
impl ModelBinder for ByteArrayModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let result = ctx.value_provider.get_value(&ctx.model_name);
        if result.is_empty() {
            return Ok(());
        }
        let key = ctx.model_name.clone();
        ctx.model_state.set_model_value(&key, &result);

        let raw = result.first_value().unwrap_or_default();
        if raw.is_empty() {
            trace!(model_name = %key, "Empty base64 value");
            return Ok(());
        }

        match base64::engine::general_purpose::STANDARD.decode(raw) {
            Ok(bytes) => {
                ctx.set_success(Value::Array(bytes.into_iter().map(Value::from).collect()));
            }
            Err(err) => {
                trace!(model_name = %key, error = %err, "Invalid base64 value");
                let metadata = ctx.metadata.clone();
                let message = attempted_value_is_invalid(ctx, &metadata, raw);
                ctx.model_state.add_model_error(&key, message);
                ctx.set_failed();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ByteArrayModelBinderProvider;

impl ModelBinderProvider for ByteArrayModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        if !matches!(model_type.shape(), TypeShape::Bytes) {
            return Ok(None);
        }
        Ok(Some(Arc::new(ByteArrayModelBinder)))
    }
}
