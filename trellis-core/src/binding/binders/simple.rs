// Scalar binding from a single value

use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext, ModelBindingContext};
use crate::conversion::convert_to;
use crate::logging::{debug, trace};
use crate::metadata::{MetadataKind, ModelMetadata};
use crate::model_type::{ScalarKind, TypeShape};
use crate::value_provider::ValueProvider;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Converts the first value under the model name to the scalar type
#[derive(Debug, Default)]
pub struct SimpleTypeModelBinder;

impl SimpleTypeModelBinder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelBinder for SimpleTypeModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let result = ctx.value_provider.get_value(&ctx.model_name);
        if result.is_empty() {
            trace!(model_name = %ctx.model_name, "No value found");
            return Ok(());
        }

        let key = ctx.model_name.clone();
        ctx.model_state.set_model_value(&key, &result);

        let raw = result.first_value().unwrap_or_default();
        let model_type = ctx.metadata.model_type().clone();
        let is_plain_string = matches!(model_type.shape(), TypeShape::Scalar(ScalarKind::String));

        let converted = if raw.trim().is_empty() {
            // A non-optional String cannot hold null, so it keeps the input
            let keeps_empty = model_type.scalar_kind() == Some(ScalarKind::String)
                && !ctx.metadata.convert_empty_string_to_null();
            if is_plain_string || keeps_empty {
                Ok(Value::String(raw.to_string()))
            } else {
                Ok(Value::Null)
            }
        } else {
            convert_to(&model_type, raw, result.culture())
        };

        match converted {
            Ok(Value::Null) if !ctx.metadata.is_reference_or_nullable_type() => {
                let message = ctx.messages().value_must_not_be_null(&result.to_string());
                ctx.model_state.add_model_error(&key, message);
                ctx.set_failed();
            }
            Ok(value) => {
                debug!(model_name = %key, model_type = model_type.name(), "Bound simple value");
                ctx.set_success(value);
            }
            Err(err) => {
                trace!(model_name = %key, error = %err, "Conversion failed");
                let message = attempted_value_is_invalid(ctx, &ctx.metadata.clone(), raw);
                ctx.model_state.add_model_error(&key, message);
                ctx.set_failed();
            }
        }
        Ok(())
    }
}

/// "not valid for {display}" for properties, the short form otherwise
pub(crate) fn attempted_value_is_invalid(
    ctx: &ModelBindingContext<'_>,
    metadata: &ModelMetadata,
    value: &str,
) -> String {
    if metadata.kind() == MetadataKind::Property {
        ctx.messages()
            .attempted_value_is_invalid(value, metadata.get_display_name())
    } else {
        ctx.messages().non_property_attempted_value_is_invalid(value)
    }
}

#[derive(Debug, Default)]
pub struct SimpleTypeModelBinderProvider;

impl ModelBinderProvider for SimpleTypeModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        if context.metadata().model_type().scalar_kind().is_some() {
            return Ok(Some(Arc::new(SimpleTypeModelBinder::new())));
        }
        Ok(None)
    }
}
