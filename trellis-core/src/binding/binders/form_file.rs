// Uploaded file binding

use crate::action::ActionContext;
use crate::binding::{
    create_property_model_name, ModelBinder, ModelBinderProvider, ModelBinderProviderContext,
    ModelBindingContext,
};
use crate::form::FormFile;
use crate::logging::{debug, trace};
use crate::model_type::TypeShape;
use crate::validation::ValidationNode;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Binds uploaded files posted under the model name.
///
/// A single-file model takes the first match; collection models take all
/// of them. File models are never validated.
#[derive(Debug)]
pub struct FormFileModelBinder {
    single: bool,
}

impl FormFileModelBinder {
    pub fn new(single: bool) -> Self {
        Self { single }
    }
}

/// Non-empty files posted under `name`; nothing for non-form requests
async fn collect_files(action: &ActionContext, name: &str) -> Result<Vec<FormFile>> {
    let request = &action.request;
    if !request.has_form_content_type() {
        return Ok(Vec::new());
    }
    let form = request.read_form(&action.cancellation).await?;
    Ok(form
        .files
        .iter()
        .filter(|file| !file.is_empty_input())
        .filter(|file| file.name.eq_ignore_ascii_case(name))
        .cloned()
        .collect())
}

/// Whether `name` already sits under `original`
fn is_under(name: &str, original: &str) -> bool {
    name == original
        || name
            .strip_prefix(original)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

#[async_trait]
impl ModelBinder for FormFileModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let mut name = if ctx.is_top_level_object {
            ctx.binder_model_name
                .clone()
                .unwrap_or_else(|| ctx.field_name.clone())
        } else {
            ctx.model_name.clone()
        };

        let action = ctx.action_context();
        let mut files = match collect_files(action, &name).await {
            Ok(files) => files,
            Err(err) => {
                debug!(model_name = %name, error = %err, "Could not read form files");
                ctx.model_state.add_model_error(&name, err.to_string());
                ctx.set_failed();
                return Ok(());
            }
        };

        let original = ctx.original_model_name.clone();
        if files.is_empty() && !original.is_empty() && !is_under(&name, &original) {
            name = create_property_model_name(&original, &name);
            trace!(model_name = %name, "Retrying file lookup under the original model name");
            files = collect_files(action, &name).await?;
        }

        let value = if self.single {
            match files.into_iter().next() {
                Some(file) => serde_json::to_value(file)?,
                None => return Ok(()),
            }
        } else {
            if files.is_empty() && !ctx.is_top_level_object {
                return Ok(());
            }
            Value::Array(
                files
                    .into_iter()
                    .map(serde_json::to_value)
                    .collect::<std::result::Result<Vec<_>, serde_json::Error>>()?,
            )
        };

        debug!(model_name = %name, "Bound form files");
        ctx.model_state.set_raw_value(&name, Vec::new(), None);
        ctx.validation_node = Some(ValidationNode::suppressed(name, ctx.metadata.clone()));
        ctx.set_success(value);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FormFileModelBinderProvider;

impl ModelBinderProvider for FormFileModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let model_type = context.metadata().model_type().underlying();
        let single = match model_type.shape() {
            TypeShape::FormFile => true,
            TypeShape::FormFileCollection => false,
            TypeShape::Array(element) | TypeShape::Collection(element)
                if matches!(element().shape(), TypeShape::FormFile) =>
            {
                false
            }
            _ => return Ok(None),
        };
        Ok(Some(Arc::new(FormFileModelBinder::new(single))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_under() {
        assert!(is_under("upload", "upload"));
        assert!(is_under("upload.File", "upload"));
        assert!(is_under("upload[0]", "upload"));
        assert!(!is_under("uploads", "upload"));
        assert!(!is_under("File", "upload"));
    }
}
