// Binders chosen by name

use crate::binding::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext};
use crate::binding_source::BindingSource;
use crate::logging::trace;
use crate::{Error, Result};
use std::sync::Arc;

/// Uses the binder registered in `MvcOptions::custom_binders` under the
/// name declared on the parameter or property.
///
/// Names are checked at startup by `ActionDescriptor::validate`; an
/// unknown name reaching this point is still a configuration error.
#[derive(Debug, Default)]
pub struct BinderTypeModelBinderProvider;

impl ModelBinderProvider for BinderTypeModelBinderProvider {
    fn get_binder(
        &self,
        context: &ModelBinderProviderContext<'_>,
    ) -> Result<Option<Arc<dyn ModelBinder>>> {
        let info = context.binding_info();
        let Some(name) = info.binder_type.as_deref() else {
            return Ok(None);
        };
        if matches!(info.binding_source, Some(source) if source != BindingSource::Custom) {
            trace!(binder = name, source = ?info.binding_source, "Custom binder overrides declared source");
        }
        context
            .options()
            .custom_binders
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::InvalidBinderType(name.to_string()))
    }
}
