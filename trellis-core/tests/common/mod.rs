//! Shared helpers for binding integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use trellis_core::*;

pub fn factory(options: MvcOptions) -> Arc<ModelBinderFactory> {
    Arc::new(ModelBinderFactory::new(
        Arc::new(MetadataProvider::new()),
        Arc::new(options),
    ))
}

/// Bind `parameters` against `request` with `options`
pub async fn bind_with(
    options: MvcOptions,
    request: HttpRequest,
    parameters: Vec<ParameterDescriptor>,
) -> Result<BoundArguments> {
    let factory = factory(options);
    let context = ActionContext::new(request, factory.options().clone());
    bind_in(&factory, &context, parameters).await
}

pub async fn bind_in(
    factory: &Arc<ModelBinderFactory>,
    context: &ActionContext,
    parameters: Vec<ParameterDescriptor>,
) -> Result<BoundArguments> {
    let action = parameters
        .into_iter()
        .fold(ActionDescriptor::new("test"), ActionDescriptor::parameter);
    ParameterBinder::new(factory.clone())
        .bind_arguments(context, &action)
        .await
}

pub async fn bind(request: HttpRequest, parameters: Vec<ParameterDescriptor>) -> BoundArguments {
    bind_with(MvcOptions::new(), request, parameters)
        .await
        .expect("binding should not fail")
}
