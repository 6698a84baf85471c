//! Model binding: turning request data into typed models.
//!
//! A [`ModelBinderFactory`] walks the ordered [`ModelBinderProvider`] chain
//! to pick a binder for each metadata, caching the result. Binders run
//! against a [`ModelBindingContext`] and report a [`ModelBindingResult`];
//! per-field problems land in the request's model state, and only
//! configuration errors and limits surface as [`crate::Error`].

pub mod binders;
mod context;
mod factory;
mod model_names;
mod parameter_binder;
mod result;

pub use context::ModelBindingContext;
pub use factory::{ModelBinderFactory, ModelBinderProvider, ModelBinderProviderContext};
pub use model_names::{create_index_model_name, create_property_model_name};
pub use parameter_binder::{BoundArguments, BoundParameter, ParameterBinder};
pub use result::{Model, ModelBindingResult};

use crate::Result;
use async_trait::async_trait;

/// Binds one model from the context's value providers or request.
///
/// Implementations set `context.result` and record per-field errors in
/// `context.model_state`. An `Err` aborts the whole bind.
#[async_trait]
pub trait ModelBinder: Send + Sync {
    async fn bind_model(&self, context: &mut ModelBindingContext<'_>) -> Result<()>;
}
