// Core library for the Trellis web framework
// Model binding, value providers, input/output formatters and content negotiation

pub mod action;
pub mod binding;
pub mod binding_source;
pub mod config;
pub mod container;
pub mod conversion;
pub mod culture;
pub mod error;
pub mod form;
pub mod formatters;
pub mod http;
pub mod logging;
pub mod media_type;
pub mod metadata;
pub mod model_state;
pub mod model_type;
pub mod negotiation;
pub mod options;
pub mod validation;
pub mod value_provider;

// Re-export commonly used types
pub use action::{ActionContext, ActionDescriptor, ParameterDescriptor};
pub use binding::{
    BoundArguments, Model, ModelBinder, ModelBinderFactory, ModelBinderProvider,
    ModelBindingContext, ModelBindingResult, ParameterBinder,
};
pub use binding_source::{BindingInfo, BindingSource, EmptyBodyBehavior};
pub use config::BindingSettings;
pub use container::Container;
pub use culture::Culture;
pub use error::*;
pub use form::{FormCollection, FormFile, FormFileCollection};
pub use formatters::{InputFormatter, ObjectType, ObjectValue, OutputFormatter};
pub use http::{HttpRequest, HttpResponse};
pub use media_type::{Accept, MediaType};
pub use metadata::{MetadataProvider, ModelMetadata};
pub use model_state::{ModelError, ModelStateDictionary, ModelValidationState};
pub use model_type::{Attribute, Bindable, ByteArray, KeyValuePair, ModelType, TypeShape};
pub use negotiation::{ObjectResult, ObjectResultExecutor};
pub use options::{ModelBindingMessageProvider, MvcOptions};
pub use validation::ValidationNode;
