// Trellis - model binding and content negotiation for MVC-style web applications
//
// Actions declare typed parameters; Trellis binds them from the request's
// route values, query string, form, headers, files and body, and writes
// action results through the output formatter the client's Accept header
// selects.

// Re-export core functionality
pub use trellis_core::*;

/// Commonly used items for defining bindable types and binding actions
pub mod prelude {
    pub use trellis_core::formatters::{
        JsonInputFormatter, JsonOutputFormatter, XmlInputFormatter, XmlOutputFormatter,
    };
    pub use trellis_core::{
        ActionContext, ActionDescriptor, Attribute, Bindable, BindingInfo, BindingSource,
        BoundArguments, Container, FormCollection, FormFile, HttpRequest, HttpResponse,
        MediaType, MetadataProvider, ModelBinderFactory, ModelStateDictionary, ModelType,
        MvcOptions, ObjectResult, ObjectResultExecutor, ParameterBinder, ParameterDescriptor,
    };
}
