//! Framework options: provider chains, formatters, limits and messages.

use crate::binding::binders::default_model_binder_providers;
use crate::binding::{ModelBinder, ModelBinderProvider};
use crate::config::BindingSettings;
use crate::culture::Culture;
use crate::formatters::{
    HttpNoContentOutputFormatter, InputFormatter, JsonInputFormatter, JsonOutputFormatter,
    OutputFormatter, StreamOutputFormatter, StringOutputFormatter, XmlInputFormatter,
    XmlOutputFormatter,
};
use crate::model_state::DEFAULT_MAX_ALLOWED_ERRORS;
use crate::value_provider::{
    FormFileValueProviderFactory, FormValueProviderFactory, JQueryFormValueProviderFactory,
    JQueryQueryStringValueProviderFactory, QueryStringValueProviderFactory,
    RouteValueProviderFactory, ValueProviderFactory,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Messages binders record in model state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    MissingBindRequiredValue,
    MissingKeyOrValue,
    MissingRequestBodyRequiredValue,
    ValueMustNotBeNull,
    AttemptedValueIsInvalid,
    NonPropertyAttemptedValueIsInvalid,
    UnknownValueIsInvalid,
    NonPropertyUnknownValueIsInvalid,
    UnsupportedContentType,
    RequestAborted,
    CouldNotCreateInstance,
}

impl MessageKind {
    /// Default template; `{0}` and `{1}` are replaced by the arguments
    pub fn default_template(&self) -> &'static str {
        match self {
            MessageKind::MissingBindRequiredValue => {
                "A value for the '{0}' parameter or property was not provided."
            }
            MessageKind::MissingKeyOrValue => "A value is required.",
            MessageKind::MissingRequestBodyRequiredValue => "A non-empty request body is required.",
            MessageKind::ValueMustNotBeNull => "The value '{0}' is invalid.",
            MessageKind::AttemptedValueIsInvalid => "The value '{0}' is not valid for {1}.",
            MessageKind::NonPropertyAttemptedValueIsInvalid => "The value '{0}' is not valid.",
            MessageKind::UnknownValueIsInvalid => "The supplied value is invalid for {0}.",
            MessageKind::NonPropertyUnknownValueIsInvalid => "The supplied value is invalid.",
            MessageKind::UnsupportedContentType => "Unsupported content type '{0}'.",
            MessageKind::RequestAborted => "The request was aborted.",
            MessageKind::CouldNotCreateInstance => "Could not create an instance of type '{0}'.",
        }
    }
}

/// Formats binding error messages, with per-kind overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelBindingMessageProvider {
    overrides: HashMap<MessageKind, String>,
}

impl ModelBindingMessageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, kind: MessageKind, template: impl Into<String>) -> Self {
        self.set_message(kind, template);
        self
    }

    pub fn set_message(&mut self, kind: MessageKind, template: impl Into<String>) {
        self.overrides.insert(kind, template.into());
    }

    pub fn template(&self, kind: MessageKind) -> &str {
        self.overrides
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_template())
    }

    pub fn format(&self, kind: MessageKind, args: &[&str]) -> String {
        let mut message = self.template(kind).to_string();
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), arg);
        }
        message
    }

    pub fn missing_bind_required_value(&self, field: &str) -> String {
        self.format(MessageKind::MissingBindRequiredValue, &[field])
    }

    pub fn missing_key_or_value(&self) -> String {
        self.format(MessageKind::MissingKeyOrValue, &[])
    }

    pub fn missing_request_body_required_value(&self) -> String {
        self.format(MessageKind::MissingRequestBodyRequiredValue, &[])
    }

    pub fn value_must_not_be_null(&self, value: &str) -> String {
        self.format(MessageKind::ValueMustNotBeNull, &[value])
    }

    pub fn attempted_value_is_invalid(&self, value: &str, display_name: &str) -> String {
        self.format(MessageKind::AttemptedValueIsInvalid, &[value, display_name])
    }

    pub fn non_property_attempted_value_is_invalid(&self, value: &str) -> String {
        self.format(MessageKind::NonPropertyAttemptedValueIsInvalid, &[value])
    }

    pub fn unknown_value_is_invalid(&self, display_name: &str) -> String {
        self.format(MessageKind::UnknownValueIsInvalid, &[display_name])
    }

    pub fn non_property_unknown_value_is_invalid(&self) -> String {
        self.format(MessageKind::NonPropertyUnknownValueIsInvalid, &[])
    }

    pub fn unsupported_content_type(&self, content_type: &str) -> String {
        self.format(MessageKind::UnsupportedContentType, &[content_type])
    }

    pub fn request_aborted(&self) -> String {
        self.format(MessageKind::RequestAborted, &[])
    }

    pub fn could_not_create_instance(&self, type_name: &str) -> String {
        self.format(MessageKind::CouldNotCreateInstance, &[type_name])
    }
}

/// Options shared by every request.
///
/// Lists are ordered and scanned first-match. Build once at startup and
/// share behind an `Arc`.
#[derive(Clone)]
pub struct MvcOptions {
    pub value_provider_factories: Vec<Arc<dyn ValueProviderFactory>>,
    pub model_binder_providers: Vec<Arc<dyn ModelBinderProvider>>,
    pub input_formatters: Vec<Arc<dyn InputFormatter>>,
    pub output_formatters: Vec<Arc<dyn OutputFormatter>>,
    /// Binders selectable by name with `Attribute::ModelBinder`
    pub custom_binders: HashMap<String, Arc<dyn ModelBinder>>,
    /// Honor `*/*` in Accept instead of treating it as a browser default
    pub respect_browser_accept_header: bool,
    /// Respond 406 instead of falling back when Accept cannot be met
    pub return_http_not_acceptable: bool,
    pub allow_empty_input_in_body_model_binding: bool,
    pub max_model_binding_collection_size: usize,
    pub max_model_binding_recursion_depth: usize,
    pub max_model_validation_errors: usize,
    /// Culture of form values
    pub request_culture: String,
    pub treat_null_value_as_no_content: bool,
    pub messages: ModelBindingMessageProvider,
}

impl MvcOptions {
    pub fn new() -> Self {
        Self {
            value_provider_factories: vec![
                Arc::new(FormValueProviderFactory),
                Arc::new(RouteValueProviderFactory),
                Arc::new(QueryStringValueProviderFactory),
                Arc::new(JQueryFormValueProviderFactory),
                Arc::new(JQueryQueryStringValueProviderFactory),
                Arc::new(FormFileValueProviderFactory),
            ],
            model_binder_providers: default_model_binder_providers(),
            input_formatters: vec![Arc::new(JsonInputFormatter::new())],
            output_formatters: vec![
                Arc::new(HttpNoContentOutputFormatter::new()),
                Arc::new(StringOutputFormatter::new()),
                Arc::new(StreamOutputFormatter::new()),
                Arc::new(JsonOutputFormatter::new()),
            ],
            custom_binders: HashMap::new(),
            respect_browser_accept_header: false,
            return_http_not_acceptable: false,
            allow_empty_input_in_body_model_binding: false,
            max_model_binding_collection_size: 1024,
            max_model_binding_recursion_depth: 32,
            max_model_validation_errors: DEFAULT_MAX_ALLOWED_ERRORS,
            request_culture: "en-US".to_string(),
            treat_null_value_as_no_content: true,
            messages: ModelBindingMessageProvider::new(),
        }
    }

    /// Register the XML input and output formatters after the defaults
    pub fn with_xml_formatters(mut self) -> Self {
        self.input_formatters.push(Arc::new(XmlInputFormatter::new()));
        self.output_formatters.push(Arc::new(XmlOutputFormatter::new()));
        self
    }

    pub fn with_custom_binder(
        mut self,
        name: impl Into<String>,
        binder: impl ModelBinder + 'static,
    ) -> Self {
        self.custom_binders.insert(name.into(), Arc::new(binder));
        self
    }

    pub fn with_input_formatter(mut self, formatter: impl InputFormatter + 'static) -> Self {
        self.input_formatters.push(Arc::new(formatter));
        self
    }

    pub fn with_output_formatter(mut self, formatter: impl OutputFormatter + 'static) -> Self {
        self.output_formatters.push(Arc::new(formatter));
        self
    }

    pub fn respect_browser_accept_header(mut self, respect: bool) -> Self {
        self.respect_browser_accept_header = respect;
        self
    }

    pub fn return_http_not_acceptable(mut self, enabled: bool) -> Self {
        self.return_http_not_acceptable = enabled;
        self
    }

    /// Apply loaded settings over the current values
    pub fn with_settings(mut self, settings: &BindingSettings) -> Self {
        if let Some(v) = settings.respect_browser_accept_header {
            self.respect_browser_accept_header = v;
        }
        if let Some(v) = settings.return_http_not_acceptable {
            self.return_http_not_acceptable = v;
        }
        if let Some(v) = settings.allow_empty_input_in_body_model_binding {
            self.allow_empty_input_in_body_model_binding = v;
        }
        if let Some(v) = settings.max_model_binding_collection_size {
            self.max_model_binding_collection_size = v;
        }
        if let Some(v) = settings.max_model_binding_recursion_depth {
            self.max_model_binding_recursion_depth = v;
        }
        if let Some(v) = settings.max_model_validation_errors {
            self.max_model_validation_errors = v;
        }
        if let Some(v) = &settings.request_culture {
            self.request_culture = v.clone();
        }
        if let Some(v) = settings.treat_null_value_as_no_content {
            self.treat_null_value_as_no_content = v;
        }
        if settings.xml_formatters == Some(true) {
            self = self.with_xml_formatters();
        }
        for (kind, template) in &settings.messages {
            self.messages.set_message(*kind, template.clone());
        }
        self
    }

    pub fn culture(&self) -> Culture {
        Culture::from_name(&self.request_culture)
    }
}

impl Default for MvcOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MvcOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut binders: Vec<_> = self.custom_binders.keys().collect();
        binders.sort();
        f.debug_struct("MvcOptions")
            .field("value_provider_factories", &self.value_provider_factories.len())
            .field("model_binder_providers", &self.model_binder_providers.len())
            .field("input_formatters", &self.input_formatters.len())
            .field("output_formatters", &self.output_formatters.len())
            .field("custom_binders", &binders)
            .field("respect_browser_accept_header", &self.respect_browser_accept_header)
            .field("return_http_not_acceptable", &self.return_http_not_acceptable)
            .field(
                "allow_empty_input_in_body_model_binding",
                &self.allow_empty_input_in_body_model_binding,
            )
            .field(
                "max_model_binding_collection_size",
                &self.max_model_binding_collection_size,
            )
            .field(
                "max_model_binding_recursion_depth",
                &self.max_model_binding_recursion_depth,
            )
            .field("max_model_validation_errors", &self.max_model_validation_errors)
            .field("request_culture", &self.request_culture)
            .field("treat_null_value_as_no_content", &self.treat_null_value_as_no_content)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MvcOptions::new();
        assert!(!options.respect_browser_accept_header);
        assert!(!options.return_http_not_acceptable);
        assert_eq!(options.max_model_binding_collection_size, 1024);
        assert_eq!(options.max_model_binding_recursion_depth, 32);
        assert_eq!(options.max_model_validation_errors, 200);
        assert_eq!(options.output_formatters.len(), 4);
        assert_eq!(options.input_formatters.len(), 1);
        assert_eq!(options.model_binder_providers.len(), 13);
        assert_eq!(options.culture().name(), "en-US");
    }

    #[test]
    fn test_xml_formatters_append() {
        let options = MvcOptions::new().with_xml_formatters();
        assert_eq!(options.input_formatters.len(), 2);
        assert_eq!(options.output_formatters.len(), 5);
    }

    #[test]
    fn test_message_formatting() {
        let messages = ModelBindingMessageProvider::new();
        assert_eq!(
            messages.attempted_value_is_invalid("abc", "Age"),
            "The value 'abc' is not valid for Age."
        );
        assert_eq!(messages.value_must_not_be_null(""), "The value '' is invalid.");
        assert_eq!(
            messages.missing_bind_required_value("Id"),
            "A value for the 'Id' parameter or property was not provided."
        );

        let custom = messages.with_message(MessageKind::MissingKeyOrValue, "Required.");
        assert_eq!(custom.missing_key_or_value(), "Required.");
    }

    #[test]
    fn test_settings_override() {
        let settings = BindingSettings {
            return_http_not_acceptable: Some(true),
            max_model_binding_collection_size: Some(10),
            request_culture: Some("de-DE".to_string()),
            xml_formatters: Some(true),
            ..BindingSettings::default()
        };
        let options = MvcOptions::new().with_settings(&settings);
        assert!(options.return_http_not_acceptable);
        assert_eq!(options.max_model_binding_collection_size, 10);
        assert_eq!(options.culture().name(), "de-DE");
        assert_eq!(options.output_formatters.len(), 5);
        // Untouched values keep their defaults
        assert_eq!(options.max_model_binding_recursion_depth, 32);
    }
}
