// Request body formatters

use crate::http::HttpRequest;
use crate::media_type::MediaType;
use crate::metadata::ModelMetadata;
use crate::model_state::ModelStateDictionary;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Everything a formatter needs to read one body
pub struct InputFormatterContext<'a> {
    pub request: &'a HttpRequest,
    /// Model state key for errors
    pub model_name: &'a str,
    pub metadata: &'a ModelMetadata,
    pub model_state: &'a mut ModelStateDictionary,
    /// Produce the type's default for an empty body instead of no value
    pub treat_empty_input_as_default_value: bool,
}

impl InputFormatterContext<'_> {
    /// Default model for an empty body: null where allowed, else the
    /// type's default instance
    pub fn default_value(&self) -> Value {
        let model_type = self.metadata.model_type();
        if model_type.accepts_null() {
            Value::Null
        } else {
            model_type.default_value()
        }
    }
}

/// Outcome of reading a body
#[derive(Debug, Clone, PartialEq)]
pub enum InputFormatterResult {
    Success(Value),
    /// The body was empty and no default was wanted
    NoValue,
    /// The body could not be read; errors are in model state
    Failure,
}

#[async_trait]
pub trait InputFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_media_types(&self) -> &[MediaType];

    /// Whether the request content type is one this formatter reads
    fn can_read(&self, context: &InputFormatterContext<'_>) -> bool {
        let Some(content_type) = context.request.content_type() else {
            return false;
        };
        self.supported_media_types()
            .iter()
            .any(|supported| content_type.is_subset_of(supported))
    }

    /// Read the body, handling the empty case
    async fn read(&self, context: &mut InputFormatterContext<'_>) -> Result<InputFormatterResult> {
        if context.request.body.is_empty() {
            if context.treat_empty_input_as_default_value {
                return Ok(InputFormatterResult::Success(context.default_value()));
            }
            return Ok(InputFormatterResult::NoValue);
        }
        self.read_request_body(context).await
    }

    async fn read_request_body(
        &self,
        context: &mut InputFormatterContext<'_>,
    ) -> Result<InputFormatterResult>;
}
