// Response body formatters

use crate::http::{HttpRequest, HttpResponse};
use crate::media_type::MediaType;
use crate::model_type::Bindable;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Declared type of a result object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// The handler returns nothing
    Void,
    Text,
    Stream,
    /// Any serializable type, named for formats that need a root element
    Structured(&'static str),
}

impl ObjectType {
    pub fn of<T: Bindable>() -> Self {
        ObjectType::Structured(T::model_type().short_name())
    }
}

/// Runtime value of a result object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    Null,
    Text(String),
    Stream(Vec<u8>),
    Structured(Value),
}

impl ObjectValue {
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(ObjectValue::Structured(serde_json::to_value(value)?))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ObjectValue::Null | ObjectValue::Structured(Value::Null))
    }

    /// JSON form of the value; text becomes a JSON string
    pub fn to_json(&self) -> Value {
        match self {
            ObjectValue::Null => Value::Null,
            ObjectValue::Text(text) => Value::String(text.clone()),
            ObjectValue::Stream(bytes) => Value::Array(bytes.iter().copied().map(Value::from).collect()),
            ObjectValue::Structured(value) => value.clone(),
        }
    }
}

/// State shared by formatters while one result is negotiated and written
#[derive(Debug)]
pub struct OutputFormatterWriteContext<'a> {
    pub request: &'a HttpRequest,
    pub object_type: ObjectType,
    pub object: &'a ObjectValue,
    /// Candidate content type; formatters may rewrite it when accepting
    pub content_type: Option<MediaType>,
    /// The content type came from the server rather than from `Accept`
    pub content_type_is_server_defined: bool,
    pub treat_null_value_as_no_content: bool,
}

impl<'a> OutputFormatterWriteContext<'a> {
    pub fn new(request: &'a HttpRequest, object_type: ObjectType, object: &'a ObjectValue) -> Self {
        Self {
            request,
            object_type,
            object,
            content_type: None,
            content_type_is_server_defined: false,
            treat_null_value_as_no_content: true,
        }
    }
}

/// Writes result objects in one or more media types.
///
/// `can_write_result` is not a pure predicate: on acceptance it may narrow
/// `context.content_type` to the concrete type the formatter will write,
/// and the caller commits that choice.
#[async_trait]
pub trait OutputFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    fn supported_media_types(&self) -> &[MediaType];

    /// Whether the formatter writes `charset` text
    fn is_text(&self) -> bool {
        false
    }

    fn can_write_type(&self, object_type: ObjectType, object: &ObjectValue) -> bool;

    fn can_write_result(&self, context: &mut OutputFormatterWriteContext<'_>) -> bool {
        if !self.can_write_type(context.object_type, context.object) {
            return false;
        }

        let Some(requested) = context.content_type.clone() else {
            context.content_type = self.supported_media_types().first().cloned();
            return context.content_type.is_some();
        };

        for supported in self.supported_media_types() {
            if supported.has_wildcard() {
                // A range we support can only be honored as-is when the
                // server chose the concrete type
                if context.content_type_is_server_defined && requested.is_subset_of(supported) {
                    return true;
                }
            } else if supported.is_subset_of(&requested) {
                context.content_type = Some(supported.clone());
                return true;
            }
        }
        false
    }

    /// Content types this formatter can produce for `object_type`, limited
    /// to subsets of `content_type` when one is given
    fn supported_content_types(
        &self,
        content_type: Option<&MediaType>,
        object_type: ObjectType,
    ) -> Option<Vec<MediaType>> {
        let _ = object_type;
        let types: Vec<MediaType> = match content_type {
            None => self.supported_media_types().to_vec(),
            Some(requested) => self
                .supported_media_types()
                .iter()
                .filter(|supported| supported.is_subset_of(requested))
                .cloned()
                .collect(),
        };
        (!types.is_empty()).then_some(types)
    }

    fn write_response_headers(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) {
        let Some(content_type) = &context.content_type else {
            return;
        };
        let content_type = if self.is_text() && content_type.charset().is_none() {
            content_type.clone().with_param("charset", "utf-8")
        } else {
            content_type.clone()
        };
        response.set_content_type(content_type.to_header_value());
    }

    async fn write_response_body(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()>;

    async fn write(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()> {
        self.write_response_headers(context, response);
        self.write_response_body(context, response).await
    }
}
