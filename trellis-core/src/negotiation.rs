//! Content negotiation for object results.
//!
//! [`DefaultOutputFormatterSelector`] picks an output formatter from the
//! result's explicit content types, the request `Accept` header and the
//! registered formatters. [`ObjectResultExecutor`] runs the selection and
//! writes the response, answering 406 when nothing can write the result.

use crate::action::ActionContext;
use crate::formatters::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, trace, warn};
use crate::media_type::MediaType;
use crate::model_type::Bindable;
use crate::options::MvcOptions;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

/// A handler result to be written through content negotiation
#[derive(Clone)]
pub struct ObjectResult {
    pub value: ObjectValue,
    pub declared_type: ObjectType,
    pub status_code: Option<u16>,
    /// Content types the result is restricted to
    pub content_types: Vec<MediaType>,
    /// Formatters to use instead of the registered ones
    pub formatters: Vec<Arc<dyn OutputFormatter>>,
}

impl ObjectResult {
    pub fn new(value: ObjectValue, declared_type: ObjectType) -> Self {
        Self {
            value,
            declared_type,
            status_code: None,
            content_types: Vec::new(),
            formatters: Vec::new(),
        }
    }

    /// A serializable value declared as `T`
    pub fn of<T: Serialize + Bindable>(value: &T) -> Result<Self> {
        Ok(Self::new(ObjectValue::from_serialize(value)?, ObjectType::of::<T>()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ObjectValue::Text(text.into()), ObjectType::Text)
    }

    pub fn stream(bytes: Vec<u8>) -> Self {
        Self::new(ObjectValue::Stream(bytes), ObjectType::Stream)
    }

    /// A handler that returned nothing
    pub fn void() -> Self {
        Self::new(ObjectValue::Null, ObjectType::Void)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_content_type(mut self, content_type: MediaType) -> Self {
        self.content_types.push(content_type);
        self
    }

    pub fn with_formatter(mut self, formatter: impl OutputFormatter + 'static) -> Self {
        self.formatters.push(Arc::new(formatter));
        self
    }
}

impl std::fmt::Debug for ObjectResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectResult")
            .field("value", &self.value)
            .field("declared_type", &self.declared_type)
            .field("status_code", &self.status_code)
            .field("content_types", &self.content_types)
            .field("formatters", &self.formatters.len())
            .finish()
    }
}

/// Chooses the output formatter for a result
#[derive(Debug, Clone)]
pub struct DefaultOutputFormatterSelector {
    options: Arc<MvcOptions>,
}

impl DefaultOutputFormatterSelector {
    pub fn new(options: Arc<MvcOptions>) -> Self {
        Self { options }
    }

    /// Select a formatter, leaving the chosen content type in `context`.
    ///
    /// Falls back to the registered formatters when `formatters` is empty.
    pub fn select_formatter(
        &self,
        context: &mut OutputFormatterWriteContext<'_>,
        formatters: &[Arc<dyn OutputFormatter>],
        content_types: &[MediaType],
    ) -> Option<Arc<dyn OutputFormatter>> {
        let formatters = if formatters.is_empty() {
            self.options.output_formatters.as_slice()
        } else {
            formatters
        };
        if formatters.is_empty() {
            warn!("No output formatters are registered");
            return None;
        }

        if content_types.len() == 1 {
            debug!(content_type = %content_types[0], "Skipping content negotiation");
            return select_using_content_types(context, formatters, content_types);
        }

        let accepted = self.acceptable_media_types(context.request, content_types);
        if accepted.is_empty() {
            trace!("No acceptable media types in request");
            return select_fallback(context, formatters, content_types);
        }

        let selected = if content_types.is_empty() {
            select_using_accept(context, formatters, &accepted)
        } else {
            select_using_accept_and_content_types(context, formatters, &accepted, content_types)
        };
        match selected {
            Some(formatter) => Some(formatter),
            None if self.options.return_http_not_acceptable => None,
            None => {
                trace!("No formatter matched Accept, falling back");
                select_fallback(context, formatters, content_types)
            }
        }
    }

    /// Accept entries in preference order
    fn acceptable_media_types(&self, request: &HttpRequest, content_types: &[MediaType]) -> Vec<MediaType> {
        let accept = request.accept();
        if !self.options.respect_browser_accept_header && accept.contains_any() {
            trace!("Ignoring Accept header containing */*");
            return Vec::new();
        }

        accept
            .sorted_by_quality()
            .into_iter()
            .filter(|(_, quality)| *quality > 0.0)
            .map(|(media_type, _)| media_type)
            .filter(|media_type| {
                content_types.is_empty() || content_types.iter().any(|ct| ct.is_subset_of(media_type))
            })
            .collect()
    }
}

fn select_fallback(
    context: &mut OutputFormatterWriteContext<'_>,
    formatters: &[Arc<dyn OutputFormatter>],
    content_types: &[MediaType],
) -> Option<Arc<dyn OutputFormatter>> {
    if content_types.is_empty() {
        select_not_using_content_type(context, formatters)
    } else {
        select_using_content_types(context, formatters, content_types)
    }
}

/// First formatter able to write the type, in its own content type
fn select_not_using_content_type(
    context: &mut OutputFormatterWriteContext<'_>,
    formatters: &[Arc<dyn OutputFormatter>],
) -> Option<Arc<dyn OutputFormatter>> {
    formatters.iter().find_map(|formatter| {
        context.content_type = None;
        context.content_type_is_server_defined = false;
        formatter.can_write_result(context).then(|| formatter.clone())
    })
}

/// Formatters outer, server-chosen content types inner
fn select_using_content_types(
    context: &mut OutputFormatterWriteContext<'_>,
    formatters: &[Arc<dyn OutputFormatter>],
    content_types: &[MediaType],
) -> Option<Arc<dyn OutputFormatter>> {
    for formatter in formatters {
        for content_type in content_types {
            context.content_type = Some(content_type.clone());
            context.content_type_is_server_defined = true;
            if formatter.can_write_result(context) {
                return Some(formatter.clone());
            }
        }
    }
    None
}

/// Media types outer, formatters inner: a better media type always wins
/// over a preferred formatter
fn select_using_accept(
    context: &mut OutputFormatterWriteContext<'_>,
    formatters: &[Arc<dyn OutputFormatter>],
    accepted: &[MediaType],
) -> Option<Arc<dyn OutputFormatter>> {
    for media_type in accepted {
        for formatter in formatters {
            context.content_type = Some(media_type.clone());
            context.content_type_is_server_defined = false;
            if formatter.can_write_result(context) {
                return Some(formatter.clone());
            }
        }
    }
    None
}

fn select_using_accept_and_content_types(
    context: &mut OutputFormatterWriteContext<'_>,
    formatters: &[Arc<dyn OutputFormatter>],
    accepted: &[MediaType],
    content_types: &[MediaType],
) -> Option<Arc<dyn OutputFormatter>> {
    for media_type in accepted {
        for content_type in content_types.iter().filter(|ct| ct.is_subset_of(media_type)) {
            for formatter in formatters {
                context.content_type = Some(content_type.clone());
                context.content_type_is_server_defined = true;
                if formatter.can_write_result(context) {
                    return Some(formatter.clone());
                }
            }
        }
    }
    None
}

/// Negotiates and writes object results
#[derive(Debug, Clone)]
pub struct ObjectResultExecutor {
    selector: DefaultOutputFormatterSelector,
    options: Arc<MvcOptions>,
}

impl ObjectResultExecutor {
    pub fn new(options: Arc<MvcOptions>) -> Self {
        Self {
            selector: DefaultOutputFormatterSelector::new(options.clone()),
            options,
        }
    }

    pub fn selector(&self) -> &DefaultOutputFormatterSelector {
        &self.selector
    }

    /// Write `result` for the request in `context`.
    ///
    /// A result no formatter can write produces 406 with no body.
    pub async fn execute(&self, context: &ActionContext, result: &ObjectResult) -> Result<HttpResponse> {
        let mut response = HttpResponse::new(result.status_code.unwrap_or(200));
        let mut write_context =
            OutputFormatterWriteContext::new(&context.request, result.declared_type, &result.value);
        write_context.treat_null_value_as_no_content = self.options.treat_null_value_as_no_content;

        let Some(formatter) =
            self.selector
                .select_formatter(&mut write_context, &result.formatters, &result.content_types)
        else {
            warn!(
                accept = context.request.header("accept").unwrap_or_default(),
                "No output formatter can write the result"
            );
            response.status = 406;
            return Ok(response);
        };

        debug!(
            formatter = formatter.name(),
            content_type = ?write_context.content_type.as_ref().map(MediaType::to_header_value),
            "Selected output formatter"
        );
        formatter.write(&write_context, &mut response).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::{JsonOutputFormatter, StringOutputFormatter, XmlOutputFormatter};
    use serde_json::json;

    fn request(accept: &str) -> HttpRequest {
        HttpRequest::get("/").with_header("accept", accept)
    }

    fn select(
        options: MvcOptions,
        request: &HttpRequest,
        result: &ObjectResult,
    ) -> (Option<&'static str>, Option<MediaType>) {
        let selector = DefaultOutputFormatterSelector::new(Arc::new(options));
        let mut ctx = OutputFormatterWriteContext::new(request, result.declared_type, &result.value);
        let formatter = selector.select_formatter(&mut ctx, &result.formatters, &result.content_types);
        (formatter.map(|f| f.name()), ctx.content_type)
    }

    fn structured() -> ObjectResult {
        ObjectResult::new(ObjectValue::Structured(json!({"id": 1})), ObjectType::Structured("Item"))
    }

    #[test]
    fn test_quality_orders_media_types() {
        let request = request("text/plain;q=0.5, application/json;q=0.9");
        let result = ObjectResult::text("hi");
        let (name, content_type) = select(MvcOptions::new(), &request, &result);
        assert_eq!(name, Some("json"));
        assert_eq!(content_type, Some(MediaType::json()));
    }

    #[test]
    fn test_zero_quality_is_not_acceptable() {
        let request = request("application/json;q=0, text/plain");
        let result = ObjectResult::text("hi");
        let (name, _) = select(MvcOptions::new(), &request, &result);
        assert_eq!(name, Some("string"));
    }

    #[test]
    fn test_single_content_type_ignores_accept() {
        let request = request("application/json");
        let result = structured().with_content_type(MediaType::xml());
        let (name, content_type) = select(MvcOptions::new().with_xml_formatters(), &request, &result);
        assert_eq!(name, Some("xml"));
        assert_eq!(content_type, Some(MediaType::xml()));
    }

    #[test]
    fn test_browser_wildcard_is_ignored() {
        let result = structured();
        let options = MvcOptions::new().with_xml_formatters();
        let with_wildcard = select(options.clone(), &request("application/xml, */*;q=0.8"), &result);
        let without_accept = select(options, &HttpRequest::get("/"), &result);
        assert_eq!(with_wildcard, without_accept);
        assert_eq!(with_wildcard.0, Some("json"));
    }

    #[test]
    fn test_wildcard_respected_when_configured() {
        let result = structured();
        let options = MvcOptions::new()
            .with_xml_formatters()
            .respect_browser_accept_header(true);
        let (name, _) = select(options, &request("application/xml, */*;q=0.8"), &result);
        assert_eq!(name, Some("xml"));
    }

    #[test]
    fn test_unmatched_accept_falls_back() {
        let (name, content_type) = select(MvcOptions::new(), &request("application/xml"), &structured());
        assert_eq!(name, Some("json"));
        assert_eq!(content_type, Some(MediaType::json()));

        let strict = MvcOptions::new().return_http_not_acceptable(true);
        let (name, _) = select(strict, &request("application/xml"), &structured());
        assert_eq!(name, None);
    }

    #[test]
    fn test_content_types_filter_accept() {
        let request = request("text/json, application/json");
        let result = structured()
            .with_content_type(MediaType::json())
            .with_content_type(MediaType::xml());
        let (name, content_type) = select(MvcOptions::new().with_xml_formatters(), &request, &result);
        assert_eq!(name, Some("json"));
        assert_eq!(content_type, Some(MediaType::json()));
    }

    #[test]
    fn test_result_formatters_override_registered() {
        let result = ObjectResult::text("x")
            .with_formatter(XmlOutputFormatter::new())
            .with_formatter(StringOutputFormatter::new());
        let (name, _) = select(MvcOptions::new(), &request("text/xml"), &result);
        assert_eq!(name, Some("xml"));
    }

    #[tokio::test]
    async fn test_not_acceptable_has_empty_body() {
        let options = Arc::new(MvcOptions::new());
        let context = ActionContext::new(request("application/xml"), options.clone());
        let result = ObjectResult::stream(vec![1, 2, 3]).with_formatter(JsonOutputFormatter::new());
        let response = ObjectResultExecutor::new(options).execute(&context, &result).await.unwrap();
        assert_eq!(response.status, 406);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_null_result_is_no_content() {
        let options = Arc::new(MvcOptions::new());
        let context = ActionContext::new(request("application/json"), options.clone());
        let result = ObjectResult::new(ObjectValue::Null, ObjectType::Structured("Item"));
        let response = ObjectResultExecutor::new(options).execute(&context, &result).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }
}
