// 204 for empty results

use super::output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use crate::http::HttpResponse;
use crate::logging::trace;
use crate::media_type::MediaType;
use crate::Result;
use async_trait::async_trait;

/// Turns void results, and null results when configured, into an empty
/// 204 response. Registered first so it sees results before any
/// serializing formatter.
#[derive(Debug, Clone, Default)]
pub struct HttpNoContentOutputFormatter;

impl HttpNoContentOutputFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputFormatter for HttpNoContentOutputFormatter {
    fn name(&self) -> &'static str {
        "no-content"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &[]
    }

    fn can_write_type(&self, object_type: ObjectType, _object: &ObjectValue) -> bool {
        object_type == ObjectType::Void
    }

    fn can_write_result(&self, context: &mut OutputFormatterWriteContext<'_>) -> bool {
        if self.can_write_type(context.object_type, context.object) {
            return true;
        }
        context.treat_null_value_as_no_content
            && context.object_type != ObjectType::Stream
            && context.object.is_null()
    }

    fn write_response_headers(&self, _context: &OutputFormatterWriteContext<'_>, _response: &mut HttpResponse) {}

    async fn write_response_body(
        &self,
        _context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()> {
        if response.status == 200 {
            trace!("Writing 204 for empty result");
            response.status = 204;
        }
        response.body.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;

    #[tokio::test]
    async fn test_null_becomes_204() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Null;
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Structured("A"), &object);
        let formatter = HttpNoContentOutputFormatter::new();
        assert!(formatter.can_write_result(&mut ctx));
        let mut response = HttpResponse::ok();
        formatter.write(&ctx, &mut response).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.content_type().is_none());
    }

    #[tokio::test]
    async fn test_keeps_explicit_status() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Null;
        let ctx = OutputFormatterWriteContext::new(&request, ObjectType::Void, &object);
        let mut response = HttpResponse::new(201);
        HttpNoContentOutputFormatter::new().write(&ctx, &mut response).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn test_null_passes_through_when_disabled() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Null;
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Structured("A"), &object);
        ctx.treat_null_value_as_no_content = false;
        assert!(!HttpNoContentOutputFormatter::new().can_write_result(&mut ctx));
    }
}
