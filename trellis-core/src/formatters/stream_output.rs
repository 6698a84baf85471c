// Raw byte responses

use super::output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use crate::http::HttpResponse;
use crate::media_type::MediaType;
use crate::Result;
use async_trait::async_trait;

/// Copies byte streams to the response in whatever content type was asked
/// for, defaulting to `application/octet-stream`
#[derive(Debug, Clone)]
pub struct StreamOutputFormatter {
    media_types: Vec<MediaType>,
}

impl StreamOutputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![MediaType::octet_stream()],
        }
    }
}

impl Default for StreamOutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputFormatter for StreamOutputFormatter {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn can_write_type(&self, object_type: ObjectType, object: &ObjectValue) -> bool {
        object_type == ObjectType::Stream || matches!(object, ObjectValue::Stream(_))
    }

    fn can_write_result(&self, context: &mut OutputFormatterWriteContext<'_>) -> bool {
        if !self.can_write_type(context.object_type, context.object) {
            return false;
        }
        if context.content_type.is_none() {
            context.content_type = Some(MediaType::octet_stream());
        }
        true
    }

    async fn write_response_body(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()> {
        if let ObjectValue::Stream(bytes) = context.object {
            response.body = bytes.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;

    #[test]
    fn test_accepts_any_requested_type() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Stream(vec![0xFF]);
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Stream, &object);
        ctx.content_type = MediaType::parse("image/png");
        assert!(StreamOutputFormatter::new().can_write_result(&mut ctx));
        assert_eq!(ctx.content_type, MediaType::parse("image/png"));
    }

    #[tokio::test]
    async fn test_defaults_to_octet_stream() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Stream(vec![1, 2, 3]);
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Stream, &object);
        let formatter = StreamOutputFormatter::new();
        assert!(formatter.can_write_result(&mut ctx));
        let mut response = HttpResponse::ok();
        formatter.write(&ctx, &mut response).await.unwrap();
        assert_eq!(response.content_type(), Some("application/octet-stream"));
        assert_eq!(response.body, vec![1, 2, 3]);
    }
}
