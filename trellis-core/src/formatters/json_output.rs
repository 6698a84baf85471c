// JSON responses

use super::output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use crate::http::HttpResponse;
use crate::media_type::MediaType;
use crate::{Error, Result};
use async_trait::async_trait;

/// Writes `application/json`, `text/json` and `application/*+json`
#[derive(Debug, Clone)]
pub struct JsonOutputFormatter {
    media_types: Vec<MediaType>,
    pretty: bool,
}

impl JsonOutputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::json(),
                MediaType::text_json(),
                MediaType::new("application", "*+json"),
            ],
            pretty: false,
        }
    }

    /// Indent the output
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Default for JsonOutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputFormatter for JsonOutputFormatter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn is_text(&self) -> bool {
        true
    }

    fn can_write_type(&self, object_type: ObjectType, _object: &ObjectValue) -> bool {
        !matches!(object_type, ObjectType::Stream)
    }

    async fn write_response_body(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()> {
        let value = context.object.to_json();
        response.body = if self.pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        }
        .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use serde_json::json;

    #[test]
    fn test_narrows_wildcard_request() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Structured(json!({"a": 1}));
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Structured("A"), &object);
        ctx.content_type = MediaType::parse("application/*");
        let formatter = JsonOutputFormatter::new();
        assert!(formatter.can_write_result(&mut ctx));
        assert_eq!(ctx.content_type, Some(MediaType::json()));
    }

    #[test]
    fn test_suffix_type_needs_server_choice() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Structured(json!({}));
        let formatter = JsonOutputFormatter::new();

        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Structured("A"), &object);
        ctx.content_type = MediaType::parse("application/problem+json");
        assert!(!formatter.can_write_result(&mut ctx));

        ctx.content_type_is_server_defined = true;
        assert!(formatter.can_write_result(&mut ctx));
        assert_eq!(ctx.content_type.unwrap().subtype, "problem+json");
    }

    #[tokio::test]
    async fn test_writes_json_with_charset() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Structured(json!({"id": 3}));
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Structured("A"), &object);
        let formatter = JsonOutputFormatter::new();
        assert!(formatter.can_write_result(&mut ctx));

        let mut response = HttpResponse::ok();
        formatter.write(&ctx, &mut response).await.unwrap();
        assert_eq!(response.content_type(), Some("application/json; charset=utf-8"));
        assert_eq!(response.body, br#"{"id":3}"#);
    }

    #[test]
    fn test_refuses_streams() {
        let request = HttpRequest::get("/");
        let object = ObjectValue::Stream(vec![1, 2]);
        let mut ctx = OutputFormatterWriteContext::new(&request, ObjectType::Stream, &object);
        assert!(!JsonOutputFormatter::new().can_write_result(&mut ctx));
    }
}
