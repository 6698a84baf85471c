// XML responses

use super::output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use super::xml::{sanitize_keys, sanitize_name, wrap_for_root};
use crate::http::HttpResponse;
use crate::media_type::MediaType;
use crate::{Error, Result};
use async_trait::async_trait;

/// Writes `application/xml`, `text/xml` and `application/*+xml`.
///
/// The root element is the result type's short name. Sequences are
/// written as repeated `<item>` children and scalars as `<value>`.
#[derive(Debug, Clone)]
pub struct XmlOutputFormatter {
    media_types: Vec<MediaType>,
}

impl XmlOutputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![
                MediaType::xml(),
                MediaType::text_xml(),
                MediaType::new("application", "*+xml"),
            ],
        }
    }
}

impl Default for XmlOutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputFormatter for XmlOutputFormatter {
    fn name(&self) -> &'static str {
        "xml"
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
        let root = match context.object_type {
            ObjectType::Structured(name) => sanitize_name(name),
            ObjectType::Text => "string".to_string(),
            _ => "data".to_string(),
        };
        let value = wrap_for_root(sanitize_keys(&context.object.to_json()));
        let xml = quick_xml::se::to_string_with_root(&root, &value)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        response.body = xml.into_bytes();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpRequest;
    use serde_json::json;

    async fn write(object_type: ObjectType, object: ObjectValue) -> (HttpResponse, String) {
        let request = HttpRequest::get("/");
        let mut ctx = OutputFormatterWriteContext::new(&request, object_type, &object);
        ctx.content_type = MediaType::parse("text/xml");
        let formatter = XmlOutputFormatter::new();
        assert!(formatter.can_write_result(&mut ctx));
        let mut response = HttpResponse::ok();
        formatter.write(&ctx, &mut response).await.unwrap();
        let body = String::from_utf8(response.body.clone()).unwrap();
        (response, body)
    }

    #[tokio::test]
    async fn test_writes_object_under_type_name() {
        let (response, body) = write(
            ObjectType::Structured("Order"),
            ObjectValue::Structured(json!({"Id": 7, "Name": "desk"})),
        )
        .await;
        assert_eq!(response.content_type(), Some("text/xml; charset=utf-8"));
        assert!(body.starts_with("<Order>"));
        assert!(body.contains("<Id>7</Id>"));
        assert!(body.contains("<Name>desk</Name>"));
    }

    #[tokio::test]
    async fn test_writes_sequences_as_items() {
        let (_, body) = write(ObjectType::Structured("Vec"), ObjectValue::Structured(json!([1, 2]))).await;
        assert!(body.contains("<item>1</item>"));
        assert!(body.contains("<item>2</item>"));
    }

    #[tokio::test]
    async fn test_sanitizes_keys() {
        let (_, body) = write(
            ObjectType::Structured("Map"),
            ObjectValue::Structured(json!({"1st": true})),
        )
        .await;
        assert!(body.contains("<_1st>true</_1st>"));
    }
}
