// Plain text responses

use super::output::{ObjectType, ObjectValue, OutputFormatter, OutputFormatterWriteContext};
use crate::http::HttpResponse;
use crate::media_type::MediaType;
use crate::Result;
use async_trait::async_trait;

/// Writes string results as `text/plain`
#[derive(Debug, Clone)]
pub struct StringOutputFormatter {
    media_types: Vec<MediaType>,
}

impl StringOutputFormatter {
    pub fn new() -> Self {
        Self {
            media_types: vec![MediaType::plain_text()],
        }
    }
}

impl Default for StringOutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputFormatter for StringOutputFormatter {
    fn name(&self) -> &'static str {
        "string"
    }

    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn is_text(&self) -> bool {
        true
    }

    fn can_write_type(&self, object_type: ObjectType, object: &ObjectValue) -> bool {
        object_type == ObjectType::Text || matches!(object, ObjectValue::Text(_))
    }

    async fn write_response_body(
        &self,
        context: &OutputFormatterWriteContext<'_>,
        response: &mut HttpResponse,
    ) -> Result<()> {
        if let ObjectValue::Text(text) = context.object {
            response.body = text.as_bytes().to_vec();
        }
        Ok(())
    }
}
