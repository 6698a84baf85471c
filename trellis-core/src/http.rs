// HTTP request and response types

use crate::form::FormCollection;
use crate::logging::debug;
use crate::media_type::{Accept, MediaType};
use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

/// An already-routed HTTP request.
///
/// Header names are stored lowercase. The form is parsed on first use and
/// cached for the rest of the request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub route_values: HashMap<String, String>,
    /// Raw query string without the leading `?`
    pub query_string: String,
    pub body: Bytes,
    form: OnceCell<FormCollection>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            route_values: HashMap::new(),
            query_string: String::new(),
            body: Bytes::new(),
            form: OnceCell::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_route_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_values.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query_string = query.strip_prefix('?').unwrap_or(&query).to_string();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn with_json_body(self, body: impl Into<Bytes>) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Set a URL-encoded form body and content type
    pub fn with_form_body(self, body: impl Into<Bytes>) -> Self {
        self.with_header("content-type", "application/x-www-form-urlencoded")
            .with_body(body)
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<MediaType> {
        self.header("content-type").and_then(MediaType::parse)
    }

    pub fn has_form_content_type(&self) -> bool {
        self.content_type().is_some_and(|ct| ct.is_form())
    }

    /// Parsed `Accept` header; empty when absent
    pub fn accept(&self) -> Accept {
        self.header("accept").map(Accept::parse).unwrap_or_default()
    }

    /// Get a route value by name
    pub fn route_value(&self, name: &str) -> Option<&String> {
        self.route_values.get(name)
    }

    /// Decode the query string into ordered pairs
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, crate::Error> {
        serde_urlencoded::from_str(&self.query_string)
            .map_err(|e| crate::Error::BadRequest(format!("Failed to parse query string: {}", e)))
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Read the form, parsing and caching it on first access.
    ///
    /// Fails for non-form content types, malformed content, or when the
    /// request was cancelled before parsing started.
    pub async fn read_form(
        &self,
        cancellation: &CancellationToken,
    ) -> Result<&FormCollection, crate::Error> {
        self.form
            .get_or_try_init(|| async {
                if cancellation.is_cancelled() {
                    return Err(crate::Error::BadRequest("The request was aborted.".to_string()));
                }
                let content_type = self.content_type().ok_or_else(|| {
                    crate::Error::BadRequest("Request has no content type".to_string())
                })?;
                let form = if content_type.is_subset_of(&MediaType::multipart_form_data()) {
                    FormCollection::from_multipart(&content_type.to_header_value(), &self.body)?
                } else if content_type.is_subset_of(&MediaType::form_urlencoded()) {
                    FormCollection::from_urlencoded(&self.body)?
                } else {
                    return Err(crate::Error::BadRequest(format!(
                        "Incorrect Content-Type: {}",
                        content_type
                    )));
                };
                debug!(
                    fields = form.fields.len(),
                    files = form.files.len(),
                    "Parsed request form"
                );
                Ok(form)
            })
            .await
    }

    /// Provide an already parsed form
    pub fn with_form(self, form: FormCollection) -> Self {
        let this = if self.has_form_content_type() {
            self
        } else {
            self.with_header("content-type", "application/x-www-form-urlencoded")
        };
        Self {
            form: OnceCell::new_with(Some(form)),
            ..this
        }
    }
}

/// HTTP response wrapper
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn bad_request() -> Self {
        Self::new(400)
    }

    pub fn not_acceptable() -> Self {
        Self::new(406)
    }

    pub fn unsupported_media_type() -> Self {
        Self::new(415)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn set_content_type(&mut self, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case("Content-Type"));
        self.headers.insert("Content-Type".to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_case_insensitive() {
        let request = HttpRequest::get("/").with_header("X-Trace-Id", "abc");
        assert_eq!(request.header("x-trace-id"), Some("abc"));
        assert_eq!(request.header("X-TRACE-ID"), Some("abc"));
    }

    #[test]
    fn test_query_pairs_keep_duplicates() {
        let request = HttpRequest::get("/").with_query("?a=1&b=x+y&a=2");
        let pairs = request.query_pairs().unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x y".to_string()),
                ("a".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_content_type_detection() {
        assert!(HttpRequest::post("/").with_form_body("a=1").has_form_content_type());
        assert!(!HttpRequest::post("/").with_json_body("{}").has_form_content_type());
    }

    #[tokio::test]
    async fn test_read_form_is_cached() {
        let request = HttpRequest::post("/").with_form_body("name=Ada&name=Grace");
        let token = CancellationToken::new();

        let first = request.read_form(&token).await.unwrap();
        assert_eq!(first.get("name"), ["Ada", "Grace"]);

        token.cancel();
        let second = request.read_form(&token).await.unwrap();
        assert_eq!(second.get("name").len(), 2);
    }

    #[tokio::test]
    async fn test_read_form_rejects_other_content() {
        let request = HttpRequest::post("/").with_json_body("{}");
        assert!(request.read_form(&CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_form_cancelled() {
        let request = HttpRequest::post("/").with_form_body("a=1");
        let token = CancellationToken::new();
        token.cancel();
        assert!(request.read_form(&token).await.is_err());
    }

    #[test]
    fn test_response_content_type() {
        let mut response = HttpResponse::ok();
        response.set_content_type("application/json");
        response.set_content_type("text/plain");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.headers.len(), 1);
    }
}
