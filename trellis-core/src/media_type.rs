//! Media types and `Accept` header parsing.
//!
//! Matching follows RFC 7231 media-range rules: `*/*` and `type/*` are
//! wildcards, structured syntax suffixes (`+json`) take part in subtype
//! matching, and parameters of the broader type must be present in the
//! narrower one. Parameters from `q` onward are accept-params and never
//! take part in matching.
//!
//! # Examples
//!
//! ```
//! use trellis_core::media_type::{Accept, MediaType};
//!
//! let accept = Accept::parse("text/plain;q=0.5, application/json;q=0.9");
//! let sorted = accept.sorted_by_quality();
//! assert_eq!(sorted[0].0, MediaType::json());
//!
//! let problem = MediaType::parse("application/problem+json").unwrap();
//! assert!(problem.is_subset_of(&MediaType::parse("application/*+json").unwrap()));
//! ```

use std::fmt;

// ============================================================================
// Media Types
// ============================================================================

/// A media type (MIME type) with ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// The type (e.g., "application", "text")
    pub type_: String,
    /// The full subtype, including any suffix (e.g., "json", "problem+json")
    pub subtype: String,
    /// Parameters in header order; names are lowercase
    pub params: Vec<(String, String)>,
}

impl MediaType {
    /// Create a new media type.
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Add a parameter, replacing one with the same name.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// `application/json`
    pub fn json() -> Self {
        Self::new("application", "json")
    }

    /// `text/json`
    pub fn text_json() -> Self {
        Self::new("text", "json")
    }

    /// `text/plain`
    pub fn plain_text() -> Self {
        Self::new("text", "plain")
    }

    /// `application/xml`
    pub fn xml() -> Self {
        Self::new("application", "xml")
    }

    /// `text/xml`
    pub fn text_xml() -> Self {
        Self::new("text", "xml")
    }

    /// `application/x-www-form-urlencoded`
    pub fn form_urlencoded() -> Self {
        Self::new("application", "x-www-form-urlencoded")
    }

    /// `multipart/form-data`
    pub fn multipart_form_data() -> Self {
        Self::new("multipart", "form-data")
    }

    /// `application/octet-stream`
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// `*/*`
    pub fn any() -> Self {
        Self::new("*", "*")
    }

    /// Parse a media type, keeping every parameter (including `q`).
    ///
    /// Quoted parameter values may contain `;` and `,`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = split_unquoted(s, ';').into_iter();

        let type_subtype = parts.next()?.trim();
        let (type_, subtype) = type_subtype.split_once('/')?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if !is_token(type_) || !is_token(subtype) {
            return None;
        }

        let mut params = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param.split_once('=')?;
            let key = key.trim();
            if !is_token(key) {
                return None;
            }
            params.push((key.to_ascii_lowercase(), unquote(value.trim())));
        }

        Some(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params,
        })
    }

    /// Structured syntax suffix (`json` for `application/problem+json`)
    pub fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// Subtype with any suffix removed
    pub fn subtype_without_suffix(&self) -> &str {
        self.subtype
            .rsplit_once('+')
            .map(|(subtype, _)| subtype)
            .unwrap_or(&self.subtype)
    }

    /// Look up a parameter (case-insensitive name)
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// Check if this is `*/*`.
    pub fn is_any(&self) -> bool {
        self.type_ == "*" && self.subtype == "*"
    }

    /// Whether the type or the subtype (ignoring a suffix) is `*`
    pub fn has_wildcard(&self) -> bool {
        self.type_ == "*" || self.subtype_without_suffix() == "*"
    }

    /// Whether this media type is contained in `set`.
    ///
    /// `application/json` is a subset of `application/*` and of `*/*`;
    /// `application/vnd.api+json` is a subset of `application/json` and of
    /// `application/*+json`; `text/plain; charset=utf-8` is a subset of
    /// `text/plain`, but not the other way around.
    pub fn is_subset_of(&self, set: &MediaType) -> bool {
        self.matches_type(set) && self.matches_subtype(set) && self.contains_all_params(set)
    }

    fn matches_type(&self, set: &MediaType) -> bool {
        set.type_ == "*" || set.type_.eq_ignore_ascii_case(&self.type_)
    }

    fn matches_subtype(&self, set: &MediaType) -> bool {
        if set.subtype == "*" {
            return true;
        }
        match (set.suffix(), self.suffix()) {
            (Some(set_suffix), Some(suffix)) => {
                let set_base = set.subtype_without_suffix();
                (set_base == "*" || set_base.eq_ignore_ascii_case(self.subtype_without_suffix()))
                    && set_suffix.eq_ignore_ascii_case(suffix)
            }
            // A suffixed set never contains an unsuffixed type
            (Some(_), None) => false,
            (None, suffix) => {
                set.subtype.eq_ignore_ascii_case(&self.subtype)
                    || suffix.is_some_and(|s| set.subtype.eq_ignore_ascii_case(s))
            }
        }
    }

    fn contains_all_params(&self, set: &MediaType) -> bool {
        for (name, value) in &set.params {
            if name == "q" {
                // accept-params start at q
                break;
            }
            match self.param(name) {
                Some(local) if local.eq_ignore_ascii_case(value) => {}
                _ => return false,
            }
        }
        true
    }

    /// Type and subtype without parameters.
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    /// Full header value, parameters in order.
    pub fn to_header_value(&self) -> String {
        let mut result = self.mime_type();
        for (key, value) in &self.params {
            result.push_str("; ");
            result.push_str(key);
            result.push('=');
            if value.is_empty() || !is_token(value) {
                result.push('"');
                result.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
                result.push('"');
            } else {
                result.push_str(value);
            }
        }
        result
    }

    /// Drop accept-params (`q` and everything after it).
    pub fn without_quality(&self) -> Self {
        let end = self
            .params
            .iter()
            .position(|(k, _)| k == "q")
            .unwrap_or(self.params.len());
        Self {
            type_: self.type_.clone(),
            subtype: self.subtype.clone(),
            params: self.params[..end].to_vec(),
        }
    }

    /// Whether this is a form content type (urlencoded or multipart)
    pub fn is_form(&self) -> bool {
        self.is_subset_of(&Self::form_urlencoded()) || self.is_subset_of(&Self::multipart_form_data())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_header_value())
    }
}

// ============================================================================
// Accept Header
// ============================================================================

/// A parsed `Accept` header, entries in header order with quality values.
#[derive(Debug, Clone, Default)]
pub struct Accept {
    pub media_types: Vec<(MediaType, f32)>,
}

impl Accept {
    /// Parse an `Accept` header. Malformed entries are skipped.
    ///
    /// ```
    /// use trellis_core::media_type::Accept;
    ///
    /// let accept = Accept::parse("application/json, text/html;q=0.9, */*;q=0.1");
    /// assert_eq!(accept.media_types.len(), 3);
    /// ```
    pub fn parse(header: &str) -> Self {
        let media_types = split_unquoted(header, ',')
            .into_iter()
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return None;
                }
                let media_type = MediaType::parse(part)?;
                let quality = Self::extract_quality(&media_type)?;
                Some((media_type.without_quality(), quality))
            })
            .collect();

        Self { media_types }
    }

    /// Quality of an entry; `None` when `q` is present but malformed.
    fn extract_quality(media_type: &MediaType) -> Option<f32> {
        match media_type.param("q") {
            None => Some(1.0),
            Some(q) => {
                let quality: f32 = q.trim().parse().ok()?;
                (0.0..=1.0).contains(&quality).then_some(quality)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.media_types.is_empty()
    }

    /// Whether any entry is `*/*`
    pub fn contains_any(&self) -> bool {
        self.media_types.iter().any(|(mt, _)| mt.is_any())
    }

    /// Entries stable-sorted by descending quality.
    ///
    /// Entries with equal quality keep their header order.
    pub fn sorted_by_quality(&self) -> Vec<(MediaType, f32)> {
        let mut sorted = self.media_types.clone();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    /// Quality of the first entry that contains `media_type`, or 0.
    pub fn quality_for(&self, media_type: &MediaType) -> f32 {
        self.media_types
            .iter()
            .find(|(mt, _)| media_type.is_subset_of(mt))
            .map(|(_, q)| *q)
            .unwrap_or(0.0)
    }
}

// ============================================================================
// Tokenizing helpers
// ============================================================================

/// Split on `delimiter`, ignoring delimiters inside quoted strings.
fn split_unquoted(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => value.to_string(),
    }
}

/// RFC 7230 token characters
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| {
            c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(s: &str) -> MediaType {
        MediaType::parse(s).unwrap()
    }

    #[test]
    fn test_media_type_parse() {
        let mt = mt("Application/JSON");
        assert_eq!(mt.type_, "application");
        assert_eq!(mt.subtype, "json");
        assert!(mt.params.is_empty());
    }

    #[test]
    fn test_media_type_with_params() {
        let mt = mt("text/html; charset=utf-8");
        assert_eq!(mt.charset(), Some("utf-8"));
        assert_eq!(mt.to_header_value(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_quoted_parameter() {
        let mt = mt(r#"text/plain; title="a;b,c"; charset=utf-8"#);
        assert_eq!(mt.param("title"), Some("a;b,c"));
        assert_eq!(mt.charset(), Some("utf-8"));
    }

    #[test]
    fn test_invalid_media_types() {
        assert!(MediaType::parse("json").is_none());
        assert!(MediaType::parse("text/").is_none());
        assert!(MediaType::parse("text/plain; charset").is_none());
    }

    #[test]
    fn test_suffix() {
        let mt = mt("application/vnd.api+json");
        assert_eq!(mt.suffix(), Some("json"));
        assert_eq!(mt.subtype_without_suffix(), "vnd.api");
        assert_eq!(MediaType::json().suffix(), None);
    }

    #[test]
    fn test_subset_wildcards() {
        let json = MediaType::json();
        assert!(json.is_subset_of(&MediaType::any()));
        assert!(json.is_subset_of(&mt("application/*")));
        assert!(!json.is_subset_of(&mt("text/*")));
        assert!(!MediaType::any().is_subset_of(&json));
    }

    #[test]
    fn test_subset_suffix_rules() {
        let vnd = mt("application/vnd.api+json");
        assert!(vnd.is_subset_of(&mt("application/json")));
        assert!(vnd.is_subset_of(&mt("application/*+json")));
        assert!(!MediaType::json().is_subset_of(&mt("application/*+json")));
        assert!(!mt("application/vnd.api+xml").is_subset_of(&mt("application/*+json")));
    }

    #[test]
    fn test_subset_parameters() {
        let with_charset = mt("text/plain; charset=utf-8");
        let bare = MediaType::plain_text();
        assert!(with_charset.is_subset_of(&bare));
        assert!(!bare.is_subset_of(&with_charset));
        assert!(with_charset.is_subset_of(&mt("text/plain; CHARSET=UTF-8")));
    }

    #[test]
    fn test_subset_ignores_accept_params() {
        let set = mt("text/plain; q=0.5; level=1");
        assert!(MediaType::plain_text().is_subset_of(&set));
    }

    #[test]
    fn test_accept_parse_keeps_order() {
        let accept = Accept::parse("text/plain;q=0.5, application/json;q=0.9");
        assert_eq!(accept.media_types.len(), 2);
        assert_eq!(accept.media_types[0].0, MediaType::plain_text());
        assert_eq!(accept.media_types[0].1, 0.5);
    }

    #[test]
    fn test_accept_sorted_by_quality_is_stable() {
        let accept = Accept::parse("text/xml, text/plain;q=0.5, application/json, text/csv;q=0.5");
        let sorted: Vec<String> = accept
            .sorted_by_quality()
            .into_iter()
            .map(|(mt, _)| mt.mime_type())
            .collect();
        assert_eq!(sorted, ["text/xml", "application/json", "text/plain", "text/csv"]);
    }

    #[test]
    fn test_accept_skips_malformed_entries() {
        let accept = Accept::parse("application/json, garbage, text/plain;q=abc, text/html;q=2");
        assert_eq!(accept.media_types.len(), 1);
    }

    #[test]
    fn test_accept_quality_param_stripped() {
        let accept = Accept::parse("text/plain;q=0.3;level=1");
        assert_eq!(accept.media_types[0].0, MediaType::plain_text());
    }

    #[test]
    fn test_accept_quality_for() {
        let accept = Accept::parse("application/json, text/*;q=0.4");
        assert_eq!(accept.quality_for(&MediaType::json()), 1.0);
        assert_eq!(accept.quality_for(&MediaType::plain_text()), 0.4);
        assert_eq!(accept.quality_for(&MediaType::xml()), 0.0);
    }

    #[test]
    fn test_contains_any() {
        assert!(Accept::parse("text/html, */*;q=0.8").contains_any());
        assert!(!Accept::parse("text/html").contains_any());
    }

    #[test]
    fn test_form_detection() {
        assert!(mt("multipart/form-data; boundary=x").is_form());
        assert!(MediaType::form_urlencoded().is_form());
        assert!(!MediaType::json().is_form());
    }
}
